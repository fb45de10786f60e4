//! hire-intake - job-application ingestion service
//!
//! Configuration priority: command line, environment, TOML file, defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hire_common::config::{self, DATABASE_ENV_VAR};
use hire_common::db::init_database;
use hire_common::NotificationHub;
use hire_intake::pipeline::RetryPolicy;
use hire_intake::{build_router, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for hire-intake
#[derive(Parser, Debug)]
#[command(name = "hire-intake")]
#[command(about = "Job-application ingestion service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "HIRE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides HIRE_DATABASE and the config file)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "HIRE_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    let default_filter = format!(
        "hire_intake={level},hire_common={level},tower_http={level}",
        level = toml_config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting hire-intake v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let db_path =
        config::resolve_database_path(args.database.as_deref(), DATABASE_ENV_VAR, &toml_config);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path, &toml_config.store)
        .await
        .context("Failed to initialize database")?;

    let hub = NotificationHub::new(toml_config.notifications.channel_capacity);
    let retry = RetryPolicy::from(&toml_config.intake);
    info!(
        attempts = retry.attempts,
        backoff_ms = retry.backoff.as_millis() as u64,
        channel_capacity = hub.capacity(),
        "Pipeline configured"
    );

    let app = build_router(AppState::new(pool.clone(), hub, retry));

    let bind = args.bind.unwrap_or(toml_config.bind_address);
    let port = args.port.unwrap_or(toml_config.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("hire-intake listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
