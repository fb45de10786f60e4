//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and creates the
//! accounts/applicants/jobs/applications schema. Safe to call repeatedly.

use crate::config::StoreConfig;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path, store: &StoreConfig) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas set here apply to every pooled connection
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        // WAL lets dashboard reads proceed while an application is being written
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(store.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(store.max_connections)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    info!("Database busy timeout set to {} ms", store.busy_timeout_ms);

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_accounts_table(pool).await?;
    create_applicants_table(pool).await?;
    create_jobs_table(pool).await?;
    create_applications_table(pool).await?;
    Ok(())
}

async fn create_accounts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            guid TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            email_normalized TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL DEFAULT '',
            role TEXT NOT NULL CHECK (role IN ('applicant', 'recruiter', 'admin')),
            email_verified INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_applicants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applicants (
            guid TEXT PRIMARY KEY,
            account_guid TEXT UNIQUE REFERENCES accounts(guid),
            email TEXT NOT NULL DEFAULT '',
            email_normalized TEXT NOT NULL DEFAULT '',
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            university TEXT NOT NULL DEFAULT '',
            degree TEXT NOT NULL DEFAULT '',
            skills TEXT NOT NULL DEFAULT '[]',
            document_url TEXT,
            scores TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_applicants_email ON applicants(email_normalized)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_jobs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            recruiter_guid TEXT NOT NULL REFERENCES accounts(guid),
            status TEXT NOT NULL CHECK (status IN ('open', 'closed', 'draft')),
            application_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_recruiter ON jobs(recruiter_guid)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_applications_table(pool: &SqlitePool) -> Result<()> {
    // UNIQUE(applicant_guid, job_guid) is the final arbiter for concurrent submits
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            guid TEXT PRIMARY KEY,
            job_guid TEXT NOT NULL REFERENCES jobs(guid),
            applicant_guid TEXT NOT NULL REFERENCES applicants(guid),
            status TEXT NOT NULL CHECK (status IN
                ('pending', 'reviewing', 'shortlisted', 'interviewed', 'accepted', 'rejected')),
            document_url TEXT NOT NULL,
            cover_note TEXT,
            applied_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            snapshot_name TEXT NOT NULL DEFAULT '',
            snapshot_email TEXT NOT NULL DEFAULT '',
            snapshot_university TEXT NOT NULL DEFAULT '',
            snapshot_degree TEXT NOT NULL DEFAULT '',
            snapshot_skills TEXT NOT NULL DEFAULT '[]',
            UNIQUE (applicant_guid, job_guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_applications_job ON applications(job_guid, status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
