//! Shared fixtures for hire-intake integration tests

#![allow(dead_code)]

use std::time::Duration;

use hire_common::config::StoreConfig;
use hire_common::db::{init_database, Account, Job, JobStatus, Role};
use hire_common::NotificationHub;
use hire_intake::db::{accounts, jobs};
use hire_intake::pipeline::{ApplicantHints, IngestionOrchestrator, RetryPolicy, SubmitApplication};
use hire_intake::AppState;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

pub const CV_URL: &str = "https://files.example.com/cv/jane-doe.pdf";

/// Throwaway database plus a wired-up pipeline
pub struct TestEnv {
    // Keeps the database directory alive for the test
    _dir: TempDir,
    pub pool: SqlitePool,
    pub hub: NotificationHub,
    pub orchestrator: IngestionOrchestrator,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("hire.db"), &StoreConfig::default())
            .await
            .unwrap();
        let hub = NotificationHub::new(64);
        let orchestrator = IngestionOrchestrator::new(pool.clone(), hub.clone(), fast_retry());

        Self {
            _dir: dir,
            pool,
            hub,
            orchestrator,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(self.pool.clone(), self.hub.clone(), fast_retry())
    }

    pub async fn account(&self, email: &str, name: &str, role: Role) -> Account {
        accounts::create_account(
            &self.pool,
            &accounts::NewAccount {
                email: email.to_string(),
                display_name: name.to_string(),
                role,
                email_verified: true,
            },
        )
        .await
        .unwrap()
    }

    pub async fn recruiter(&self, email: &str) -> Account {
        self.account(email, "Rita Recruiter", Role::Recruiter).await
    }

    pub async fn admin(&self) -> Account {
        self.account("admin@example.com", "Ada Admin", Role::Admin).await
    }

    pub async fn job(&self, recruiter: &Account, title: &str, status: JobStatus) -> Job {
        jobs::create_job(&self.pool, title, recruiter.id, status)
            .await
            .unwrap()
    }

    pub async fn open_job(&self, recruiter: &Account) -> Job {
        self.job(recruiter, "Backend Engineer", JobStatus::Open).await
    }

    pub async fn reload_job(&self, job_id: Uuid) -> Job {
        jobs::load_job(&self.pool, job_id).await.unwrap().unwrap()
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5))
}

pub fn guest_hints(email: &str, name: &str) -> ApplicantHints {
    ApplicantHints {
        account_id: None,
        email: Some(email.to_string()),
        display_name: Some(name.to_string()),
    }
}

/// Guest submission with a document attached
pub fn guest_submission(job_id: Uuid, email: &str, name: &str) -> SubmitApplication {
    SubmitApplication {
        job_id,
        hints: guest_hints(email, name),
        cover_note: Some("Keen to join the team.".to_string()),
        document_url: Some(CV_URL.to_string()),
    }
}
