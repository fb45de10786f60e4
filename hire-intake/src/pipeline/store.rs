//! Application Store
//!
//! Persists applications, applies validated status changes and keeps the
//! per-job counter. Counter updates are best-effort: a failed increment or
//! decrement is logged and left for reconciliation.

use hire_common::db::{
    Account, Applicant, ApplicantSnapshot, Application, ApplicationStatus, ApplicationView, Job,
    JobStatus,
};
use hire_common::time;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::status::validate_transition;
use crate::db::applications::{self, ListScope};
use crate::db::jobs::{self, CounterDrift};
use crate::error::ApplicationError;
use crate::pagination::{Page, PageRequest};

/// Submission payload
#[derive(Debug, Clone)]
pub struct NewApplication {
    /// Retrieval URL from the document storage collaborator
    pub document_url: String,
    pub cover_note: Option<String>,
}

/// A status change that was written
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub application: Application,
    pub old_status: ApplicationStatus,
}

#[derive(Debug, Clone)]
pub struct ApplicationStore {
    db: SqlitePool,
}

impl ApplicationStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn load_job(&self, job_id: Uuid) -> Result<Job, ApplicationError> {
        jobs::load_job(&self.db, job_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("job {}", job_id)))
    }

    pub async fn load(&self, application_id: Uuid) -> Result<Application, ApplicationError> {
        applications::load_application(&self.db, application_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("application {}", application_id)))
    }

    /// Write a new `pending` application, then bump the job counter
    ///
    /// Fails with `JobClosed` unless the job is open, and with
    /// `DuplicateApplication` when the pair already has a record.
    pub async fn create(
        &self,
        account: &Account,
        applicant: &Applicant,
        job: &Job,
        payload: NewApplication,
    ) -> Result<Application, ApplicationError> {
        if job.status != JobStatus::Open {
            return Err(ApplicationError::JobClosed(job.id));
        }

        let now = time::now();
        let application = Application {
            id: Uuid::new_v4(),
            job_id: job.id,
            applicant_id: applicant.id,
            status: ApplicationStatus::Pending,
            document_url: payload.document_url,
            cover_note: payload.cover_note,
            applied_at: now,
            updated_at: now,
            snapshot: ApplicantSnapshot::capture(account, applicant),
        };

        if let Err(err) = applications::insert_application(&self.db, &application).await {
            if err.is_unique_violation() {
                return Err(ApplicationError::DuplicateApplication {
                    applicant_id: applicant.id,
                    job_id: job.id,
                });
            }
            return Err(err.into());
        }

        tracing::info!(
            application_id = %application.id,
            job_id = %job.id,
            applicant_id = %applicant.id,
            "Application created"
        );

        if let Err(err) = jobs::increment_application_count(&self.db, job.id).await {
            tracing::warn!(
                job_id = %job.id,
                application_id = %application.id,
                error = %err,
                "Failed to increment application counter, left for reconciliation"
            );
        }

        Ok(application)
    }

    /// Apply a status transition validated by the status machine
    ///
    /// The write is a compare-and-set on the status that was validated; if a
    /// concurrent change lands first, the request is re-validated against the
    /// new status.
    pub async fn update_status(
        &self,
        application_id: Uuid,
        new_status: ApplicationStatus,
    ) -> Result<StatusChange, ApplicationError> {
        loop {
            let current = self.load(application_id).await?;
            validate_transition(current.status, new_status)?;

            let written = applications::update_application_status(
                &self.db,
                application_id,
                current.status,
                new_status,
            )
            .await?;

            if written {
                tracing::info!(
                    application_id = %application_id,
                    old_status = %current.status,
                    new_status = %new_status,
                    "Application status changed"
                );
                let application = self.load(application_id).await?;
                return Ok(StatusChange {
                    application,
                    old_status: current.status,
                });
            }

            tracing::debug!(
                application_id = %application_id,
                "Status changed concurrently, re-validating"
            );
        }
    }

    /// Remove an application and decrement its job counter
    pub async fn delete(&self, application_id: Uuid) -> Result<Application, ApplicationError> {
        let application = self.load(application_id).await?;

        if !applications::delete_application(&self.db, application_id).await? {
            return Err(ApplicationError::NotFound(format!("application {}", application_id)));
        }

        tracing::info!(
            application_id = %application_id,
            job_id = %application.job_id,
            "Application deleted"
        );

        if let Err(err) = jobs::decrement_application_count(&self.db, application.job_id).await {
            tracing::warn!(
                job_id = %application.job_id,
                application_id = %application_id,
                error = %err,
                "Failed to decrement application counter, left for reconciliation"
            );
        }

        Ok(application)
    }

    /// Denormalized projection of one application, joined at read time
    pub async fn get_view(&self, application_id: Uuid) -> Result<ApplicationView, ApplicationError> {
        applications::load_application_view(&self.db, application_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("application {}", application_id)))
    }

    pub async fn list_for_job(
        &self,
        job_id: Uuid,
        status: Option<ApplicationStatus>,
        page: PageRequest,
    ) -> Result<Page<ApplicationView>, ApplicationError> {
        self.load_job(job_id).await?;
        self.list(ListScope::Job(job_id), status, page).await
    }

    pub async fn list_for_recruiter(
        &self,
        recruiter_id: Uuid,
        status: Option<ApplicationStatus>,
        page: PageRequest,
    ) -> Result<Page<ApplicationView>, ApplicationError> {
        self.list(ListScope::Recruiter(recruiter_id), status, page).await
    }

    async fn list(
        &self,
        scope: ListScope,
        status: Option<ApplicationStatus>,
        page: PageRequest,
    ) -> Result<Page<ApplicationView>, ApplicationError> {
        let (items, total) = applications::list_application_views(&self.db, scope, status, page).await?;
        Ok(Page::new(items, total, page))
    }

    /// Recompute one job's counter from its application records
    pub async fn reconcile_job_counter(&self, job_id: Uuid) -> Result<CounterDrift, ApplicationError> {
        let drift = jobs::reconcile_application_count(&self.db, job_id).await?;
        if drift.drift() != 0 {
            tracing::warn!(
                job_id = %job_id,
                stored = drift.stored,
                actual = drift.actual,
                "Corrected application counter drift"
            );
        }
        Ok(drift)
    }

    /// Recompute every job's counter, returning only the jobs that drifted
    pub async fn reconcile_all_counters(&self) -> Result<Vec<CounterDrift>, ApplicationError> {
        let drifts = jobs::reconcile_all_application_counts(&self.db).await?;
        tracing::info!(corrected = drifts.len(), "Application counters reconciled");
        Ok(drifts)
    }
}
