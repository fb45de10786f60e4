//! Ingestion Orchestrator
//!
//! Entry point for every pipeline operation. A submission runs
//! resolve -> duplicate check -> job/artifact validation -> create -> publish,
//! each stage awaited in turn. Only the store reachability check at entry is
//! retried; every later failure goes straight back to the caller.

use hire_common::db::{Account, Applicant, ApplicationStatus, ApplicationView, Job, JobStatus, Role};
use hire_common::{time, ApplicationEvent, NotificationHub};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::duplicate::DuplicateGuard;
use super::identity::{ApplicantHints, IdentityResolver};
use super::retry::{ensure_store_reachable, RetryPolicy};
use super::store::{ApplicationStore, NewApplication};
use crate::db::jobs::CounterDrift;
use crate::db::{accounts, applicants};
use crate::error::{ApplicationError, AuthorizationError, IntakeError, IntakeResult};
use crate::pagination::{Page, PageRequest};

/// Inbound "apply to job" request
#[derive(Debug, Clone)]
pub struct SubmitApplication {
    pub job_id: Uuid,
    pub hints: ApplicantHints,
    pub cover_note: Option<String>,
    /// Falls back to the applicant's profile document when absent
    pub document_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub application_id: Uuid,
    /// True when the applicant had already applied; nothing new was written
    pub duplicate: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct StatusUpdateRequest {
    pub application_id: Uuid,
    pub requested_status: ApplicationStatus,
    pub requester_account_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct WithdrawRequest {
    pub application_id: Uuid,
    pub requester_account_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct IngestionOrchestrator {
    db: SqlitePool,
    hub: NotificationHub,
    retry: RetryPolicy,
    identity: IdentityResolver,
    guard: DuplicateGuard,
    store: ApplicationStore,
}

impl IngestionOrchestrator {
    pub fn new(db: SqlitePool, hub: NotificationHub, retry: RetryPolicy) -> Self {
        Self {
            identity: IdentityResolver::new(db.clone()),
            guard: DuplicateGuard::new(db.clone()),
            store: ApplicationStore::new(db.clone()),
            db,
            hub,
            retry,
        }
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn store(&self) -> &ApplicationStore {
        &self.store
    }

    /// Submit an application
    ///
    /// Duplicate submissions succeed with `duplicate = true`, including the
    /// loser of a concurrent race on the same pair.
    pub async fn submit(&self, request: SubmitApplication) -> IntakeResult<SubmitOutcome> {
        self.ensure_reachable().await?;

        let identity = self.identity.resolve(&request.hints).await?;
        let account = &identity.account;
        let applicant = &identity.applicant;

        let check = self.guard.check(applicant.id, request.job_id).await?;
        if let Some(existing) = check.existing_application_id {
            tracing::info!(
                application_id = %existing,
                job_id = %request.job_id,
                applicant_id = %applicant.id,
                "Duplicate submission, returning existing application"
            );
            return Ok(SubmitOutcome {
                application_id: existing,
                duplicate: true,
            });
        }

        let job = self.store.load_job(request.job_id).await?;
        if job.status != JobStatus::Open {
            return Err(ApplicationError::JobClosed(job.id).into());
        }

        let document_url = required_artifact(request.document_url.as_deref(), applicant)?;
        let payload = NewApplication {
            document_url,
            cover_note: request
                .cover_note
                .map(|note| note.trim().to_string())
                .filter(|note| !note.is_empty()),
        };

        self.persist(account, applicant, &job, payload).await
    }

    /// Write the record and announce it
    ///
    /// A uniqueness violation here means another submission for the same pair
    /// won after the duplicate check; that becomes a duplicate outcome.
    async fn persist(
        &self,
        account: &Account,
        applicant: &Applicant,
        job: &Job,
        payload: NewApplication,
    ) -> IntakeResult<SubmitOutcome> {
        let application = match self.store.create(account, applicant, job, payload).await {
            Ok(application) => application,
            Err(ApplicationError::DuplicateApplication { .. }) => {
                return self.recover_duplicate_race(applicant.id, job.id).await;
            }
            Err(err) => return Err(err.into()),
        };

        self.publish(ApplicationEvent::ApplicationCreated {
            application_id: application.id,
            job_id: job.id,
            job_title: job.title.clone(),
            applicant_id: applicant.id,
            applicant_account_id: Some(account.id),
            applicant_name: application.snapshot.name.clone(),
            recruiter_id: Some(job.recruiter_id),
            status: application.status,
            timestamp: application.applied_at,
        });

        Ok(SubmitOutcome {
            application_id: application.id,
            duplicate: false,
        })
    }

    /// Move an application to a new status on behalf of a recruiter or admin
    pub async fn update_status(&self, request: StatusUpdateRequest) -> IntakeResult<ApplicationView> {
        self.ensure_reachable().await?;

        let application = self.store.load(request.application_id).await?;
        let job = self.store.load_job(application.job_id).await?;
        let requester = self.load_requester(request.requester_account_id).await?;

        if !manages_job(requester.as_ref(), &job) {
            return Err(AuthorizationError::NotJobOwner {
                account_id: request.requester_account_id,
                job_id: job.id,
            }
            .into());
        }

        let applicant = self.load_applicant(application.applicant_id).await?;
        let change = self
            .store
            .update_status(request.application_id, request.requested_status)
            .await?;

        self.publish(ApplicationEvent::ApplicationStatusChanged {
            application_id: change.application.id,
            job_id: job.id,
            applicant_id: change.application.applicant_id,
            applicant_account_id: applicant.and_then(|a| a.account_id),
            recruiter_id: Some(job.recruiter_id),
            old_status: change.old_status,
            new_status: change.application.status,
            timestamp: change.application.updated_at,
        });

        Ok(self.store.get_view(request.application_id).await?)
    }

    /// Withdraw (applicant) or delete (owning recruiter, admin) an application
    pub async fn withdraw(&self, request: WithdrawRequest) -> IntakeResult<()> {
        self.ensure_reachable().await?;

        let application = self.store.load(request.application_id).await?;
        let job = self.store.load_job(application.job_id).await?;
        let requester = self.load_requester(request.requester_account_id).await?;
        let applicant_account_id = self
            .load_applicant(application.applicant_id)
            .await?
            .and_then(|a| a.account_id);

        let is_own = requester
            .as_ref()
            .is_some_and(|account| account.active && Some(account.id) == applicant_account_id);
        if !is_own && !manages_job(requester.as_ref(), &job) {
            return Err(AuthorizationError::NotApplicationOwner {
                account_id: request.requester_account_id,
                application_id: application.id,
            }
            .into());
        }

        let removed = self.store.delete(request.application_id).await?;

        self.publish(ApplicationEvent::ApplicationWithdrawn {
            application_id: removed.id,
            job_id: job.id,
            applicant_id: removed.applicant_id,
            applicant_account_id,
            recruiter_id: Some(job.recruiter_id),
            timestamp: time::now(),
        });

        Ok(())
    }

    pub async fn get(&self, application_id: Uuid) -> IntakeResult<ApplicationView> {
        self.ensure_reachable().await?;
        Ok(self.store.get_view(application_id).await?)
    }

    pub async fn list_for_job(
        &self,
        job_id: Uuid,
        status: Option<ApplicationStatus>,
        page: PageRequest,
    ) -> IntakeResult<Page<ApplicationView>> {
        self.ensure_reachable().await?;
        Ok(self.store.list_for_job(job_id, status, page).await?)
    }

    pub async fn list_for_recruiter(
        &self,
        recruiter_id: Uuid,
        status: Option<ApplicationStatus>,
        page: PageRequest,
    ) -> IntakeResult<Page<ApplicationView>> {
        self.ensure_reachable().await?;
        Ok(self.store.list_for_recruiter(recruiter_id, status, page).await?)
    }

    pub async fn reconcile_job_counter(&self, job_id: Uuid) -> IntakeResult<CounterDrift> {
        self.ensure_reachable().await?;
        Ok(self.store.reconcile_job_counter(job_id).await?)
    }

    pub async fn reconcile_all_counters(&self) -> IntakeResult<Vec<CounterDrift>> {
        self.ensure_reachable().await?;
        Ok(self.store.reconcile_all_counters().await?)
    }

    async fn ensure_reachable(&self) -> IntakeResult<()> {
        ensure_store_reachable(&self.db, self.retry)
            .await
            .map_err(|err| IntakeError::from(ApplicationError::from(err)))
    }

    /// Convert a lost insert race into the winner's id
    async fn recover_duplicate_race(
        &self,
        applicant_id: Uuid,
        job_id: Uuid,
    ) -> IntakeResult<SubmitOutcome> {
        let check = self.guard.check(applicant_id, job_id).await?;
        match check.existing_application_id {
            Some(existing) => {
                tracing::warn!(
                    application_id = %existing,
                    applicant_id = %applicant_id,
                    job_id = %job_id,
                    "Concurrent duplicate submission resolved to existing application"
                );
                Ok(SubmitOutcome {
                    application_id: existing,
                    duplicate: true,
                })
            }
            // Winner was removed between the violation and the re-read
            None => Err(ApplicationError::DuplicateApplication {
                applicant_id,
                job_id,
            }
            .into()),
        }
    }

    async fn load_requester(&self, account_id: Uuid) -> IntakeResult<Option<Account>> {
        accounts::load_account(&self.db, account_id)
            .await
            .map_err(|err| ApplicationError::from(err).into())
    }

    async fn load_applicant(&self, applicant_id: Uuid) -> IntakeResult<Option<Applicant>> {
        applicants::load_applicant(&self.db, applicant_id)
            .await
            .map_err(|err| ApplicationError::from(err).into())
    }

    /// Fire-and-forget; delivery never affects the write that triggered it
    fn publish(&self, event: ApplicationEvent) {
        let event_type = event.event_type();
        let application_id = event.application_id();
        let delivered = self.hub.publish(event);
        tracing::debug!(
            event_type,
            application_id = %application_id,
            delivered,
            "Notification published"
        );
    }
}

/// Admin, or the recruiter owning the job (active accounts only)
fn manages_job(requester: Option<&Account>, job: &Job) -> bool {
    match requester {
        Some(account) if account.active => match account.role {
            Role::Admin => true,
            Role::Recruiter => account.id == job.recruiter_id,
            Role::Applicant => false,
        },
        _ => false,
    }
}

/// Document to attach: the submitted one, else the profile's upload
fn required_artifact(submitted: Option<&str>, applicant: &Applicant) -> Result<String, ApplicationError> {
    submitted
        .and_then(non_blank)
        .or_else(|| applicant.document_url.as_deref().and_then(non_blank))
        .ok_or(ApplicationError::MissingRequiredArtifact)
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
