//! Error types for hire-intake
//!
//! One enum per pipeline component, unified by [`IntakeError`] at the
//! orchestrator and HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hire_common::db::{ApplicationStatus, Role};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Identity Resolver failures
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Neither an account id nor an email was supplied (or the account id
    /// matched nothing and there is no email to provision with)
    #[error("Insufficient identity hints: an account id or email is required")]
    InsufficientHints,

    /// The matched account belongs to a recruiter or admin
    #[error("Account {account_id} has role {role} and cannot apply")]
    NotApplicantAccount { account_id: Uuid, role: Role },

    /// The matched account has been deactivated
    #[error("Account {0} is deactivated")]
    AccountInactive(Uuid),

    /// A lookup or synthesis write failed; retryable
    #[error("Identity persistence failed: {0}")]
    PersistenceFailed(#[source] hire_common::Error),
}

/// Duplicate Guard failures
#[derive(Debug, Error)]
pub enum DuplicateError {
    /// The duplicate lookup could not reach the store; retryable
    #[error("Duplicate check unavailable: {0}")]
    StoreUnavailable(#[source] hire_common::Error),
}

/// Application Store and Status Machine failures
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Job {0} is not open for applications")]
    JobClosed(Uuid),

    #[error("A submitted document is required to apply")]
    MissingRequiredArtifact,

    #[error("Cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("Application is already {0} and cannot change")]
    AlreadyFinal(ApplicationStatus),

    /// The uniqueness constraint rejected a second application for the pair
    #[error("Applicant {applicant_id} already applied to job {job_id}")]
    DuplicateApplication { applicant_id: Uuid, job_id: Uuid },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] hire_common::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other storage failure (decode errors, constraint failures other than
    /// the duplicate pair)
    #[error("Storage error: {0}")]
    Storage(#[source] hire_common::Error),
}

impl From<hire_common::Error> for ApplicationError {
    fn from(err: hire_common::Error) -> Self {
        if err.is_store_unavailable() {
            ApplicationError::StoreUnavailable(err)
        } else if let hire_common::Error::NotFound(what) = err {
            ApplicationError::NotFound(what)
        } else {
            ApplicationError::Storage(err)
        }
    }
}

/// Requester is not allowed to act on the application
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("Account {account_id} does not own job {job_id}")]
    NotJobOwner { account_id: Uuid, job_id: Uuid },

    #[error("Account {account_id} may not withdraw application {application_id}")]
    NotApplicationOwner {
        account_id: Uuid,
        application_id: Uuid,
    },
}

/// Error returned by the ingestion orchestrator and HTTP handlers
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// Operation requires an authenticated caller
    #[error("Authentication required")]
    Unauthenticated,

    /// Malformed request
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntakeError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            IntakeError::Identity(IdentityError::InsufficientHints) => "INSUFFICIENT_HINTS",
            IntakeError::Identity(IdentityError::NotApplicantAccount { .. }) => {
                "NOT_APPLICANT_ACCOUNT"
            }
            IntakeError::Identity(IdentityError::AccountInactive(_)) => "ACCOUNT_INACTIVE",
            IntakeError::Identity(IdentityError::PersistenceFailed(_)) => {
                "IDENTITY_PERSISTENCE_FAILED"
            }
            IntakeError::Duplicate(DuplicateError::StoreUnavailable(_)) => "STORE_UNAVAILABLE",
            IntakeError::Application(err) => match err {
                ApplicationError::JobClosed(_) => "JOB_CLOSED",
                ApplicationError::MissingRequiredArtifact => "MISSING_REQUIRED_ARTIFACT",
                ApplicationError::InvalidTransition { .. } => "INVALID_TRANSITION",
                ApplicationError::AlreadyFinal(_) => "ALREADY_FINAL",
                ApplicationError::DuplicateApplication { .. } => "DUPLICATE_APPLICATION",
                ApplicationError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
                ApplicationError::NotFound(_) => "NOT_FOUND",
                ApplicationError::Storage(_) => "STORAGE_ERROR",
            },
            IntakeError::Authorization(AuthorizationError::NotJobOwner { .. }) => "NOT_JOB_OWNER",
            IntakeError::Authorization(AuthorizationError::NotApplicationOwner { .. }) => {
                "NOT_APPLICATION_OWNER"
            }
            IntakeError::Unauthenticated => "UNAUTHENTICATED",
            IntakeError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IntakeError::Identity(IdentityError::PersistenceFailed(_))
                | IntakeError::Duplicate(DuplicateError::StoreUnavailable(_))
                | IntakeError::Application(ApplicationError::StoreUnavailable(_))
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            IntakeError::Identity(IdentityError::InsufficientHints) => StatusCode::BAD_REQUEST,
            IntakeError::Identity(IdentityError::NotApplicantAccount { .. })
            | IntakeError::Identity(IdentityError::AccountInactive(_)) => StatusCode::FORBIDDEN,
            IntakeError::Identity(IdentityError::PersistenceFailed(_))
            | IntakeError::Duplicate(DuplicateError::StoreUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            IntakeError::Application(err) => match err {
                ApplicationError::JobClosed(_)
                | ApplicationError::InvalidTransition { .. }
                | ApplicationError::AlreadyFinal(_)
                | ApplicationError::DuplicateApplication { .. } => StatusCode::CONFLICT,
                ApplicationError::MissingRequiredArtifact => StatusCode::UNPROCESSABLE_ENTITY,
                ApplicationError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ApplicationError::NotFound(_) => StatusCode::NOT_FOUND,
                ApplicationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            IntakeError::Authorization(_) => StatusCode::FORBIDDEN,
            IntakeError::Unauthenticated => StatusCode::UNAUTHORIZED,
            IntakeError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for orchestrator operations and API handlers
pub type IntakeResult<T> = Result<T, IntakeError>;
