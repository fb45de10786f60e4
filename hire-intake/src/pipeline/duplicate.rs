//! Duplicate Guard
//!
//! Any prior application for the (applicant, job) pair counts, whatever its
//! status. The storage uniqueness constraint settles check-then-act races;
//! the orchestrator turns that late violation into the same result as a hit
//! here.

use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::applications;
use crate::error::DuplicateError;

/// Outcome of a duplicate lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicateCheck {
    pub duplicate: bool,
    pub existing_application_id: Option<Uuid>,
}

impl DuplicateCheck {
    pub fn clear() -> Self {
        Self {
            duplicate: false,
            existing_application_id: None,
        }
    }

    pub fn existing(application_id: Uuid) -> Self {
        Self {
            duplicate: true,
            existing_application_id: Some(application_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DuplicateGuard {
    db: SqlitePool,
}

impl DuplicateGuard {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn check(&self, applicant_id: Uuid, job_id: Uuid) -> Result<DuplicateCheck, DuplicateError> {
        let existing = applications::find_application_for_pair(&self.db, applicant_id, job_id)
            .await
            .map_err(DuplicateError::StoreUnavailable)?;

        Ok(match existing {
            Some(id) => {
                tracing::debug!(
                    application_id = %id,
                    applicant_id = %applicant_id,
                    job_id = %job_id,
                    "Existing application found"
                );
                DuplicateCheck::existing(id)
            }
            None => DuplicateCheck::clear(),
        })
    }
}
