//! Application endpoints
//!
//! Thin adapters between HTTP and the ingestion orchestrator. Request
//! validation beyond parsing is left to the pipeline.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hire_common::db::{ApplicationStatus, ApplicationView};
use serde::Deserialize;
use uuid::Uuid;

use super::caller::Caller;
use crate::error::{IntakeError, IntakeResult};
use crate::pagination::{Page, PageRequest};
use crate::pipeline::{ApplicantHints, StatusUpdateRequest, SubmitApplication, WithdrawRequest};
use crate::AppState;

/// Body of POST /api/jobs/:job_id/applications
#[derive(Debug, Default, Deserialize)]
pub struct SubmitBody {
    /// Identity hints for anonymous (guest) submissions
    #[serde(default)]
    pub applicant: ApplicantHints,
    pub cover_note: Option<String>,
    pub document_url: Option<String>,
}

/// Listing filters
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    fn status(&self) -> IntakeResult<Option<ApplicationStatus>> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<ApplicationStatus>()
                    .map_err(|_| IntakeError::BadRequest(format!("Unknown status filter: {}", s)))
            })
            .transpose()
    }

    fn page(&self) -> PageRequest {
        PageRequest::new(self.offset, self.limit)
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: ApplicationStatus,
}

/// POST /api/jobs/:job_id/applications
///
/// 201 for a new application, 200 with `duplicate: true` when the applicant
/// had already applied.
pub async fn submit_application(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    caller: Caller,
    Json(body): Json<SubmitBody>,
) -> IntakeResult<Response> {
    let request = SubmitApplication {
        job_id,
        hints: caller.hints(body.applicant),
        cover_note: body.cover_note,
        document_url: body.document_url,
    };

    let outcome = state.orchestrator.submit(request).await?;
    let status = if outcome.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(outcome)).into_response())
}

/// GET /api/jobs/:job_id/applications
pub async fn list_job_applications(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> IntakeResult<Json<Page<ApplicationView>>> {
    let page = state
        .orchestrator
        .list_for_job(job_id, query.status()?, query.page())
        .await?;
    Ok(Json(page))
}

/// GET /api/recruiters/:recruiter_id/applications
pub async fn list_recruiter_applications(
    State(state): State<AppState>,
    Path(recruiter_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> IntakeResult<Json<Page<ApplicationView>>> {
    let page = state
        .orchestrator
        .list_for_recruiter(recruiter_id, query.status()?, query.page())
        .await?;
    Ok(Json(page))
}

/// GET /api/applications/:id
pub async fn get_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
) -> IntakeResult<Json<ApplicationView>> {
    Ok(Json(state.orchestrator.get(application_id).await?))
}

/// PUT /api/applications/:id/status
///
/// Requires an authenticated recruiter owning the job, or an admin.
pub async fn update_application_status(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    caller: Caller,
    Json(body): Json<StatusBody>,
) -> IntakeResult<Json<ApplicationView>> {
    let view = state
        .orchestrator
        .update_status(StatusUpdateRequest {
            application_id,
            requested_status: body.status,
            requester_account_id: caller.require_account_id()?,
        })
        .await?;
    Ok(Json(view))
}

/// DELETE /api/applications/:id
///
/// Withdrawal by the applicant, or removal by the owning recruiter or an admin.
pub async fn withdraw_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    caller: Caller,
) -> IntakeResult<StatusCode> {
    state
        .orchestrator
        .withdraw(WithdrawRequest {
            application_id,
            requester_account_id: caller.require_account_id()?,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_status_parsing() {
        let query = ListQuery {
            status: Some("shortlisted".into()),
            offset: None,
            limit: None,
        };
        assert_eq!(query.status().unwrap(), Some(ApplicationStatus::Shortlisted));

        let query = ListQuery {
            status: Some("hired".into()),
            offset: None,
            limit: None,
        };
        assert!(matches!(query.status(), Err(IntakeError::BadRequest(_))));
    }

    #[test]
    fn test_submit_body_defaults() {
        let body: SubmitBody =
            serde_json::from_str(r#"{"document_url":"https://files.example.com/cv.pdf"}"#).unwrap();
        assert!(body.applicant.email.is_none());
        assert!(body.cover_note.is_none());
    }
}
