//! Ingestion pipeline integration tests
//!
//! Submission idempotence, race safety, job/artifact validation, status
//! lifecycle, authorization, withdrawal and counter reconciliation.

mod helpers;

use hire_common::db::{ApplicationStatus, JobStatus, Role};
use hire_intake::db::jobs;
use hire_intake::error::{ApplicationError, AuthorizationError, IntakeError};
use hire_intake::pagination::PageRequest;
use hire_intake::pipeline::{
    ApplicantHints, IdentityResolver, IngestionOrchestrator, NewApplication, RetryPolicy,
    StatusUpdateRequest, SubmitApplication, WithdrawRequest,
};
use helpers::{guest_hints, guest_submission, TestEnv, CV_URL};
use std::time::Duration;
use uuid::Uuid;

async fn set_status(
    env: &TestEnv,
    application_id: Uuid,
    status: ApplicationStatus,
    requester: Uuid,
) -> Result<ApplicationStatus, IntakeError> {
    env.orchestrator
        .update_status(StatusUpdateRequest {
            application_id,
            requested_status: status,
            requester_account_id: requester,
        })
        .await
        .map(|view| view.status)
}

#[tokio::test]
async fn test_sequential_resubmission_is_idempotent() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;

    let first = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap();
    let second = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap();

    assert!(!first.duplicate);
    assert!(second.duplicate);
    assert_eq!(second.application_id, first.application_id);

    let page = env
        .orchestrator
        .list_for_job(job.id, None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(env.reload_job(job.id).await.application_count, 1);
}

#[tokio::test]
async fn test_store_rejects_second_record_for_pair() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;
    let identity = IdentityResolver::new(env.pool.clone())
        .resolve(&guest_hints("jane@example.com", "Jane Doe"))
        .await
        .unwrap();
    let store = env.orchestrator.store();
    let payload = || NewApplication {
        document_url: CV_URL.to_string(),
        cover_note: None,
    };

    store
        .create(&identity.account, &identity.applicant, &job, payload())
        .await
        .unwrap();
    let second = store
        .create(&identity.account, &identity.applicant, &job, payload())
        .await;

    match second {
        Err(ApplicationError::DuplicateApplication { applicant_id, job_id }) => {
            assert_eq!(applicant_id, identity.applicant.id);
            assert_eq!(job_id, job.id);
        }
        other => panic!("expected DuplicateApplication, got {:?}", other),
    }
    assert_eq!(env.reload_job(job.id).await.application_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_submissions_create_one_record() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;

    let job_id = job.id;
    let a = env.orchestrator.clone();
    let b = env.orchestrator.clone();
    let (first, second) = tokio::join!(
        tokio::spawn(async move {
            a.submit(guest_submission(job_id, "twin@example.com", "Tw In"))
                .await
        }),
        tokio::spawn(async move {
            b.submit(guest_submission(job_id, "twin@example.com", "Tw In"))
                .await
        }),
    );
    let first = first.unwrap().unwrap();
    let second = second.unwrap().unwrap();

    assert_eq!(first.application_id, second.application_id);
    assert_eq!(
        [first.duplicate, second.duplicate].iter().filter(|d| **d).count(),
        1,
        "exactly one submission creates the record"
    );

    let page = env
        .orchestrator
        .list_for_job(job.id, None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_closed_job_rejected() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;
    jobs::set_job_status(&env.pool, job.id, JobStatus::Closed)
        .await
        .unwrap();

    let result = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await;

    assert!(matches!(
        result,
        Err(IntakeError::Application(ApplicationError::JobClosed(id))) if id == job.id
    ));
    assert_eq!(env.reload_job(job.id).await.application_count, 0);
}

#[tokio::test]
async fn test_draft_job_rejected() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env
        .job(&recruiter, "Unpublished Role", JobStatus::Draft)
        .await;

    let err = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "JOB_CLOSED");
}

#[tokio::test]
async fn test_unknown_job_not_found() {
    let env = TestEnv::new().await;

    let err = env
        .orchestrator
        .submit(guest_submission(Uuid::new_v4(), "jane@example.com", "Jane Doe"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IntakeError::Application(ApplicationError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_missing_document_rejected() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;

    let mut request = guest_submission(job.id, "jane@example.com", "Jane Doe");
    request.document_url = None;

    let err = env.orchestrator.submit(request).await.unwrap_err();
    assert!(matches!(
        err,
        IntakeError::Application(ApplicationError::MissingRequiredArtifact)
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_insufficient_hints_surface_unchanged() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;

    let err = env
        .orchestrator
        .submit(SubmitApplication {
            job_id: job.id,
            hints: ApplicantHints::default(),
            cover_note: None,
            document_url: Some(CV_URL.into()),
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), "INSUFFICIENT_HINTS");
}

#[tokio::test]
async fn test_unreachable_store_reports_unavailable() {
    let env = TestEnv::new().await;
    let orchestrator = IngestionOrchestrator::new(
        env.pool.clone(),
        env.hub.clone(),
        RetryPolicy::new(3, Duration::from_millis(1)),
    );
    env.pool.close().await;

    let err = orchestrator
        .submit(guest_submission(Uuid::new_v4(), "jane@example.com", "Jane Doe"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IntakeError::Application(ApplicationError::StoreUnavailable(_))
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_submission_projection_and_snapshot() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;

    let outcome = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap();
    let view = env.orchestrator.get(outcome.application_id).await.unwrap();

    assert_eq!(view.status, ApplicationStatus::Pending);
    assert_eq!(view.document_url, CV_URL);
    assert_eq!(view.cover_note.as_deref(), Some("Keen to join the team."));
    assert_eq!(view.job.id, job.id);
    assert_eq!(view.job.title, "Backend Engineer");
    assert_eq!(view.job.recruiter_id, recruiter.id);
    assert_eq!(view.applicant.name, "Jane Doe");
    assert_eq!(view.applicant.email, "jane@example.com");
    assert_eq!(view.submitted_as.name, "Jane Doe");
    assert_eq!(view.submitted_as.university, "Not Specified");
}

#[tokio::test]
async fn test_status_transitions_follow_table() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;
    let id = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap()
        .application_id;

    let err = set_status(&env, id, ApplicationStatus::Accepted, recruiter.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IntakeError::Application(ApplicationError::InvalidTransition {
            from: ApplicationStatus::Pending,
            to: ApplicationStatus::Accepted,
        })
    ));

    assert_eq!(
        set_status(&env, id, ApplicationStatus::Shortlisted, recruiter.id)
            .await
            .unwrap(),
        ApplicationStatus::Shortlisted
    );
    assert_eq!(
        set_status(&env, id, ApplicationStatus::Accepted, recruiter.id)
            .await
            .unwrap(),
        ApplicationStatus::Accepted
    );

    for status in ApplicationStatus::ALL {
        let err = set_status(&env, id, status, recruiter.id).await.unwrap_err();
        assert!(
            matches!(
                err,
                IntakeError::Application(ApplicationError::AlreadyFinal(ApplicationStatus::Accepted))
            ),
            "{} on accepted",
            status
        );
    }
}

#[tokio::test]
async fn test_rejected_is_final() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;
    let id = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap()
        .application_id;

    set_status(&env, id, ApplicationStatus::Rejected, recruiter.id)
        .await
        .unwrap();
    let err = set_status(&env, id, ApplicationStatus::Reviewing, recruiter.id)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "ALREADY_FINAL");
}

#[tokio::test]
async fn test_rejected_application_still_blocks_reapplication() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;
    let first = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap();
    set_status(&env, first.application_id, ApplicationStatus::Rejected, recruiter.id)
        .await
        .unwrap();

    let again = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap();

    assert!(again.duplicate);
    assert_eq!(again.application_id, first.application_id);
}

#[tokio::test]
async fn test_only_owner_or_admin_may_change_status() {
    let env = TestEnv::new().await;
    let owner = env.recruiter("owner@example.com").await;
    let other = env.recruiter("other@example.com").await;
    let admin = env.admin().await;
    let job = env.open_job(&owner).await;
    let outcome = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap();
    let applicant_view = env.orchestrator.get(outcome.application_id).await.unwrap();
    let applicant_account = applicant_view.applicant.account_id.unwrap();

    for requester in [other.id, applicant_account, Uuid::new_v4()] {
        let err = set_status(&env, outcome.application_id, ApplicationStatus::Reviewing, requester)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IntakeError::Authorization(AuthorizationError::NotJobOwner { .. })
        ));
    }

    assert_eq!(
        set_status(&env, outcome.application_id, ApplicationStatus::Reviewing, admin.id)
            .await
            .unwrap(),
        ApplicationStatus::Reviewing
    );
}

#[tokio::test]
async fn test_withdrawal_by_applicant_frees_counter() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;
    let outcome = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap();
    let view = env.orchestrator.get(outcome.application_id).await.unwrap();
    let stranger = env
        .account("stranger@example.com", "Stan Ger", Role::Applicant)
        .await;

    let err = env
        .orchestrator
        .withdraw(WithdrawRequest {
            application_id: outcome.application_id,
            requester_account_id: stranger.id,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_APPLICATION_OWNER");

    env.orchestrator
        .withdraw(WithdrawRequest {
            application_id: outcome.application_id,
            requester_account_id: view.applicant.account_id.unwrap(),
        })
        .await
        .unwrap();

    assert_eq!(env.reload_job(job.id).await.application_count, 0);
    let err = env.orchestrator.get(outcome.application_id).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_owning_recruiter_may_delete() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;
    let outcome = env
        .orchestrator
        .submit(guest_submission(job.id, "jane@example.com", "Jane Doe"))
        .await
        .unwrap();

    env.orchestrator
        .withdraw(WithdrawRequest {
            application_id: outcome.application_id,
            requester_account_id: recruiter.id,
        })
        .await
        .unwrap();

    let page = env
        .orchestrator
        .list_for_job(job.id, None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_counter_matches_record_count_under_load() {
    const N: usize = 12;

    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let job = env.open_job(&recruiter).await;
    let job_id = job.id;

    let handles: Vec<_> = (0..N)
        .map(|i| {
            let orchestrator = env.orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .submit(guest_submission(
                        job_id,
                        &format!("applicant{}@example.com", i),
                        &format!("Applicant {}", i),
                    ))
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert!(!handle.await.unwrap().unwrap().duplicate);
    }

    assert_eq!(env.reload_job(job.id).await.application_count, N as i64);
    let drift = env.orchestrator.reconcile_job_counter(job.id).await.unwrap();
    assert_eq!(drift.drift(), 0);
    assert_eq!(drift.actual, N as i64);
}

#[tokio::test]
async fn test_reconciliation_corrects_drift() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let drifted = env.open_job(&recruiter).await;
    let healthy = env.job(&recruiter, "Data Engineer", JobStatus::Open).await;

    for (job, email) in [(drifted.id, "a@example.com"), (healthy.id, "b@example.com")] {
        env.orchestrator
            .submit(guest_submission(job, email, "Some One"))
            .await
            .unwrap();
    }
    sqlx::query("UPDATE jobs SET application_count = 7 WHERE guid = ?")
        .bind(drifted.id.to_string())
        .execute(&env.pool)
        .await
        .unwrap();

    let corrected = env.orchestrator.reconcile_all_counters().await.unwrap();
    assert_eq!(corrected.len(), 1);
    assert_eq!(corrected[0].job_id, drifted.id);
    assert_eq!(corrected[0].stored, 7);
    assert_eq!(corrected[0].actual, 1);
    assert_eq!(env.reload_job(drifted.id).await.application_count, 1);

    assert!(env.orchestrator.reconcile_all_counters().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_recruiter_listing_filters_and_pages() {
    let env = TestEnv::new().await;
    let recruiter = env.recruiter("rita@example.com").await;
    let other = env.recruiter("other@example.com").await;
    let backend = env.open_job(&recruiter).await;
    let frontend = env.job(&recruiter, "Frontend Engineer", JobStatus::Open).await;
    let elsewhere = env.open_job(&other).await;

    let mut ids = Vec::new();
    for (i, job) in [backend.id, frontend.id, backend.id].into_iter().enumerate() {
        let outcome = env
            .orchestrator
            .submit(guest_submission(job, &format!("p{}@example.com", i), "Pat Person"))
            .await
            .unwrap();
        ids.push(outcome.application_id);
    }
    env.orchestrator
        .submit(guest_submission(elsewhere.id, "q@example.com", "Quinn Q"))
        .await
        .unwrap();
    set_status(&env, ids[0], ApplicationStatus::Reviewing, recruiter.id)
        .await
        .unwrap();

    let all = env
        .orchestrator
        .list_for_recruiter(recruiter.id, None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    assert!(all.items.iter().all(|v| v.job.recruiter_id == recruiter.id));

    let reviewing = env
        .orchestrator
        .list_for_recruiter(recruiter.id, Some(ApplicationStatus::Reviewing), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(reviewing.total, 1);
    assert_eq!(reviewing.items[0].id, ids[0]);

    let page = env
        .orchestrator
        .list_for_recruiter(recruiter.id, None, PageRequest::new(Some(2), Some(2)))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.offset, 2);
    assert_eq!(page.limit, 2);
}
