//! Application persistence and the denormalized read projection

use hire_common::db::{
    ApplicantSnapshot, ApplicantSummary, Application, ApplicationStatus, ApplicationView,
    JobSummary,
};
use hire_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{encode_skills, parse_guid, parse_optional_guid, parse_skills};
use crate::pagination::PageRequest;

const APPLICATION_COLUMNS: &str = "guid, job_guid, applicant_guid, status, document_url, \
     cover_note, applied_at, updated_at, snapshot_name, snapshot_email, snapshot_university, \
     snapshot_degree, snapshot_skills";

/// Projection query: application joined with its job, applicant and account
const VIEW_SELECT: &str = r#"
    SELECT a.guid, a.status, a.document_url, a.cover_note, a.applied_at, a.updated_at,
           a.snapshot_name, a.snapshot_email, a.snapshot_university, a.snapshot_degree,
           a.snapshot_skills,
           j.guid AS job_guid, j.title AS job_title, j.status AS job_status, j.recruiter_guid,
           p.guid AS applicant_guid, p.account_guid, p.first_name, p.last_name,
           p.email AS applicant_email, p.university, p.degree, p.skills,
           acc.display_name AS account_name, acc.email AS account_email
    FROM applications a
    JOIN jobs j ON j.guid = a.job_guid
    JOIN applicants p ON p.guid = a.applicant_guid
    LEFT JOIN accounts acc ON acc.guid = p.account_guid
"#;

/// Which applications a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    Job(Uuid),
    Recruiter(Uuid),
}

fn snapshot_from_row(row: &SqliteRow) -> Result<ApplicantSnapshot> {
    let skills: String = row.try_get("snapshot_skills")?;
    Ok(ApplicantSnapshot {
        name: row.try_get("snapshot_name")?,
        email: row.try_get("snapshot_email")?,
        university: row.try_get("snapshot_university")?,
        degree: row.try_get("snapshot_degree")?,
        skills: parse_skills(&skills)?.into_iter().collect(),
    })
}

fn application_from_row(row: &SqliteRow) -> Result<Application> {
    let guid: String = row.try_get("guid")?;
    let job: String = row.try_get("job_guid")?;
    let applicant: String = row.try_get("applicant_guid")?;
    let status: String = row.try_get("status")?;
    let applied_at: String = row.try_get("applied_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Application {
        id: parse_guid(&guid)?,
        job_id: parse_guid(&job)?,
        applicant_id: parse_guid(&applicant)?,
        status: status.parse()?,
        document_url: row.try_get("document_url")?,
        cover_note: row.try_get("cover_note")?,
        applied_at: time::from_db(&applied_at)?,
        updated_at: time::from_db(&updated_at)?,
        snapshot: snapshot_from_row(row)?,
    })
}

fn view_from_row(row: &SqliteRow) -> Result<ApplicationView> {
    let guid: String = row.try_get("guid")?;
    let status: String = row.try_get("status")?;
    let applied_at: String = row.try_get("applied_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let job_guid: String = row.try_get("job_guid")?;
    let job_status: String = row.try_get("job_status")?;
    let recruiter: String = row.try_get("recruiter_guid")?;

    let applicant_guid: String = row.try_get("applicant_guid")?;
    let first_name: String = row.try_get("first_name")?;
    let last_name: String = row.try_get("last_name")?;
    let account_name: Option<String> = row.try_get("account_name")?;
    let account_email: Option<String> = row.try_get("account_email")?;
    let applicant_email: String = row.try_get("applicant_email")?;
    let skills: String = row.try_get("skills")?;

    // Account fields win over profile fields when present
    let name = account_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("{} {}", first_name, last_name).trim().to_string());
    let email = account_email.unwrap_or(applicant_email);

    Ok(ApplicationView {
        id: parse_guid(&guid)?,
        status: status.parse()?,
        document_url: row.try_get("document_url")?,
        cover_note: row.try_get("cover_note")?,
        applied_at: time::from_db(&applied_at)?,
        updated_at: time::from_db(&updated_at)?,
        job: JobSummary {
            id: parse_guid(&job_guid)?,
            title: row.try_get("job_title")?,
            status: job_status.parse()?,
            recruiter_id: parse_guid(&recruiter)?,
        },
        applicant: ApplicantSummary {
            id: parse_guid(&applicant_guid)?,
            account_id: parse_optional_guid(row.try_get("account_guid")?)?,
            name,
            email,
            university: row.try_get("university")?,
            degree: row.try_get("degree")?,
            skills: parse_skills(&skills)?.into_iter().collect(),
        },
        submitted_as: snapshot_from_row(row)?,
    })
}

/// Insert a new application
///
/// A second application for the same (applicant, job) pair fails with a
/// unique-constraint violation.
pub async fn insert_application(pool: &SqlitePool, application: &Application) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO applications (guid, job_guid, applicant_guid, status, document_url,
                                  cover_note, applied_at, updated_at, snapshot_name,
                                  snapshot_email, snapshot_university, snapshot_degree,
                                  snapshot_skills)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(application.id.to_string())
    .bind(application.job_id.to_string())
    .bind(application.applicant_id.to_string())
    .bind(application.status.as_str())
    .bind(&application.document_url)
    .bind(&application.cover_note)
    .bind(time::to_db(&application.applied_at))
    .bind(time::to_db(&application.updated_at))
    .bind(&application.snapshot.name)
    .bind(&application.snapshot.email)
    .bind(&application.snapshot.university)
    .bind(&application.snapshot.degree)
    .bind(encode_skills(&application.snapshot.skills))
    .execute(pool)
    .await?;

    Ok(())
}

/// Find any application for the pair, regardless of status
pub async fn find_application_for_pair(
    pool: &SqlitePool,
    applicant_id: Uuid,
    job_id: Uuid,
) -> Result<Option<Uuid>> {
    let guid: Option<String> = sqlx::query_scalar(
        "SELECT guid FROM applications WHERE applicant_guid = ? AND job_guid = ?",
    )
    .bind(applicant_id.to_string())
    .bind(job_id.to_string())
    .fetch_optional(pool)
    .await?;

    guid.as_deref().map(parse_guid).transpose()
}

/// Load application by id
pub async fn load_application(pool: &SqlitePool, id: Uuid) -> Result<Option<Application>> {
    let sql = format!(
        "SELECT {} FROM applications WHERE guid = ?",
        APPLICATION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(application_from_row).transpose()
}

/// Move an application from `expected` to `new_status`
///
/// Compare-and-set on the current status: returns false (and writes nothing)
/// when the stored status is no longer `expected`.
pub async fn update_application_status(
    pool: &SqlitePool,
    id: Uuid,
    expected: ApplicationStatus,
    new_status: ApplicationStatus,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE applications SET status = ?, updated_at = ? WHERE guid = ? AND status = ?",
    )
    .bind(new_status.as_str())
    .bind(time::to_db(&time::now()))
    .bind(id.to_string())
    .bind(expected.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Delete an application, returning whether a row was removed
pub async fn delete_application(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM applications WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Count applications referencing a job
pub async fn count_applications_for_job(pool: &SqlitePool, job_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE job_guid = ?")
        .bind(job_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Load the denormalized projection of one application
pub async fn load_application_view(pool: &SqlitePool, id: Uuid) -> Result<Option<ApplicationView>> {
    let sql = format!("{} WHERE a.guid = ?", VIEW_SELECT);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(view_from_row).transpose()
}

/// List projections for a job or recruiter, newest first
///
/// Returns the requested page and the total number of matching rows.
pub async fn list_application_views(
    pool: &SqlitePool,
    scope: ListScope,
    status: Option<ApplicationStatus>,
    page: PageRequest,
) -> Result<(Vec<ApplicationView>, i64)> {
    let (scope_clause, scope_id) = match scope {
        ListScope::Job(id) => ("a.job_guid = ?", id),
        ListScope::Recruiter(id) => ("j.recruiter_guid = ?", id),
    };
    let status_filter = status.map(|s| s.as_str());

    let count_sql = format!(
        "SELECT COUNT(*) FROM applications a JOIN jobs j ON j.guid = a.job_guid
         WHERE {} AND (? IS NULL OR a.status = ?)",
        scope_clause
    );
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(scope_id.to_string())
        .bind(status_filter)
        .bind(status_filter)
        .fetch_one(pool)
        .await?;

    let list_sql = format!(
        "{} WHERE {} AND (? IS NULL OR a.status = ?)
         ORDER BY a.applied_at DESC, a.guid ASC
         LIMIT ? OFFSET ?",
        VIEW_SELECT, scope_clause
    );
    let rows = sqlx::query(&list_sql)
        .bind(scope_id.to_string())
        .bind(status_filter)
        .bind(status_filter)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?;

    let views = rows.iter().map(view_from_row).collect::<Result<Vec<_>>>()?;
    Ok((views, total))
}
