//! Job persistence and the per-job application counter
//!
//! Counter updates are single `UPDATE ... SET application_count = application_count ± 1`
//! statements, so concurrent writers never lose an increment.

use chrono::Utc;
use hire_common::db::{Job, JobStatus};
use hire_common::{time, Error, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_guid;

const JOB_COLUMNS: &str =
    "guid, title, recruiter_guid, status, application_count, created_at, updated_at";

/// Difference between a stored counter and the actual record count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterDrift {
    pub job_id: Uuid,
    pub stored: i64,
    pub actual: i64,
}

impl CounterDrift {
    pub fn drift(&self) -> i64 {
        self.actual - self.stored
    }
}

fn job_from_row(row: &SqliteRow) -> Result<Job> {
    let guid: String = row.try_get("guid")?;
    let recruiter: String = row.try_get("recruiter_guid")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Job {
        id: parse_guid(&guid)?,
        title: row.try_get("title")?,
        recruiter_id: parse_guid(&recruiter)?,
        status: status.parse()?,
        application_count: row.try_get("application_count")?,
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}

/// Create a job owned by `recruiter_id`
pub async fn create_job(
    pool: &SqlitePool,
    title: &str,
    recruiter_id: Uuid,
    status: JobStatus,
) -> Result<Job> {
    let id = Uuid::new_v4();
    let now = time::to_db(&Utc::now());

    sqlx::query(
        r#"
        INSERT INTO jobs (guid, title, recruiter_guid, status, application_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(title)
    .bind(recruiter_id.to_string())
    .bind(status.as_str())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    load_job(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("job {}", id)))
}

/// Load job by id
pub async fn load_job(pool: &SqlitePool, id: Uuid) -> Result<Option<Job>> {
    let sql = format!("SELECT {} FROM jobs WHERE guid = ?", JOB_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// Change a job's posting status
pub async fn set_job_status(pool: &SqlitePool, id: Uuid, status: JobStatus) -> Result<()> {
    let result = sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE guid = ?")
        .bind(status.as_str())
        .bind(time::to_db(&Utc::now()))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("job {}", id)));
    }
    Ok(())
}

/// Atomically add one to the job's application counter
pub async fn increment_application_count(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query(
        "UPDATE jobs SET application_count = application_count + 1 WHERE guid = ?",
    )
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("job {}", id)));
    }
    Ok(())
}

/// Atomically subtract one from the job's application counter, never below zero
pub async fn decrement_application_count(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query(
        "UPDATE jobs SET application_count = MAX(application_count - 1, 0) WHERE guid = ?",
    )
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("job {}", id)));
    }
    Ok(())
}

/// Recompute one job's counter from the applications table
pub async fn reconcile_application_count(pool: &SqlitePool, id: Uuid) -> Result<CounterDrift> {
    let stored: i64 = sqlx::query_scalar("SELECT application_count FROM jobs WHERE guid = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;

    sqlx::query(
        r#"
        UPDATE jobs
        SET application_count = (SELECT COUNT(*) FROM applications WHERE job_guid = jobs.guid)
        WHERE guid = ?
        "#,
    )
    .bind(id.to_string())
    .execute(pool)
    .await?;

    let actual: i64 = sqlx::query_scalar("SELECT application_count FROM jobs WHERE guid = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(CounterDrift {
        job_id: id,
        stored,
        actual,
    })
}

/// Recompute every job's counter, returning only the jobs that had drifted
pub async fn reconcile_all_application_counts(pool: &SqlitePool) -> Result<Vec<CounterDrift>> {
    let drifted = sqlx::query(
        r#"
        SELECT j.guid
        FROM jobs j
        WHERE j.application_count !=
              (SELECT COUNT(*) FROM applications a WHERE a.job_guid = j.guid)
        ORDER BY j.guid
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut corrected = Vec::with_capacity(drifted.len());
    for row in &drifted {
        let guid: String = row.try_get("guid")?;
        let id = parse_guid(&guid)?;
        let drift = reconcile_application_count(pool, id).await?;
        if drift.drift() != 0 {
            corrected.push(drift);
        }
    }

    Ok(corrected)
}
