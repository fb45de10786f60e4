//! Applicant profile persistence

use hire_common::db::{normalize_email, Applicant};
use hire_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{encode_skills, parse_guid, parse_optional_guid, parse_skills};

const APPLICANT_COLUMNS: &str = "guid, account_guid, email, first_name, last_name, university, \
     degree, skills, document_url, scores, created_at, updated_at";

fn applicant_from_row(row: &SqliteRow) -> Result<Applicant> {
    let guid: String = row.try_get("guid")?;
    let skills: String = row.try_get("skills")?;
    let scores: Option<String> = row.try_get("scores")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let scores = scores
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::InvalidInput(format!("Bad scores for applicant {}: {}", guid, e)))?;

    Ok(Applicant {
        id: parse_guid(&guid)?,
        account_id: parse_optional_guid(row.try_get("account_guid")?)?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        university: row.try_get("university")?,
        degree: row.try_get("degree")?,
        skills: parse_skills(&skills)?,
        document_url: row.try_get("document_url")?,
        scores,
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}

/// Load applicant by id
pub async fn load_applicant(pool: &SqlitePool, id: Uuid) -> Result<Option<Applicant>> {
    let sql = format!("SELECT {} FROM applicants WHERE guid = ?", APPLICANT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(applicant_from_row).transpose()
}

/// Find the applicant profile linked to an account
pub async fn find_applicant_by_account(
    pool: &SqlitePool,
    account_id: Uuid,
) -> Result<Option<Applicant>> {
    let sql = format!(
        "SELECT {} FROM applicants WHERE account_guid = ?",
        APPLICANT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(account_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(applicant_from_row).transpose()
}

/// Find a legacy/guest applicant row by email that has no linked account yet
///
/// The oldest matching row wins when several exist.
pub async fn find_unlinked_applicant_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<Applicant>> {
    let sql = format!(
        "SELECT {} FROM applicants
         WHERE email_normalized = ? AND account_guid IS NULL
         ORDER BY created_at ASC, guid ASC
         LIMIT 1",
        APPLICANT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(applicant_from_row).transpose()
}

/// Insert an applicant row as-is
pub async fn insert_applicant(pool: &SqlitePool, applicant: &Applicant) -> Result<()> {
    let scores = applicant
        .scores
        .as_ref()
        .map(serde_json::Value::to_string);

    sqlx::query(
        r#"
        INSERT INTO applicants (guid, account_guid, email, email_normalized, first_name,
                                last_name, university, degree, skills, document_url, scores,
                                created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(applicant.id.to_string())
    .bind(applicant.account_id.map(|id| id.to_string()))
    .bind(applicant.email.trim())
    .bind(normalize_email(&applicant.email))
    .bind(&applicant.first_name)
    .bind(&applicant.last_name)
    .bind(&applicant.university)
    .bind(&applicant.degree)
    .bind(encode_skills(&applicant.skills))
    .bind(&applicant.document_url)
    .bind(scores)
    .bind(time::to_db(&applicant.created_at))
    .bind(time::to_db(&applicant.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a profile for `account_id` unless that account already has one
///
/// Returns the stored profile for the account (either `applicant` or the one a
/// concurrent request wrote first) and whether this call wrote it.
pub async fn insert_applicant_if_absent(
    pool: &SqlitePool,
    account_id: Uuid,
    applicant: &Applicant,
) -> Result<(Applicant, bool)> {
    let result = sqlx::query(
        r#"
        INSERT INTO applicants (guid, account_guid, email, email_normalized, first_name,
                                last_name, university, degree, skills, document_url,
                                created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(account_guid) DO NOTHING
        "#,
    )
    .bind(applicant.id.to_string())
    .bind(account_id.to_string())
    .bind(applicant.email.trim())
    .bind(normalize_email(&applicant.email))
    .bind(&applicant.first_name)
    .bind(&applicant.last_name)
    .bind(&applicant.university)
    .bind(&applicant.degree)
    .bind(encode_skills(&applicant.skills))
    .bind(&applicant.document_url)
    .bind(time::to_db(&applicant.created_at))
    .bind(time::to_db(&applicant.updated_at))
    .execute(pool)
    .await?;

    let stored = find_applicant_by_account(pool, account_id)
        .await?
        .ok_or_else(|| {
            Error::Internal(format!(
                "Applicant for account {} missing after insert",
                account_id
            ))
        })?;

    Ok((stored, result.rows_affected() == 1))
}

/// Attach an unlinked applicant row to an account
///
/// Returns false when the row was linked by someone else in the meantime.
pub async fn link_applicant_to_account(
    pool: &SqlitePool,
    applicant_id: Uuid,
    account_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE applicants SET account_guid = ?, updated_at = ?
         WHERE guid = ? AND account_guid IS NULL",
    )
    .bind(account_id.to_string())
    .bind(time::to_db(&time::now()))
    .bind(applicant_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
