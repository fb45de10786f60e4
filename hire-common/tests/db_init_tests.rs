//! Integration tests for database initialization
//!
//! Tests cover:
//! - Automatic database creation with the intake schema
//! - Idempotent re-initialization
//! - Uniqueness constraints the intake pipeline relies on

use hire_common::config::StoreConfig;
use hire_common::db::init_database;
use tempfile::TempDir;

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("hire.db");

    let pool = init_database(&db_path, &StoreConfig::default()).await.unwrap();

    assert!(db_path.exists(), "Database file should be created");
    assert_eq!(
        table_names(&pool).await,
        vec!["accounts", "applicants", "applications", "jobs"]
    );
}

#[tokio::test]
async fn test_idempotent_initialization() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("hire.db");

    let pool1 = init_database(&db_path, &StoreConfig::default()).await.unwrap();
    sqlx::query(
        "INSERT INTO accounts (guid, email, email_normalized, role, created_at, updated_at)
         VALUES ('a1', 'r@x.com', 'r@x.com', 'recruiter', 'now', 'now')",
    )
    .execute(&pool1)
    .await
    .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path, &StoreConfig::default()).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
        .fetch_one(&pool2)
        .await
        .unwrap();

    assert_eq!(count, 1, "Re-initialization must keep existing rows");
}

#[tokio::test]
async fn test_application_pair_is_unique() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("hire.db"), &StoreConfig::default())
        .await
        .unwrap();

    for sql in [
        "INSERT INTO accounts (guid, email, email_normalized, role, created_at, updated_at)
         VALUES ('r1', 'r@x.com', 'r@x.com', 'recruiter', 'now', 'now')",
        "INSERT INTO jobs (guid, title, recruiter_guid, status, created_at, updated_at)
         VALUES ('j1', 'Engineer', 'r1', 'open', 'now', 'now')",
        "INSERT INTO applicants (guid, created_at, updated_at) VALUES ('p1', 'now', 'now')",
        "INSERT INTO applications (guid, job_guid, applicant_guid, status, document_url, applied_at, updated_at)
         VALUES ('x1', 'j1', 'p1', 'pending', 'https://docs/cv.pdf', 'now', 'now')",
    ] {
        sqlx::query(sql).execute(&pool).await.unwrap();
    }

    let second = sqlx::query(
        "INSERT INTO applications (guid, job_guid, applicant_guid, status, document_url, applied_at, updated_at)
         VALUES ('x2', 'j1', 'p1', 'pending', 'https://docs/cv.pdf', 'now', 'now')",
    )
    .execute(&pool)
    .await;

    let err = hire_common::Error::from(second.unwrap_err());
    assert!(err.is_unique_violation(), "Expected unique violation, got {err}");
}

#[tokio::test]
async fn test_account_email_is_unique() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("hire.db"), &StoreConfig::default())
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO accounts (guid, email, email_normalized, role, created_at, updated_at)
         VALUES ('a1', 'A@b.com', 'a@b.com', 'applicant', 'now', 'now')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let duplicate = sqlx::query(
        "INSERT INTO accounts (guid, email, email_normalized, role, created_at, updated_at)
         VALUES ('a2', 'a@B.com', 'a@b.com', 'applicant', 'now', 'now')",
    )
    .execute(&pool)
    .await;

    assert!(duplicate.is_err());
}
