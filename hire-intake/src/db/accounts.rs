//! Account persistence

use chrono::Utc;
use hire_common::db::{normalize_email, Account, Role};
use hire_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_guid;

const ACCOUNT_COLUMNS: &str =
    "guid, email, display_name, role, email_verified, active, created_at, updated_at";

/// Fields for a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub email_verified: bool,
}

fn account_from_row(row: &SqliteRow) -> Result<Account> {
    let guid: String = row.try_get("guid")?;
    let role: String = row.try_get("role")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Account {
        id: parse_guid(&guid)?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        role: role.parse()?,
        email_verified: row.try_get::<i64, _>("email_verified")? != 0,
        active: row.try_get::<i64, _>("active")? != 0,
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}

/// Load account by id
pub async fn load_account(pool: &SqlitePool, id: Uuid) -> Result<Option<Account>> {
    let sql = format!("SELECT {} FROM accounts WHERE guid = ?", ACCOUNT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(account_from_row).transpose()
}

/// Find account by email (case-insensitive)
pub async fn find_account_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Account>> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE email_normalized = ?",
        ACCOUNT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(account_from_row).transpose()
}

/// Insert an account unless one with the same email already exists
///
/// Returns the stored account for that email (either the row just written or
/// the one a concurrent request wrote first) and whether this call wrote it.
pub async fn insert_account_if_absent(
    pool: &SqlitePool,
    account: &NewAccount,
) -> Result<(Account, bool)> {
    let now = time::to_db(&Utc::now());

    let result = sqlx::query(
        r#"
        INSERT INTO accounts (guid, email, email_normalized, display_name, role,
                              email_verified, active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
        ON CONFLICT(email_normalized) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(account.email.trim())
    .bind(normalize_email(&account.email))
    .bind(&account.display_name)
    .bind(account.role.as_str())
    .bind(account.email_verified as i64)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    let stored = find_account_by_email(pool, &account.email)
        .await?
        .ok_or_else(|| {
            hire_common::Error::Internal(format!(
                "Account for {} missing after insert",
                account.email
            ))
        })?;

    Ok((stored, result.rows_affected() == 1))
}

/// Create an account, failing if the email is taken
pub async fn create_account(pool: &SqlitePool, account: &NewAccount) -> Result<Account> {
    let id = Uuid::new_v4();
    let now = time::to_db(&Utc::now());

    sqlx::query(
        r#"
        INSERT INTO accounts (guid, email, email_normalized, display_name, role,
                              email_verified, active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(account.email.trim())
    .bind(normalize_email(&account.email))
    .bind(&account.display_name)
    .bind(account.role.as_str())
    .bind(account.email_verified as i64)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    load_account(pool, id)
        .await?
        .ok_or_else(|| hire_common::Error::NotFound(format!("account {}", id)))
}

/// Deactivate an account (accounts are never deleted)
pub async fn deactivate_account(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE accounts SET active = 0, updated_at = ? WHERE guid = ?")
        .bind(time::to_db(&Utc::now()))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}
