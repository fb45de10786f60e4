//! Identity Resolver
//!
//! Turns whatever identity hints accompany a request into a canonical
//! Account + Applicant pair, provisioning either one when missing.
//!
//! Lookups run as a fixed-priority strategy chain (first match wins):
//! 1. account by id (authenticated caller)
//! 2. account by email, then its linked applicant
//! 3. unlinked applicant by email (legacy/guest rows)
//!
//! Anything not found is synthesized and persisted before returning, so
//! downstream stages always see stable ids.

use hire_common::db::{normalize_email, Account, Applicant, Role};
use hire_common::time;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::db::{accounts, applicants};
use crate::error::IdentityError;

/// Placeholder for profile fields nobody supplied
pub const NOT_SPECIFIED: &str = "Not Specified";

/// Identity hints attached to an application request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicantHints {
    pub account_id: Option<Uuid>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl ApplicantHints {
    /// Email, if present and non-blank
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Lookup strategies in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    AccountById,
    AccountByEmail,
    UnlinkedApplicantByEmail,
}

impl Strategy {
    pub const CHAIN: [Strategy; 3] = [
        Strategy::AccountById,
        Strategy::AccountByEmail,
        Strategy::UnlinkedApplicantByEmail,
    ];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::AccountById => "account_by_id",
            Strategy::AccountByEmail => "account_by_email",
            Strategy::UnlinkedApplicantByEmail => "unlinked_applicant_by_email",
        })
    }
}

/// What a strategy matched
enum Matched {
    Account(Account),
    LegacyApplicant(Applicant),
}

/// Canonical identity for an application request
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub account: Account,
    pub applicant: Applicant,
    /// Strategy that matched, `None` when everything was synthesized
    pub matched_by: Option<Strategy>,
    pub account_created: bool,
    pub applicant_created: bool,
}

/// Split a display name into first/last on the first run of whitespace
pub fn split_display_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

fn persistence(err: hire_common::Error) -> IdentityError {
    IdentityError::PersistenceFailed(err)
}

#[derive(Debug, Clone)]
pub struct IdentityResolver {
    db: SqlitePool,
}

impl IdentityResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Resolve hints to an Account + Applicant, persisting anything synthesized
    pub async fn resolve(&self, hints: &ApplicantHints) -> Result<ResolvedIdentity, IdentityError> {
        if hints.account_id.is_none() && hints.email().is_none() {
            return Err(IdentityError::InsufficientHints);
        }

        let mut matched_by = None;
        let mut matched = None;
        for strategy in Strategy::CHAIN {
            if let Some(found) = self.try_strategy(strategy, hints).await? {
                tracing::debug!(strategy = %strategy, "Identity matched");
                matched_by = Some(strategy);
                matched = Some(found);
                break;
            }
        }

        let (account, legacy, account_created) = match matched {
            Some(Matched::Account(account)) => (account, None, false),
            Some(Matched::LegacyApplicant(applicant)) => {
                let (account, created) = self
                    .provision_account(&applicant.email, display_name_for(hints, Some(&applicant)))
                    .await?;
                (account, Some(applicant), created)
            }
            None => {
                // Unknown account id with no email leaves nothing to provision with
                let email = hints.email().ok_or(IdentityError::InsufficientHints)?;
                let (account, created) = self
                    .provision_account(email, display_name_for(hints, None))
                    .await?;
                (account, None, created)
            }
        };

        check_can_apply(&account)?;

        let (applicant, applicant_created) = self.applicant_for(&account, legacy, hints).await?;

        Ok(ResolvedIdentity {
            account,
            applicant,
            matched_by,
            account_created,
            applicant_created,
        })
    }

    async fn try_strategy(
        &self,
        strategy: Strategy,
        hints: &ApplicantHints,
    ) -> Result<Option<Matched>, IdentityError> {
        let found = match strategy {
            Strategy::AccountById => match hints.account_id {
                Some(id) => accounts::load_account(&self.db, id)
                    .await
                    .map_err(persistence)?
                    .map(Matched::Account),
                None => None,
            },
            Strategy::AccountByEmail => match hints.email() {
                Some(email) => accounts::find_account_by_email(&self.db, email)
                    .await
                    .map_err(persistence)?
                    .map(Matched::Account),
                None => None,
            },
            Strategy::UnlinkedApplicantByEmail => match hints.email() {
                Some(email) => applicants::find_unlinked_applicant_by_email(&self.db, email)
                    .await
                    .map_err(persistence)?
                    .map(Matched::LegacyApplicant),
                None => None,
            },
        };

        Ok(found)
    }

    /// Find or create the applicant-role account for `email`
    async fn provision_account(
        &self,
        email: &str,
        display_name: String,
    ) -> Result<(Account, bool), IdentityError> {
        let (account, created) = accounts::insert_account_if_absent(
            &self.db,
            &accounts::NewAccount {
                email: email.to_string(),
                display_name,
                role: Role::Applicant,
                // Same-request trust boundary
                email_verified: true,
            },
        )
        .await
        .map_err(persistence)?;

        if created {
            tracing::info!(account_id = %account.id, email = %account.email, "Synthesized account");
        }

        Ok((account, created))
    }

    /// Linked applicant for `account`, adopting a legacy row or synthesizing one
    async fn applicant_for(
        &self,
        account: &Account,
        legacy: Option<Applicant>,
        hints: &ApplicantHints,
    ) -> Result<(Applicant, bool), IdentityError> {
        if let Some(applicant) = applicants::find_applicant_by_account(&self.db, account.id)
            .await
            .map_err(persistence)?
        {
            return Ok((applicant, false));
        }

        let legacy = match legacy {
            Some(applicant) => Some(applicant),
            None => applicants::find_unlinked_applicant_by_email(&self.db, &account.email)
                .await
                .map_err(persistence)?,
        };

        if let Some(legacy) = legacy {
            match applicants::link_applicant_to_account(&self.db, legacy.id, account.id).await {
                Ok(true) => {
                    tracing::info!(
                        applicant_id = %legacy.id,
                        account_id = %account.id,
                        "Linked legacy applicant to account"
                    );
                }
                Ok(false) => {}
                // A concurrent request linked another profile to this account first
                Err(err) if err.is_unique_violation() => {}
                Err(err) => return Err(persistence(err)),
            }

            if let Some(applicant) = applicants::find_applicant_by_account(&self.db, account.id)
                .await
                .map_err(persistence)?
            {
                return Ok((applicant, false));
            }
        }

        let draft = synthesize_applicant(account, hints);
        let (applicant, created) = applicants::insert_applicant_if_absent(&self.db, account.id, &draft)
            .await
            .map_err(persistence)?;

        if created {
            tracing::info!(
                applicant_id = %applicant.id,
                account_id = %account.id,
                "Synthesized applicant profile"
            );
        }

        Ok((applicant, created))
    }
}

fn display_name_for(hints: &ApplicantHints, legacy: Option<&Applicant>) -> String {
    match (hints.display_name(), legacy) {
        (Some(name), _) => name.to_string(),
        (None, Some(applicant)) => applicant.full_name(),
        (None, None) => String::new(),
    }
}

fn check_can_apply(account: &Account) -> Result<(), IdentityError> {
    if account.role != Role::Applicant {
        return Err(IdentityError::NotApplicantAccount {
            account_id: account.id,
            role: account.role,
        });
    }
    if !account.active {
        return Err(IdentityError::AccountInactive(account.id));
    }
    Ok(())
}

/// Minimal profile built from application-time data
fn synthesize_applicant(account: &Account, hints: &ApplicantHints) -> Applicant {
    let name = hints.display_name().unwrap_or(&account.display_name);
    let (first_name, last_name) = split_display_name(name);
    let now = time::now();

    Applicant {
        id: Uuid::new_v4(),
        account_id: Some(account.id),
        email: normalize_email(&account.email),
        first_name,
        last_name,
        university: NOT_SPECIFIED.to_string(),
        degree: NOT_SPECIFIED.to_string(),
        skills: BTreeSet::new(),
        document_url: None,
        scores: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_display_name() {
        assert_eq!(
            split_display_name("Jane Doe"),
            ("Jane".to_string(), "Doe".to_string())
        );
        assert_eq!(
            split_display_name("  Mary  Ann Smith "),
            ("Mary".to_string(), "Ann Smith".to_string())
        );
        assert_eq!(split_display_name("Cher"), ("Cher".to_string(), String::new()));
        assert_eq!(split_display_name(""), (String::new(), String::new()));
    }

    #[test]
    fn test_blank_hints_are_absent() {
        let hints = ApplicantHints {
            account_id: None,
            email: Some("   ".into()),
            display_name: Some("".into()),
        };
        assert_eq!(hints.email(), None);
        assert_eq!(hints.display_name(), None);
    }

    #[test]
    fn test_hints_deserialize_with_missing_fields() {
        let hints: ApplicantHints =
            serde_json::from_str(r#"{"email":"a@b.com","display_name":"Jane Doe"}"#).unwrap();
        assert_eq!(hints.email(), Some("a@b.com"));
        assert_eq!(hints.display_name(), Some("Jane Doe"));
        assert!(hints.account_id.is_none());
    }

    #[test]
    fn test_chain_order() {
        assert_eq!(Strategy::CHAIN[0], Strategy::AccountById);
        assert_eq!(Strategy::CHAIN[2], Strategy::UnlinkedApplicantByEmail);
    }
}
