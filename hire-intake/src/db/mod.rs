//! Database access layer for hire-intake
//!
//! One module per table. Every function performs its own round trip against
//! the pool; there are no multi-statement transactions.

pub mod accounts;
pub mod applicants;
pub mod applications;
pub mod jobs;

use hire_common::{Error, Result};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Parse a stored guid column
pub(crate) fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::InvalidInput(format!("Bad guid '{}': {}", value, e)))
}

/// Parse an optional stored guid column
pub(crate) fn parse_optional_guid(value: Option<String>) -> Result<Option<Uuid>> {
    value.as_deref().map(parse_guid).transpose()
}

/// Decode a JSON array of skills
pub(crate) fn parse_skills(value: &str) -> Result<BTreeSet<String>> {
    serde_json::from_str(value)
        .map_err(|e| Error::InvalidInput(format!("Bad skills list '{}': {}", value, e)))
}

/// Encode skills as a JSON array
pub(crate) fn encode_skills<'a, I>(skills: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let list: Vec<&String> = skills.into_iter().collect();
    serde_json::to_string(&list).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skills_encoding() {
        let skills: BTreeSet<String> = ["rust", "sql"].iter().map(|s| s.to_string()).collect();
        let encoded = encode_skills(&skills);
        assert_eq!(encoded, r#"["rust","sql"]"#);
        assert_eq!(parse_skills(&encoded).unwrap(), skills);
    }

    #[test]
    fn test_bad_guid_is_invalid_input() {
        assert!(matches!(parse_guid("nope"), Err(Error::InvalidInput(_))));
        assert_eq!(parse_optional_guid(None).unwrap(), None);
    }
}
