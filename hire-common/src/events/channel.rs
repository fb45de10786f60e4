//! Notification channel names

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Named notification channel
///
/// Wire names: `global`, `recruiter:{account id}`, `applicant:{account id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    /// Every application event, for aggregate activity dashboards
    Global,
    /// Events for jobs owned by one recruiter
    Recruiter(Uuid),
    /// Events for one applicant's own applications
    Applicant(Uuid),
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKey::Global => write!(f, "global"),
            ChannelKey::Recruiter(id) => write!(f, "recruiter:{}", id),
            ChannelKey::Applicant(id) => write!(f, "applicant:{}", id),
        }
    }
}

impl FromStr for ChannelKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "global" {
            return Ok(ChannelKey::Global);
        }

        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("Unknown channel: {}", s)))?;
        let id = Uuid::parse_str(id)
            .map_err(|e| Error::InvalidInput(format!("Bad channel id in '{}': {}", s, e)))?;

        match kind {
            "recruiter" => Ok(ChannelKey::Recruiter(id)),
            "applicant" => Ok(ChannelKey::Applicant(id)),
            _ => Err(Error::InvalidInput(format!("Unknown channel: {}", s))),
        }
    }
}

impl Serialize for ChannelKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChannelKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id = Uuid::new_v4();
        for key in [ChannelKey::Global, ChannelKey::Recruiter(id), ChannelKey::Applicant(id)] {
            assert_eq!(key.to_string().parse::<ChannelKey>().unwrap(), key);
        }
        assert_eq!(ChannelKey::Recruiter(id).to_string(), format!("recruiter:{}", id));
    }

    #[test]
    fn test_rejects_unknown_channels() {
        assert!("everyone".parse::<ChannelKey>().is_err());
        assert!("recruiter:not-a-uuid".parse::<ChannelKey>().is_err());
        assert!(format!("admin:{}", Uuid::new_v4()).parse::<ChannelKey>().is_err());
    }
}
