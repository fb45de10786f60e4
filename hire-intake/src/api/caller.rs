//! Requester identity supplied by the upstream auth collaborator
//!
//! The auth layer in front of this service verifies the caller and forwards
//! the verdict in trusted headers. No headers means an anonymous caller.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::IntakeError;
use crate::pipeline::ApplicantHints;

pub const ACCOUNT_ID_HEADER: &str = "x-account-id";
pub const ACCOUNT_EMAIL_HEADER: &str = "x-account-email";
pub const ACCOUNT_NAME_HEADER: &str = "x-account-name";

/// Authenticated caller, or anonymous when every field is `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub account_id: Option<Uuid>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Caller {
    pub fn is_anonymous(&self) -> bool {
        self.account_id.is_none() && self.email.is_none()
    }

    /// Account id of an authenticated caller
    pub fn require_account_id(&self) -> Result<Uuid, IntakeError> {
        self.account_id.ok_or(IntakeError::Unauthenticated)
    }

    /// Combine caller identity with hints from the request body
    ///
    /// Authenticated fields win. An account id is only ever taken from the
    /// caller, never from the body.
    pub fn hints(&self, body: ApplicantHints) -> ApplicantHints {
        ApplicantHints {
            account_id: self.account_id,
            email: self.email.clone().or(body.email),
            display_name: self.display_name.clone().or(body.display_name),
        }
    }
}

fn header(parts: &Parts, name: &str) -> Result<Option<String>, IntakeError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| IntakeError::BadRequest(format!("Header {} is not valid text", name)))?
                .trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = IntakeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account_id = header(parts, ACCOUNT_ID_HEADER)?
            .map(|id| {
                Uuid::parse_str(&id).map_err(|_| {
                    IntakeError::BadRequest(format!("Header {} is not a valid id", ACCOUNT_ID_HEADER))
                })
            })
            .transpose()?;

        Ok(Caller {
            account_id,
            email: header(parts, ACCOUNT_EMAIL_HEADER)?,
            display_name: header(parts, ACCOUNT_NAME_HEADER)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Caller, IntakeError> {
        let (mut parts, _) = request.into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_no_headers_is_anonymous() {
        let caller = extract(Request::builder().body(()).unwrap()).await.unwrap();
        assert!(caller.is_anonymous());
        assert!(matches!(caller.require_account_id(), Err(IntakeError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_headers_parsed() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header(ACCOUNT_ID_HEADER, id.to_string())
            .header(ACCOUNT_EMAIL_HEADER, " jane@example.com ")
            .header(ACCOUNT_NAME_HEADER, "Jane Doe")
            .body(())
            .unwrap();

        let caller = extract(request).await.unwrap();
        assert_eq!(caller.account_id, Some(id));
        assert_eq!(caller.email.as_deref(), Some("jane@example.com"));
        assert_eq!(caller.display_name.as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn test_bad_account_id_rejected() {
        let request = Request::builder()
            .header(ACCOUNT_ID_HEADER, "not-a-uuid")
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(IntakeError::BadRequest(_))));
    }

    #[test]
    fn test_body_cannot_claim_account_id() {
        let body = ApplicantHints {
            account_id: Some(Uuid::new_v4()),
            email: Some("guest@example.com".into()),
            display_name: None,
        };
        let hints = Caller::default().hints(body);
        assert_eq!(hints.account_id, None);
        assert_eq!(hints.email.as_deref(), Some("guest@example.com"));
    }
}
