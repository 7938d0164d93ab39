//! Acting user supplied by the upstream identity layer
//!
//! Authentication happens before requests reach this service; the caller's
//! identity arrives as a UUID in the `x-actor-id` header.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the acting user's ID
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Extractor for the acting user, `None` when the header is absent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurrentActor(pub Option<Uuid>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(ACTOR_HEADER) else {
            return Ok(CurrentActor(None));
        };

        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(|id| CurrentActor(Some(id)))
            .ok_or_else(|| AppError::Validation {
                field: ACTOR_HEADER.to_string(),
                message: "Actor ID must be a UUID".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<CurrentActor, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(ACTOR_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentActor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        assert_eq!(extract(None).await.unwrap(), CurrentActor(None));
    }

    #[tokio::test]
    async fn test_valid_header() {
        let id = Uuid::new_v4();
        let actor = extract(Some(&id.to_string())).await.unwrap();
        assert_eq!(actor, CurrentActor(Some(id)));
    }

    #[tokio::test]
    async fn test_malformed_header_rejected() {
        let err = extract(Some("not-a-uuid")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
