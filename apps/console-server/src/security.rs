// [[AGENTDECK]]/apps/console-server/src/security.rs
// Purpose: Per-request caller context forwarded to the backend. Validation stays with the auth provider.
// Architecture: API Layer
// Dependencies: Axum

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

/// Explicit caller context handed to every backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub bearer: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(RequestContext::anonymous());
        };

        let value = header.to_str().map_err(|_| {
            tracing::warn!("Authorization header is not valid ASCII");
            StatusCode::BAD_REQUEST
        })?;

        // Only bearer tokens are forwarded; anything else is a client mistake
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty() && !t.contains(char::is_whitespace))
            .ok_or_else(|| {
                tracing::warn!("Rejected malformed Authorization header");
                StatusCode::UNAUTHORIZED
            })?;

        Ok(RequestContext::with_bearer(token))
    }
}
