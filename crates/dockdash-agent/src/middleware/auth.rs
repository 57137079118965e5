//! Bearer-token authentication for the container API

use crate::error::AgentError;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Constant-time string comparison
///
/// Lengths are compared first; token length is not a secret.
#[inline]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Token of an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Whether `request` carries the configured secret
pub fn is_authorized(request: &Request, secret: &str) -> bool {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    extract_bearer_token(auth_header).is_some_and(|t| constant_time_compare(t, secret))
}

/// Rejects requests without the agent secret; an empty secret disables auth
pub async fn auth_middleware(
    State(secret): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if secret.is_empty() || is_authorized(&request, &secret) {
        Ok(next.run(request).await)
    } else {
        Err(AgentError::Unauthorized.into_response())
    }
}
