//! Bearer-token guard for write endpoints.
//!
//! Viewer sockets and callback reports never pass through here; browsers
//! hold no token.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use command_center_core::config::AuthMode;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::ApiError;
use crate::state::GatewayState;

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check an `Authorization` header value against the auth mode.
pub fn check_bearer(mode: &AuthMode, header: Option<&str>) -> Result<(), ApiError> {
    let expected = match mode {
        AuthMode::Open => return Ok(()),
        AuthMode::Token(secret) => secret,
    };

    let (scheme, token) = header
        .unwrap_or_default()
        .split_once(' ')
        .unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::Unauthorized);
    }

    // Compare SHA-256 hashes so the comparison length never depends on input
    let expected_hash = format!("{:x}", Sha256::digest(expected.as_bytes()));
    let provided_hash = format!("{:x}", Sha256::digest(token.as_bytes()));
    if constant_time_eq(&provided_hash, &expected_hash) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Extractor that rejects the request unless it carries a valid bearer token.
pub struct Authorized;

impl FromRequestParts<Arc<GatewayState>> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        check_bearer(&state.auth, header).inspect_err(|_| {
            warn!(path = %parts.uri.path(), "Rejected unauthorized write");
        })?;
        Ok(Self)
    }
}
