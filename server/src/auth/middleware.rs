//! Authentication middleware.
//!
//! A single shared bearer token guards the document API. When
//! `AUTH_SECRET` is unset every request is let through as anonymous.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::AppState;

/// Caller identity extracted from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUser {
    /// Presented the configured token
    Token,
    /// No secret configured
    Anonymous,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        authorize(header, state.config.auth_secret.as_deref())
    }
}

/// Check an `Authorization` header value against the configured secret.
pub fn authorize(header: Option<&str>, secret: Option<&str>) -> Result<AuthUser, AppError> {
    let Some(secret) = secret else {
        return Ok(AuthUser::Anonymous);
    };

    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::Unauthorized)?;

    if token.is_empty() || !bool::from(token.as_bytes().ct_eq(secret.as_bytes())) {
        tracing::debug!("Rejected request with invalid bearer token");
        return Err(AppError::Unauthorized);
    }
    Ok(AuthUser::Token)
}
