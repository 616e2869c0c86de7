//! JWT bearer verification for the protected API surface.
//!
//! Token issuance (signup, OTP, refresh) belongs to the external auth
//! service; this layer only verifies HS256 signatures against the shared
//! secret and hands the claims to handlers through request extensions.
//! The public scheduling endpoints are capability-URL based and bypass
//! this entirely.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// Account type carried in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Organization,
    Candidate,
}

/// Claims the auth service puts in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Subject: the account's email address.
    pub sub: String,
    /// Display name of the account holder.
    pub name: String,
    pub account_type: AccountType,
    /// Expiry as a unix timestamp; enforced by `jsonwebtoken`.
    pub exp: i64,
}

impl AuthClaims {
    /// The claims as an organization identity, or 403.
    pub fn organization(&self) -> Result<&AuthClaims, ApiError> {
        match self.account_type {
            AccountType::Organization => Ok(self),
            AccountType::Candidate => Err(ApiError::Forbidden {
                detail: "This operation requires an organization account".to_string(),
            }),
        }
    }

    /// The claims as a candidate identity, or 403.
    pub fn candidate(&self) -> Result<&AuthClaims, ApiError> {
        match self.account_type {
            AccountType::Candidate => Ok(self),
            AccountType::Organization => Err(ApiError::Forbidden {
                detail: "This operation requires a candidate account".to_string(),
            }),
        }
    }
}

/// Decodes and verifies a bearer token against the shared secret.
pub fn verify_bearer(secret: &str, token: &str) -> Result<AuthClaims, String> {
    decode::<AuthClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

/// Axum middleware: requires a valid `Authorization: Bearer` token and
/// stores the verified claims in request extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = verify_bearer(&state.config.jwt_secret, token).map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
