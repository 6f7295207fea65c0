//! Gateway authentication and acting-user extraction.
//!
//! Users sign in with an external identity provider. The gateway in front of
//! this service verifies the session and forwards the user's id in the
//! `x-user-id` header. When a gateway secret is configured, requests must
//! also carry it as a bearer token so the header cannot be forged by callers
//! that bypass the gateway.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::ServerConfig;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Security settings for the HTTP surface.
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Gateway secret expected as `Authorization: Bearer <key>`.
    pub api_key: Option<String>,
    /// Allowed CORS origins. `None` is permissive.
    pub cors_origins: Option<Vec<String>>,
}

impl SecurityConfig {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            cors_origins: config.cors_origins.clone(),
        }
    }

    /// No gateway secret and permissive CORS (local development/testing).
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            cors_origins: None,
        }
    }
}

/// Rejects requests that do not carry the configured gateway secret.
pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let expected_key = match &config.api_key {
        Some(key) => key,
        None => return Ok(next.run(request).await),
    };

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if token == expected_key => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!("Invalid gateway key provided");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("Missing or malformed Authorization header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// The authenticated user making the request, if the gateway supplied one.
///
/// Extraction never fails; operations that need a user reject a missing one
/// themselves before touching the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser(pub Option<String>);

impl ActingUser {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Self(user))
    }
}
