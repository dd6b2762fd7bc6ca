//! Axum extractors for authentication
//!
//! Generic over any state `S` where `JwtValidator: FromRef<S>`.
//! This is axum's idiomatic nested-state pattern. Routing stays with the
//! hosting application; these adapters only turn a bearer header into a
//! `Principal` for the request-context pipeline.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::jwt::{extract_bearer_token, validate_token};
use crate::principal::{extract, Principal};

/// Validates bearer tokens and resolves principals.
#[derive(Clone)]
pub struct JwtValidator {
    config: Arc<AuthConfig>,
}

impl JwtValidator {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Validate a raw token and extract its principal.
    pub fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = validate_token(token, &self.config)?;
        Ok(extract(&claims))
    }
}

/// Authenticated principal extractor. Rejects requests without a valid
/// bearer token.
#[derive(Debug)]
pub struct AuthPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AuthPrincipal
where
    JwtValidator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let validator = JwtValidator::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthorization)?;

        let token = extract_bearer_token(auth_header)?;
        let principal = validator.authenticate(&token)?;

        Ok(AuthPrincipal(principal))
    }
}

/// Optional-auth extractor: yields the anonymous principal when no
/// Authorization header is present, so requests that do not require
/// authentication still flow through the same pipeline.
///
/// A header that is present but invalid is still rejected.
#[derive(Debug)]
pub struct MaybePrincipal(pub Principal);

impl<S> FromRequestParts<S> for MaybePrincipal
where
    JwtValidator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Some(auth_header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(MaybePrincipal(Principal::anonymous()));
        };

        let validator = JwtValidator::from_ref(state);
        let token = extract_bearer_token(auth_header)?;
        let principal = validator.authenticate(&token)?;

        Ok(MaybePrincipal(principal))
    }
}
