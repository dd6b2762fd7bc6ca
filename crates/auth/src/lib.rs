//! Authentication primitives for the Gatehouse control plane
//!
//! Provides the access-token claims model, JWT signing and validation
//! (HS256 or RS256, configurable), JWKS export of public verification
//! material, principal extraction, and axum extractors that work with any
//! state implementing `FromRef<S>` for `JwtValidator`.

mod claims;
mod config;
mod error;
mod extractors;
mod jwks;
mod jwt;
mod principal;
mod types;

pub use claims::AccessClaims;
pub use config::{AuthConfig, KeyMaterial};
pub use error::AuthError;
pub use extractors::{AuthPrincipal, JwtValidator, MaybePrincipal};
pub use jwks::{Jwk, JwkSet};
pub use jwt::{extract_bearer_token, sign_token, validate_token};
pub use principal::{extract, Principal};
pub use types::TeamType;
