//! JWT signing, validation, and token extraction helpers

use axum::http::HeaderValue;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::AccessClaims;
use crate::config::{AuthConfig, KeyMaterial};
use crate::error::AuthError;

/// Sign an access token with the configured key material.
pub fn sign_token(claims: &AccessClaims, config: &AuthConfig) -> Result<String, AuthError> {
    let (header, encoding_key) = match &config.keys {
        KeyMaterial::Hmac { secret } => (
            Header::new(Algorithm::HS256),
            EncodingKey::from_secret(secret.as_ref()),
        ),
        KeyMaterial::Rsa {
            kid,
            private_key_pem,
            ..
        } => {
            let mut header = Header::new(Algorithm::RS256);
            header.kid = Some(kid.clone());
            let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
                tracing::error!(error = %e, "Invalid RSA private key");
                AuthError::InvalidKeyMaterial
            })?;
            (header, key)
        }
    };

    encode(&header, claims, &encoding_key).map_err(|e| {
        tracing::error!(error = %e, "JWT signing failed");
        AuthError::SigningFailed
    })
}

/// Validate an access token and return its claims.
pub fn validate_token(token: &str, config: &AuthConfig) -> Result<AccessClaims, AuthError> {
    let (algorithm, decoding_key) = match &config.keys {
        KeyMaterial::Hmac { secret } => {
            (Algorithm::HS256, DecodingKey::from_secret(secret.as_ref()))
        }
        KeyMaterial::Rsa { public_key_pem, .. } => (
            Algorithm::RS256,
            DecodingKey::from_rsa_pem(public_key_pem.as_bytes()).map_err(|e| {
                tracing::error!(error = %e, "Invalid RSA public key");
                AuthError::InvalidKeyMaterial
            })?,
        ),
    };

    let mut validation = Validation::new(algorithm);

    if let Some(aud) = &config.audience {
        validation.set_audience(&[aud]);
    } else {
        validation.validate_aud = false;
    }

    if let Some(iss) = &config.issuer {
        validation.set_issuer(&[iss]);
    }

    let token_data = decode::<AccessClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        AuthError::InvalidToken
    })?;

    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(header: &HeaderValue) -> Result<String, AuthError> {
    let header_str = header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorizationFormat)?;

    if let Some(token) = header_str.strip_prefix("Bearer ") {
        Ok(token.to_string())
    } else {
        Err(AuthError::InvalidAuthorizationFormat)
    }
}
