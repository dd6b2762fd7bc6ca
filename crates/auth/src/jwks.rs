//! JWKS (RFC 7517) export of public verification material
//!
//! Only the public components of asymmetric keys are ever exposed;
//! symmetric (HMAC) configurations produce an empty key set.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

use crate::config::{AuthConfig, KeyMaterial};
use crate::error::AuthError;

/// A single RFC 7517 JSON Web Key (RSA public key)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use")]
    pub use_: String,
    pub alg: String,
    pub kid: String,
    pub n: String,
    pub e: String,
}

/// RFC 7517 key set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Build the key set for the configured signing material.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        match &config.keys {
            // Symmetric secrets have no publishable verification material
            KeyMaterial::Hmac { .. } => Ok(Self { keys: vec![] }),
            KeyMaterial::Rsa {
                kid,
                public_key_pem,
                ..
            } => {
                let public_key =
                    RsaPublicKey::from_public_key_pem(public_key_pem).map_err(|e| {
                        tracing::error!(error = %e, "Invalid RSA public key for JWKS");
                        AuthError::InvalidKeyMaterial
                    })?;

                Ok(Self {
                    keys: vec![Jwk {
                        kty: "RSA".to_string(),
                        use_: "sig".to_string(),
                        alg: "RS256".to_string(),
                        kid: kid.clone(),
                        n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
                        e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
                    }],
                })
            }
        }
    }
}
