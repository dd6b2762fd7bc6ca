//! Signing configuration for the token service

use anyhow::Result;
use std::env;

/// Signing key material. The private half never leaves this struct's
/// owner; JWKS exposes only the public components of `Rsa`.
#[derive(Clone)]
pub enum KeyMaterial {
    Hmac {
        secret: String,
    },
    Rsa {
        kid: String,
        private_key_pem: String,
        public_key_pem: String,
    },
}

#[derive(Clone)]
pub struct AuthConfig {
    pub keys: KeyMaterial,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl AuthConfig {
    /// Load signing configuration from environment variables.
    ///
    /// `JWT_ALGORITHM=HS256` (default) reads `JWT_SECRET`;
    /// `JWT_ALGORITHM=RS256` reads `JWT_KID`, `JWT_PRIVATE_KEY_PEM`,
    /// `JWT_PUBLIC_KEY_PEM`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let algorithm = env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string());
        let keys = match algorithm.as_str() {
            "HS256" => KeyMaterial::Hmac {
                secret: env::var("JWT_SECRET")
                    .map_err(|_| anyhow::anyhow!("JWT_SECRET is required"))?,
            },
            "RS256" => KeyMaterial::Rsa {
                kid: env::var("JWT_KID").unwrap_or_else(|_| "gatehouse-1".to_string()),
                private_key_pem: env::var("JWT_PRIVATE_KEY_PEM")
                    .map_err(|_| anyhow::anyhow!("JWT_PRIVATE_KEY_PEM is required"))?,
                public_key_pem: env::var("JWT_PUBLIC_KEY_PEM")
                    .map_err(|_| anyhow::anyhow!("JWT_PUBLIC_KEY_PEM is required"))?,
            },
            other => anyhow::bail!("Unsupported JWT_ALGORITHM: {other}"),
        };

        Ok(Self {
            keys,
            issuer: env::var("JWT_ISSUER").ok(),
            audience: env::var("JWT_AUDIENCE").ok(),
        })
    }

    /// HS256 config with a literal secret, for tests and local runs.
    pub fn hmac(secret: impl Into<String>) -> Self {
        Self {
            keys: KeyMaterial::Hmac {
                secret: secret.into(),
            },
            issuer: None,
            audience: None,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = match &self.keys {
            KeyMaterial::Hmac { .. } => "Hmac([REDACTED])",
            KeyMaterial::Rsa { .. } => "Rsa([REDACTED])",
        };
        f.debug_struct("AuthConfig")
            .field("keys", &keys)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}
