//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Application marker embedded in every issued access token
    pub application: String,

    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,

    /// Global refresh-token feature flag
    pub refresh_enabled: bool,

    /// Pending two-factor token lifetime in seconds
    pub pending_two_factor_ttl_secs: i64,

    /// Email confirmation token lifetime in seconds
    pub confirmation_token_ttl_secs: i64,

    /// One-time code digit count
    pub otp_digits: u32,

    /// Runtime configuration
    pub log_level: String,
    pub rust_log: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            application: env::var("APPLICATION_NAME").unwrap_or_else(|_| "gatehouse".to_string()),

            access_token_ttl_secs: parse_var("ACCESS_TOKEN_TTL_SECS", 900),
            refresh_token_ttl_secs: parse_var("REFRESH_TOKEN_TTL_SECS", 30 * 24 * 3600),
            refresh_enabled: env::var("REFRESH_TOKENS_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            pending_two_factor_ttl_secs: parse_var("PENDING_TWO_FACTOR_TTL_SECS", 300),
            confirmation_token_ttl_secs: parse_var("CONFIRMATION_TOKEN_TTL_SECS", 24 * 3600),
            otp_digits: parse_var("OTP_DIGITS", 6),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "gatehouse=debug".to_string()),
        };

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            application: "gatehouse".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 30 * 24 * 3600,
            refresh_enabled: true,
            pending_two_factor_ttl_secs: 300,
            confirmation_token_ttl_secs: 24 * 3600,
            otp_digits: 6,
            log_level: "info".to_string(),
            rust_log: "gatehouse=debug".to_string(),
        }
    }
}

fn parse_var<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
