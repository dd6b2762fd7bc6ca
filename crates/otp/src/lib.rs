//! Gatehouse One-Time Code Service
//!
//! Provides second-factor code delivery and validation with support for:
//! - Channel-based providers (SMS, Email, WhatsApp) behind one trait
//! - Locally-validated TOTP for authenticator apps (no delivery step)
//! - A provider registry keyed by the provider enum
//! - Mock channel for testing and development

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod mock;
pub mod totp;

#[derive(Error, Debug)]
pub enum OtpError {
    #[error("OTP configuration error: {0}")]
    Configuration(String),

    #[error("OTP delivery error: {0}")]
    Delivery(String),

    #[error("No channel registered for provider {0}")]
    NoChannel(TwoFactorProvider),
}

/// Second-factor provider. `AuthenticatorApp` validates locally (TOTP);
/// the others deliver and validate through an external channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoFactorProvider {
    Sms,
    Email,
    WhatsApp,
    AuthenticatorApp,
}

impl TwoFactorProvider {
    /// Whether codes travel through an external delivery channel.
    pub fn uses_channel(&self) -> bool {
        !matches!(self, TwoFactorProvider::AuthenticatorApp)
    }
}

impl std::fmt::Display for TwoFactorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TwoFactorProvider::Sms => write!(f, "sms"),
            TwoFactorProvider::Email => write!(f, "email"),
            TwoFactorProvider::WhatsApp => write!(f, "whats_app"),
            TwoFactorProvider::AuthenticatorApp => write!(f, "authenticator_app"),
        }
    }
}

/// A delivery/validation channel for one provider.
#[async_trait::async_trait]
pub trait OtpChannel: Send + Sync {
    /// The provider this channel serves.
    fn provider(&self) -> TwoFactorProvider;

    /// Deliver a code to a destination (phone number, email address).
    async fn send(&self, destination: &str, code: &str) -> Result<(), OtpError>;

    /// Validate a code previously delivered to `identity` (the same
    /// destination that `send` was called with).
    async fn validate(&self, identity: &str, code: &str) -> Result<bool, OtpError>;
}

/// Registry of channels keyed by provider, constructed once at startup.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    channels: HashMap<TwoFactorProvider, Arc<dyn OtpChannel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    pub fn register(mut self, channel: Arc<dyn OtpChannel>) -> Self {
        self.channels.insert(channel.provider(), channel);
        self
    }

    pub fn channel(&self, provider: TwoFactorProvider) -> Result<Arc<dyn OtpChannel>, OtpError> {
        self.channels
            .get(&provider)
            .cloned()
            .ok_or(OtpError::NoChannel(provider))
    }

    pub fn has_channel(&self, provider: TwoFactorProvider) -> bool {
        self.channels.contains_key(&provider)
    }
}

/// Generate a zero-padded numeric one-time code.
pub fn generate_code(digits: u32) -> String {
    let max = 10u64.pow(digits);
    let value = rand::thread_rng().gen_range(0..max);
    format!("{value:0width$}", width = digits as usize)
}
