//! Two-factor verification service
//!
//! Sends one-time codes through the user's configured provider, validates
//! them, and completes the sign-in that parked on a pending token. The
//! pending token is the sole capability: resend and verify never take a
//! user id from the caller.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use gatehouse_common::{crypto, Config, Error, Result, TtlCache};
use gatehouse_events::EventPublisher;
use gatehouse_otp::totp::{self, TotpGenerator};
use gatehouse_otp::{generate_code, ChannelRegistry, TwoFactorProvider};

use crate::domain::entities::{JwtPackage, PendingTwoFactor, User};
use crate::domain::events;
use crate::repository::{TeamStore, UserStore};
use crate::service::tokens::TokenService;

/// Result of starting a challenge: the opaque resume token and the
/// provider the code went through.
#[derive(Debug, Clone, PartialEq)]
pub struct MfaChallenge {
    pub pending_token: String,
    pub provider: TwoFactorProvider,
}

pub struct TwoFactorService {
    config: Config,
    users: Arc<dyn UserStore>,
    teams: Arc<dyn TeamStore>,
    tokens: Arc<TokenService>,
    events: Arc<dyn EventPublisher>,
    registry: ChannelRegistry,
    pending: TtlCache<PendingTwoFactor>,
    totp: TotpGenerator,
}

impl TwoFactorService {
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        teams: Arc<dyn TeamStore>,
        tokens: Arc<TokenService>,
        events: Arc<dyn EventPublisher>,
        registry: ChannelRegistry,
        pending: TtlCache<PendingTwoFactor>,
    ) -> Self {
        Self {
            config,
            users,
            teams,
            tokens,
            events,
            registry,
            pending,
            totp: TotpGenerator::default(),
        }
    }

    /// Resolve where a code can go for this user and provider, eagerly —
    /// before anything is dispatched or cached.
    fn destination_for(&self, user: &User, provider: TwoFactorProvider) -> Result<Option<String>> {
        match provider {
            TwoFactorProvider::Sms | TwoFactorProvider::WhatsApp => user
                .phone_number
                .clone()
                .map(Some)
                .ok_or_else(|| {
                    Error::Validation(format!(
                        "A phone number is required for the {provider} provider"
                    ))
                }),
            TwoFactorProvider::Email => Ok(Some(user.email.clone())),
            TwoFactorProvider::AuthenticatorApp => {
                if user.totp_secret.is_none() {
                    return Err(Error::Validation(
                        "No authenticator app is enrolled".to_string(),
                    ));
                }
                Ok(None)
            }
        }
    }

    /// Send (or for authenticator apps, skip sending) a code and mint the
    /// pending token that resumes sign-in.
    pub async fn start_challenge(
        &self,
        user: &User,
        provider_override: Option<TwoFactorProvider>,
    ) -> Result<MfaChallenge> {
        let provider = provider_override
            .or(user.two_factor_provider)
            .ok_or_else(|| {
                Error::Validation("No two-factor provider is configured".to_string())
            })?;

        let destination = self.destination_for(user, provider)?;

        if let Some(destination) = destination.as_deref() {
            let code = generate_code(self.config.otp_digits);
            let channel = self
                .registry
                .channel(provider)
                .map_err(|e| Error::Internal(e.to_string()))?;
            channel
                .send(destination, &code)
                .await
                .map_err(|e| Error::Internal(format!("code delivery failed: {e}")))?;
            tracing::debug!(user_id = %user.id, %provider, "One-time code dispatched");
        }

        let pending_token = crypto::generate_opaque_token(32);
        self.pending.insert(
            &pending_token,
            PendingTwoFactor {
                user_id: user.id,
                provider,
                destination,
            },
            Duration::seconds(self.config.pending_two_factor_ttl_secs),
        );

        Ok(MfaChallenge {
            pending_token,
            provider,
        })
    }

    /// Re-issue the code. Consumes the presented pending token and mints
    /// a replacement.
    pub async fn resend(&self, pending_token: &str) -> Result<MfaChallenge> {
        let entry = self
            .pending
            .take(pending_token)
            .ok_or_else(Error::invalid_credentials)?;
        let user = self
            .users
            .get(entry.user_id)
            .await?
            .ok_or_else(Error::invalid_credentials)?;

        self.start_challenge(&user, Some(entry.provider)).await
    }

    /// Verify a code and finish the parked sign-in. Single-use: the
    /// pending token is consumed on success and survives a failed
    /// attempt only until its TTL runs out.
    pub async fn verify(
        &self,
        pending_token: &str,
        code: &str,
        device_id: Option<&str>,
        remember_me: bool,
    ) -> Result<JwtPackage> {
        let entry = self
            .pending
            .get(pending_token)
            .ok_or_else(Error::invalid_credentials)?;
        let user = self
            .users
            .get(entry.user_id)
            .await?
            .ok_or_else(Error::invalid_credentials)?;

        let valid = match entry.provider {
            TwoFactorProvider::AuthenticatorApp => {
                let secret = user
                    .totp_secret
                    .as_deref()
                    .ok_or_else(Error::invalid_credentials)?;
                self.totp.verify(secret, code, Utc::now())
            }
            provider => {
                let identity = entry.destination.as_deref().unwrap_or_default();
                let channel = self
                    .registry
                    .channel(provider)
                    .map_err(|e| Error::Internal(e.to_string()))?;
                channel
                    .validate(identity, code)
                    .await
                    .map_err(|e| Error::Internal(format!("code validation failed: {e}")))?
            }
        };

        if !valid {
            tracing::debug!(user_id = %user.id, "Two-factor code rejected");
            return Err(Error::invalid_credentials());
        }

        self.pending.remove(pending_token);

        let team = self
            .teams
            .get(user.team_id)
            .await?
            .ok_or_else(|| Error::NotFound("team".to_string()))?;

        self.tokens
            .issue_package(&user, &team, true, device_id, remember_me)
            .await
    }

    /// Turn two-factor on for a user. For authenticator apps this
    /// enrolls a fresh TOTP secret and returns it so the user can add it
    /// to their app; channel providers return nothing.
    pub async fn enable(
        &self,
        user_id: Uuid,
        provider: TwoFactorProvider,
    ) -> Result<Option<String>> {
        let mut user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("user".to_string()))?;

        let mut enrollment_secret = None;
        if provider == TwoFactorProvider::AuthenticatorApp {
            if user.totp_secret.is_none() {
                let secret = totp::generate_secret();
                user.totp_secret = Some(secret.clone());
                enrollment_secret = Some(secret);
            }
        } else {
            // Eager destination validation, same rule as sending
            self.destination_for(&user, provider)?;
        }

        user.two_factor_enabled = true;
        user.two_factor_provider = Some(provider);
        user.updated_at = Utc::now();
        self.users.update(&user).await?;

        if let Err(e) = self
            .events
            .publish(events::two_factor_enabled(user_id, provider))
            .await
        {
            tracing::warn!(error = %e, "Failed to publish two-factor-enabled event");
        }

        Ok(enrollment_secret)
    }

    /// Turn two-factor off for a user.
    pub async fn disable(&self, user_id: Uuid) -> Result<()> {
        let mut user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("user".to_string()))?;

        user.two_factor_enabled = false;
        user.two_factor_provider = None;
        user.updated_at = Utc::now();
        self.users.update(&user).await?;

        if let Err(e) = self.events.publish(events::two_factor_disabled(user_id)).await {
            tracing::warn!(error = %e, "Failed to publish two-factor-disabled event");
        }

        Ok(())
    }

    /// Reclaim expired pending entries (optional periodic sweep; expiry
    /// is otherwise enforced lazily at read time).
    pub fn sweep_pending(&self) -> usize {
        self.pending.sweep()
    }
}
