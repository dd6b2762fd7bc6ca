//! Sign-in orchestration
//!
//! Drives the formal state machine in `domain::state`:
//! credential check → email-confirmation gate → password check →
//! two-factor branch → token issuance. Every failure is terminal for the
//! call; unknown identifiers and wrong passwords produce the same
//! generic rejection so accounts cannot be enumerated.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use gatehouse_common::{crypto, Config, Error, Result, TtlCache};
use gatehouse_events::EventPublisher;
use gatehouse_otp::TwoFactorProvider;

use crate::domain::entities::JwtPackage;
use crate::domain::events;
use crate::domain::state::{SignInEvent, SignInState};
use crate::repository::{TeamStore, UserStore};
use crate::service::tokens::TokenService;
use crate::service::two_factor::TwoFactorService;

/// How the credentials arrived. Pre-trusted native-app channels skip the
/// two-factor branch; this is a typed caller decision, not header
/// sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignInChannel {
    #[default]
    Standard,
    TrustedNative,
}

/// Sign-in input
#[derive(Debug, Clone)]
pub struct Credentials {
    /// User id, email, or username
    pub identifier: String,
    pub password: String,
    pub device_id: Option<String>,
    pub channel: SignInChannel,
}

/// Claims returned by a third-party identity provider. The verification
/// itself (signature, audience, revocation) is the collaborator's
/// problem; these arrive pre-verified.
#[derive(Debug, Clone)]
pub struct ExternalClaims {
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
}

/// Black-box third-party token verification (Google etc.).
#[async_trait::async_trait]
pub trait OAuthVerifier: Send + Sync {
    async fn verify(&self, external_token: &str) -> Result<ExternalClaims>;
}

/// Terminal outcomes of one sign-in call
#[derive(Debug, Clone, PartialEq)]
pub enum SignInOutcome {
    /// The account exists but its email is unconfirmed; a confirmation
    /// message was (re)requested. Precedes the password check.
    EmailConfirmationRequired { email: String },
    /// Password accepted; a one-time code is pending
    TwoFactorRequired {
        pending_token: String,
        provider: TwoFactorProvider,
    },
    Success(JwtPackage),
}

pub struct SignInService {
    config: Config,
    users: Arc<dyn UserStore>,
    teams: Arc<dyn TeamStore>,
    tokens: Arc<TokenService>,
    two_factor: Arc<TwoFactorService>,
    events: Arc<dyn EventPublisher>,
    confirmations: TtlCache<Uuid>,
    oauth: Option<Arc<dyn OAuthVerifier>>,
}

impl SignInService {
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        teams: Arc<dyn TeamStore>,
        tokens: Arc<TokenService>,
        two_factor: Arc<TwoFactorService>,
        events: Arc<dyn EventPublisher>,
        confirmations: TtlCache<Uuid>,
    ) -> Self {
        Self {
            config,
            users,
            teams,
            tokens,
            two_factor,
            events,
            confirmations,
            oauth: None,
        }
    }

    pub fn with_oauth(mut self, oauth: Arc<dyn OAuthVerifier>) -> Self {
        self.oauth = Some(oauth);
        self
    }

    /// Run one sign-in attempt to a terminal state.
    pub async fn sign_in(&self, credentials: Credentials) -> Result<SignInOutcome> {
        let state = SignInState::CredentialCheck;

        // Credential check
        let Some(user) = self.users.find_by_identifier(&credentials.identifier).await? else {
            let _ = state.apply(SignInEvent::IdentifierUnknown);
            tracing::debug!("Sign-in identifier unknown");
            return Err(Error::invalid_credentials());
        };
        let state = state.apply(SignInEvent::IdentifierMatched)?;

        // Email-confirmation gate. Runs before the password check: an
        // unconfirmed account must not learn whether its password was
        // correct.
        if !user.email_confirmed {
            state.apply(SignInEvent::EmailUnconfirmed)?;
            self.request_confirmation(user.id, &user.email).await?;
            return Ok(SignInOutcome::EmailConfirmationRequired {
                email: user.email.clone(),
            });
        }
        let state = state.apply(SignInEvent::EmailConfirmed)?;

        // Password check
        let password_ok = user
            .password_hash
            .as_deref()
            .map(|hash| crypto::verify_password(&credentials.password, hash))
            .unwrap_or(false);
        if !password_ok {
            state.apply(SignInEvent::PasswordInvalid)?;
            tracing::debug!(user_id = %user.id, "Sign-in password rejected");
            return Err(Error::invalid_credentials());
        }
        let state = state.apply(SignInEvent::PasswordValid)?;

        // Two-factor branch
        if user.two_factor_enabled && credentials.channel == SignInChannel::Standard {
            state.apply(SignInEvent::TwoFactorNeeded)?;
            let challenge = self.two_factor.start_challenge(&user, None).await?;
            return Ok(SignInOutcome::TwoFactorRequired {
                pending_token: challenge.pending_token,
                provider: challenge.provider,
            });
        }
        state.apply(SignInEvent::TwoFactorSkipped)?;

        // Token issuance
        let team = self
            .teams
            .get(user.team_id)
            .await?
            .ok_or_else(|| Error::NotFound("team".to_string()))?;
        let package = self
            .tokens
            .issue_package(&user, &team, false, credentials.device_id.as_deref(), true)
            .await?;

        Ok(SignInOutcome::Success(package))
    }

    /// Sign in with a third-party identity token. The provider already
    /// authenticated the user, so there is no password check; the
    /// confirmation gate and the two-factor branch still apply.
    pub async fn sign_in_external(
        &self,
        external_token: &str,
        device_id: Option<&str>,
    ) -> Result<SignInOutcome> {
        let oauth = self
            .oauth
            .as_ref()
            .ok_or_else(|| Error::Disabled("external sign-in is not configured".to_string()))?;

        let claims = oauth.verify(external_token).await?;
        let Some(mut user) = self.users.find_by_email(&claims.email).await? else {
            tracing::debug!("External sign-in for unknown account");
            return Err(Error::invalid_credentials());
        };

        // A provider-verified email satisfies the confirmation gate
        if !user.email_confirmed {
            if claims.email_verified {
                user.email_confirmed = true;
                user.updated_at = Utc::now();
                self.users.update(&user).await?;
            } else {
                self.request_confirmation(user.id, &user.email).await?;
                return Ok(SignInOutcome::EmailConfirmationRequired {
                    email: user.email.clone(),
                });
            }
        }

        if user.two_factor_enabled {
            let challenge = self.two_factor.start_challenge(&user, None).await?;
            return Ok(SignInOutcome::TwoFactorRequired {
                pending_token: challenge.pending_token,
                provider: challenge.provider,
            });
        }

        let team = self
            .teams
            .get(user.team_id)
            .await?
            .ok_or_else(|| Error::NotFound("team".to_string()))?;
        let package = self
            .tokens
            .issue_package(&user, &team, false, device_id, true)
            .await?;
        Ok(SignInOutcome::Success(package))
    }

    /// Mint a confirmation token and ask the mailer collaborator (via the
    /// event bus) to deliver it.
    pub async fn request_confirmation(&self, user_id: Uuid, email: &str) -> Result<()> {
        let token = crypto::generate_opaque_token(32);
        self.confirmations.insert(
            &token,
            user_id,
            Duration::seconds(self.config.confirmation_token_ttl_secs),
        );
        if let Err(e) = self
            .events
            .publish(events::email_confirmation_requested(user_id, email, &token))
            .await
        {
            tracing::warn!(error = %e, "Failed to publish confirmation-requested event");
        }
        Ok(())
    }

    /// Complete email confirmation with the token from the message.
    pub async fn confirm_email(&self, token: &str) -> Result<()> {
        let user_id = self
            .confirmations
            .take(token)
            .ok_or_else(Error::invalid_credentials)?;

        let mut user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(Error::invalid_credentials)?;
        user.email_confirmed = true;
        user.updated_at = Utc::now();
        self.users.update(&user).await?;

        tracing::info!(user_id = %user.id, "Email confirmed");
        Ok(())
    }
}
