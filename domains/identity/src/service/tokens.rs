//! Token service: access-token issuance, refresh-token rotation, JWKS
//!
//! Access tokens are short-lived JWTs carrying the hierarchy claims.
//! Refresh tokens are opaque, stored by digest, rotated on every use, and
//! revoked as a family when a superseded token is replayed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use gatehouse_auth::{sign_token, AccessClaims, AuthConfig, JwkSet, JwtValidator};
use gatehouse_common::{crypto, Config, Error, Result};
use gatehouse_events::EventPublisher;

use crate::domain::entities::{JwtPackage, RefreshTokenRecord, Team, User};
use crate::domain::events;
use crate::repository::{RefreshTokenStore, RotationOutcome, TeamStore, UserStore};

/// Injected collaborator appending arbitrary claims after the standard
/// set is built.
pub trait ExtraClaims: Send + Sync {
    fn append(&self, user: &User) -> HashMap<String, serde_json::Value>;
}

pub struct TokenService {
    config: Config,
    auth_config: AuthConfig,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    users: Arc<dyn UserStore>,
    teams: Arc<dyn TeamStore>,
    events: Arc<dyn EventPublisher>,
    extra_claims: Option<Arc<dyn ExtraClaims>>,
}

impl TokenService {
    pub fn new(
        config: Config,
        auth_config: AuthConfig,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        users: Arc<dyn UserStore>,
        teams: Arc<dyn TeamStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            auth_config,
            refresh_tokens,
            users,
            teams,
            events,
            extra_claims: None,
        }
    }

    pub fn with_extra_claims(mut self, extra: Arc<dyn ExtraClaims>) -> Self {
        self.extra_claims = Some(extra);
        self
    }

    /// A validator sharing this service's verification material.
    pub fn validator(&self) -> JwtValidator {
        JwtValidator::new(self.auth_config.clone())
    }

    /// Public verification material (RFC 7517). Empty for HMAC setups;
    /// the private key never leaves this service.
    pub fn jwks(&self) -> Result<JwkSet> {
        JwkSet::from_config(&self.auth_config).map_err(Error::from)
    }

    fn build_claims(&self, user: &User, team: &Team, two_factor_verified: bool) -> AccessClaims {
        let now = Utc::now();
        let extra = self
            .extra_claims
            .as_ref()
            .map(|e| e.append(user))
            .unwrap_or_default();

        AccessClaims {
            sub: user.id.to_string(),
            email: Some(user.email.clone()),
            username: Some(user.username.clone()),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.access_token_ttl_secs)).timestamp(),
            iss: self.auth_config.issuer.clone(),
            aud: self.auth_config.audience.clone(),
            team_id: Some(team.id),
            team_position: user.position,
            team_type: team.team_type,
            leader: team.leader_id == Some(user.id),
            two_factor_verified: two_factor_verified.then_some(true),
            app: self.config.application.clone(),
            extra,
        }
    }

    /// Mint a signed access token for a user acting in a team.
    pub fn issue_access_token(
        &self,
        user: &User,
        team: &Team,
        two_factor_verified: bool,
    ) -> Result<(String, DateTime<Utc>)> {
        let claims = self.build_claims(user, team, two_factor_verified);
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| Error::Internal("token expiry out of range".to_string()))?;
        let token = sign_token(&claims, &self.auth_config)?;
        Ok((token, expires_at))
    }

    /// Mint the full caller-facing package: access token plus, when the
    /// feature is on and the caller asked for one, a refresh token. An
    /// existing live token for the same device is invalidated first —
    /// rotation, not reuse.
    pub async fn issue_package(
        &self,
        user: &User,
        team: &Team,
        two_factor_verified: bool,
        device_id: Option<&str>,
        with_refresh: bool,
    ) -> Result<JwtPackage> {
        let (access_token, expires_at) = self.issue_access_token(user, team, two_factor_verified)?;

        let refresh_token = if self.config.refresh_enabled && with_refresh {
            if let Some(existing) = self
                .refresh_tokens
                .find_active_for_device(user.id, device_id)
                .await?
            {
                self.refresh_tokens
                    .revoke_family(existing.family_id)
                    .await?;
            }

            let (token, record) = RefreshTokenRecord::mint(
                user.id,
                Uuid::new_v4(),
                device_id.map(str::to_string),
                two_factor_verified,
                Duration::seconds(self.config.refresh_token_ttl_secs),
            );
            self.refresh_tokens.insert(record).await?;
            Some(token)
        } else {
            None
        };

        Ok(JwtPackage {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    /// Exchange a refresh token for a fresh package, rotating it.
    ///
    /// Refreshing never re-runs the two-factor challenge: the new access
    /// token carries the original session's verified state. Replay of an
    /// already-rotated token revokes the whole family.
    pub async fn refresh(&self, presented_token: &str) -> Result<JwtPackage> {
        if !self.config.refresh_enabled {
            return Err(Error::Disabled("refresh tokens are disabled".to_string()));
        }

        let digest = crypto::digest_token(presented_token);
        let Some(record) = self.refresh_tokens.find(&digest).await? else {
            return Err(Error::invalid_credentials());
        };

        if record.superseded {
            return self.reject_replay(&record).await;
        }
        if record.is_expired(Utc::now()) {
            return Err(Error::invalid_credentials());
        }

        let (new_token, replacement) = RefreshTokenRecord::mint(
            record.user_id,
            record.family_id,
            record.device_id.clone(),
            record.two_factor_verified,
            Duration::seconds(self.config.refresh_token_ttl_secs),
        );

        // The store decides the race: exactly one concurrent rotation of
        // the same token value may succeed.
        match self.refresh_tokens.rotate(&digest, replacement).await? {
            RotationOutcome::Rotated => {}
            RotationOutcome::AlreadySuperseded => return self.reject_replay(&record).await,
            RotationOutcome::NotFound => return Err(Error::invalid_credentials()),
        }

        let user = self
            .users
            .get(record.user_id)
            .await?
            .ok_or_else(Error::invalid_credentials)?;
        let team = self
            .teams
            .get(user.team_id)
            .await?
            .ok_or_else(Error::invalid_credentials)?;

        let (access_token, expires_at) =
            self.issue_access_token(&user, &team, record.two_factor_verified)?;

        Ok(JwtPackage {
            access_token,
            refresh_token: Some(new_token),
            expires_at,
        })
    }

    async fn reject_replay(&self, record: &RefreshTokenRecord) -> Result<JwtPackage> {
        let revoked = self.refresh_tokens.revoke_family(record.family_id).await?;
        tracing::warn!(
            user_id = %record.user_id,
            family_id = %record.family_id,
            revoked,
            "Replay of a rotated refresh token — family revoked"
        );
        if let Err(e) = self
            .events
            .publish(events::refresh_family_revoked(
                record.user_id,
                record.family_id,
            ))
            .await
        {
            tracing::warn!(error = %e, "Failed to publish refresh-family-revoked event");
        }
        Err(Error::Conflict(
            "refresh token has already been used".to_string(),
        ))
    }
}
