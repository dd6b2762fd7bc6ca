//! Domain entities for the Gatehouse identity domain
//!
//! Each entity includes constructor validation and invariant checks; the
//! stores persist them as-is and the services mutate them only through
//! the operations specified here.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatehouse_auth::TeamType;
use gatehouse_common::{crypto, Error, Result};
use gatehouse_otp::TwoFactorProvider;
use validator::ValidateEmail;

use crate::domain::validation::validate_username;

/// Default member cap applied to customer teams
pub const DEFAULT_CUSTOMER_TEAM_CAPACITY: usize = 25;

/// Byte length of opaque token material (refresh, pending, confirmation)
const OPAQUE_TOKEN_BYTES: usize = 32;

/// Team entity: a tenant grouping of users with a type and position range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub team_type: TeamType,
    pub min_position: i32,
    pub max_position: i32,
    pub leader_id: Option<Uuid>,
    pub member_ids: HashSet<Uuid>,
    /// Member cap; customer teams carry one, the singleton teams do not
    pub member_limit: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn new(
        name: impl Into<String>,
        team_type: TeamType,
        min_position: i32,
        max_position: i32,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.len() > 100 {
            return Err(Error::Validation(
                "Team name must be 1-100 characters".to_string(),
            ));
        }
        if min_position > max_position {
            return Err(Error::Validation(format!(
                "Invalid position range: {min_position} > {max_position}"
            )));
        }

        let member_limit = match team_type {
            TeamType::Customer => Some(DEFAULT_CUSTOMER_TEAM_CAPACITY),
            TeamType::Maintenance | TeamType::Super => None,
        };

        let now = Utc::now();
        Ok(Team {
            id: Uuid::new_v4(),
            name,
            team_type,
            min_position,
            max_position,
            leader_id: None,
            member_ids: HashSet::new(),
            member_limit,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn position_in_range(&self, position: i32) -> bool {
        position >= self.min_position && position <= self.max_position
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member_ids.contains(&user_id)
    }

    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }

    pub fn has_capacity(&self) -> bool {
        match self.member_limit {
            Some(limit) => self.member_count() < limit,
            None => true,
        }
    }

    /// Validate a position-range change against the current members'
    /// positions. Every existing member must remain inside the new range.
    pub fn validate_range_change(
        &self,
        new_min: i32,
        new_max: i32,
        member_positions: &[i32],
    ) -> Result<()> {
        if new_min > new_max {
            return Err(Error::Validation(format!(
                "Invalid position range: {new_min} > {new_max}"
            )));
        }
        if let Some(out) = member_positions
            .iter()
            .find(|p| **p < new_min || **p > new_max)
        {
            return Err(Error::Validation(format!(
                "Position {out} of an existing member falls outside {new_min}..={new_max}"
            )));
        }
        Ok(())
    }

    /// Validate invariants
    pub fn validate(&self) -> Result<()> {
        if self.min_position > self.max_position {
            return Err(Error::Validation(
                "Team position range inverted".to_string(),
            ));
        }
        if let Some(leader_id) = self.leader_id {
            if !self.is_member(leader_id) {
                return Err(Error::Validation(
                    "Team leader must be a member of the team".to_string(),
                ));
            }
        }
        if let Some(limit) = self.member_limit {
            if self.member_count() > limit {
                return Err(Error::Validation("Team exceeds its member cap".to_string()));
            }
        }
        Ok(())
    }
}

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub team_id: Uuid,
    pub position: i32,
    pub email: String,
    pub username: String,
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    pub email_confirmed: bool,
    pub phone_confirmed: bool,
    pub two_factor_enabled: bool,
    pub two_factor_provider: Option<TwoFactorProvider>,
    /// Base32 TOTP secret, present once an authenticator app is enrolled
    #[serde(default, skip_serializing)]
    pub totp_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with validation. `position` is checked against
    /// the owning team by the caller, which holds the `Team`.
    pub fn new(
        team_id: Uuid,
        position: i32,
        email: impl Into<String>,
        username: impl Into<String>,
        password_hash: Option<String>,
    ) -> Result<Self> {
        let email = email.into();
        let username = username.into();

        if !email.validate_email() {
            return Err(Error::Validation("Invalid email format".to_string()));
        }
        validate_username(&username)?;

        let now = Utc::now();
        Ok(User {
            id: Uuid::new_v4(),
            team_id,
            position,
            email,
            username,
            phone_number: None,
            password_hash,
            email_confirmed: false,
            phone_confirmed: false,
            two_factor_enabled: false,
            two_factor_provider: None,
            totp_secret: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Stored refresh-token record. Keyed by the deterministic digest of the
/// opaque token value; the raw token exists only in the caller's hands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub token_digest: String,
    pub user_id: Uuid,
    /// Rotation chain id: every rotation stays in the family, and replay
    /// of a superseded token revokes the whole family.
    pub family_id: Uuid,
    pub device_id: Option<String>,
    /// Two-factor state of the originating session; refresh carries it
    /// forward without re-running the challenge.
    pub two_factor_verified: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub superseded: bool,
}

impl RefreshTokenRecord {
    /// Mint a fresh opaque token and its stored record.
    pub fn mint(
        user_id: Uuid,
        family_id: Uuid,
        device_id: Option<String>,
        two_factor_verified: bool,
        ttl: Duration,
    ) -> (String, Self) {
        let token = crypto::generate_opaque_token(OPAQUE_TOKEN_BYTES);
        let now = Utc::now();
        let record = Self {
            token_digest: crypto::digest_token(&token),
            user_id,
            family_id,
            device_id,
            two_factor_verified,
            created_at: now,
            expires_at: now + ttl,
            superseded: false,
        };
        (token, record)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Pending two-factor state, cached under the opaque pending token.
/// The token itself is the lookup capability; callers never supply a
/// user id.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTwoFactor {
    pub user_id: Uuid,
    pub provider: TwoFactorProvider,
    /// Where the code went (phone/email); `None` for authenticator apps
    pub destination: Option<String>,
}

/// Caller-facing result of a successful authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtPackage {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}
