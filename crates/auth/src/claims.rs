//! Access-token claims model

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::TeamType;

/// Claims carried by every Gatehouse access token.
///
/// Standard subject/email claims plus the custom hierarchy claims the
/// permission engine needs. Every custom claim has a serde default so a
/// token minted by an older issuer (or a third-party token with only the
/// standard claims) deserializes with zero values instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user id
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Issued-at (Unix timestamp)
    pub iat: i64,
    /// Expiry (Unix timestamp)
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub team_position: i32,
    #[serde(default)]
    pub team_type: TeamType,
    #[serde(default)]
    pub leader: bool,

    /// Present and true only after a completed two-factor challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub two_factor_verified: Option<bool>,

    /// Application marker
    #[serde(default)]
    pub app: String,

    /// Externally-supplied extra claims, appended post-build
    #[serde(flatten, default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}
