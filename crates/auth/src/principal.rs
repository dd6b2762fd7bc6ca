//! Principal extraction and the per-request security context
//!
//! `extract` turns a verified claim set into a `Principal` — the resolved
//! identity of the caller for one request. Constructed once, immutable
//! thereafter, discarded at request end.

use uuid::Uuid;

use crate::claims::AccessClaims;
use crate::types::TeamType;

/// The resolved identity/context of the caller for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub team_position: i32,
    pub email: Option<String>,
    pub username: Option<String>,
    pub is_authenticated: bool,
    pub team_type: TeamType,
    pub is_leader: bool,
}

impl Principal {
    /// The unauthenticated principal: every field at its zero value.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            team_id: None,
            team_position: 0,
            email: None,
            username: None,
            is_authenticated: false,
            team_type: TeamType::default(),
            is_leader: false,
        }
    }

    /// Super-team member.
    pub fn is_super_minimum(&self) -> bool {
        self.is_authenticated && self.team_type == TeamType::Super
    }

    /// Super- or maintenance-team member.
    pub fn is_maintenance_minimum(&self) -> bool {
        self.is_authenticated
            && matches!(self.team_type, TeamType::Super | TeamType::Maintenance)
    }

    /// Every authenticated principal is at least customer-minimum.
    pub fn is_customer_minimum(&self) -> bool {
        self.is_authenticated
    }
}

/// Turn a verified claim set into a `Principal`.
///
/// Never fails: missing optional claims map to the type's zero value.
/// `is_authenticated` is true iff a recognized subject claim is present —
/// signature validity was already established by the JWT validator that
/// produced the claims.
pub fn extract(claims: &AccessClaims) -> Principal {
    let user_id = Uuid::parse_str(&claims.sub).ok();

    Principal {
        user_id,
        team_id: claims.team_id,
        team_position: claims.team_position,
        email: claims.email.clone(),
        username: claims.username.clone(),
        is_authenticated: user_id.is_some(),
        team_type: claims.team_type,
        is_leader: claims.leader,
    }
}
