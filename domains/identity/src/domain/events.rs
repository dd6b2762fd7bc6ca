//! Domain events raised by identity operations

use gatehouse_events::DomainEvent;
use gatehouse_otp::TwoFactorProvider;
use serde_json::json;
use uuid::Uuid;

pub const EMAIL_CONFIRMATION_REQUESTED: &str = "identity.email_confirmation_requested";
pub const TWO_FACTOR_ENABLED: &str = "identity.two_factor_enabled";
pub const TWO_FACTOR_DISABLED: &str = "identity.two_factor_disabled";
pub const MEMBER_ADDED: &str = "identity.member_added";
pub const MEMBER_REMOVED: &str = "identity.member_removed";
pub const LEADERSHIP_CHANGED: &str = "identity.leadership_changed";
pub const REFRESH_FAMILY_REVOKED: &str = "identity.refresh_family_revoked";
pub const ACCOUNT_CLOSED: &str = "identity.account_closed";

/// The confirmation token rides in the event payload; the mailer
/// collaborator turns it into a link.
pub fn email_confirmation_requested(user_id: Uuid, email: &str, token: &str) -> DomainEvent {
    DomainEvent::new(
        EMAIL_CONFIRMATION_REQUESTED,
        json!({
            "user_id": user_id,
            "email": email,
            "token": token,
        }),
    )
}

pub fn two_factor_enabled(user_id: Uuid, provider: TwoFactorProvider) -> DomainEvent {
    DomainEvent::new(
        TWO_FACTOR_ENABLED,
        json!({
            "user_id": user_id,
            "provider": provider,
        }),
    )
}

pub fn two_factor_disabled(user_id: Uuid) -> DomainEvent {
    DomainEvent::new(TWO_FACTOR_DISABLED, json!({ "user_id": user_id }))
}

pub fn member_added(team_id: Uuid, user_id: Uuid, position: i32) -> DomainEvent {
    DomainEvent::new(
        MEMBER_ADDED,
        json!({
            "team_id": team_id,
            "user_id": user_id,
            "position": position,
        }),
    )
}

pub fn member_removed(team_id: Uuid, user_id: Uuid) -> DomainEvent {
    DomainEvent::new(
        MEMBER_REMOVED,
        json!({
            "team_id": team_id,
            "user_id": user_id,
        }),
    )
}

pub fn leadership_changed(
    team_id: Uuid,
    previous_leader: Option<Uuid>,
    new_leader: Uuid,
) -> DomainEvent {
    DomainEvent::new(
        LEADERSHIP_CHANGED,
        json!({
            "team_id": team_id,
            "previous_leader": previous_leader,
            "new_leader": new_leader,
        }),
    )
}

pub fn refresh_family_revoked(user_id: Uuid, family_id: Uuid) -> DomainEvent {
    DomainEvent::new(
        REFRESH_FAMILY_REVOKED,
        json!({
            "user_id": user_id,
            "family_id": family_id,
        }),
    )
}

pub fn account_closed(user_id: Uuid, team_id: Uuid) -> DomainEvent {
    DomainEvent::new(
        ACCOUNT_CLOSED,
        json!({
            "user_id": user_id,
            "team_id": team_id,
        }),
    )
}
