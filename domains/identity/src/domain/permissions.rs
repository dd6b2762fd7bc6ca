//! Hierarchical permission engine
//!
//! Stateless decision functions over the acting `Principal` plus the
//! target user/team. Rank denials always surface as the uniform
//! `Error::Forbidden`: the payload never varies with the failed rule, so
//! the hierarchy cannot be probed through error messages. Structural
//! problems (a position outside the team's range, a candidate who is not
//! a member) are `Validation` errors with specific messages.

use uuid::Uuid;

use gatehouse_auth::{Principal, TeamType};
use gatehouse_common::{Error, Result};

use crate::domain::entities::{Team, User};

fn outranks(principal: &Principal, position: i32) -> bool {
    principal.team_position > position
}

fn is_self(principal: &Principal, target: &User) -> bool {
    principal.user_id == Some(target.id)
}

fn same_team(principal: &Principal, target: &User) -> bool {
    principal.team_id == Some(target.team_id)
}

/// May `principal` add a member at `new_position` to `team`?
///
/// Requires the rank floor for the team's type, strict outranking of the
/// new position (no one may create a peer or superior), and the position
/// to fall inside the team's configured range.
pub fn can_add_member(principal: &Principal, team: &Team, new_position: i32) -> Result<()> {
    let type_ok = match team.team_type {
        TeamType::Customer => {
            principal.is_maintenance_minimum()
                || (principal.is_customer_minimum() && principal.team_id == Some(team.id))
        }
        TeamType::Maintenance => principal.is_maintenance_minimum(),
        TeamType::Super => principal.is_super_minimum(),
    };
    if !type_ok {
        return Err(Error::Forbidden);
    }

    if new_position >= principal.team_position {
        return Err(Error::Forbidden);
    }

    if !team.position_in_range(new_position) {
        return Err(Error::Validation(format!(
            "Position {new_position} is outside the team range {}..={}",
            team.min_position, team.max_position
        )));
    }

    Ok(())
}

/// May `principal` view `target`?
///
/// Self, super-minimum, or a same-team member at the same or a lower
/// position than the caller.
pub fn can_view_member(principal: &Principal, target: &User) -> Result<()> {
    if is_self(principal, target) || principal.is_super_minimum() {
        return Ok(());
    }
    if same_team(principal, target) && target.position <= principal.team_position {
        return Ok(());
    }
    Err(Error::Forbidden)
}

/// May `principal` update `target`?
///
/// Self, super-minimum, or a same-team member at a strictly lower
/// position than the caller.
pub fn can_update_member(principal: &Principal, target: &User) -> Result<()> {
    if is_self(principal, target) || principal.is_super_minimum() {
        return Ok(());
    }
    if same_team(principal, target) && outranks(principal, target.position) {
        return Ok(());
    }
    Err(Error::Forbidden)
}

/// May `principal` remove `target`?
///
/// Never one's own account through this path — self-removal is the
/// close-account flow. Otherwise super-minimum, or a same-team member at
/// a strictly lower position.
pub fn can_delete_member(principal: &Principal, target: &User) -> Result<()> {
    if is_self(principal, target) {
        return Err(Error::Validation(
            "Use the close-account flow to remove your own account".to_string(),
        ));
    }
    if principal.is_super_minimum() {
        return Ok(());
    }
    if same_team(principal, target) && outranks(principal, target.position) {
        return Ok(());
    }
    Err(Error::Forbidden)
}

/// May `principal` make `new_leader_id` the leader of `team`?
///
/// Only the current leader or a super-minimum actor; the candidate must
/// already be a member of the team.
pub fn can_change_leader(principal: &Principal, team: &Team, new_leader_id: Uuid) -> Result<()> {
    let is_current_leader = principal.user_id.is_some()
        && team.leader_id == principal.user_id
        && principal.team_id == Some(team.id);

    if !is_current_leader && !principal.is_super_minimum() {
        return Err(Error::Forbidden);
    }

    if !team.is_member(new_leader_id) {
        return Err(Error::Validation(
            "The new leader must already be a member of the team".to_string(),
        ));
    }

    Ok(())
}

/// May `principal` move `target` to `new_position` within `team`?
///
/// The actor must strictly outrank both the current and the requested
/// position, and the requested position must stay inside the team range.
pub fn can_change_position(
    principal: &Principal,
    target: &User,
    new_position: i32,
    team: &Team,
) -> Result<()> {
    if !outranks(principal, target.position) || !outranks(principal, new_position) {
        return Err(Error::Forbidden);
    }

    if !team.position_in_range(new_position) {
        return Err(Error::Validation(format!(
            "Position {new_position} is outside the team range {}..={}",
            team.min_position, team.max_position
        )));
    }

    Ok(())
}
