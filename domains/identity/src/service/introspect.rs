//! Auth introspection
//!
//! Resolves a principal back to its full scope for diagnostics.

use serde::Serialize;

use gatehouse_auth::{Principal, TeamType};
use gatehouse_common::Result;

use crate::domain::entities::User;
use crate::pipeline::{Pipeline, Request};

pub struct WhoamiRequest;

impl Request for WhoamiRequest {
    type Output = WhoamiView;
    const LOADS_USER: bool = true;
    const LOADS_TEAM: bool = true;
}

/// Response shape for auth introspection
#[derive(Debug, Clone, Serialize)]
pub struct WhoamiView {
    pub user: User,
    pub team_name: String,
    pub team_type: TeamType,
    pub position: i32,
    pub is_leader: bool,
    pub two_factor_enabled: bool,
}

pub async fn whoami(pipeline: &Pipeline, principal: Principal) -> Result<WhoamiView> {
    pipeline
        .dispatch(principal, WhoamiRequest, |_, scope| async move {
            let user = scope.user()?.clone();
            let team = scope.team()?;

            Ok(WhoamiView {
                is_leader: team.leader_id == Some(user.id),
                team_name: team.name.clone(),
                team_type: team.team_type,
                position: user.position,
                two_factor_enabled: user.two_factor_enabled,
                user,
            })
        })
        .await
}
