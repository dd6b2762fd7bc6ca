//! Self-service account closure
//!
//! The one path through which a user removes their own account. A leader
//! must transfer leadership first; the last member of a customer team
//! takes the team with them.

use std::sync::Arc;

use gatehouse_auth::{Principal, TeamType};
use gatehouse_common::{Error, Result};
use gatehouse_events::EventPublisher;

use crate::domain::events;
use crate::pipeline::{Pipeline, Request};
use crate::repository::{RefreshTokenStore, TeamStore, UserStore};

pub struct CloseAccountRequest;

impl Request for CloseAccountRequest {
    type Output = ();
    const LOADS_USER: bool = true;
    const LOADS_TEAM: bool = true;
    const MUTATES: bool = true;
}

pub struct AccountService {
    pipeline: Pipeline,
    users: Arc<dyn UserStore>,
    teams: Arc<dyn TeamStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    events: Arc<dyn EventPublisher>,
}

impl AccountService {
    pub fn new(
        pipeline: Pipeline,
        users: Arc<dyn UserStore>,
        teams: Arc<dyn TeamStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            pipeline,
            users,
            teams,
            refresh_tokens,
            events,
        }
    }

    pub async fn close_account(&self, principal: Principal) -> Result<()> {
        let users = self.users.clone();
        let teams = self.teams.clone();
        let refresh_tokens = self.refresh_tokens.clone();
        let events = self.events.clone();

        self.pipeline
            .dispatch(principal, CloseAccountRequest, move |_, scope| async move {
                let user = scope.user()?.clone();
                let mut team = scope.team()?.clone();

                if team.leader_id == Some(user.id) && team.member_count() > 1 {
                    return Err(Error::Conflict(
                        "Transfer leadership before closing the account".to_string(),
                    ));
                }

                users.remove(user.id).await?;
                refresh_tokens.revoke_all_for_user(user.id).await?;
                team.member_ids.remove(&user.id);

                if team.team_type == TeamType::Customer && team.member_ids.is_empty() {
                    // The last member takes the team with them
                    teams.remove(team.id).await?;
                } else {
                    if team.leader_id == Some(user.id) {
                        team.leader_id = None;
                    }
                    team.updated_at = chrono::Utc::now();
                    teams.update(&team).await?;
                }

                if let Err(e) = events
                    .publish(events::account_closed(user.id, team.id))
                    .await
                {
                    tracing::warn!(error = %e, "Failed to publish account-closed event");
                }

                tracing::info!(user_id = %user.id, "Account closed");
                Ok(())
            })
            .await
    }
}
