//! Member management commands
//!
//! The mutating operations the permission engine exists to gate, each
//! dispatched through the request-context pipeline: registration, add,
//! view, update, delete, leadership transfer, position changes, and
//! team position-range changes.

use std::sync::Arc;

use uuid::Uuid;
use validator::ValidateEmail;

use gatehouse_auth::{Principal, TeamType};
use gatehouse_common::{crypto, Error, Result};
use gatehouse_events::EventPublisher;

use crate::domain::entities::{Team, User};
use crate::domain::events;
use crate::domain::permissions;
use crate::domain::validation::{validate_password_pair, validate_phone_number};
use crate::pipeline::{Pipeline, Request, Rule};
use crate::repository::{RefreshTokenStore, TeamStore, UserStore};
use crate::service::signin::SignInService;

/// Position range given to self-service customer teams
const DEFAULT_TEAM_RANGE: (i32, i32) = (1, 10);

pub struct RegisterRequest {
    pub team_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
    pub phone_number: Option<String>,
}

impl Request for RegisterRequest {
    type Output = Uuid;
    const REQUIRES_AUTH: bool = false;
    const MUTATES: bool = true;
    fn rules(&self) -> Rule {
        Rule::Unrestricted
    }
}

pub struct AddMemberRequest {
    pub team_id: Uuid,
    pub email: String,
    pub username: String,
    pub position: i32,
    pub password: Option<String>,
    pub phone_number: Option<String>,
}

impl Request for AddMemberRequest {
    type Output = Uuid;
    const MUTATES: bool = true;
}

pub struct GetMemberRequest {
    pub user_id: Uuid,
}

impl Request for GetMemberRequest {
    type Output = User;
}

pub struct UpdateMemberRequest {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl Request for UpdateMemberRequest {
    type Output = ();
    const MUTATES: bool = true;
}

pub struct DeleteMemberRequest {
    pub user_id: Uuid,
}

impl Request for DeleteMemberRequest {
    type Output = ();
    const MUTATES: bool = true;
}

pub struct ChangeLeaderRequest {
    pub team_id: Uuid,
    pub new_leader_id: Uuid,
}

impl Request for ChangeLeaderRequest {
    type Output = ();
    const MUTATES: bool = true;
}

pub struct ChangePositionRequest {
    pub user_id: Uuid,
    pub new_position: i32,
}

impl Request for ChangePositionRequest {
    type Output = ();
    const MUTATES: bool = true;
}

pub struct ChangeTeamRangeRequest {
    pub team_id: Uuid,
    pub new_min: i32,
    pub new_max: i32,
}

impl Request for ChangeTeamRangeRequest {
    type Output = ();
    const MUTATES: bool = true;
}

pub struct MemberService {
    pipeline: Pipeline,
    users: Arc<dyn UserStore>,
    teams: Arc<dyn TeamStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    events: Arc<dyn EventPublisher>,
    signin: Arc<SignInService>,
}

impl MemberService {
    pub fn new(
        pipeline: Pipeline,
        users: Arc<dyn UserStore>,
        teams: Arc<dyn TeamStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        events: Arc<dyn EventPublisher>,
        signin: Arc<SignInService>,
    ) -> Self {
        Self {
            pipeline,
            users,
            teams,
            refresh_tokens,
            events,
            signin,
        }
    }

    /// Self-service registration: a fresh customer team with the
    /// registrant as its leader at the top of the range.
    pub async fn register(&self, request: RegisterRequest) -> Result<Uuid> {
        let users = self.users.clone();
        let teams = self.teams.clone();
        let events = self.events.clone();
        let signin = self.signin.clone();

        self.pipeline
            .dispatch(Principal::anonymous(), request, move |req, _scope| async move {
                validate_password_pair(&req.password, &req.password_confirmation)?;
                if let Some(phone) = req.phone_number.as_deref() {
                    validate_phone_number(phone)?;
                }

                let (min, max) = DEFAULT_TEAM_RANGE;
                let mut team = Team::new(req.team_name, TeamType::Customer, min, max)?;

                let hash = crypto::hash_password(&req.password)?;
                let mut user = User::new(team.id, max, req.email, req.username, Some(hash))?;
                user.phone_number = req.phone_number;

                team.leader_id = Some(user.id);
                team.member_ids.insert(user.id);

                teams.insert(team.clone()).await?;
                users.insert(user.clone()).await?;

                signin.request_confirmation(user.id, &user.email).await?;
                if let Err(e) = events
                    .publish(events::member_added(team.id, user.id, user.position))
                    .await
                {
                    tracing::warn!(error = %e, "Failed to publish member-added event");
                }

                tracing::info!(user_id = %user.id, team_id = %team.id, "Account registered");
                Ok(user.id)
            })
            .await
    }

    /// Add a member to a team at a position strictly below the actor's.
    pub async fn add_member(
        &self,
        principal: Principal,
        request: AddMemberRequest,
    ) -> Result<Uuid> {
        let users = self.users.clone();
        let teams = self.teams.clone();
        let events = self.events.clone();
        let signin = self.signin.clone();

        self.pipeline
            .dispatch(principal, request, move |req, scope| async move {
                let mut team = teams
                    .get(req.team_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("team".to_string()))?;

                permissions::can_add_member(&scope.principal, &team, req.position)?;

                if !team.has_capacity() {
                    return Err(Error::Validation("Team is at capacity".to_string()));
                }
                if let Some(phone) = req.phone_number.as_deref() {
                    validate_phone_number(phone)?;
                }

                let hash = match req.password.as_deref() {
                    Some(password) => Some(crypto::hash_password(password)?),
                    None => None,
                };
                let mut user = User::new(team.id, req.position, req.email, req.username, hash)?;
                user.phone_number = req.phone_number;

                users.insert(user.clone()).await?;
                team.member_ids.insert(user.id);
                teams.update(&team).await?;

                signin.request_confirmation(user.id, &user.email).await?;
                if let Err(e) = events
                    .publish(events::member_added(team.id, user.id, user.position))
                    .await
                {
                    tracing::warn!(error = %e, "Failed to publish member-added event");
                }

                Ok(user.id)
            })
            .await
    }

    /// View a member (same-or-lower rank, self, or super).
    pub async fn get_member(
        &self,
        principal: Principal,
        request: GetMemberRequest,
    ) -> Result<User> {
        let users = self.users.clone();

        self.pipeline
            .dispatch(principal, request, move |req, scope| async move {
                let target = users
                    .get(req.user_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("user".to_string()))?;
                permissions::can_view_member(&scope.principal, &target)?;
                Ok(target)
            })
            .await
    }

    /// Update a member's contact details. An email change resets the
    /// confirmation flag and re-requests confirmation.
    pub async fn update_member(
        &self,
        principal: Principal,
        request: UpdateMemberRequest,
    ) -> Result<()> {
        let users = self.users.clone();
        let signin = self.signin.clone();

        self.pipeline
            .dispatch(principal, request, move |req, scope| async move {
                let mut target = users
                    .get(req.user_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("user".to_string()))?;
                permissions::can_update_member(&scope.principal, &target)?;

                let mut email_changed = false;
                if let Some(email) = req.email {
                    if !email.validate_email() {
                        return Err(Error::Validation("Invalid email format".to_string()));
                    }
                    if email != target.email {
                        target.email = email;
                        target.email_confirmed = false;
                        email_changed = true;
                    }
                }
                if let Some(phone) = req.phone_number {
                    validate_phone_number(&phone)?;
                    if Some(&phone) != target.phone_number.as_ref() {
                        target.phone_number = Some(phone);
                        target.phone_confirmed = false;
                    }
                }

                target.updated_at = chrono::Utc::now();
                users.update(&target).await?;

                if email_changed {
                    signin.request_confirmation(target.id, &target.email).await?;
                }
                Ok(())
            })
            .await
    }

    /// Remove a member. The team leader must transfer leadership first.
    pub async fn delete_member(
        &self,
        principal: Principal,
        request: DeleteMemberRequest,
    ) -> Result<()> {
        let users = self.users.clone();
        let teams = self.teams.clone();
        let refresh_tokens = self.refresh_tokens.clone();
        let events = self.events.clone();

        self.pipeline
            .dispatch(principal, request, move |req, scope| async move {
                let target = users
                    .get(req.user_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("user".to_string()))?;
                permissions::can_delete_member(&scope.principal, &target)?;

                let mut team = teams
                    .get(target.team_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("team".to_string()))?;
                if team.leader_id == Some(target.id) {
                    return Err(Error::Conflict(
                        "Transfer leadership before removing the team leader".to_string(),
                    ));
                }

                users.remove(target.id).await?;
                team.member_ids.remove(&target.id);
                teams.update(&team).await?;
                refresh_tokens.revoke_all_for_user(target.id).await?;

                if let Err(e) = events
                    .publish(events::member_removed(team.id, target.id))
                    .await
                {
                    tracing::warn!(error = %e, "Failed to publish member-removed event");
                }
                Ok(())
            })
            .await
    }

    /// Transfer team leadership to an existing member.
    pub async fn change_leader(
        &self,
        principal: Principal,
        request: ChangeLeaderRequest,
    ) -> Result<()> {
        let teams = self.teams.clone();
        let events = self.events.clone();

        self.pipeline
            .dispatch(principal, request, move |req, scope| async move {
                let mut team = teams
                    .get(req.team_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("team".to_string()))?;

                permissions::can_change_leader(&scope.principal, &team, req.new_leader_id)?;

                let previous = team.leader_id;
                team.leader_id = Some(req.new_leader_id);
                team.updated_at = chrono::Utc::now();
                teams.update(&team).await?;

                if let Err(e) = events
                    .publish(events::leadership_changed(
                        team.id,
                        previous,
                        req.new_leader_id,
                    ))
                    .await
                {
                    tracing::warn!(error = %e, "Failed to publish leadership-changed event");
                }
                Ok(())
            })
            .await
    }

    /// Move a member to a new position within the team range.
    pub async fn change_position(
        &self,
        principal: Principal,
        request: ChangePositionRequest,
    ) -> Result<()> {
        let users = self.users.clone();
        let teams = self.teams.clone();

        self.pipeline
            .dispatch(principal, request, move |req, scope| async move {
                let mut target = users
                    .get(req.user_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("user".to_string()))?;
                let team = teams
                    .get(target.team_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("team".to_string()))?;

                permissions::can_change_position(
                    &scope.principal,
                    &target,
                    req.new_position,
                    &team,
                )?;

                target.position = req.new_position;
                target.updated_at = chrono::Utc::now();
                users.update(&target).await?;
                Ok(())
            })
            .await
    }

    /// Change a team's position range; every existing member must stay
    /// inside the new range. Only the leader or a super-minimum actor.
    pub async fn change_team_range(
        &self,
        principal: Principal,
        request: ChangeTeamRangeRequest,
    ) -> Result<()> {
        let users = self.users.clone();
        let teams = self.teams.clone();

        self.pipeline
            .dispatch(principal, request, move |req, scope| async move {
                let mut team = teams
                    .get(req.team_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("team".to_string()))?;

                let is_leader = scope.principal.user_id.is_some()
                    && team.leader_id == scope.principal.user_id
                    && scope.principal.team_id == Some(team.id);
                if !is_leader && !scope.principal.is_super_minimum() {
                    return Err(Error::Forbidden);
                }

                let positions = users.positions_in_team(team.id).await?;
                team.validate_range_change(req.new_min, req.new_max, &positions)?;

                team.min_position = req.new_min;
                team.max_position = req.new_max;
                team.updated_at = chrono::Utc::now();
                teams.update(&team).await?;
                Ok(())
            })
            .await
    }
}
