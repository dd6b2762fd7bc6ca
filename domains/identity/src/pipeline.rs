//! Request-context pipeline
//!
//! Every command and query dispatches through the same fixed stage order:
//!
//! 1. Principal — reject unauthenticated callers of protected requests
//! 2. User load — populate the scope for user-aware requests
//! 3. Team load — populate the scope for team-aware requests
//! 4. Validation — evaluate the request's declared rule tree
//! 5. Transaction — wrap mutating handlers in a scoped transaction
//!
//! The order is a hard invariant; once any stage fails, no later stage or
//! the handler executes. Requests declare their capabilities through
//! associated consts, and the pipeline is generic over the handler's
//! response type — both plain and value-carrying results flow through the
//! one implementation.

use std::future::Future;
use std::sync::Arc;

use gatehouse_auth::Principal;
use gatehouse_common::{Error, Result};

use crate::domain::entities::{Team, User};
use crate::repository::{TeamStore, TransactionManager, UserStore};

/// Per-request context populated by the pipeline. Handlers read the
/// parts their request declared; `user()`/`team()` are infallible in
/// practice for declaring requests because the load stages ran first.
#[derive(Debug, Clone)]
pub struct AuthScope {
    pub principal: Principal,
    pub user: Option<User>,
    pub team: Option<Team>,
}

impl AuthScope {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            user: None,
            team: None,
        }
    }

    /// The loaded user. Declaring `LOADS_USER` guarantees presence.
    pub fn user(&self) -> Result<&User> {
        self.user
            .as_ref()
            .ok_or_else(|| Error::Internal("request did not declare a user capability".to_string()))
    }

    /// The loaded team. Declaring `LOADS_TEAM` guarantees presence.
    pub fn team(&self) -> Result<&Team> {
        self.team
            .as_ref()
            .ok_or_else(|| Error::Internal("request did not declare a team capability".to_string()))
    }
}

/// Authorization rule tree evaluated by the validation stage.
///
/// Rules never explain themselves: a failed tree is the uniform
/// `Forbidden`, whichever leaf failed.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Always satisfied (public requests)
    Unrestricted,
    Authenticated,
    CustomerMinimum,
    MaintenanceMinimum,
    SuperMinimum,
    PositionAtLeast(i32),
    /// The caller leads the loaded team
    TeamLeader,
    All(Vec<Rule>),
    Any(Vec<Rule>),
}

impl Rule {
    pub fn evaluate(&self, scope: &AuthScope) -> bool {
        let principal = &scope.principal;
        match self {
            Rule::Unrestricted => true,
            Rule::Authenticated => principal.is_authenticated,
            Rule::CustomerMinimum => principal.is_customer_minimum(),
            Rule::MaintenanceMinimum => principal.is_maintenance_minimum(),
            Rule::SuperMinimum => principal.is_super_minimum(),
            Rule::PositionAtLeast(n) => {
                principal.is_authenticated && principal.team_position >= *n
            }
            Rule::TeamLeader => match (&scope.team, principal.user_id) {
                (Some(team), Some(user_id)) => team.leader_id == Some(user_id),
                _ => false,
            },
            Rule::All(rules) => rules.iter().all(|r| r.evaluate(scope)),
            Rule::Any(rules) => rules.iter().any(|r| r.evaluate(scope)),
        }
    }
}

/// Capability declaration for a request type. The pipeline fills the
/// scope before dispatch; the type system guarantees presence only where
/// declared.
pub trait Request: Send {
    type Output: Send;

    const REQUIRES_AUTH: bool = true;
    const LOADS_USER: bool = false;
    const LOADS_TEAM: bool = false;
    const MUTATES: bool = false;

    fn rules(&self) -> Rule {
        Rule::Authenticated
    }
}

/// The pipeline executor. Cheap to clone; construct once at startup.
#[derive(Clone)]
pub struct Pipeline {
    users: Arc<dyn UserStore>,
    teams: Arc<dyn TeamStore>,
    transactions: Arc<dyn TransactionManager>,
}

impl Pipeline {
    pub fn new(
        users: Arc<dyn UserStore>,
        teams: Arc<dyn TeamStore>,
        transactions: Arc<dyn TransactionManager>,
    ) -> Self {
        Self {
            users,
            teams,
            transactions,
        }
    }

    /// Run a request through the stages and, if all pass, the handler.
    pub async fn dispatch<R, H, Fut>(
        &self,
        principal: Principal,
        request: R,
        handler: H,
    ) -> Result<R::Output>
    where
        R: Request,
        H: FnOnce(R, AuthScope) -> Fut + Send,
        Fut: Future<Output = Result<R::Output>> + Send,
    {
        // Stage 1: principal
        if R::REQUIRES_AUTH && !principal.is_authenticated {
            tracing::debug!("pipeline: unauthenticated caller rejected");
            return Err(Error::invalid_credentials());
        }
        let mut scope = AuthScope::new(principal);

        // Stage 2: user load
        if R::LOADS_USER {
            let user_id = scope
                .principal
                .user_id
                .ok_or_else(Error::invalid_credentials)?;
            let user = self
                .users
                .get(user_id)
                .await?
                .ok_or_else(|| Error::NotFound("user".to_string()))?;
            scope.user = Some(user);
        }

        // Stage 3: team load
        if R::LOADS_TEAM {
            let team_id = scope
                .principal
                .team_id
                .or_else(|| scope.user.as_ref().map(|u| u.team_id))
                .ok_or_else(|| Error::NotFound("team".to_string()))?;
            let team = self
                .teams
                .get(team_id)
                .await?
                .ok_or_else(|| Error::NotFound("team".to_string()))?;
            scope.team = Some(team);
        }

        // Stage 4: validation
        if !request.rules().evaluate(&scope) {
            tracing::debug!("pipeline: validation rule failed");
            return Err(Error::Forbidden);
        }

        // Stage 5: transaction (mutating requests only)
        if R::MUTATES {
            let transaction = self.transactions.begin().await?;
            match handler(request, scope).await {
                Ok(output) => {
                    transaction.commit().await?;
                    Ok(output)
                }
                Err(err) => {
                    transaction.rollback().await?;
                    Err(err)
                }
            }
        } else {
            handler(request, scope).await
        }
    }
}
