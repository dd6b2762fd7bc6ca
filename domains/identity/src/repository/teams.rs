//! Team store

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use gatehouse_auth::TeamType;
use gatehouse_common::{Error, Result};

use crate::domain::entities::Team;

#[async_trait::async_trait]
pub trait TeamStore: Send + Sync {
    /// Get team by ID (with members)
    async fn get(&self, id: Uuid) -> Result<Option<Team>>;

    /// Insert a new team. At most one Super and one Maintenance team may
    /// exist; a second insert of either type fails with `Conflict`.
    async fn insert(&self, team: Team) -> Result<()>;

    async fn update(&self, team: &Team) -> Result<()>;

    async fn remove(&self, id: Uuid) -> Result<()>;

    async fn find_singleton(&self, team_type: TeamType) -> Result<Option<Team>>;
}

/// In-memory reference implementation
#[derive(Clone, Default)]
pub struct InMemoryTeamStore {
    teams: Arc<Mutex<HashMap<Uuid, Team>>>,
}

impl InMemoryTeamStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TeamStore for InMemoryTeamStore {
    async fn get(&self, id: Uuid) -> Result<Option<Team>> {
        Ok(self.teams.lock().unwrap().get(&id).cloned())
    }

    async fn insert(&self, team: Team) -> Result<()> {
        let mut teams = self.teams.lock().unwrap();
        if matches!(team.team_type, TeamType::Super | TeamType::Maintenance) {
            let exists = teams.values().any(|t| t.team_type == team.team_type);
            if exists {
                return Err(Error::Conflict(format!(
                    "A {} team already exists",
                    team.team_type
                )));
            }
        }
        teams.insert(team.id, team);
        Ok(())
    }

    async fn update(&self, team: &Team) -> Result<()> {
        let mut teams = self.teams.lock().unwrap();
        if !teams.contains_key(&team.id) {
            return Err(Error::NotFound("team".to_string()));
        }
        teams.insert(team.id, team.clone());
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        self.teams.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn find_singleton(&self, team_type: TeamType) -> Result<Option<Team>> {
        Ok(self
            .teams
            .lock()
            .unwrap()
            .values()
            .find(|t| t.team_type == team_type)
            .cloned())
    }
}
