//! User store

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use gatehouse_common::{Error, Result};

use crate::domain::entities::User;

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Get user by ID
    async fn get(&self, id: Uuid) -> Result<Option<User>>;

    /// Look up by sign-in identifier: user id, email, or username.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new user. Fails with `Conflict` when the email or
    /// username is already taken.
    async fn insert(&self, user: User) -> Result<()>;

    async fn update(&self, user: &User) -> Result<()>;

    async fn remove(&self, id: Uuid) -> Result<()>;

    /// Positions of every member of a team, for range-change validation.
    async fn positions_in_team(&self, team_id: Uuid) -> Result<Vec<i32>>;
}

/// In-memory reference implementation
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        if let Ok(id) = Uuid::parse_str(identifier) {
            return self.get(id).await;
        }
        let lowered = identifier.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.to_lowercase() == lowered || u.username == lowered)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let lowered = email.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.to_lowercase() == lowered)
            .cloned())
    }

    async fn insert(&self, user: User) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        let taken = users.values().any(|u| {
            u.email.to_lowercase() == user.email.to_lowercase() || u.username == user.username
        });
        if taken {
            return Err(Error::Conflict(
                "Email or username already in use".to_string(),
            ));
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.id) {
            return Err(Error::NotFound("user".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        self.users.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn positions_in_team(&self, team_id: Uuid) -> Result<Vec<i32>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.team_id == team_id)
            .map(|u| u.position)
            .collect())
    }
}
