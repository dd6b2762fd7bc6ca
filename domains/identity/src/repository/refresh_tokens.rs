//! Refresh-token store
//!
//! Rotation is a single conditional write: the store supersedes the
//! presented record and inserts its replacement under one lock, so
//! exactly one of two concurrent rotations of the same token can succeed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use gatehouse_common::Result;

use crate::domain::entities::RefreshTokenRecord;

/// Result of a conditional rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The presented record was live; it is now superseded and the
    /// replacement is stored.
    Rotated,
    /// The presented record had already been superseded — replay.
    AlreadySuperseded,
    /// No record under the presented digest.
    NotFound,
}

#[async_trait::async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<()>;

    async fn find(&self, token_digest: &str) -> Result<Option<RefreshTokenRecord>>;

    /// The live (not superseded, not expired) token for a (user, device)
    /// pair, if any.
    async fn find_active_for_device(
        &self,
        user_id: Uuid,
        device_id: Option<&str>,
    ) -> Result<Option<RefreshTokenRecord>>;

    /// Compare-and-swap rotation: supersede the record under
    /// `presented_digest` and store `replacement` atomically. Never a
    /// read-then-write from the caller's side.
    async fn rotate(
        &self,
        presented_digest: &str,
        replacement: RefreshTokenRecord,
    ) -> Result<RotationOutcome>;

    /// Supersede every record in a family. Returns how many were live.
    async fn revoke_family(&self, family_id: Uuid) -> Result<usize>;

    /// Supersede every record belonging to a user (account closure).
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<usize>;
}

/// In-memory reference implementation
#[derive(Clone, Default)]
pub struct InMemoryRefreshTokenStore {
    records: Arc<Mutex<HashMap<String, RefreshTokenRecord>>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record.token_digest.clone(), record);
        Ok(())
    }

    async fn find(&self, token_digest: &str) -> Result<Option<RefreshTokenRecord>> {
        Ok(self.records.lock().unwrap().get(token_digest).cloned())
    }

    async fn find_active_for_device(
        &self,
        user_id: Uuid,
        device_id: Option<&str>,
    ) -> Result<Option<RefreshTokenRecord>> {
        let now = chrono::Utc::now();
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| {
                r.user_id == user_id
                    && r.device_id.as_deref() == device_id
                    && !r.superseded
                    && !r.is_expired(now)
            })
            .cloned())
    }

    async fn rotate(
        &self,
        presented_digest: &str,
        replacement: RefreshTokenRecord,
    ) -> Result<RotationOutcome> {
        // One lock span covers the check, the supersede, and the insert.
        let mut records = self.records.lock().unwrap();
        match records.get_mut(presented_digest) {
            None => Ok(RotationOutcome::NotFound),
            Some(record) if record.superseded => Ok(RotationOutcome::AlreadySuperseded),
            Some(record) => {
                record.superseded = true;
                records.insert(replacement.token_digest.clone(), replacement);
                Ok(RotationOutcome::Rotated)
            }
        }
    }

    async fn revoke_family(&self, family_id: Uuid) -> Result<usize> {
        let mut records = self.records.lock().unwrap();
        let mut revoked = 0;
        for record in records.values_mut() {
            if record.family_id == family_id && !record.superseded {
                record.superseded = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<usize> {
        let mut records = self.records.lock().unwrap();
        let mut revoked = 0;
        for record in records.values_mut() {
            if record.user_id == user_id && !record.superseded {
                record.superseded = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}
