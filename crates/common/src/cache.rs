//! TTL key-value cache for short-lived capability tokens
//!
//! Backs the pending two-factor token and email-confirmation token stores.
//! Constructed once at startup and handed to consumers by clone (shared
//! `Arc` internals) — never accessed through ambient static state.
//! Expiry is enforced lazily at read time; `sweep` reclaims memory when a
//! periodic job wants to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Thread-safe in-process cache with per-entry TTL.
#[derive(Clone)]
pub struct TtlCache<V> {
    entries: Arc<Mutex<HashMap<String, Entry<V>>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Insert a value under `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.into(),
            Entry {
                value,
                expires_at: Utc::now() + ttl,
            },
        );
    }

    /// Read a value without consuming it. Expired entries are removed and
    /// reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Consume a value: removes the entry and returns it if still live.
    /// This is the single-use path for capability tokens.
    pub fn take(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let entry = entries.remove(key)?;
        if entry.expires_at > Utc::now() {
            Some(entry.value)
        } else {
            None
        }
    }

    pub fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.remove(key);
    }

    /// Drop every expired entry, returning how many were reclaimed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
