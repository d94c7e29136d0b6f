//! In-process session store.
//!
//! A single mutex guards the whole map; it is never held across an await.
//! Expired entries are dropped lazily on `get`, or in bulk by
//! [`MemoryStore::purge_expired`]. Nothing survives a restart.

use super::{ttl_millis, SessionStore};
use crate::auth::token::SessionId;
use crate::error::AuthError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

struct Entry<S> {
    state: S,
    ttl: Duration,
    expires_at: Instant,
}

pub struct MemoryStore<S> {
    entries: Mutex<HashMap<String, Entry<S>>>,
}

impl<S> MemoryStore<S> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of entries that have not yet expired.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "Purged expired sessions");
        }
        removed
    }
}

impl<S> Default for MemoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> SessionStore<S> for MemoryStore<S>
where
    S: Clone + Send + 'static,
{
    async fn save(&self, id: &SessionId, state: S, ttl: Duration) -> Result<(), AuthError> {
        ttl_millis(ttl)?;
        let expires_at = Instant::now().checked_add(ttl).ok_or_else(|| {
            AuthError::ValidationFailed("session TTL is out of range".to_string())
        })?;
        let entry = Entry {
            state,
            ttl,
            expires_at,
        };
        self.entries.lock().insert(id.as_str().to_string(), entry);
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<S, AuthError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match entries.get_mut(id.as_str()) {
            None => return Err(AuthError::SessionNotFound),
            Some(entry) if entry.expires_at > now => {
                // Keep the current expiry if the refreshed one is unrepresentable
                if let Some(refreshed) = now.checked_add(entry.ttl) {
                    entry.expires_at = refreshed;
                }
                return Ok(entry.state.clone());
            }
            Some(_) => {}
        }

        // Expired
        entries.remove(id.as_str());
        Err(AuthError::SessionNotFound)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), AuthError> {
        self.entries.lock().remove(id.as_str());
        Ok(())
    }
}
