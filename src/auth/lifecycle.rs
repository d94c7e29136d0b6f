//! Session lifecycle: begin, look up, end.
//!
//! [`SessionManager`] ties a [`SigningKey`] to a [`SessionStore`]. A presented
//! token is checked against the key first, so forged or malformed tokens are
//! rejected without a store round trip.

use super::token::{self, SessionId, SigningKey};
use crate::error::AuthError;
use crate::storage::SessionStore;
use std::sync::Arc;
use std::time::Duration;

pub struct SessionManager<S> {
    key: SigningKey,
    store: Arc<dyn SessionStore<S>>,
    ttl: Duration,
}

impl<S: Send + 'static> SessionManager<S> {
    pub fn new(key: SigningKey, store: Arc<dyn SessionStore<S>>, ttl: Duration) -> Self {
        Self { key, store, ttl }
    }

    /// Idle timeout applied to every session this manager begins.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a new id and store `state` under it.
    pub async fn begin(&self, state: S) -> Result<SessionId, AuthError> {
        let id = token::mint(&self.key)?;
        self.store.save(&id, state, self.ttl).await?;

        tracing::debug!(action = "session_begin", session = ?id, "Session started");
        Ok(id)
    }

    /// Validate `presented` and fetch its state, sliding the expiry.
    pub async fn get_state(&self, presented: &str) -> Result<(SessionId, S), AuthError> {
        let id = self.verify(presented)?;
        let state = self.store.get(&id).await?;
        Ok((id, state))
    }

    /// Remove a session. Ending an unknown or already-ended session succeeds.
    pub async fn end(&self, id: &SessionId) -> Result<(), AuthError> {
        self.store.delete(id).await?;
        tracing::debug!(action = "session_end", session = ?id, "Session ended");
        Ok(())
    }

    /// Validate `presented`, then end it.
    pub async fn end_presented(&self, presented: &str) -> Result<SessionId, AuthError> {
        let id = self.verify(presented)?;
        self.end(&id).await?;
        Ok(id)
    }

    fn verify(&self, presented: &str) -> Result<SessionId, AuthError> {
        token::validate(presented, &self.key).map_err(|e| {
            tracing::warn!(action = "token_rejected", "Rejected session token");
            e
        })
    }
}

impl<S> std::fmt::Debug for SessionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
