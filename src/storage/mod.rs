//! Session storage.
//!
//! [`SessionStore`] maps a [`SessionId`] to a caller-defined payload with a
//! sliding expiration. Two backends:
//! - [`MemoryStore`]: process-local map behind a mutex
//! - [`RedisStore`]: shared Redis cache, JSON-encoded payloads

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::auth::token::SessionId;
use crate::config::{Config, StoreBackend};
use crate::error::AuthError;
use crate::models::SessionState;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Session storage backend.
///
/// Every successful `get` slides the entry's expiry to `now + ttl`, where
/// `ttl` is the value passed to the last `save`. A `get` after the entry
/// expired fails with [`AuthError::SessionNotFound`].
#[async_trait]
pub trait SessionStore<S: Send + 'static>: Send + Sync {
    /// Associate `state` with `id`, replacing any previous association.
    async fn save(&self, id: &SessionId, state: S, ttl: Duration) -> Result<(), AuthError>;

    /// Fetch the state for `id` and refresh its expiry.
    async fn get(&self, id: &SessionId) -> Result<S, AuthError>;

    /// Remove `id`. Deleting an unknown id succeeds.
    async fn delete(&self, id: &SessionId) -> Result<(), AuthError>;
}

/// Longest TTL a store accepts (one year).
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Convert a TTL to whole milliseconds, rejecting zero and anything above
/// [`MAX_SESSION_TTL`].
pub(crate) fn ttl_millis(ttl: Duration) -> Result<u64, AuthError> {
    if ttl > MAX_SESSION_TTL {
        return Err(AuthError::ValidationFailed(format!(
            "session TTL must be at most {}s",
            MAX_SESSION_TTL.as_secs()
        )));
    }
    let ms = ttl.as_millis() as u64;
    if ms == 0 {
        return Err(AuthError::ValidationFailed(
            "session TTL must be at least 1ms".to_string(),
        ));
    }
    Ok(ms)
}

/// Build the backend selected by `SESSION_STORE`.
pub fn build_store(config: &Config) -> Result<Arc<dyn SessionStore<SessionState>>, AuthError> {
    match &config.store_backend {
        StoreBackend::Memory => {
            tracing::info!(backend = "memory", "Using in-process session store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redis { url } => {
            tracing::info!(backend = "redis", "Using Redis session store");
            Ok(Arc::new(RedisStore::open(url.as_str())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis() {
        assert_eq!(ttl_millis(Duration::from_secs(2)).unwrap(), 2000);
        assert_eq!(ttl_millis(Duration::from_micros(1500)).unwrap(), 1);
        assert!(matches!(
            ttl_millis(Duration::ZERO),
            Err(AuthError::ValidationFailed(_))
        ));
        assert!(matches!(
            ttl_millis(Duration::from_micros(999)),
            Err(AuthError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_ttl_millis_upper_bound() {
        assert_eq!(
            ttl_millis(MAX_SESSION_TTL).unwrap(),
            MAX_SESSION_TTL.as_secs() * 1000
        );
        assert!(matches!(
            ttl_millis(MAX_SESSION_TTL + Duration::from_millis(1)),
            Err(AuthError::ValidationFailed(_))
        ));
        assert!(matches!(
            ttl_millis(Duration::from_secs(u64::MAX)),
            Err(AuthError::ValidationFailed(_))
        ));
    }
}
