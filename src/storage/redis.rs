//! Redis session store.
//!
//! Redis key pattern:
//! - `session:{id}`: JSON envelope `{"ttl_ms": <u64>, "state": <payload>}`
//!
//! The TTL lives inside the envelope so that a read can slide the expiry
//! without the caller knowing the TTL given at save time. Read and touch
//! happen in one Lua script, so concurrent readers of the same session
//! cannot race an expiry between the two steps.
//!
//! ## Security: Zeroizing Sensitive Data
//!
//! Payload JSON read back from Redis is wrapped in `Zeroizing` and cleared
//! once deserialized. Redis keeps its own copy; this only covers the
//! application's memory.

use super::{ttl_millis, SessionStore};
use crate::auth::token::SessionId;
use crate::error::AuthError;
use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use zeroize::Zeroizing;

const KEY_PREFIX: &str = "session:";

// GET + PEXPIRE with the TTL recorded at save time
const GET_AND_REFRESH: &str = r"
local val = redis.call('GET', KEYS[1])
if val then
    local envelope = cjson.decode(val)
    redis.call('PEXPIRE', KEYS[1], envelope['ttl_ms'])
end
return val
";

#[derive(Serialize)]
struct EnvelopeRef<'a, S> {
    ttl_ms: u64,
    state: &'a S,
}

// `ttl_ms` is only read by the Lua script
#[derive(Deserialize)]
struct Envelope<S> {
    state: S,
}

/// Session store shared by every service instance pointing at the same Redis.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    get_and_refresh: redis::Script,
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            get_and_refresh: redis::Script::new(GET_AND_REFRESH),
        }
    }

    /// Parse `url` and build a store. Does not connect yet.
    pub fn open(url: &str) -> Result<Self, AuthError> {
        Ok(Self::new(redis::Client::open(url)?))
    }

    /// Round-trip a `PING` to confirm the server is reachable.
    pub async fn ping(&self) -> Result<(), AuthError> {
        let mut con = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(())
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AuthError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AuthError::StoreUnavailable(format!("Redis connection error: {}", e)))
    }

    fn key(id: &SessionId) -> String {
        format!("{}{}", KEY_PREFIX, id.as_str())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Connection info may carry credentials
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> SessionStore<S> for RedisStore
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn save(&self, id: &SessionId, state: S, ttl: Duration) -> Result<(), AuthError> {
        let ttl_ms = ttl_millis(ttl)?;
        let json = serde_json::to_string(&EnvelopeRef {
            ttl_ms,
            state: &state,
        })?;

        let mut con = self.connection().await?;
        con.pset_ex::<_, _, ()>(Self::key(id), json, ttl_ms).await?;
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<S, AuthError> {
        let mut con = self.connection().await?;
        let json: Option<String> = self
            .get_and_refresh
            .key(Self::key(id))
            .invoke_async(&mut con)
            .await?;

        match json {
            Some(data) => {
                let data = Zeroizing::new(data);
                let envelope: Envelope<S> = serde_json::from_str(&data)?;
                Ok(envelope.state)
            }
            None => {
                tracing::debug!(action = "session_miss", "Session not found in Redis");
                Err(AuthError::SessionNotFound)
            }
        }
    }

    async fn delete(&self, id: &SessionId) -> Result<(), AuthError> {
        let mut con = self.connection().await?;
        con.del::<_, ()>(Self::key(id)).await?;
        Ok(())
    }
}
