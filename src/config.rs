//! Environment-driven configuration for signing, session storage and hashing.

use crate::auth::token::SigningKey;
use crate::storage::MAX_SESSION_TTL;
use std::env;
use std::time::Duration;

/// Which session store backs the service.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis { url: String },
}

impl std::fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => f.write_str("Memory"),
            StoreBackend::Redis { .. } => f.write_str("Redis { url: [REDACTED] }"),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    // Session signing
    pub session_key: String,

    // Session storage
    pub store_backend: StoreBackend,
    pub session_ttl_secs: u64,

    // Argon2id work factor
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("session_key", &"[REDACTED]")
            .field("store_backend", &self.store_backend)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("hash_memory_kib", &self.hash_memory_kib)
            .field("hash_iterations", &self.hash_iterations)
            .field("hash_parallelism", &self.hash_parallelism)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // Signing key - required, never logged
        let session_key = env::var("SESSION_KEY")
            .map_err(|_| ConfigError::MissingVar("SESSION_KEY".to_string()))?;
        if session_key.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SESSION_KEY".to_string(),
                "cannot be empty".to_string(),
            ));
        }

        // Session store backend
        let backend = env::var("SESSION_STORE").unwrap_or_else(|_| "memory".to_string());
        let store_backend = match backend.trim().to_ascii_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            "redis" => {
                // Required for redis to prevent silent fallback to a local store
                let url = env::var("REDIS_URL")
                    .map_err(|_| ConfigError::MissingVar("REDIS_URL".to_string()))?;
                StoreBackend::Redis { url }
            }
            other => {
                return Err(ConfigError::InvalidValue(
                    "SESSION_STORE".to_string(),
                    format!("expected 'memory' or 'redis', got '{}'", other),
                ))
            }
        };

        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 3600)?;
        if session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        if session_ttl_secs > MAX_SESSION_TTL.as_secs() {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                format!("must be at most {}", MAX_SESSION_TTL.as_secs()),
            ));
        }

        // Argon2id parameters (OWASP defaults)
        let hash_memory_kib = parse_env_or_default("HASH_MEMORY_KIB", 19_456)?;
        let hash_iterations = parse_env_or_default("HASH_ITERATIONS", 2)?;
        let hash_parallelism = parse_env_or_default("HASH_PARALLELISM", 1)?;

        Ok(Config {
            session_key,
            store_backend,
            session_ttl_secs,
            hash_memory_kib,
            hash_iterations,
            hash_parallelism,
        })
    }

    pub fn signing_key(&self) -> SigningKey {
        SigningKey::new(self.session_key.clone())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
