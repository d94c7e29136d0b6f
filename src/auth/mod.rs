//! Session tokens, session lifecycle and credential hashing.

pub mod lifecycle;
pub mod middleware;
pub mod password;
pub mod token;

pub use lifecycle::SessionManager;
pub use middleware::{AppState, AuthSession};
pub use password::{Argon2Hasher, CredentialHasher};
pub use token::{generate_signing_key, mint, validate, SessionId, SigningKey};
