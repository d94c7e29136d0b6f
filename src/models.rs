//! Session payload and user models.
//!
//! All models use serde. JSON field names follow the public API
//! (`userName`, `photoURL`, ...). Password hashes are never serialized.

use crate::auth::password::CredentialHasher;
use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Base URL for Gravatar profile photos.
const GRAVATAR_BASE_URL: &str = "https://www.gravatar.com/avatar/";

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ============================================================================
// Session Models
// ============================================================================

/// State kept for each live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Unix seconds when the session began.
    pub began_at: u64,
    /// Address of the client that began the session.
    pub client_addr: String,
    /// Snapshot of the authenticated user, without the password hash.
    pub user: User,
}

impl SessionState {
    pub fn new(mut user: User, client_addr: impl Into<String>) -> Self {
        user.pass_hash.clear();
        Self {
            began_at: unix_now(),
            client_addr: client_addr.into(),
            user,
        }
    }
}

// ============================================================================
// User Models
// ============================================================================

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Argon2id PHC string. Stored by the user store, never sent to clients.
    #[serde(skip_serializing, default)]
    pub pass_hash: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    #[serde(rename = "mobilePhone", default)]
    pub mobile_phone: String,
}

impl User {
    /// Replace the stored hash with a hash of `password`.
    pub fn set_password(
        &mut self,
        hasher: &dyn CredentialHasher,
        password: &str,
    ) -> Result<(), AuthError> {
        self.pass_hash = hasher.hash_password(password)?;
        Ok(())
    }

    /// Check a plaintext password against the stored hash.
    pub fn authenticate(
        &self,
        hasher: &dyn CredentialHasher,
        password: &str,
    ) -> Result<(), AuthError> {
        hasher.verify_password(&self.pass_hash, password)
    }

    pub fn apply_updates(&mut self, updates: UserUpdates) {
        self.first_name = updates.first_name;
        self.last_name = updates.last_name;
    }
}

/// Sign-in credentials.
#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A new user signing up for an account.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: Zeroizing<String>,
    pub password_conf: Zeroizing<String>,
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub mobile_phone: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("password_conf", &"[REDACTED]")
            .field("user_name", &self.user_name)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("mobile_phone", &self.mobile_phone)
            .finish()
    }
}

impl NewUser {
    /// Cheap local checks. Must pass before any hashing is attempted.
    pub fn validate(&self) -> Result<(), AuthError> {
        if !is_valid_email(&self.email) {
            return Err(AuthError::ValidationFailed(
                "email address is not valid".to_string(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::ValidationFailed(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if *self.password != *self.password_conf {
            return Err(AuthError::ValidationFailed(
                "passwords do not match".to_string(),
            ));
        }
        if self.user_name.is_empty() {
            return Err(AuthError::ValidationFailed(
                "user name is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate, then build a [`User`] with a hashed password, a Gravatar
    /// photo URL and a fresh id.
    pub fn into_user(self, hasher: &dyn CredentialHasher) -> Result<User, AuthError> {
        self.validate()?;
        let pass_hash = hasher.hash_password(&self.password)?;
        Ok(self.into_user_with_hash(pass_hash))
    }

    /// Build the [`User`] once `pass_hash` has been computed.
    pub(crate) fn into_user_with_hash(self, pass_hash: String) -> User {
        User {
            id: nanoid::nanoid!(12),
            photo_url: gravatar_url(&self.email),
            email: self.email,
            pass_hash,
            user_name: self.user_name,
            first_name: self.first_name,
            last_name: self.last_name,
            mobile_phone: self.mobile_phone,
        }
    }
}

/// Profile fields a user may change.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdates {
    pub first_name: String,
    pub last_name: String,
}

/// Gravatar URL for an email: SHA-256 of the trimmed, lower-cased address.
pub fn gravatar_url(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{}{}", GRAVATAR_BASE_URL, hex::encode(digest))
}

/// Syntactic email check: `local@domain` with a dotted, non-empty domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-')
        })
}
