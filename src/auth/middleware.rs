//! Axum request-layer adapters: shared state, account flows and the
//! session extractor.

use super::lifecycle::SessionManager;
use super::password::{hash_off_thread, verify_off_thread, Argon2Hasher, CredentialHasher};
use super::token::SessionId;
use crate::config::Config;
use crate::error::AuthError;
use crate::models::{Credentials, NewUser, SessionState, User};
use crate::storage;
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager<SessionState>>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the configured session store and hasher.
    pub fn from_config(config: Config) -> Result<Self, AuthError> {
        let hasher = Argon2Hasher::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
        )?;
        let store = storage::build_store(&config)?;
        let sessions = SessionManager::new(config.signing_key(), store, config.session_ttl());

        Ok(Self {
            sessions: Arc::new(sessions),
            hasher: Arc::new(hasher),
            config: Arc::new(config),
        })
    }

    /// Validate a sign-up and hash its password.
    ///
    /// Validation runs first; invalid input never reaches the hasher.
    /// Persisting the returned [`User`] is the caller's job.
    pub async fn register(&self, new_user: NewUser) -> Result<User, AuthError> {
        new_user.validate()?;
        let pass_hash = hash_off_thread(self.hasher.clone(), new_user.password.clone()).await?;

        let user = new_user.into_user_with_hash(pass_hash);
        tracing::info!(action = "user_registered", user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check `credentials` against `user` and begin a session on success.
    pub async fn sign_in(
        &self,
        user: &User,
        credentials: Credentials,
        client_addr: &str,
    ) -> Result<SessionId, AuthError> {
        if !user.email.eq_ignore_ascii_case(credentials.email.trim()) {
            return Err(AuthError::AuthenticationFailed);
        }

        if let Err(e) =
            verify_off_thread(self.hasher.clone(), user.pass_hash.clone(), credentials.password)
                .await
        {
            if matches!(e, AuthError::AuthenticationFailed) {
                tracing::warn!(
                    action = "sign_in_failed",
                    user_id = %user.id,
                    client_addr,
                    "Password did not match"
                );
            }
            return Err(e);
        }

        self.start_session(user.clone(), client_addr).await
    }

    /// Begin a session for an already-authenticated user.
    pub async fn start_session(&self, user: User, client_addr: &str) -> Result<SessionId, AuthError> {
        let user_id = user.id.clone();
        let id = self
            .sessions
            .begin(SessionState::new(user, client_addr))
            .await?;

        tracing::info!(action = "sign_in", user_id = %user_id, client_addr, "Session started");
        Ok(id)
    }

    pub async fn sign_out(&self, session: &AuthSession) -> Result<(), AuthError> {
        self.sessions.end(&session.id).await?;
        tracing::info!(action = "sign_out", user_id = %session.state.user.id, "Session ended");
        Ok(())
    }
}

/// Authenticated session extractor.
///
/// Extracts session from `Authorization: Bearer {token}` header.
/// Returns 401 Unauthorized if missing, invalid or expired. Works with any
/// router state that [`AppState`] can be taken from.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: SessionId,
    pub state: SessionState,
}

impl AuthSession {
    pub fn user(&self) -> &User {
        &self.state.user
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AuthError::InvalidToken)
}

impl<S> FromRequestParts<S> for AuthSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let token = bearer_token(parts)?;
        let (id, session) = app.sessions.get_state(token).await?;

        Ok(AuthSession { id, state: session })
    }
}

/// Optional authenticated session extractor.
///
/// Yields `None` for a missing, invalid or expired session. A store outage
/// still fails the request.
impl<S> OptionalFromRequestParts<S> for AuthSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <AuthSession as FromRequestParts<S>>::from_request_parts(parts, state).await {
            Ok(session) => Ok(Some(session)),
            Err(AuthError::InvalidToken | AuthError::SessionNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
