//! Error taxonomy for sessions and credentials, plus Axum response conversions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors returned by the token codec, session stores, session lifecycle
/// and credential hasher.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed or forged session token. Decode failures and MAC
    /// mismatches are deliberately reported the same way.
    #[error("Invalid session token")]
    InvalidToken,

    /// Unknown or expired session id.
    #[error("Session not found or expired")]
    SessionNotFound,

    /// Session backend I/O failure. Transient; retry policy belongs to the caller.
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// The OS random source could not produce bytes for a new session id.
    #[error("Secure random source unavailable: {0}")]
    RandomUnavailable(String),

    /// A session payload could not be encoded or decoded.
    #[error("Session payload serialization failed: {0}")]
    Serialization(String),
}

impl AuthError {
    /// HTTP status the request layer should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidToken
            | AuthError::SessionNotFound
            | AuthError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::HashingFailed(_)
            | AuthError::RandomUnavailable(_)
            | AuthError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::StoreUnavailable(msg) => {
                tracing::error!(error = %msg, "Session store unavailable");
                "Service temporarily unavailable".to_string()
            }
            AuthError::HashingFailed(msg)
            | AuthError::RandomUnavailable(msg)
            | AuthError::Serialization(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::StoreUnavailable(format!("Redis error: {}", err))
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Serialization(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    /// Extract status code and JSON body from an AuthError response.
    async fn error_response(err: AuthError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_store_unavailable_hides_details() {
        let (status, body) = error_response(AuthError::StoreUnavailable(
            "Redis connection refused at 10.0.0.5:6379".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let msg = body["error"].as_str().unwrap();
        assert!(!msg.contains("Redis"));
        assert!(!msg.contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_hashing_failure_hides_details() {
        let (status, body) =
            error_response(AuthError::HashingFailed("m_cost too large".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_failed_is_bad_request() {
        let (status, body) = error_response(AuthError::ValidationFailed(
            "password must be at least 6 characters".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("at least 6 characters"));
    }

    #[tokio::test]
    async fn test_token_and_session_errors_are_unauthorized() {
        for err in [
            AuthError::InvalidToken,
            AuthError::SessionNotFound,
            AuthError::AuthenticationFailed,
        ] {
            let expected = err.to_string();
            let (status, body) = error_response(err).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], expected);
        }
    }

    #[test]
    fn test_from_redis_error() {
        let redis_err = redis::RedisError::from((
            redis::ErrorKind::IoError,
            "test context",
            "connection refused".to_string(),
        ));
        match AuthError::from(redis_err) {
            AuthError::StoreUnavailable(msg) => assert!(msg.contains("Redis error")),
            other => panic!("Expected StoreUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        match AuthError::from(serde_err) {
            AuthError::Serialization(msg) => assert!(msg.contains("JSON error")),
            other => panic!("Expected Serialization, got {:?}", other),
        }
    }
}
