//! Error types for the server.
//!
//! Two shapes go over the wire:
//! - [`ApiError`] for protocol endpoints, rendered as an RFC 6749 §5.2 body
//!   (`{"error": .., "error_description": ..}`)
//! - [`ServerError`] for the admin API, rendered as `{"code": .., "message": ..}`

use axum::{
    Json,
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, PRAGMA, WWW_AUTHENTICATE},
    },
    response::{IntoResponse, Response},
};
use keygate_oauth::OAuthError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// ServerError
// ─────────────────────────────────────────────────────────────────────────────

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage or randomness failure inside the engine.
    #[error("Engine error: {0}")]
    Engine(OAuthError),
}

impl From<OAuthError> for ServerError {
    fn from(e: OAuthError) -> Self {
        if e.is_server_error() {
            ServerError::Engine(e)
        } else {
            ServerError::BadRequest(e.description().to_string())
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ServerError::Engine(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error"),
        };

        let message = match &self {
            ServerError::Engine(e) => {
                tracing::error!(status = %status, code, error = %e, "Server error");
                e.description().to_string()
            }
            ServerError::Internal(_) => {
                let message = self.to_string();
                tracing::error!(status = %status, code, error = %message, "Server error");
                message
            }
            _ => {
                let message = self.to_string();
                tracing::warn!(status = %status, code, error = %message, "Client error");
                message
            }
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ApiError
// ─────────────────────────────────────────────────────────────────────────────

/// RFC 6749 §5.2 error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    pub error_description: String,
}

/// A protocol-level error with its HTTP framing.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    description: String,
    challenge: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, description: impl Into<String>) -> Self {
        Self {
            status,
            code,
            description: description.into(),
            challenge: None,
        }
    }

    /// The end user is not authenticated.
    pub fn access_denied(description: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "access_denied", description)
    }

    /// Missing, unknown, expired or revoked bearer token (RFC 6750 §3.1).
    pub fn invalid_token() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "the access token is missing or invalid",
        )
        .with_challenge(r#"Bearer error="invalid_token""#)
    }

    /// Valid token lacking a required scope (RFC 6750 §3.1).
    pub fn insufficient_scope(scope: &str) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "insufficient_scope",
            format!("the access token lacks the '{}' scope", scope),
        )
        .with_challenge(format!(r#"Bearer error="insufficient_scope", scope="{}""#, scope))
    }

    /// Ask the client to retry with HTTP Basic credentials.
    pub fn with_basic_challenge(self) -> Self {
        self.with_challenge(r#"Basic realm="keygate""#)
    }

    fn with_challenge(mut self, challenge: impl Into<String>) -> Self {
        self.challenge = Some(challenge.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<OAuthError> for ApiError {
    fn from(e: OAuthError) -> Self {
        let status = if e.is_server_error() {
            tracing::error!(error = %e, "Engine failure");
            StatusCode::INTERNAL_SERVER_ERROR
        } else if matches!(e, OAuthError::InvalidClient(_)) {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::BAD_REQUEST
        };
        Self::new(status, e.code(), e.description())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if !self.status.is_server_error() {
            tracing::debug!(status = %self.status, code = self.code, "OAuth error");
        }

        let body = OAuthErrorBody {
            error: self.code.to_string(),
            error_description: self.description,
        };

        let mut response = (
            self.status,
            [
                (CACHE_CONTROL, HeaderValue::from_static("no-store")),
                (PRAGMA, HeaderValue::from_static("no-cache")),
            ],
            Json(body),
        )
            .into_response();

        if let Some(challenge) = self.challenge
            && let Ok(value) = HeaderValue::from_str(&challenge)
        {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_oauth_error_mapping() {
        let response = ApiError::from(OAuthError::InvalidGrant("nope".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
        let body = body_of(response).await;
        assert_eq!(body["error"], "invalid_grant");
        assert_eq!(body["error_description"], "nope");
    }

    #[tokio::test]
    async fn test_invalid_client_is_401() {
        let response = ApiError::from(OAuthError::InvalidClient("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());

        let response = ApiError::from(OAuthError::InvalidClient("x".into()))
            .with_basic_challenge()
            .into_response();
        assert_eq!(response.headers()[WWW_AUTHENTICATE], r#"Basic realm="keygate""#);
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let response =
            ApiError::from(OAuthError::Storage("disk on fire".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["error"], "server_error");
        assert!(!body.to_string().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_bearer_challenges() {
        let response = ApiError::invalid_token().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[WWW_AUTHENTICATE],
            r#"Bearer error="invalid_token""#
        );

        let response = ApiError::insufficient_scope("api:write").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(
            response.headers()[WWW_AUTHENTICATE]
                .to_str()
                .unwrap()
                .contains(r#"scope="api:write""#)
        );
    }

    #[tokio::test]
    async fn test_server_error_from_oauth() {
        let err = ServerError::from(OAuthError::InvalidRequest("bad uri".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_of(response).await;
        assert_eq!(body["code"], "bad_request");

        let err = ServerError::from(OAuthError::Storage("secret detail".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert!(!body.to_string().contains("secret detail"));
    }

    #[tokio::test]
    async fn test_admin_error_statuses() {
        let cases = [
            (ServerError::NotFound("Client x".into()), StatusCode::NOT_FOUND, "not_found"),
            (ServerError::BadRequest("b".into()), StatusCode::BAD_REQUEST, "bad_request"),
            (
                ServerError::Internal("bind".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];
        for (err, status, code) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), status);
            assert_eq!(body_of(response).await["code"], code);
        }
    }
}
