//! Error types for the authorization engine.
//!
//! Variants mirror the RFC 6749 §5.2 error codes so the transport layer can
//! render them without re-classifying.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while authorizing clients or issuing tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuthError {
    /// Unknown client, inactive client, or bad client secret.
    #[error("Invalid client: {0}")]
    InvalidClient(String),

    /// Malformed input or redirect URI mismatch.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Code or refresh token unknown, expired, consumed, or bound elsewhere.
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// None of the requested scopes could be granted.
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// The token endpoint does not support this grant type.
    #[error("Unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    /// The authorize endpoint does not support this response type.
    #[error("Unsupported response type: {0}")]
    UnsupportedResponseType(String),

    /// Backing store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The secure random source is unavailable.
    #[error("Randomness unavailable: {0}")]
    Randomness(String),
}

impl OAuthError {
    /// The RFC 6749 `error` code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidClient(_) => "invalid_client",
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::InvalidScope(_) => "invalid_scope",
            OAuthError::UnsupportedGrantType(_) => "unsupported_grant_type",
            OAuthError::UnsupportedResponseType(_) => "unsupported_response_type",
            OAuthError::Storage(_) | OAuthError::Randomness(_) => "server_error",
        }
    }

    /// Human-readable description, suitable for `error_description`.
    pub fn description(&self) -> &str {
        match self {
            OAuthError::InvalidClient(msg)
            | OAuthError::InvalidRequest(msg)
            | OAuthError::InvalidGrant(msg)
            | OAuthError::InvalidScope(msg)
            | OAuthError::UnsupportedGrantType(msg)
            | OAuthError::UnsupportedResponseType(msg) => msg,
            // Internal details stay in the logs.
            OAuthError::Storage(_) | OAuthError::Randomness(_) => "internal server error",
        }
    }

    /// Whether the failure is the server's fault rather than the caller's.
    pub fn is_server_error(&self) -> bool {
        matches!(self, OAuthError::Storage(_) | OAuthError::Randomness(_))
    }

    pub(crate) fn client_authentication_failed() -> Self {
        OAuthError::InvalidClient("client authentication failed".to_string())
    }

    /// Same answer for unknown and deactivated clients.
    pub(crate) fn unavailable_client() -> Self {
        OAuthError::InvalidClient("client is unknown or inactive".to_string())
    }

    pub(crate) fn invalid_code() -> Self {
        OAuthError::InvalidGrant("authorization code is invalid".to_string())
    }

    pub(crate) fn invalid_refresh_token() -> Self {
        OAuthError::InvalidGrant("refresh token is invalid".to_string())
    }
}
