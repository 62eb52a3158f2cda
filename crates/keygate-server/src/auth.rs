//! Request authentication.
//!
//! Three kinds of caller reach this server:
//! - operators, with the admin bearer token, on `/admin` and `/oauth/introspect`
//! - resource clients, with an issued access token, on `/api`
//! - end users, identified by a header the upstream login gateway sets
//!
//! Client credentials on the token endpoint are handled by the engine; this
//! module only extracts them from an HTTP Basic header.
//!
//! # Security
//!
//! Token comparison uses constant-time comparison to prevent timing attacks.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use keygate_oauth::AccessGrant;
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Admin Auth Error
// ─────────────────────────────────────────────────────────────────────────────

/// Admin authentication error.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Missing authorization header.
    MissingToken,
    /// Invalid token format.
    InvalidFormat,
    /// Token validation failed.
    InvalidToken,
    /// No admin token is configured.
    AdminDisabled,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authorization token"),
            AuthError::InvalidFormat => write!(f, "Invalid authorization format"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::AdminDisabled => write!(f, "Admin API is disabled"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingToken | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidFormat => StatusCode::BAD_REQUEST,
            AuthError::AdminDisabled => StatusCode::FORBIDDEN,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Security Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Compare two strings in constant time.
///
/// On a length mismatch a dummy comparison still runs before returning false.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() == b_bytes.len() {
        a_bytes.ct_eq(b_bytes).into()
    } else {
        let _ = a_bytes.ct_eq(a_bytes);
        false
    }
}

/// The token of an `Authorization: Bearer ...` header, if there is one.
///
/// The scheme name is matched case-insensitively (RFC 7235 §2.1).
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Client credentials from an `Authorization: Basic ...` header.
///
/// Returns `Ok(None)` when no Basic header is present and an error when one
/// is present but malformed.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let Ok(value) = value.to_str() else {
        return Ok(None);
    };
    let Some((scheme, encoded)) = value.split_once(' ') else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("basic") {
        return Ok(None);
    }

    let malformed = || {
        ApiError::from(keygate_oauth::OAuthError::InvalidClient(
            "malformed basic credentials".to_string(),
        ))
        .with_basic_challenge()
    };

    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (id, secret) = decoded.split_once(':').ok_or_else(malformed)?;

    Ok(Some((id.to_string(), secret.to_string())))
}

/// The end user id set by the upstream login gateway.
pub fn authenticated_user<'a>(headers: &'a HeaderMap, header_name: &str) -> Option<&'a str> {
    headers
        .get(header_name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|user| !user.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Admin authentication middleware.
///
/// Without a configured admin token the admin surface is closed, not open.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(expected) = state.config().admin_token.as_deref() else {
        return Err(AuthError::AdminDisabled);
    };

    if request.headers().get(AUTHORIZATION).is_none() {
        return Err(AuthError::MissingToken);
    }
    let token = bearer_token(request.headers()).ok_or(AuthError::InvalidFormat)?;

    if !constant_time_eq(token, expected) {
        tracing::warn!(path = %request.uri().path(), "Rejected admin token");
        return Err(AuthError::InvalidToken);
    }

    Ok(next.run(request).await)
}

/// Access token middleware for resource endpoints.
///
/// Injects the resolved [`AccessGrant`] into request extensions.
pub async fn bearer_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(ApiError::invalid_token)?;

    let grant = state
        .service
        .validate_access(token)
        .await?
        .ok_or_else(ApiError::invalid_token)?;

    request.extensions_mut().insert(grant);

    Ok(next.run(request).await)
}

/// Fail with `insufficient_scope` unless the grant carries `scope`.
pub fn require_scope(grant: &AccessGrant, scope: &str) -> Result<(), ApiError> {
    if grant.has_scope(scope) {
        Ok(())
    } else {
        Err(ApiError::insufficient_scope(scope))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
