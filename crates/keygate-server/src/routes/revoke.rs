//! Revocation (RFC 7009) and introspection (RFC 7662) endpoints.

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
};
use keygate_oauth::{Introspection, OAuthError};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TokenParams {
    pub token: Option<String>,
    /// Accepted and ignored; the server finds the token either way.
    pub token_type_hint: Option<String>,
}

fn token_param(form: Result<Form<TokenParams>, FormRejection>) -> Result<String, ApiError> {
    let Form(params) = form.map_err(|rejection| {
        OAuthError::InvalidRequest(format!("malformed request: {}", rejection.body_text()))
    })?;

    match params.token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(OAuthError::InvalidRequest("token is required".to_string()).into()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /oauth/revoke - Revoke an access or refresh token.
///
/// Unknown tokens still get a 200 so callers cannot probe for live tokens.
pub async fn revoke_handler(
    State(state): State<AppState>,
    form: Result<Form<TokenParams>, FormRejection>,
) -> Result<StatusCode, ApiError> {
    let token = token_param(form)?;
    state.service.revoke(&token).await?;
    Ok(StatusCode::OK)
}

/// POST /oauth/introspect - Describe an access token (admin only).
pub async fn introspect_handler(
    State(state): State<AppState>,
    form: Result<Form<TokenParams>, FormRejection>,
) -> Result<Json<Introspection>, ApiError> {
    let token = token_param(form)?;
    Ok(Json(state.service.introspect(&token).await?))
}
