//! Token endpoint (RFC 6749 §4.1.3 and §6).

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{
        HeaderMap, HeaderValue,
        header::{CACHE_CONTROL, PRAGMA},
    },
    response::{IntoResponse, Response},
};
use keygate_oauth::{OAuthError, TokenPair, TokenRequest};
use serde::{Deserialize, Serialize};

use crate::auth::basic_credentials;
use crate::error::ApiError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// RFC 6749 §5.1 success body.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    /// Space-delimited granted scopes.
    pub scope: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            token_type: pair.token_type.to_string(),
            expires_in: pair.expires_in,
            refresh_token: pair.refresh_token,
            scope: pair.scope.to_string(),
        }
    }
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        (
            [
                (CACHE_CONTROL, HeaderValue::from_static("no-store")),
                (PRAGMA, HeaderValue::from_static("no-cache")),
            ],
            Json(self),
        )
            .into_response()
    }
}

/// Fold HTTP Basic client credentials into the form parameters.
///
/// Using both methods in one request is rejected (RFC 6749 §2.3).
fn merge_basic_credentials(
    request: &mut TokenRequest,
    basic: Option<(String, String)>,
) -> Result<(), OAuthError> {
    let Some((client_id, client_secret)) = basic else {
        return Ok(());
    };

    if request.client_secret.is_some() {
        return Err(OAuthError::InvalidRequest(
            "client credentials given both in the header and the body".to_string(),
        ));
    }
    if request
        .client_id
        .as_deref()
        .is_some_and(|form_id| form_id != client_id)
    {
        return Err(OAuthError::InvalidRequest(
            "client_id does not match the authorization header".to_string(),
        ));
    }

    request.client_id = Some(client_id);
    request.client_secret = Some(client_secret);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /oauth/token - Exchange a code or refresh token for credentials.
pub async fn token_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<TokenResponse, ApiError> {
    let Form(mut request) = form.map_err(|rejection| {
        OAuthError::InvalidRequest(format!("malformed token request: {}", rejection.body_text()))
    })?;

    let basic = basic_credentials(&headers)?;
    let used_basic = basic.is_some();
    merge_basic_credentials(&mut request, basic)?;

    match state.service.token(request).await {
        Ok(pair) => Ok(pair.into()),
        Err(e @ OAuthError::InvalidClient(_)) if used_basic => {
            Err(ApiError::from(e).with_basic_challenge())
        }
        Err(e) => Err(e.into()),
    }
}
