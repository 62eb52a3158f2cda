//! Sample protected resource.

use axum::{Extension, Json};
use keygate_oauth::AccessGrant;

use crate::auth::require_scope;
use crate::error::ApiError;

/// Scope required to read `/api/v1/me`.
pub const ME_SCOPE: &str = "api:read";

/// GET /api/v1/me - The grant behind the presented access token.
pub async fn me_handler(
    Extension(grant): Extension<AccessGrant>,
) -> Result<Json<AccessGrant>, ApiError> {
    require_scope(&grant, ME_SCOPE)?;
    Ok(Json(grant))
}
