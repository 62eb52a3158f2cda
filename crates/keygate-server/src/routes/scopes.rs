//! Scope catalog endpoint.

use axum::Json;
use keygate_oauth::{ScopeDefinition, scope};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ScopesResponse {
    pub scopes: &'static [ScopeDefinition],
}

/// GET /oauth/scopes - Every scope this server can grant.
pub async fn list_scopes_handler() -> Json<ScopesResponse> {
    Json(ScopesResponse {
        scopes: scope::all(),
    })
}
