//! Authorization server metadata (RFC 8414).

use axum::{Json, extract::State};
use keygate_oauth::{
    scope,
    service::{GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN},
};
use serde::Serialize;

use crate::state::AppState;

/// RFC 8414 §2 metadata document.
#[derive(Debug, Serialize)]
pub struct ServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub revocation_endpoint: String,
    pub introspection_endpoint: String,
    pub scopes_supported: Vec<&'static str>,
    pub response_types_supported: Vec<&'static str>,
    pub grant_types_supported: Vec<&'static str>,
    pub token_endpoint_auth_methods_supported: Vec<&'static str>,
    pub revocation_endpoint_auth_methods_supported: Vec<&'static str>,
}

/// GET /.well-known/oauth-authorization-server
pub async fn metadata_handler(State(state): State<AppState>) -> Json<ServerMetadata> {
    let issuer = state.config().issuer();
    let endpoint = |path: &str| format!("{}{}", issuer, path);

    Json(ServerMetadata {
        authorization_endpoint: endpoint("/oauth/authorize"),
        token_endpoint: endpoint("/oauth/token"),
        revocation_endpoint: endpoint("/oauth/revoke"),
        introspection_endpoint: endpoint("/oauth/introspect"),
        scopes_supported: scope::all().iter().map(|def| def.name).collect(),
        response_types_supported: vec!["code"],
        grant_types_supported: vec![GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN],
        token_endpoint_auth_methods_supported: vec!["client_secret_basic", "client_secret_post"],
        revocation_endpoint_auth_methods_supported: vec!["none"],
        issuer,
    })
}
