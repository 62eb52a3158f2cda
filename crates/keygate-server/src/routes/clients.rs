//! Client administration endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use keygate_oauth::{Client, RegisteredClient, ScopeSet};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a client.
#[derive(Debug, Deserialize)]
pub struct RegisterClientRequest {
    pub name: String,
    pub redirect_uris: Vec<String>,
    /// Space-delimited scopes; unknown names are dropped.
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Serialize)]
pub struct ListClientsResponse {
    pub clients: Vec<Client>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    pub client_id: String,
    pub active: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /admin/clients - Register a client. The secret is only shown here.
pub async fn register_client_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterClientRequest>,
) -> Result<(StatusCode, Json<RegisteredClient>), ServerError> {
    let registered = state
        .service
        .register_client(
            &request.name,
            request.redirect_uris,
            &ScopeSet::parse(&request.scope),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(registered)))
}

/// GET /admin/clients - List all clients, oldest first.
pub async fn list_clients_handler(
    State(state): State<AppState>,
) -> Result<Json<ListClientsResponse>, ServerError> {
    let clients = state.service.list_clients().await?;
    let total = clients.len();
    Ok(Json(ListClientsResponse { clients, total }))
}

/// GET /admin/clients/{id} - Show one client.
pub async fn get_client_handler(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Client>, ServerError> {
    state
        .service
        .client(&client_id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("Client {}", client_id)))
}

/// POST /admin/clients/{id}/deactivate - Deactivate a client. Idempotent.
pub async fn deactivate_client_handler(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<DeactivateResponse>, ServerError> {
    if !state.service.deactivate_client(&client_id).await? {
        return Err(ServerError::NotFound(format!("Client {}", client_id)));
    }

    Ok(Json(DeactivateResponse {
        client_id,
        active: false,
    }))
}
