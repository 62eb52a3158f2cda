//! HTTP routes.

pub mod authorize;
pub mod clients;
pub mod discovery;
pub mod health;
pub mod me;
pub mod revoke;
pub mod scopes;
pub mod token;

pub use authorize::{AuthorizeParams, authorize_handler};
pub use clients::{
    DeactivateResponse, ListClientsResponse, RegisterClientRequest, deactivate_client_handler,
    get_client_handler, list_clients_handler, register_client_handler,
};
pub use discovery::{ServerMetadata, metadata_handler};
pub use health::{HealthResponse, health_routes};
pub use me::me_handler;
pub use revoke::{TokenParams, introspect_handler, revoke_handler};
pub use scopes::{ScopesResponse, list_scopes_handler};
pub use token::{TokenResponse, token_handler};
