//! HTTP transport for the Keygate authorization engine.
//!
//! Exposes the engine's flows over the standard OAuth 2.0 endpoints, plus a
//! small admin API for client registration and one sample protected
//! resource.
//!
//! # Features
//!
//! - Authorization code grant with refresh (RFC 6749)
//! - Revocation (RFC 7009) and introspection (RFC 7662)
//! - Server metadata discovery (RFC 8414)
//! - Bearer-token admin API
//! - Rate limiting
//! - Request logging
//!
//! # Example
//!
//! ```ignore
//! use keygate_oauth::{AuthorizationService, OAuthConfig};
//! use keygate_server::{Server, ServerConfig};
//!
//! let service = AuthorizationService::in_memory(OAuthConfig::default())?;
//! let config = ServerConfig::new(Some("admin-token".to_string()))
//!     .with_bind_address("127.0.0.1:8080".parse()?);
//!
//! Server::new(service, config).run().await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod ratelimit;
pub mod routes;
pub mod state;

pub use auth::{AuthError, admin_middleware, bearer_middleware, require_scope};
pub use config::ServerConfig;
pub use error::{ApiError, Result, ServerError};
pub use ratelimit::{rate_limit_middleware, request_logging_middleware};
pub use routes::{HealthResponse, TokenResponse};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use keygate_oauth::AuthorizationService;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Keygate HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server around an authorization service.
    pub fn new(service: AuthorizationService, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(service, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .merge(self.oauth_routes())
            .merge(self.admin_routes())
            .nest("/api/v1", self.api_routes())
            // Request logging (inner layer, runs first)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                ratelimit::request_logging_middleware,
            ))
            // Rate limiting (outer layer, runs before request logging)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                ratelimit::rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Public protocol endpoints.
    fn oauth_routes(&self) -> Router<AppState> {
        Router::new()
            .route(
                "/.well-known/oauth-authorization-server",
                get(routes::metadata_handler),
            )
            .route("/oauth/authorize", get(routes::authorize_handler))
            .route("/oauth/token", post(routes::token_handler))
            .route("/oauth/revoke", post(routes::revoke_handler))
            .route("/oauth/scopes", get(routes::list_scopes_handler))
    }

    /// Operator endpoints, guarded by the admin token.
    fn admin_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/oauth/introspect", post(routes::introspect_handler))
            .route(
                "/admin/clients",
                post(routes::register_client_handler).get(routes::list_clients_handler),
            )
            .route("/admin/clients/{id}", get(routes::get_client_handler))
            .route(
                "/admin/clients/{id}/deactivate",
                post(routes::deactivate_client_handler),
            )
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth::admin_middleware,
            ))
    }

    /// Resource routes (v1), guarded by OAuth access tokens.
    fn api_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/me", get(routes::me_handler))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth::bearer_middleware,
            ))
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        self.run_with_shutdown(addr, std::future::pending()).await
    }

    /// Run until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_with_shutdown(
        self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        info!(addr = %local_addr, issuer = %self.state.config.issuer(), "Starting server");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    /// Application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use keygate_oauth::OAuthConfig;
    use tower::ServiceExt;

    fn create_test_server(admin_token: Option<&str>) -> Server {
        let service = AuthorizationService::in_memory(OAuthConfig::default())
            .expect("failed to create test service");
        let config = ServerConfig::new(admin_token.map(str::to_string)).with_rate_limiting(false);
        Server::new(service, config)
    }

    async fn get(app: Router, uri: &str, auth: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_server_health_endpoint() {
        let app = create_test_server(Some("test-token")).router();
        let response = get(app, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_discovery_document() {
        let service = AuthorizationService::in_memory(OAuthConfig::default()).unwrap();
        let config = ServerConfig::default().with_issuer("https://auth.example.com");
        let app = Server::new(service, config).router();

        let response = get(app, "/.well-known/oauth-authorization-server", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let doc = json_body(response).await;
        assert_eq!(doc["issuer"], "https://auth.example.com");
        assert_eq!(doc["token_endpoint"], "https://auth.example.com/oauth/token");
        assert_eq!(doc["response_types_supported"][0], "code");
        let scopes = doc["scopes_supported"].as_array().unwrap();
        assert!(scopes.iter().any(|s| s == "api:read"));
    }

    #[tokio::test]
    async fn test_scope_catalog_endpoint() {
        let app = create_test_server(None).router();
        let response = get(app, "/oauth/scopes", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let scopes = body["scopes"].as_array().unwrap();
        assert_eq!(scopes.len(), keygate_oauth::scope::all().len());
        assert!(scopes[0]["description"].is_string());
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let app = create_test_server(Some("test-token")).router();

        let response = get(app.clone(), "/admin/clients", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = get(app, "/admin/clients", Some("Bearer test-token")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_admin_routes_closed_without_token() {
        let app = create_test_server(None).router();
        let response = get(app, "/admin/clients", Some("Bearer anything")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_api_requires_access_token() {
        let app = create_test_server(Some("test-token")).router();

        // The admin token is not an access token.
        let response = get(app, "/api/v1/me", Some("Bearer test-token")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("www-authenticate"));
    }

    #[tokio::test]
    async fn test_me_checks_scope() {
        let server = create_test_server(None);
        let tokens = server.state().service.tokens().clone();
        let app = server.router();

        let reader = tokens
            .issue("alice", "client-1", &keygate_oauth::ScopeSet::parse("api:read"))
            .await
            .unwrap();
        let response = get(
            app.clone(),
            "/api/v1/me",
            Some(&format!("Bearer {}", reader.access_token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["user_id"], "alice");

        let writer = tokens
            .issue("alice", "client-1", &keygate_oauth::ScopeSet::parse("api:write"))
            .await
            .unwrap();
        let response = get(
            app,
            "/api/v1/me",
            Some(&format!("Bearer {}", writer.access_token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_run_with_shutdown_stops() {
        let server = create_test_server(None);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.run_with_shutdown("127.0.0.1:0".parse().unwrap(), async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
