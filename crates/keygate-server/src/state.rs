//! Application state shared across handlers.

use std::sync::Arc;

use keygate_oauth::{AuthorizationService, SharedAuthorizationService};

use crate::config::ServerConfig;
use crate::ratelimit::{SharedRateLimiter, create_rate_limiter};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The authorization engine.
    pub service: SharedAuthorizationService,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Global request limiter, sized from `config.api_rpm`.
    pub limiter: SharedRateLimiter,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: AuthorizationService, config: ServerConfig) -> Self {
        Self::from_shared(Arc::new(service), config)
    }

    /// Create application state around an already shared service.
    pub fn from_shared(service: SharedAuthorizationService, config: ServerConfig) -> Self {
        let limiter = create_rate_limiter(config.api_rpm);
        Self {
            service,
            config: Arc::new(config),
            limiter,
        }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
