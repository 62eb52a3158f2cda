//! Server configuration.

use std::net::SocketAddr;

/// Default header carrying the authenticated user id.
pub const DEFAULT_USER_HEADER: &str = "x-authenticated-user";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Token guarding the admin and introspection endpoints. `None`
    /// disables those endpoints entirely.
    pub admin_token: Option<String>,

    /// Header set by the upstream login gateway with the end user's id.
    pub user_header: String,

    /// Public base URL used in the discovery document. Defaults to
    /// `http://{bind_address}`.
    pub issuer: Option<String>,

    /// Enable rate limiting.
    pub rate_limiting: bool,

    /// Rate limit: requests per minute across all endpoints.
    pub api_rpm: u32,

    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            admin_token: None,
            user_header: DEFAULT_USER_HEADER.to_string(),
            issuer: None,
            rate_limiting: true,
            api_rpm: 120,
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a new server config with an optional admin token.
    pub fn new(admin_token: Option<String>) -> Self {
        Self {
            admin_token,
            ..Default::default()
        }
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the trusted user header name.
    pub fn with_user_header(mut self, header: impl Into<String>) -> Self {
        self.user_header = header.into();
        self
    }

    /// Set the public issuer URL.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Enable or disable rate limiting.
    pub fn with_rate_limiting(mut self, enabled: bool) -> Self {
        self.rate_limiting = enabled;
        self
    }

    /// Set the rate limit (requests per minute).
    pub fn with_api_rpm(mut self, rpm: u32) -> Self {
        self.api_rpm = rpm;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// The issuer URL, without a trailing slash.
    pub fn issuer(&self) -> String {
        match &self.issuer {
            Some(issuer) => issuer.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.bind_address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert!(config.admin_token.is_none());
        assert_eq!(config.user_header, "x-authenticated-user");
        assert_eq!(config.issuer(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::new(Some("admin".to_string()))
            .with_bind_address("0.0.0.0:9000".parse().unwrap())
            .with_user_header("X-Forwarded-User")
            .with_issuer("https://auth.example.com/")
            .with_rate_limiting(false)
            .with_api_rpm(10)
            .with_request_logging(false);

        assert_eq!(config.admin_token.as_deref(), Some("admin"));
        assert_eq!(config.bind_address.port(), 9000);
        assert_eq!(config.user_header, "X-Forwarded-User");
        assert_eq!(config.issuer(), "https://auth.example.com");
        assert!(!config.rate_limiting);
        assert_eq!(config.api_rpm, 10);
        assert!(!config.request_logging);
    }
}
