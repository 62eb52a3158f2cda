//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]                 # listener, rate limiting, trusted user header
//! [oauth]                  # credential lifetimes and policy switches
//! ```

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Compiled-in defaults.
pub mod defaults {
    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_BIND: &str = "127.0.0.1";
    pub const REQUESTS_PER_MINUTE: u32 = 120;
    pub const USER_HEADER: &str = "x-authenticated-user";

    pub const CODE_TTL_SECS: u64 = 600;
    pub const ACCESS_TOKEN_TTL_SECS: u64 = 3600;
    pub const REFRESH_TOKEN_TTL_SECS: u64 = 30 * 24 * 3600;
    pub const REAPER_INTERVAL_SECS: u64 = 60;
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeygateConfig {
    /// HTTP server configuration.
    pub server: Option<ServerConfig>,

    /// Authorization engine configuration.
    pub oauth: Option<OAuthSection>,
}

impl KeygateConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: KeygateConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }

        if other.oauth.is_some() {
            self.oauth = other.oauth;
        }
    }

    /// The `[server]` section, or defaults if absent.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// The `[oauth]` section, or defaults if absent.
    pub fn oauth(&self) -> OAuthSection {
        self.oauth.clone().unwrap_or_default()
    }

    /// Reject values that would leave the server unusable.
    pub fn validate(&self) -> Result<()> {
        let server = self.server();
        if server.rate_limiting && server.api_rpm == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.api_rpm".to_string(),
                reason: "must be greater than zero when rate limiting is enabled".to_string(),
            });
        }
        if !is_header_name(&server.user_header) {
            return Err(ConfigError::InvalidValue {
                field: "server.user_header".to_string(),
                reason: format!("'{}' is not a valid HTTP header name", server.user_header),
            });
        }

        let oauth = self.oauth();
        for (field, value) in [
            ("oauth.code_ttl_secs", oauth.code_ttl_secs),
            ("oauth.access_token_ttl_secs", oauth.access_token_ttl_secs),
            ("oauth.refresh_token_ttl_secs", oauth.refresh_token_ttl_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// RFC 7230 `token` characters.
fn is_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Address to bind to.
    pub bind: String,
    /// Enable rate limiting.
    pub rate_limiting: bool,
    /// API rate limit: requests per minute.
    pub api_rpm: u32,
    /// Enable request logging.
    pub request_logging: bool,
    /// Header carrying the user id set by the upstream login gateway.
    pub user_header: String,
    /// Public base URL advertised in the discovery document.
    pub issuer: Option<String>,
    /// Never honored. Parsed only so that it can be flagged.
    #[serde(skip_serializing)]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: defaults::DEFAULT_PORT,
            bind: defaults::DEFAULT_BIND.to_string(),
            rate_limiting: true,
            api_rpm: defaults::REQUESTS_PER_MINUTE,
            request_logging: true,
            user_header: defaults::USER_HEADER.to_string(),
            issuer: None,
            admin_token: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OAuth Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Authorization engine configuration (`[oauth]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSection {
    /// Authorization code lifetime.
    pub code_ttl_secs: u64,
    /// Access token lifetime.
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime.
    pub refresh_token_ttl_secs: u64,
    /// Replace the refresh token on every refresh.
    pub rotate_refresh_tokens: bool,
    /// Reject authorize requests that would grant no scopes.
    pub require_scope: bool,
    /// Seconds between expired-credential sweeps; 0 disables the sweep.
    pub reaper_interval_secs: u64,
}

impl Default for OAuthSection {
    fn default() -> Self {
        Self {
            code_ttl_secs: defaults::CODE_TTL_SECS,
            access_token_ttl_secs: defaults::ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: defaults::REFRESH_TOKEN_TTL_SECS,
            rotate_refresh_tokens: true,
            require_scope: true,
            reaper_interval_secs: defaults::REAPER_INTERVAL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = KeygateConfig::new();
        assert!(config.server.is_none());
        assert!(config.oauth.is_none());
        assert_eq!(config.server().port, 8080);
        assert_eq!(config.oauth().refresh_token_ttl_secs, 2_592_000);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml = r#"
[server]
port = 9090

[oauth]
rotate_refresh_tokens = false
"#;
        let config = KeygateConfig::from_toml(toml).unwrap();
        let server = config.server.as_ref().unwrap();
        assert_eq!(server.port, 9090);
        assert_eq!(server.bind, "127.0.0.1");
        assert_eq!(server.user_header, "x-authenticated-user");

        let oauth = config.oauth.as_ref().unwrap();
        assert!(!oauth.rotate_refresh_tokens);
        assert_eq!(oauth.code_ttl_secs, 600);
        assert_eq!(oauth.reaper_interval_secs, 60);
    }

    #[test]
    fn test_merge_replaces_sections() {
        let mut base = KeygateConfig::from_toml("[server]\nport = 1000\n[oauth]\ncode_ttl_secs = 30\n").unwrap();
        let overlay = KeygateConfig::from_toml("[server]\nport = 2000\n").unwrap();
        base.merge(overlay);

        assert_eq!(base.server().port, 2000);
        // Sections absent from the overlay are kept.
        assert_eq!(base.oauth().code_ttl_secs, 30);
    }

    #[test]
    fn test_roundtrip_omits_admin_token() {
        let mut config = KeygateConfig::from_toml("[server]\nadmin_token = \"hunter2\"\n").unwrap();
        assert_eq!(
            config.server.as_ref().unwrap().admin_token.as_deref(),
            Some("hunter2")
        );

        let rendered = config.to_toml().unwrap();
        assert!(!rendered.contains("hunter2"));

        config.server.as_mut().unwrap().admin_token = None;
        assert_eq!(KeygateConfig::from_toml(&rendered).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = KeygateConfig::from_toml("[oauth]\naccess_token_ttl_secs = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("oauth.access_token_ttl_secs"));
    }

    #[test]
    fn test_validate_rejects_bad_header_and_rpm() {
        let config = KeygateConfig::from_toml("[server]\nuser_header = \"X User\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let config = KeygateConfig::from_toml("[server]\napi_rpm = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config =
            KeygateConfig::from_toml("[server]\napi_rpm = 0\nrate_limiting = false\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        // Unknown keys are ignored so older binaries accept newer files.
        let config = KeygateConfig::from_toml("[server]\nfuture_knob = true\n").unwrap();
        assert_eq!(config.server().port, 8080);
    }
}
