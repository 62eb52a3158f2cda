//! Engine configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::token::TokenPolicy;

/// Lifetimes and policy switches for [`AuthorizationService`](crate::AuthorizationService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime, in seconds.
    pub code_ttl_secs: u64,
    /// Access token lifetime, in seconds.
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime, in seconds.
    pub refresh_token_ttl_secs: u64,
    /// Issue a new refresh token on every refresh and invalidate the old one.
    pub rotate_refresh_tokens: bool,
    /// Reject authorize requests whose granted scope set is empty.
    pub require_scope: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: 600,
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 30 * 24 * 3600,
            rotate_refresh_tokens: true,
            require_scope: true,
        }
    }
}

impl OAuthConfig {
    pub fn with_code_ttl(mut self, secs: u64) -> Self {
        self.code_ttl_secs = secs;
        self
    }

    pub fn with_access_token_ttl(mut self, secs: u64) -> Self {
        self.access_token_ttl_secs = secs;
        self
    }

    pub fn with_refresh_token_ttl(mut self, secs: u64) -> Self {
        self.refresh_token_ttl_secs = secs;
        self
    }

    pub fn with_rotation(mut self, rotate: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self
    }

    pub fn with_require_scope(mut self, require: bool) -> Self {
        self.require_scope = require;
        self
    }

    pub fn code_ttl(&self) -> Duration {
        seconds(self.code_ttl_secs)
    }

    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            access_ttl: seconds(self.access_token_ttl_secs),
            refresh_ttl: seconds(self.refresh_token_ttl_secs),
            rotate_refresh_tokens: self.rotate_refresh_tokens,
        }
    }
}

/// Longest lifetime any credential may have (100 years). Keeps
/// `issued_at + ttl` inside chrono's representable range.
const MAX_TTL_SECS: i64 = 100 * 365 * 24 * 3600;

fn seconds(secs: u64) -> Duration {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(MAX_TTL_SECS);
    Duration::seconds(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OAuthConfig::default();
        assert_eq!(config.code_ttl(), Duration::minutes(10));

        let policy = config.token_policy();
        assert_eq!(policy.access_ttl, Duration::hours(1));
        assert_eq!(policy.refresh_ttl, Duration::days(30));
        assert!(policy.rotate_refresh_tokens);
        assert!(config.require_scope);
    }

    #[test]
    fn test_builders() {
        let config = OAuthConfig::default()
            .with_code_ttl(30)
            .with_access_token_ttl(60)
            .with_refresh_token_ttl(120)
            .with_rotation(false)
            .with_require_scope(false);

        assert_eq!(config.code_ttl(), Duration::seconds(30));
        assert_eq!(config.token_policy().access_ttl, Duration::seconds(60));
        assert_eq!(config.token_policy().refresh_ttl, Duration::seconds(120));
        assert!(!config.rotate_refresh_tokens);
        assert!(!config.require_scope);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let config = OAuthConfig::default().with_access_token_ttl(u64::MAX);
        assert_eq!(config.token_policy().access_ttl, Duration::days(365 * 100));
    }
}
