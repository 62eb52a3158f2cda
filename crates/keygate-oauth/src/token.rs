//! Access and refresh token lifecycle.
//!
//! Access tokens are short-lived bearer credentials checked on every
//! resource request. Refresh tokens are long-lived and, with rotation on,
//! single-use: each refresh hands out a new refresh token and removes the
//! old one in the same store operation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};
use crate::random;
use crate::scope::ScopeSet;
use crate::store::{PurgeStats, SharedTokenStore};

/// The only token type this server issues.
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

// ============================================================================
// Records
// ============================================================================

/// A stored access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub user_id: String,
    pub client_id: String,
    pub scopes: ScopeSet,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A stored refresh token.
///
/// `scopes` is the session's last-known grant; refreshed access tokens
/// carry exactly these scopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: String,
    pub client_id: String,
    pub scopes: ScopeSet,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Freshly issued credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub scope: ScopeSet,
}

/// What a valid access token authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessGrant {
    pub user_id: String,
    pub client_id: String,
    pub scopes: ScopeSet,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessGrant {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}

impl From<AccessToken> for AccessGrant {
    fn from(token: AccessToken) -> Self {
        Self {
            user_id: token.user_id,
            client_id: token.client_id,
            scopes: token.scopes,
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        }
    }
}

/// Which kind of token a revocation removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revoked {
    Access,
    Refresh,
    Nothing,
}

/// Token lifetimes and the refresh rotation policy.
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub rotate_refresh_tokens: bool,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::days(30),
            rotate_refresh_tokens: true,
        }
    }
}

// ============================================================================
// TokenManager
// ============================================================================

/// Issues, validates, refreshes and revokes tokens.
#[derive(Debug, Clone)]
pub struct TokenManager {
    store: SharedTokenStore,
    policy: TokenPolicy,
}

impl TokenManager {
    pub fn new(store: SharedTokenStore, policy: TokenPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Issue a new access/refresh pair for a session.
    pub async fn issue(&self, user_id: &str, client_id: &str, scopes: &ScopeSet) -> Result<TokenPair> {
        let now = Utc::now();
        let refresh = RefreshToken {
            token: random::token(),
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            scopes: scopes.clone(),
            issued_at: now,
            expires_at: now + self.policy.refresh_ttl,
        };
        let refresh_token = refresh.token.clone();
        self.store.insert_refresh(refresh).await?;

        self.issue_access(user_id, client_id, scopes, refresh_token, now)
            .await
    }

    async fn issue_access(
        &self,
        user_id: &str,
        client_id: &str,
        scopes: &ScopeSet,
        refresh_token: String,
        now: DateTime<Utc>,
    ) -> Result<TokenPair> {
        let access = AccessToken {
            token: random::token(),
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            scopes: scopes.clone(),
            issued_at: now,
            expires_at: now + self.policy.access_ttl,
        };
        let access_token = access.token.clone();
        self.store.insert_access(access).await?;

        tracing::debug!(client_id, user_id, scopes = %scopes, "Tokens issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE_BEARER,
            expires_in: self.policy.access_ttl.num_seconds(),
            scope: scopes.clone(),
        })
    }

    /// Resolve an access token. Unknown and expired tokens both yield `None`.
    pub async fn validate_access(&self, token: &str) -> Result<Option<AccessGrant>> {
        match self.store.get_access(token).await? {
            Some(access) if !access.is_expired(Utc::now()) => Ok(Some(access.into())),
            Some(_) => {
                tracing::debug!("Expired access token presented");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Whether `token` is valid and carries `scope`.
    pub async fn has_scope(&self, token: &str, scope: &str) -> Result<bool> {
        Ok(self
            .validate_access(token)
            .await?
            .is_some_and(|grant| grant.has_scope(scope)))
    }

    /// Look up a live refresh token without consuming it.
    pub async fn refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        Ok(self
            .store
            .get_refresh(token)
            .await?
            .filter(|refresh| !refresh.is_expired(Utc::now())))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// When `client_id` is given the token must belong to that client. With
    /// rotation on, the old refresh token is removed atomically and a new
    /// one with a full lifetime takes its place.
    pub async fn refresh(&self, token: &str, client_id: Option<&str>) -> Result<TokenPair> {
        let now = Utc::now();

        let Some(current) = self.store.get_refresh(token).await? else {
            tracing::debug!("Unknown refresh token presented");
            return Err(OAuthError::invalid_refresh_token());
        };
        if current.is_expired(now) {
            tracing::debug!(client_id = %current.client_id, "Expired refresh token presented");
            return Err(OAuthError::invalid_refresh_token());
        }
        if client_id.is_some_and(|presented| presented != current.client_id) {
            tracing::debug!(
                client_id,
                owner = %current.client_id,
                "Refresh token presented by another client"
            );
            return Err(OAuthError::invalid_refresh_token());
        }

        let refresh_token = if self.policy.rotate_refresh_tokens {
            // Whoever removes the old token wins; everyone else lost a race.
            if self.store.take_refresh(token).await?.is_none() {
                tracing::debug!(client_id = %current.client_id, "Refresh token already rotated");
                return Err(OAuthError::invalid_refresh_token());
            }
            let rotated = RefreshToken {
                token: random::token(),
                issued_at: now,
                expires_at: now + self.policy.refresh_ttl,
                ..current.clone()
            };
            let value = rotated.token.clone();
            self.store.insert_refresh(rotated).await?;
            value
        } else {
            current.token.clone()
        };

        tracing::debug!(
            client_id = %current.client_id,
            rotated = self.policy.rotate_refresh_tokens,
            "Session refreshed"
        );

        self.issue_access(&current.user_id, &current.client_id, &current.scopes, refresh_token, now)
            .await
    }

    /// Remove an access token. Idempotent.
    pub async fn revoke_access(&self, token: &str) -> Result<bool> {
        self.store.remove_access(token).await
    }

    /// Remove a refresh token. Already issued access tokens stay valid.
    pub async fn revoke_refresh(&self, token: &str) -> Result<bool> {
        self.store.remove_refresh(token).await
    }

    /// Remove a token of either kind (RFC 7009). Idempotent.
    pub async fn revoke(&self, token: &str) -> Result<Revoked> {
        if self.revoke_access(token).await? {
            return Ok(Revoked::Access);
        }
        if self.revoke_refresh(token).await? {
            return Ok(Revoked::Refresh);
        }
        Ok(Revoked::Nothing)
    }

    /// Drop expired tokens.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeStats> {
        self.store.purge(now).await
    }
}
