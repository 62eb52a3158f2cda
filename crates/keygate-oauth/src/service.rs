//! The authorization service: the two public flows plus resource checks.
//!
//! `authorize` turns an authenticated user's consent into a code, and
//! `token` turns a code or refresh token into credentials. The service holds
//! no state of its own beyond the stores it is constructed with.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::client::{Client, ClientRegistry, RegisteredClient};
use crate::code::AuthorizationCodeManager;
use crate::config::OAuthConfig;
use crate::error::{OAuthError, Result};
use crate::memory::{InMemoryClientStore, InMemoryCodeStore, InMemoryTokenStore};
use crate::random;
use crate::scope::ScopeSet;
use crate::store::{PurgeStats, SharedClientStore, SharedCodeStore, SharedTokenStore};
use crate::token::{AccessGrant, Revoked, TOKEN_TYPE_BEARER, TokenManager, TokenPair};

pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

// ============================================================================
// Stores
// ============================================================================

/// The backing stores a service is built over.
#[derive(Debug, Clone)]
pub struct Stores {
    pub clients: SharedClientStore,
    pub codes: SharedCodeStore,
    pub tokens: SharedTokenStore,
}

impl Stores {
    /// Fresh, empty in-process stores.
    pub fn in_memory() -> Self {
        Self {
            clients: Arc::new(InMemoryClientStore::new()),
            codes: Arc::new(InMemoryCodeStore::new()),
            tokens: Arc::new(InMemoryTokenStore::new()),
        }
    }
}

// ============================================================================
// Requests and responses
// ============================================================================

/// An authorize call on behalf of an already-authenticated user.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scope: ScopeSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeResponse {
    pub code: String,
    /// Scopes actually granted; may be narrower than requested.
    pub scope: ScopeSet,
}

/// Token endpoint parameters (RFC 6749 §4.1.3 and §6).
///
/// Every field is optional so that missing parameters surface as
/// `invalid_request` instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl TokenRequest {
    pub fn authorization_code(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        code: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            grant_type: Some(GRANT_AUTHORIZATION_CODE.to_string()),
            code: Some(code.into()),
            redirect_uri: Some(redirect_uri.into()),
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            ..Self::default()
        }
    }

    pub fn refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            grant_type: Some(GRANT_REFRESH_TOKEN.to_string()),
            refresh_token: Some(refresh_token.into()),
            ..Self::default()
        }
    }

    /// Attach client credentials.
    pub fn with_client(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(OAuthError::InvalidRequest(format!("{} is required", name))),
    }
}

/// RFC 7662 introspection response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Introspection {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Introspection {
    /// The only response given for unknown, expired or revoked tokens.
    pub fn inactive() -> Self {
        Self::default()
    }
}

impl From<AccessGrant> for Introspection {
    fn from(grant: AccessGrant) -> Self {
        Self {
            active: true,
            scope: Some(grant.scopes.to_string()),
            client_id: Some(grant.client_id),
            sub: Some(grant.user_id),
            token_type: Some(TOKEN_TYPE_BEARER.to_string()),
            exp: Some(grant.expires_at.timestamp()),
            iat: Some(grant.issued_at.timestamp()),
        }
    }
}

// ============================================================================
// AuthorizationService
// ============================================================================

/// Composes the registry and the code and token managers.
#[derive(Debug, Clone)]
pub struct AuthorizationService {
    config: OAuthConfig,
    clients: ClientRegistry,
    codes: AuthorizationCodeManager,
    tokens: TokenManager,
}

/// Shared service handle.
pub type SharedAuthorizationService = Arc<AuthorizationService>;

impl AuthorizationService {
    /// Build a service over the given stores.
    ///
    /// Fails with [`OAuthError::Randomness`] if the OS random source is
    /// unusable; callers should treat that as fatal.
    pub fn new(config: OAuthConfig, stores: Stores) -> Result<Self> {
        random::self_test()?;

        let clients = ClientRegistry::new(stores.clients);
        let codes = AuthorizationCodeManager::new(clients.clone(), stores.codes, config.code_ttl());
        let tokens = TokenManager::new(stores.tokens, config.token_policy());

        tracing::debug!(
            code_ttl_secs = config.code_ttl_secs,
            access_token_ttl_secs = config.access_token_ttl_secs,
            refresh_token_ttl_secs = config.refresh_token_ttl_secs,
            rotate_refresh_tokens = config.rotate_refresh_tokens,
            "Authorization service initialized"
        );

        Ok(Self {
            config,
            clients,
            codes,
            tokens,
        })
    }

    /// Build a service over fresh in-process stores.
    pub fn in_memory(config: OAuthConfig) -> Result<Self> {
        Self::new(config, Stores::in_memory())
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    // ------------------------------------------------------------------------
    // Flows
    // ------------------------------------------------------------------------

    /// Issue an authorization code.
    ///
    /// Client and redirect problems are reported before scope problems so a
    /// transport never redirects to an unverified URI.
    pub async fn authorize(&self, request: AuthorizeRequest) -> Result<AuthorizeResponse> {
        let granted = self
            .codes
            .grantable(&request.client_id, &request.redirect_uri, &request.scope)
            .await?;

        if granted.is_empty() && self.config.require_scope {
            tracing::debug!(
                client_id = %request.client_id,
                requested = %request.scope,
                "No requested scope can be granted"
            );
            return Err(OAuthError::InvalidScope(
                "none of the requested scopes can be granted".to_string(),
            ));
        }

        let issued = self
            .codes
            .issue(
                &request.client_id,
                &request.user_id,
                &request.redirect_uri,
                &request.scope,
            )
            .await?;

        Ok(AuthorizeResponse {
            code: issued.code,
            scope: issued.scopes,
        })
    }

    /// Check that `redirect_uri` is registered to an active client.
    ///
    /// Transports call this before delivering any error by redirect.
    pub async fn verify_redirect(&self, client_id: &str, redirect_uri: &str) -> Result<()> {
        self.codes
            .grantable(client_id, redirect_uri, &ScopeSet::new())
            .await
            .map(|_| ())
    }

    /// Run the token endpoint for either supported grant type.
    pub async fn token(&self, request: TokenRequest) -> Result<TokenPair> {
        let grant_type = required(&request.grant_type, "grant_type")?;

        let result = match grant_type {
            GRANT_AUTHORIZATION_CODE => self.exchange_code(&request).await,
            GRANT_REFRESH_TOKEN => self.exchange_refresh(&request).await,
            other => Err(OAuthError::UnsupportedGrantType(format!(
                "grant_type '{}' is not supported",
                other
            ))),
        };

        match &result {
            Ok(pair) => tracing::info!(
                grant_type,
                client_id = request.client_id.as_deref(),
                scope = %pair.scope,
                "Token grant succeeded"
            ),
            Err(e) => tracing::info!(
                grant_type,
                client_id = request.client_id.as_deref(),
                error = e.code(),
                "Token grant failed"
            ),
        }
        result
    }

    async fn exchange_code(&self, request: &TokenRequest) -> Result<TokenPair> {
        let client_id = required(&request.client_id, "client_id")?;
        let client_secret = required(&request.client_secret, "client_secret")?;
        let code = required(&request.code, "code")?;
        let redirect_uri = required(&request.redirect_uri, "redirect_uri")?;

        let grant = self
            .codes
            .redeem(client_id, client_secret, code, redirect_uri)
            .await?;

        self.tokens
            .issue(&grant.user_id, &grant.client_id, &grant.scopes)
            .await
    }

    async fn exchange_refresh(&self, request: &TokenRequest) -> Result<TokenPair> {
        let refresh_token = required(&request.refresh_token, "refresh_token")?;

        // Empty parameters count as omitted (RFC 6749 §3.1).
        let client_id = request.client_id.as_deref().filter(|v| !v.is_empty());
        let client_secret = request.client_secret.as_deref().filter(|v| !v.is_empty());

        let bound_client = match (client_id, client_secret) {
            (Some(id), Some(secret)) => {
                self.clients.authenticate(id, secret).await?;
                Some(id)
            }
            (Some(id), None) => Some(id),
            (None, Some(_)) => {
                return Err(OAuthError::InvalidRequest(
                    "client_secret given without client_id".to_string(),
                ));
            }
            (None, None) => None,
        };

        // Sessions of deactivated clients cannot be extended.
        if let Some(current) = self.tokens.refresh_token(refresh_token).await? {
            match self.clients.active_client(&current.client_id).await {
                Ok(_) => {}
                Err(OAuthError::InvalidClient(_)) => {
                    tracing::debug!(client_id = %current.client_id, "Refresh for deactivated client");
                    return Err(OAuthError::invalid_refresh_token());
                }
                Err(e) => return Err(e),
            }
        }

        self.tokens.refresh(refresh_token, bound_client).await
    }

    // ------------------------------------------------------------------------
    // Resource checks
    // ------------------------------------------------------------------------

    /// Resolve an access token for a resource request.
    pub async fn validate_access(&self, token: &str) -> Result<Option<AccessGrant>> {
        self.tokens.validate_access(token).await
    }

    pub async fn has_scope(&self, token: &str, scope: &str) -> Result<bool> {
        self.tokens.has_scope(token, scope).await
    }

    /// RFC 7662 introspection of an access token.
    pub async fn introspect(&self, token: &str) -> Result<Introspection> {
        Ok(self
            .tokens
            .validate_access(token)
            .await?
            .map(Introspection::from)
            .unwrap_or_else(Introspection::inactive))
    }

    /// Revoke a token of either kind. Unknown tokens are not an error.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        match self.tokens.revoke(token).await? {
            Revoked::Access => tracing::info!("Access token revoked"),
            Revoked::Refresh => tracing::info!("Refresh token revoked"),
            Revoked::Nothing => tracing::debug!("Revocation of unknown token ignored"),
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Client administration
    // ------------------------------------------------------------------------

    pub async fn register_client(
        &self,
        name: &str,
        redirect_uris: Vec<String>,
        scopes: &ScopeSet,
    ) -> Result<RegisteredClient> {
        self.clients.register(name, redirect_uris, scopes).await
    }

    pub async fn client(&self, client_id: &str) -> Result<Option<Client>> {
        self.clients.lookup(client_id).await
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>> {
        let mut clients = self.clients.list().await?;
        clients.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(clients)
    }

    pub async fn deactivate_client(&self, client_id: &str) -> Result<bool> {
        self.clients.deactivate(client_id).await
    }

    // ------------------------------------------------------------------------
    // Housekeeping
    // ------------------------------------------------------------------------

    /// Remove expired codes and tokens and consumed codes.
    pub async fn purge_expired(&self) -> Result<PurgeStats> {
        let now = Utc::now();
        let codes = self.codes.purge_expired(now).await?;
        let tokens = self.tokens.purge_expired(now).await?;
        Ok(PurgeStats { codes, ..tokens })
    }

    /// Sweep expired entries every `interval` until the handle is aborted.
    pub fn spawn_reaper(&self, interval: StdDuration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match service.purge_expired().await {
                    Ok(stats) if stats.total() > 0 => tracing::debug!(
                        codes = stats.codes,
                        access_tokens = stats.access_tokens,
                        refresh_tokens = stats.refresh_tokens,
                        "Purged expired credentials"
                    ),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Credential sweep failed"),
                }
            }
        })
    }
}
