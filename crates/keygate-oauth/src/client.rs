//! Client registry for third-party applications.
//!
//! Clients are created once, never edited, and deactivated rather than
//! deleted when compromised. Secrets are stored as SHA-256 digests; the
//! plaintext is handed back exactly once, at registration.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use url::Url;

use crate::error::{OAuthError, Result};
use crate::random;
use crate::scope::{self, ScopeSet};
use crate::store::SharedClientStore;

/// Digest compared against when the client id is unknown, so unknown and
/// known clients cost the same to reject.
const UNKNOWN_CLIENT_DIGEST: [u8; 32] = [0u8; 32];

// ============================================================================
// Client
// ============================================================================

/// A registered third-party application.
#[derive(Debug, Clone, Serialize)]
pub struct Client {
    /// Public identifier.
    pub client_id: String,
    /// SHA-256 digest of the client secret.
    #[serde(skip_serializing)]
    pub secret_hash: [u8; 32],
    /// Display name.
    pub name: String,
    /// Redirect URIs; matched by exact string equality.
    pub redirect_uris: Vec<String>,
    /// Upper bound on what this client may ever be granted.
    pub allowed_scopes: ScopeSet,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Whether `uri` is byte-for-byte one of the registered redirect URIs.
    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }
}

/// Result of a registration: the stored client plus its one-time secret.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredClient {
    #[serde(flatten)]
    pub client: Client,
    pub client_secret: String,
}

/// SHA-256 digest of a client secret.
pub fn digest_secret(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

/// Check that a redirect URI is absolute and carries no fragment
/// (RFC 6749 §3.1.2).
pub fn validate_redirect_uri(uri: &str) -> Result<()> {
    let parsed = Url::parse(uri)
        .map_err(|e| OAuthError::InvalidRequest(format!("invalid redirect_uri '{}': {}", uri, e)))?;

    if parsed.cannot_be_a_base() {
        return Err(OAuthError::InvalidRequest(format!(
            "redirect_uri '{}' is not a hierarchical URL",
            uri
        )));
    }
    if parsed.fragment().is_some() {
        return Err(OAuthError::InvalidRequest(format!(
            "redirect_uri '{}' must not contain a fragment",
            uri
        )));
    }
    Ok(())
}

// ============================================================================
// ClientRegistry
// ============================================================================

/// Registers, looks up and authenticates clients.
#[derive(Debug, Clone)]
pub struct ClientRegistry {
    store: SharedClientStore,
}

impl ClientRegistry {
    pub fn new(store: SharedClientStore) -> Self {
        Self { store }
    }

    /// Register a new client.
    ///
    /// Unknown scopes are silently dropped. Every redirect URI must be an
    /// absolute URL without a fragment.
    pub async fn register(
        &self,
        name: &str,
        redirect_uris: Vec<String>,
        requested_scopes: &ScopeSet,
    ) -> Result<RegisteredClient> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OAuthError::InvalidRequest(
                "client name must not be empty".to_string(),
            ));
        }
        if redirect_uris.is_empty() {
            return Err(OAuthError::InvalidRequest(
                "at least one redirect_uri is required".to_string(),
            ));
        }
        for uri in &redirect_uris {
            validate_redirect_uri(uri)?;
        }

        let allowed_scopes = scope::known(requested_scopes);
        let client_secret = random::client_secret();
        let client = Client {
            client_id: random::client_id(),
            secret_hash: digest_secret(&client_secret),
            name: name.to_string(),
            redirect_uris,
            allowed_scopes,
            active: true,
            created_at: Utc::now(),
        };

        self.store.insert(client.clone()).await?;

        tracing::info!(
            client_id = %client.client_id,
            name = %client.name,
            scopes = %client.allowed_scopes,
            "Client registered"
        );

        Ok(RegisteredClient {
            client,
            client_secret,
        })
    }

    /// Look up a client by id, active or not.
    pub async fn lookup(&self, client_id: &str) -> Result<Option<Client>> {
        self.store.get(client_id).await
    }

    /// All registered clients.
    pub async fn list(&self) -> Result<Vec<Client>> {
        self.store.list().await
    }

    /// Check a client secret.
    ///
    /// The presented secret is hashed and compared against a fixed-length
    /// digest in constant time; unknown clients are compared against a dummy
    /// digest. Inactive clients always fail.
    pub async fn validate_secret(&self, client_id: &str, secret: &str) -> Result<bool> {
        let client = self.store.get(client_id).await?;
        let presented = digest_secret(secret);

        let (expected, active) = match &client {
            Some(c) => (c.secret_hash, c.active),
            None => (UNKNOWN_CLIENT_DIGEST, false),
        };

        let matches: bool = presented[..].ct_eq(&expected[..]).into();
        Ok(matches && active)
    }

    /// Authenticate a client, returning its record.
    pub async fn authenticate(&self, client_id: &str, secret: &str) -> Result<Client> {
        if !self.validate_secret(client_id, secret).await? {
            tracing::debug!(client_id, "Client authentication failed");
            return Err(OAuthError::client_authentication_failed());
        }
        self.store
            .get(client_id)
            .await?
            .ok_or_else(OAuthError::client_authentication_failed)
    }

    /// Look up a client that may take part in a new grant.
    pub async fn active_client(&self, client_id: &str) -> Result<Client> {
        match self.store.get(client_id).await? {
            Some(client) if client.active => Ok(client),
            _ => Err(OAuthError::unavailable_client()),
        }
    }

    /// Deactivate a client. Idempotent; returns `false` if the id is unknown.
    pub async fn deactivate(&self, client_id: &str) -> Result<bool> {
        let found = self.store.deactivate(client_id).await?;
        if found {
            tracing::info!(client_id, "Client deactivated");
        }
        Ok(found)
    }
}
