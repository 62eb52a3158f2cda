//! Authorization code issuance and single-use redemption.
//!
//! A code moves `issued -> redeemed` or `issued -> expired`; both ends are
//! terminal. Redemption is atomic at the store level.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::client::ClientRegistry;
use crate::error::{OAuthError, Result};
use crate::random;
use crate::scope::ScopeSet;
use crate::store::{Consumption, Redemption, SharedCodeStore};

/// A stored authorization code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub user_id: String,
    /// Granted subset of the client's allowed and the requested scopes.
    pub scopes: ScopeSet,
    /// The redirect URI the code was issued for.
    pub redirect_uri: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Snapshot of the consumed state when this copy was taken. The store
    /// owns the live flag; on insert this value only seeds it.
    pub consumed: bool,
}

impl AuthorizationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A code handed back to the authorize caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub code: String,
    pub scopes: ScopeSet,
    pub expires_at: DateTime<Utc>,
}

/// What a successfully redeemed code entitles the client to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeGrant {
    pub user_id: String,
    pub client_id: String,
    pub scopes: ScopeSet,
}

/// Issues and redeems authorization codes.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeManager {
    clients: ClientRegistry,
    store: SharedCodeStore,
    ttl: Duration,
}

impl AuthorizationCodeManager {
    pub fn new(clients: ClientRegistry, store: SharedCodeStore, ttl: Duration) -> Self {
        Self {
            clients,
            store,
            ttl,
        }
    }

    /// Check the client and redirect URI and compute what would be granted,
    /// without issuing anything.
    pub async fn grantable(
        &self,
        client_id: &str,
        redirect_uri: &str,
        requested_scopes: &ScopeSet,
    ) -> Result<ScopeSet> {
        let client = self.clients.active_client(client_id).await?;

        if !client.has_redirect_uri(redirect_uri) {
            return Err(OAuthError::InvalidRequest(
                "redirect_uri is not registered for this client".to_string(),
            ));
        }

        Ok(requested_scopes.intersection(&client.allowed_scopes))
    }

    /// Issue a code for `user_id`.
    ///
    /// The granted scopes are `requested ∩ client.allowed_scopes`; an empty
    /// grant is allowed here and left to the caller to reject.
    pub async fn issue(
        &self,
        client_id: &str,
        user_id: &str,
        redirect_uri: &str,
        requested_scopes: &ScopeSet,
    ) -> Result<IssuedCode> {
        let scopes = self
            .grantable(client_id, redirect_uri, requested_scopes)
            .await?;
        let issued_at = Utc::now();
        let record = AuthorizationCode {
            code: random::token(),
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            scopes: scopes.clone(),
            redirect_uri: redirect_uri.to_string(),
            issued_at,
            expires_at: issued_at + self.ttl,
            consumed: false,
        };

        let issued = IssuedCode {
            code: record.code.clone(),
            scopes,
            expires_at: record.expires_at,
        };

        tracing::debug!(
            client_id,
            user_id,
            scopes = %issued.scopes,
            "Authorization code issued"
        );

        self.store.insert(record).await?;
        Ok(issued)
    }

    /// Redeem a code exactly once.
    ///
    /// Every code-level failure maps to the same `invalid_grant` so callers
    /// cannot tell an expired code from a forged one.
    pub async fn redeem(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<CodeGrant> {
        self.clients.authenticate(client_id, client_secret).await?;

        let redemption = Redemption {
            client_id,
            redirect_uri,
            now: Utc::now(),
        };

        match self.store.consume(code, &redemption).await? {
            Consumption::Consumed(record) => {
                tracing::debug!(client_id, user_id = %record.user_id, "Authorization code redeemed");
                Ok(CodeGrant {
                    user_id: record.user_id,
                    client_id: record.client_id,
                    scopes: record.scopes,
                })
            }
            Consumption::Rejected(reason) => {
                tracing::debug!(client_id, ?reason, "Authorization code rejected");
                Err(OAuthError::invalid_code())
            }
        }
    }

    /// Drop expired and spent codes.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        self.store.purge(now).await
    }
}
