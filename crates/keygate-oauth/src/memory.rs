//! In-process stores backed by `parking_lot::RwLock<HashMap<..>>`.
//!
//! Locks are never held across an `.await`; every method takes the lock,
//! does its map work, and drops it before returning.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::client::Client;
use crate::code::AuthorizationCode;
use crate::error::Result;
use crate::store::{
    ClientStore, CodeStore, Consumption, PurgeStats, Redemption, Rejection, TokenStore,
};
use crate::token::{AccessToken, RefreshToken};

// ============================================================================
// Clients
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryClientStore {
    clients: RwLock<HashMap<String, Client>>,
}

impl InMemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn insert(&self, client: Client) -> Result<()> {
        self.clients.write().insert(client.client_id.clone(), client);
        Ok(())
    }

    async fn get(&self, client_id: &str) -> Result<Option<Client>> {
        Ok(self.clients.read().get(client_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Client>> {
        Ok(self.clients.read().values().cloned().collect())
    }

    async fn deactivate(&self, client_id: &str) -> Result<bool> {
        match self.clients.write().get_mut(client_id) {
            Some(client) => {
                client.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ============================================================================
// Authorization codes
// ============================================================================

/// A code record plus its one-way consumed flag.
#[derive(Debug)]
struct StoredCode {
    record: AuthorizationCode,
    consumed: AtomicBool,
}

impl StoredCode {
    fn is_spent(&self, now: DateTime<Utc>) -> bool {
        self.consumed.load(Ordering::Acquire) || self.record.is_expired(now)
    }
}

/// Code store where redemption is a compare-and-swap on a per-code flag.
///
/// Consumption only needs the read lock, so redemptions of distinct codes
/// never contend with each other.
#[derive(Debug, Default)]
pub struct InMemoryCodeStore {
    codes: RwLock<HashMap<String, Arc<StoredCode>>>,
}

impl InMemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored codes, spent or not.
    pub fn len(&self) -> usize {
        self.codes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.read().is_empty()
    }
}

#[async_trait]
impl CodeStore for InMemoryCodeStore {
    async fn insert(&self, code: AuthorizationCode) -> Result<()> {
        let stored = StoredCode {
            consumed: AtomicBool::new(code.consumed),
            record: code,
        };
        self.codes
            .write()
            .insert(stored.record.code.clone(), Arc::new(stored));
        Ok(())
    }

    async fn consume(&self, code: &str, redemption: &Redemption<'_>) -> Result<Consumption> {
        let Some(stored) = self.codes.read().get(code).cloned() else {
            return Ok(Consumption::Rejected(Rejection::Unknown));
        };

        let record = &stored.record;
        if record.is_expired(redemption.now) {
            return Ok(Consumption::Rejected(Rejection::Expired));
        }
        if record.client_id != redemption.client_id {
            return Ok(Consumption::Rejected(Rejection::ClientMismatch));
        }
        if record.redirect_uri != redemption.redirect_uri {
            return Ok(Consumption::Rejected(Rejection::RedirectMismatch));
        }

        if stored
            .consumed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(Consumption::Rejected(Rejection::AlreadyConsumed));
        }

        let mut record = record.clone();
        record.consumed = true;
        Ok(Consumption::Consumed(record))
    }

    async fn purge(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut codes = self.codes.write();
        let before = codes.len();
        codes.retain(|_, stored| !stored.is_spent(now));
        Ok(before - codes.len())
    }
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    access: RwLock<HashMap<String, AccessToken>>,
    refresh: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored (access, refresh) counts, expired entries included.
    pub fn counts(&self) -> (usize, usize) {
        (self.access.read().len(), self.refresh.read().len())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert_access(&self, token: AccessToken) -> Result<()> {
        self.access.write().insert(token.token.clone(), token);
        Ok(())
    }

    async fn get_access(&self, token: &str) -> Result<Option<AccessToken>> {
        Ok(self.access.read().get(token).cloned())
    }

    async fn remove_access(&self, token: &str) -> Result<bool> {
        Ok(self.access.write().remove(token).is_some())
    }

    async fn insert_refresh(&self, token: RefreshToken) -> Result<()> {
        self.refresh.write().insert(token.token.clone(), token);
        Ok(())
    }

    async fn get_refresh(&self, token: &str) -> Result<Option<RefreshToken>> {
        Ok(self.refresh.read().get(token).cloned())
    }

    async fn take_refresh(&self, token: &str) -> Result<Option<RefreshToken>> {
        Ok(self.refresh.write().remove(token))
    }

    async fn remove_refresh(&self, token: &str) -> Result<bool> {
        Ok(self.refresh.write().remove(token).is_some())
    }

    async fn purge(&self, now: DateTime<Utc>) -> Result<PurgeStats> {
        let access_tokens = {
            let mut access = self.access.write();
            let before = access.len();
            access.retain(|_, t| !t.is_expired(now));
            before - access.len()
        };
        let refresh_tokens = {
            let mut refresh = self.refresh.write();
            let before = refresh.len();
            refresh.retain(|_, t| !t.is_expired(now));
            before - refresh.len()
        };

        Ok(PurgeStats {
            codes: 0,
            access_tokens,
            refresh_tokens,
        })
    }
}
