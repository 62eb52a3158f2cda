//! Storage seams for clients, codes and tokens.
//!
//! The engine only needs key-based lookup plus one atomic read-modify-write:
//! consuming an authorization code. Implementations must make
//! [`CodeStore::consume`] race-free so that concurrent redemptions of one
//! code produce exactly one [`Consumption::Consumed`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::client::Client;
use crate::code::AuthorizationCode;
use crate::error::Result;
use crate::token::{AccessToken, RefreshToken};

// ============================================================================
// Clients
// ============================================================================

/// Persistent client records.
#[async_trait]
pub trait ClientStore: Send + Sync + std::fmt::Debug {
    /// Store a newly registered client.
    async fn insert(&self, client: Client) -> Result<()>;

    /// Fetch a client by id.
    async fn get(&self, client_id: &str) -> Result<Option<Client>>;

    /// All clients, in no particular order.
    async fn list(&self) -> Result<Vec<Client>>;

    /// Mark a client inactive. Returns `false` if it does not exist.
    async fn deactivate(&self, client_id: &str) -> Result<bool>;
}

// ============================================================================
// Authorization codes
// ============================================================================

/// What a redeeming client presents alongside the code.
#[derive(Debug, Clone, Copy)]
pub struct Redemption<'a> {
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub now: DateTime<Utc>,
}

/// Why a code was not consumed. Only ever logged, never returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unknown,
    Expired,
    AlreadyConsumed,
    ClientMismatch,
    RedirectMismatch,
}

/// Outcome of an atomic consume attempt.
#[derive(Debug, Clone)]
pub enum Consumption {
    /// This caller won the code; the record is returned with `consumed` set.
    Consumed(AuthorizationCode),
    /// The code was not usable by this caller.
    Rejected(Rejection),
}

/// Outstanding authorization codes.
#[async_trait]
pub trait CodeStore: Send + Sync + std::fmt::Debug {
    /// Store a freshly issued code.
    async fn insert(&self, code: AuthorizationCode) -> Result<()>;

    /// Check bindings and expiry, then flip the consumed flag exactly once.
    async fn consume(&self, code: &str, redemption: &Redemption<'_>) -> Result<Consumption>;

    /// Drop expired and consumed codes. Returns how many were removed.
    async fn purge(&self, now: DateTime<Utc>) -> Result<usize>;
}

// ============================================================================
// Tokens
// ============================================================================

/// Counts from a token sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub codes: usize,
    pub access_tokens: usize,
    pub refresh_tokens: usize,
}

impl PurgeStats {
    pub fn total(&self) -> usize {
        self.codes + self.access_tokens + self.refresh_tokens
    }
}

/// Outstanding access and refresh tokens.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    async fn insert_access(&self, token: AccessToken) -> Result<()>;

    async fn get_access(&self, token: &str) -> Result<Option<AccessToken>>;

    /// Returns whether the token existed.
    async fn remove_access(&self, token: &str) -> Result<bool>;

    async fn insert_refresh(&self, token: RefreshToken) -> Result<()>;

    async fn get_refresh(&self, token: &str) -> Result<Option<RefreshToken>>;

    /// Remove and return a refresh token in one step. At most one caller
    /// receives `Some` for a given token.
    async fn take_refresh(&self, token: &str) -> Result<Option<RefreshToken>>;

    /// Returns whether the token existed.
    async fn remove_refresh(&self, token: &str) -> Result<bool>;

    /// Drop expired tokens. `codes` in the result is always zero.
    async fn purge(&self, now: DateTime<Utc>) -> Result<PurgeStats>;
}

/// Shared client store.
pub type SharedClientStore = Arc<dyn ClientStore>;

/// Shared code store.
pub type SharedCodeStore = Arc<dyn CodeStore>;

/// Shared token store.
pub type SharedTokenStore = Arc<dyn TokenStore>;
