//! OAuth 2.0 authorization-code engine.
//!
//! Lets registered third-party clients obtain scoped, time-bounded
//! credentials on behalf of a user, without any transport attached.
//!
//! # Components
//!
//! - [`scope`] - Static scope catalog and the `ScopeSet` type
//! - [`client`] - Client registration and constant-time secret checks
//! - [`code`] - Single-use authorization codes
//! - [`token`] - Access/refresh token issuance, validation, rotation, revocation
//! - [`service`] - `AuthorizationService`, composing the above into the authorize and token flows
//! - [`store`] / [`memory`] - Storage traits and in-process implementations

pub mod client;
pub mod code;
pub mod config;
pub mod error;
pub mod memory;
pub mod random;
pub mod scope;
pub mod service;
pub mod store;
pub mod token;

pub use client::{Client, ClientRegistry, RegisteredClient};
pub use code::{AuthorizationCode, AuthorizationCodeManager, CodeGrant, IssuedCode};
pub use config::OAuthConfig;
pub use error::{OAuthError, Result};
pub use memory::{InMemoryClientStore, InMemoryCodeStore, InMemoryTokenStore};
pub use scope::{ScopeCategory, ScopeDefinition, ScopeSet};
pub use service::{
    AuthorizationService, AuthorizeRequest, AuthorizeResponse, Introspection,
    SharedAuthorizationService, Stores, TokenRequest,
};
pub use store::{
    ClientStore, CodeStore, PurgeStats, SharedClientStore, SharedCodeStore, SharedTokenStore,
    TokenStore,
};
pub use token::{AccessGrant, AccessToken, RefreshToken, TokenManager, TokenPair, TokenPolicy};
