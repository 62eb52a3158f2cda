//! HTTP client for the Keygate server's admin and token endpoints.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Environment variable holding the admin token.
pub const ADMIN_TOKEN_ENV: &str = "KEYGATE_ADMIN_TOKEN";

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Health check response from the server.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// A client as shown by the admin API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: String,
    pub name: String,
    pub redirect_uris: Vec<String>,
    pub allowed_scopes: Vec<String>,
    pub active: bool,
    pub created_at: String,
    /// Only present in the registration response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Client list response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientListResponse {
    pub clients: Vec<ClientInfo>,
    #[serde(default)]
    pub total: usize,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    redirect_uris: &'a [String],
    scope: String,
}

/// Error bodies the server produces. Admin auth failures
/// (`{"error", "code": 401}`) parse as the second shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Admin {
        code: String,
        message: String,
    },
    OAuth {
        error: String,
        #[serde(default)]
        error_description: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Keygate API client.
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
    token: Option<String>,
}

impl Client {
    /// Create a new client for the given server URL.
    ///
    /// The admin token is read from `KEYGATE_ADMIN_TOKEN` when set.
    pub fn new(base_url: &str) -> Result<Self> {
        let token = std::env::var(ADMIN_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty());
        Self::build(base_url, token)
    }

    /// Create a client with a specific admin token.
    pub fn with_token(base_url: &str, token: String) -> Result<Self> {
        Self::build(base_url, Some(token))
    }

    fn build(base_url: &str, token: Option<String>) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            http: reqwest::Client::new(),
            token,
        })
    }

    fn admin(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        match &self.token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => anyhow::bail!(
                "No admin token. Pass --admin-token or set {}",
                ADMIN_TOKEN_ENV
            ),
        }
    }

    /// Check server health.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("/health")?;
        let response = self.http.get(url).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// Register a client. The response carries the one-time secret.
    pub async fn register_client(
        &self,
        name: &str,
        redirect_uris: &[String],
        scopes: &[String],
    ) -> Result<ClientInfo> {
        let url = self.base_url.join("/admin/clients")?;
        let body = RegisterRequest {
            name,
            redirect_uris,
            scope: scopes.join(" "),
        };
        let response = self.admin(self.http.post(url).json(&body))?.send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// List registered clients.
    pub async fn list_clients(&self) -> Result<ClientListResponse> {
        let url = self.base_url.join("/admin/clients")?;
        let response = self.admin(self.http.get(url))?.send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// Show one client.
    pub async fn get_client(&self, client_id: &str) -> Result<ClientInfo> {
        let url = self
            .base_url
            .join(&format!("/admin/clients/{}", client_id))?;
        let response = self.admin(self.http.get(url))?.send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// Deactivate a client.
    pub async fn deactivate_client(&self, client_id: &str) -> Result<()> {
        let url = self
            .base_url
            .join(&format!("/admin/clients/{}/deactivate", client_id))?;
        let response = self.admin(self.http.post(url))?.send().await?;
        check(response).await?;
        Ok(())
    }

    /// Introspect an access token.
    pub async fn introspect(&self, token: &str) -> Result<Value> {
        let url = self.base_url.join("/oauth/introspect")?;
        let response = self
            .admin(self.http.post(url).form(&[("token", token)]))?
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Revoke an access or refresh token.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let url = self.base_url.join("/oauth/revoke")?;
        let response = self.http.post(url).form(&[("token", token)]).send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into an error carrying the server's message.
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody::Admin { code, message }) => format!("{} ({})", message, code),
        Ok(ErrorBody::OAuth {
            error,
            error_description,
        }) if !error_description.is_empty() => format!("{}: {}", error, error_description),
        Ok(ErrorBody::OAuth { error, .. }) => error,
        Err(_) if !text.is_empty() => text,
        Err(_) => status.to_string(),
    };

    anyhow::bail!("Server returned {}: {}", status.as_u16(), detail)
}
