//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode, header::LOCATION, redirect};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use url::Url;

use keygate_oauth::{AuthorizationService, OAuthConfig};
use keygate_server::{Server, ServerConfig};

pub const ADMIN_TOKEN: &str = "test-admin-token";
pub const USER_HEADER: &str = "x-authenticated-user";
pub const REDIRECT_URI: &str = "https://app.example.com/callback";

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// The admin token for the server.
    pub token: String,
    /// HTTP client configured for this server. Never follows redirects.
    pub client: Client,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

/// Credentials of a client registered through the admin API.
#[derive(Debug, Clone)]
pub struct TestClient {
    pub client_id: String,
    pub client_secret: String,
}

impl TestServer {
    /// Start a new test server with default configuration.
    pub async fn start() -> Result<Self> {
        Self::start_with(OAuthConfig::default()).await
    }

    /// Start a new test server with the given engine configuration.
    pub async fn start_with(oauth: OAuthConfig) -> Result<Self> {
        let token = ADMIN_TOKEN.to_string();
        let addr = find_available_port().await?;

        let service = AuthorizationService::in_memory(oauth)?;
        let config = ServerConfig::new(Some(token.clone()))
            .with_bind_address(addr)
            .with_user_header(USER_HEADER)
            .with_rate_limiting(false)
            .with_request_logging(false);

        let server = Server::new(service, config);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            token,
            client,
            _handle: handle,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Get an admin-authenticated request builder.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(&self.token)
    }

    /// Get an admin-authenticated POST request builder.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(&self.token)
    }

    /// Check if server is healthy.
    pub async fn health(&self) -> Result<bool> {
        let resp = self.client.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    /// Register a client through the admin API.
    pub async fn register_client(&self, scope: &str) -> Result<TestClient> {
        let resp = self
            .post("/admin/clients")
            .json(&serde_json::json!({
                "name": "Test App",
                "redirect_uris": [REDIRECT_URI],
                "scope": scope,
            }))
            .send()
            .await?;
        anyhow::ensure!(
            resp.status() == StatusCode::CREATED,
            "register failed: {}",
            resp.status()
        );

        let body: Value = resp.json().await?;
        Ok(TestClient {
            client_id: body["client_id"]
                .as_str()
                .context("missing client_id")?
                .to_string(),
            client_secret: body["client_secret"]
                .as_str()
                .context("missing client_secret")?
                .to_string(),
        })
    }

    /// Call the authorize endpoint as `user` and return the raw response.
    pub async fn authorize_raw(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
        user: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut url = Url::parse(&self.url("/oauth/authorize"))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", scope)
            .append_pair("state", "test-state");

        let mut request = self.client.get(url);
        if let Some(user) = user {
            request = request.header(USER_HEADER, user);
        }
        Ok(request.send().await?)
    }

    /// Authorize as `alice` and return the code from the redirect.
    pub async fn authorize(&self, client: &TestClient, scope: &str) -> Result<String> {
        let resp = self
            .authorize_raw(&client.client_id, REDIRECT_URI, scope, Some("alice"))
            .await?;
        anyhow::ensure!(
            resp.status() == StatusCode::FOUND,
            "authorize failed: {}",
            resp.status()
        );

        let target = redirect_target(&resp)?;
        query_value(&target, "code").context("redirect carries no code")
    }

    /// Exchange a code with form-posted client credentials.
    pub async fn exchange_code(
        &self,
        client: &TestClient,
        code: &str,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/oauth/token"))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", REDIRECT_URI),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
            ])
            .send()
            .await?)
    }

    /// Run a refresh grant bound to `client`.
    pub async fn refresh(
        &self,
        client: &TestClient,
        refresh_token: &str,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/oauth/token"))
            .basic_auth(&client.client_id, Some(&client.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?)
    }

    /// Register, authorize and exchange: the full happy path.
    pub async fn obtain_tokens(&self, scope: &str) -> Result<(TestClient, Value)> {
        let client = self.register_client("api:read api:write webhooks:write").await?;
        let code = self.authorize(&client, scope).await?;
        let resp = self.exchange_code(&client, &code).await?;
        anyhow::ensure!(
            resp.status() == StatusCode::OK,
            "token exchange failed: {}",
            resp.status()
        );
        Ok((client, resp.json().await?))
    }
}

/// The parsed `Location` header of a redirect response.
pub fn redirect_target(resp: &reqwest::Response) -> Result<Url> {
    let location = resp
        .headers()
        .get(LOCATION)
        .context("response has no Location header")?
        .to_str()?;
    Ok(Url::parse(location)?)
}

pub fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
