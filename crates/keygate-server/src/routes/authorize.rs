//! Authorization endpoint (RFC 6749 §4.1.1).
//!
//! The end user has already signed in; the login gateway in front of this
//! server passes their id in a trusted header. Consent is implied by the
//! platform's own UI, so a valid request is answered with a redirect
//! carrying the code.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use keygate_oauth::{AuthorizeRequest, OAuthError, ScopeSet};
use serde::Deserialize;
use url::Url;

use crate::auth::authenticated_user;
use crate::error::ApiError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeParams {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
}

/// 302 to `redirect_uri` with the given query parameters appended.
fn redirect_with(redirect_uri: &str, params: &[(&str, &str)]) -> Result<Response, ApiError> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|_| OAuthError::InvalidRequest("redirect_uri is not a valid URL".to_string()))?;
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }

    Ok((StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response())
}

/// Deliver an error to the client through its verified redirect URI.
fn redirect_error(
    redirect_uri: &str,
    error: &OAuthError,
    state: Option<&str>,
) -> Result<Response, ApiError> {
    let mut params = vec![
        ("error", error.code()),
        ("error_description", error.description()),
    ];
    if let Some(state) = state {
        params.push(("state", state));
    }
    redirect_with(redirect_uri, &params)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /oauth/authorize - Issue an authorization code.
pub async fn authorize_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, ApiError> {
    let Some(user_id) = authenticated_user(&headers, &state.config().user_header) else {
        return Err(ApiError::access_denied("the end user is not authenticated"));
    };

    let client_id = params
        .client_id
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OAuthError::InvalidRequest("client_id is required".to_string()))?;
    let redirect_uri = params
        .redirect_uri
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OAuthError::InvalidRequest("redirect_uri is required".to_string()))?;

    // Nothing may be redirected until the URI is known to belong to the client.
    state.service.verify_redirect(client_id, redirect_uri).await?;

    let client_state = params.state.as_deref();

    if params.response_type.as_deref() != Some("code") {
        let error = OAuthError::UnsupportedResponseType(
            "only response_type=code is supported".to_string(),
        );
        return redirect_error(redirect_uri, &error, client_state);
    }

    let request = AuthorizeRequest {
        client_id: client_id.to_string(),
        user_id: user_id.to_string(),
        redirect_uri: redirect_uri.to_string(),
        scope: ScopeSet::parse(params.scope.as_deref().unwrap_or_default()),
    };

    match state.service.authorize(request).await {
        Ok(response) => {
            tracing::info!(
                client_id,
                scope = %response.scope,
                "Authorization code issued"
            );
            let mut query = vec![("code", response.code.as_str())];
            if let Some(client_state) = client_state {
                query.push(("state", client_state));
            }
            redirect_with(redirect_uri, &query)
        }
        Err(e) if matches!(e, OAuthError::InvalidScope(_)) || e.is_server_error() => {
            if e.is_server_error() {
                tracing::error!(error = %e, "Authorization failed");
            }
            redirect_error(redirect_uri, &e, client_state)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::{Router, body::Body, http::Request, routing::get};
    use keygate_oauth::{AuthorizationService, OAuthConfig, RegisteredClient};
    use tower::ServiceExt;

    async fn setup() -> (Router, RegisteredClient) {
        let service = AuthorizationService::in_memory(OAuthConfig::default()).unwrap();
        let client = service
            .register_client(
                "App",
                vec!["https://app.example.com/cb".to_string()],
                &ScopeSet::parse("api:read webhooks:write"),
            )
            .await
            .unwrap();
        let state = AppState::new(service, ServerConfig::default());
        let app = Router::new()
            .route("/oauth/authorize", get(authorize_handler))
            .with_state(state);
        (app, client)
    }

    fn authorize_uri(client_id: &str, redirect: &str, extra: &str) -> String {
        let mut url = Url::parse("http://localhost/oauth/authorize").unwrap();
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect);
        format!("{}{}", url, extra)
    }

    async fn call(app: Router, uri: &str, user: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-authenticated-user", user);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &Response) -> Url {
        Url::parse(response.headers()[LOCATION].to_str().unwrap()).unwrap()
    }

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[tokio::test]
    async fn test_issues_code_by_redirect() {
        let (app, client) = setup().await;
        let uri = authorize_uri(
            &client.client.client_id,
            "https://app.example.com/cb",
            "&response_type=code&scope=api:read&state=xyz",
        );

        let response = call(app, &uri, Some("alice")).await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let target = location(&response);
        assert_eq!(target.host_str(), Some("app.example.com"));
        assert!(query_value(&target, "code").is_some());
        assert_eq!(query_value(&target, "state").as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_requires_authenticated_user() {
        let (app, client) = setup().await;
        let uri = authorize_uri(
            &client.client.client_id,
            "https://app.example.com/cb",
            "&response_type=code&scope=api:read",
        );

        let response = call(app, &uri, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unregistered_redirect_is_not_followed() {
        let (app, client) = setup().await;
        let uri = authorize_uri(
            &client.client.client_id,
            "https://evil.example.com/cb",
            "&response_type=code&scope=api:read",
        );

        let response = call(app, &uri, Some("alice")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_unknown_client_is_json_error() {
        let (app, _) = setup().await;
        let uri = authorize_uri(
            "no-such-client",
            "https://app.example.com/cb",
            "&response_type=code&scope=api:read",
        );

        let response = call(app, &uri, Some("alice")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_invalid_scope_is_redirected() {
        let (app, client) = setup().await;
        let uri = authorize_uri(
            &client.client.client_id,
            "https://app.example.com/cb",
            "&response_type=code&scope=admin&state=s1",
        );

        let response = call(app, &uri, Some("alice")).await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let target = location(&response);
        assert_eq!(query_value(&target, "error").as_deref(), Some("invalid_scope"));
        assert_eq!(query_value(&target, "state").as_deref(), Some("s1"));
        assert!(query_value(&target, "code").is_none());
    }

    #[tokio::test]
    async fn test_unsupported_response_type() {
        let (app, client) = setup().await;
        let uri = authorize_uri(
            &client.client.client_id,
            "https://app.example.com/cb",
            "&response_type=token&scope=api:read",
        );

        let response = call(app, &uri, Some("alice")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            query_value(&location(&response), "error").as_deref(),
            Some("unsupported_response_type")
        );
    }

    #[tokio::test]
    async fn test_missing_client_id() {
        let (app, _) = setup().await;
        let response = call(
            app,
            "/oauth/authorize?response_type=code&redirect_uri=https://app.example.com/cb",
            Some("alice"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
