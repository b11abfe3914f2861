/// HTTP API client
///
/// Every call takes the caller's [`Credentials`]. Session-creating calls
/// store the returned tokens there; a `401` from any call clears them.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use siteline_shared::auth::oauth::{OAuthProfile, OAuthProvider};
use siteline_shared::auth::service::{AuthResponse, RefreshResponse};
use siteline_shared::models::user::SanitizedUser;
use tracing::debug;
use uuid::Uuid;

use crate::credentials::Credentials;
use crate::error::{ClientError, ClientResult, ErrorBody};

/// Registration payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetActiveRequest {
    is_active: bool,
}

/// API client for the Siteline server
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:3001`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    /// Create a client reusing an existing connection pool
    pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, credentials: &Credentials, request: RequestBuilder) -> ClientResult<RequestBuilder> {
        let token = credentials
            .access_token()
            .ok_or(ClientError::NotAuthenticated)?;
        Ok(request.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        credentials: &mut Credentials,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        if status == StatusCode::UNAUTHORIZED {
            debug!("Received 401, clearing credentials");
            credentials.clear();
        }

        let (code, message) = match response.json::<ErrorBody>().await {
            Ok(body) => (body.error, body.message),
            Err(_) => (
                "unknown".to_string(),
                status.canonical_reason().unwrap_or("Request failed").to_string(),
            ),
        };

        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn start_session(
        &self,
        credentials: &mut Credentials,
        request: RequestBuilder,
    ) -> ClientResult<AuthResponse> {
        let response: AuthResponse = self.send(credentials, request).await?;
        credentials.set_session(response.access_token.clone(), response.refresh_token.clone());
        Ok(response)
    }

    /// Register a new account and start a session
    pub async fn register(
        &self,
        credentials: &mut Credentials,
        registration: &Registration,
    ) -> ClientResult<AuthResponse> {
        let request = self.http.post(self.url("/v1/auth/register")).json(registration);
        self.start_session(credentials, request).await
    }

    /// Login with email and password
    pub async fn login(
        &self,
        credentials: &mut Credentials,
        email: &str,
        password: &str,
    ) -> ClientResult<AuthResponse> {
        let request = self
            .http
            .post(self.url("/v1/auth/login"))
            .json(&LoginRequest { email, password });
        self.start_session(credentials, request).await
    }

    /// Complete an OAuth login with an already-exchanged profile
    pub async fn oauth_callback(
        &self,
        credentials: &mut Credentials,
        provider: OAuthProvider,
        profile: &OAuthProfile,
    ) -> ClientResult<AuthResponse> {
        let request = self
            .http
            .post(self.url(&format!("/v1/auth/oauth/{}/callback", provider)))
            .json(profile);
        self.start_session(credentials, request).await
    }

    /// Replace the access token using the stored refresh token
    pub async fn refresh(&self, credentials: &mut Credentials) -> ClientResult<()> {
        let refresh_token = credentials
            .refresh_token()
            .ok_or(ClientError::NotAuthenticated)?
            .to_string();

        let request = self
            .http
            .post(self.url("/v1/auth/refresh"))
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            });

        let response: RefreshResponse = self.send(credentials, request).await?;
        credentials.set_access_token(response.access_token);
        Ok(())
    }

    /// Current user
    pub async fn me(&self, credentials: &mut Credentials) -> ClientResult<SanitizedUser> {
        let request = self.authorized(credentials, self.http.get(self.url("/v1/auth/me")))?;
        self.send(credentials, request).await
    }

    /// Activate or deactivate an account (admin only)
    pub async fn set_user_active(
        &self,
        credentials: &mut Credentials,
        user_id: Uuid,
        is_active: bool,
    ) -> ClientResult<SanitizedUser> {
        let request = self.authorized(
            credentials,
            self.http
                .patch(self.url(&format!("/v1/admin/users/{}/active", user_id)))
                .json(&SetActiveRequest { is_active }),
        )?;
        self.send(credentials, request).await
    }
}
