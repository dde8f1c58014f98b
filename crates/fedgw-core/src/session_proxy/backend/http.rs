//! JSON over HTTP backend with OAuth2 client-credentials authentication.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeDelta, Utc};
use fedgw_types::{
    ConfigError, CreateSessionRequest, CreateSessionResponse, SessionControllerConfig,
    SessionTerminateRequest, SessionTerminateResponse, UpdateSessionRequest,
    UpdateSessionResponse,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use super::SessionBackend;
use crate::error::{GatewayError, GatewayResult};

const CREATE_PATH: &str = "sessions";
const UPDATE_PATH: &str = "sessions/update";
const TERMINATE_PATH: &str = "sessions/terminate";

/// Tokens expiring within this window are refreshed before use.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 30;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
/// Longest token lifetime accepted from the token endpoint.
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

pub struct HttpSessionBackend {
    client: reqwest::Client,
    api_root: String,
    token_url: Url,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl HttpSessionBackend {
    /// Fails with `ConfigError::InvalidUrl` when either endpoint is malformed.
    pub fn new(config: &SessionControllerConfig) -> GatewayResult<Self> {
        let api_root = parse_url("api_root", &config.api_root)?;
        let token_url = parse_url("token_url", &config.token_url)?;

        let client = reqwest::Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            api_root: api_root.as_str().trim_end_matches('/').to_string(),
            token_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> GatewayResult<String> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.access_token.clone());
        }

        tracing::debug!(token_url = %self.token_url, "Requesting backend access token");
        let response = self
            .client
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::OAuth(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::OAuth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::OAuth(format!("invalid token response: {}", e)))?;
        let expires_at = token_expiry(now, token.expires_in)?;
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken { access_token: token.access_token, expires_at });
        Ok(access_token)
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> GatewayResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.api_root, path);
        let response = self.client.post(&url).bearer_auth(token).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                *self.token.lock().await = None;
            }
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = status.as_u16(), "Backend rejected request");
            return Err(GatewayError::Backend { status: status.as_u16(), message });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Expiry instant for a token issued at `now`; lifetimes outside `0..=MAX` are rejected.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> GatewayResult<DateTime<Utc>> {
    if !(0..=MAX_TOKEN_LIFETIME_SECS).contains(&expires_in) {
        return Err(GatewayError::OAuth(format!("invalid expires_in: {}", expires_in)));
    }
    TimeDelta::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| GatewayError::OAuth(format!("invalid expires_in: {}", expires_in)))
}

fn parse_url(field: &str, raw: &str) -> GatewayResult<Url> {
    Url::parse(raw).map_err(|e| {
        GatewayError::from(ConfigError::InvalidUrl {
            field: field.to_string(),
            url: raw.to_string(),
            message: e.to_string(),
        })
    })
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> GatewayResult<CreateSessionResponse> {
        self.post(CREATE_PATH, request).await
    }

    async fn update_session(
        &self,
        request: &UpdateSessionRequest,
    ) -> GatewayResult<UpdateSessionResponse> {
        self.post(UPDATE_PATH, request).await
    }

    async fn terminate_session(
        &self,
        request: &SessionTerminateRequest,
    ) -> GatewayResult<SessionTerminateResponse> {
        self.post(TERMINATE_PATH, request).await
    }
}
