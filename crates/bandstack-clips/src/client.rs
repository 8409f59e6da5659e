//! Twitch Helix HTTP client.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{ClipsError, ClipsResult};
use crate::types::{sort_by_views, ClipRecord, ClipsResponse, TokenResponse, UsersResponse};

const DEFAULT_API_BASE: &str = "https://api.twitch.tv/helix";
const DEFAULT_AUTH_BASE: &str = "https://id.twitch.tv";

/// Configuration for the clips client.
#[derive(Debug, Clone)]
pub struct ClipsConfig {
    /// Twitch application client ID
    pub client_id: String,
    /// Twitch application client secret
    pub client_secret: String,
    /// Helix API base URL
    pub api_base: String,
    /// OAuth base URL
    pub auth_base: String,
    /// Request timeout
    pub timeout: Duration,
    /// Only clips created at or after this RFC 3339 instant
    pub started_at: String,
}

impl ClipsConfig {
    /// Create config from environment variables.
    ///
    /// Requires `TWITCH_CLIENT_ID` and `TWITCH_CLIENT_SECRET`.
    pub fn from_env() -> ClipsResult<Self> {
        let client_id = std::env::var("TWITCH_CLIENT_ID")
            .map_err(|_| ClipsError::MissingCredentials("TWITCH_CLIENT_ID".to_string()))?;
        let client_secret = std::env::var("TWITCH_CLIENT_SECRET")
            .map_err(|_| ClipsError::MissingCredentials("TWITCH_CLIENT_SECRET".to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            api_base: std::env::var("TWITCH_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            auth_base: std::env::var("TWITCH_AUTH_BASE")
                .unwrap_or_else(|_| DEFAULT_AUTH_BASE.to_string()),
            timeout: Duration::from_secs(
                std::env::var("TWITCH_HTTP_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            started_at: std::env::var("TWITCH_CLIPS_STARTED_AT")
                .unwrap_or_else(|_| "2024-01-01T00:00:00Z".to_string()),
        })
    }
}

/// Client for clip discovery against the Helix API.
pub struct ClipsClient {
    http: Client,
    config: ClipsConfig,
    token: String,
}

impl ClipsClient {
    /// Create a client and obtain an app access token
    /// (client-credentials grant).
    pub async fn connect(config: ClipsConfig) -> ClipsResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClipsError::Network)?;

        let url = format!("{}/oauth2/token", config.auth_base);
        let response = http
            .post(&url)
            .query(&[
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClipsError::AuthFailed(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        debug!("Obtained Helix app access token");

        Ok(Self {
            http,
            config,
            token: token.access_token,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> ClipsResult<Self> {
        Self::connect(ClipsConfig::from_env()?).await
    }

    /// Resolve a channel login to a broadcaster ID.
    pub async fn user_id(&self, login: &str) -> ClipsResult<String> {
        let url = format!("{}/users", self.config.api_base);
        let response = self
            .http
            .get(&url)
            .header("Client-ID", &self.config.client_id)
            .bearer_auth(&self.token)
            .query(&[("login", login)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClipsError::RequestFailed(format!(
                "users lookup returned {}",
                response.status()
            )));
        }

        let users: UsersResponse = response.json().await?;
        users
            .data
            .into_iter()
            .next()
            .map(|u| u.id)
            .ok_or_else(|| ClipsError::UnknownChannel(login.to_string()))
    }

    /// Fetch up to `first` clips for one channel.
    pub async fn clips_for(&self, channel: &str, first: u32) -> ClipsResult<Vec<ClipRecord>> {
        let broadcaster_id = self.user_id(channel).await?;

        let url = format!("{}/clips", self.config.api_base);
        let response = self
            .http
            .get(&url)
            .header("Client-ID", &self.config.client_id)
            .bearer_auth(&self.token)
            .query(&[
                ("broadcaster_id", broadcaster_id.as_str()),
                ("first", &first.to_string()),
                ("started_at", self.config.started_at.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClipsError::RequestFailed(format!(
                "clips lookup returned {}",
                response.status()
            )));
        }

        let clips: ClipsResponse = response.json().await?;
        Ok(clips
            .data
            .into_iter()
            .map(|c| ClipRecord {
                title: c.title,
                view_count: c.view_count,
                url: c.url,
                channel: channel.to_string(),
            })
            .collect())
    }

    /// Fetch clips across several channels, merged and sorted by view
    /// count descending. Channels that fail to resolve are skipped.
    pub async fn top_clips(&self, channels: &[&str], first: u32) -> ClipsResult<Vec<ClipRecord>> {
        let mut all = Vec::new();
        for channel in channels {
            match self.clips_for(channel, first).await {
                Ok(mut clips) => all.append(&mut clips),
                Err(ClipsError::UnknownChannel(login)) => {
                    warn!("Skipping unknown channel {}", login);
                }
                Err(e) => return Err(e),
            }
        }
        sort_by_views(&mut all);
        Ok(all)
    }
}
