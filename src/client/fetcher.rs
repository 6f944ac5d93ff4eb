use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use reqwest::StatusCode;
use tracing::{debug, error};

use super::config::ClientConfig;
use crate::models::User;

/// The "who am I" path on the backend.
pub const CURRENT_USER_PATH: &str = "/api/auth/me";

/// Why a session fetch produced no user. Only used for logging.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("session endpoint unavailable: {0}")]
    Endpoint(String),
    #[error("request failed: {0}")]
    Transport(reqwest::Error),
    #[error("session endpoint answered {0}")]
    Status(StatusCode),
    #[error("invalid user payload: {0}")]
    Decode(reqwest::Error),
}

/// Resolves a session token to the user it belongs to.
///
/// Implementations always settle: failures are logged and reported as `None`.
#[async_trait]
pub trait UserFetcher: Send + Sync {
    async fn fetch_user(&self, token: &str) -> Option<User>;
}

/// Asks the backend's `/api/auth/me`, presenting the token as the session cookie.
pub struct HttpUserFetcher {
    client: reqwest::Client,
    endpoint: Result<String, String>,
    cookie_name: String,
}

impl HttpUserFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(CURRENT_USER_PATH),
            cookie_name: config.session_cookie.clone(),
        })
    }

    async fn request(&self, token: &str) -> Result<User, FetchError> {
        let url = self.endpoint.as_ref().map_err(|e| FetchError::Endpoint(e.clone()))?;
        debug!("Fetching current user from {}", url);

        let response = self
            .client
            .get(url)
            .header(header::COOKIE, format!("{}={}", self.cookie_name, token))
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        response.json::<User>().await.map_err(FetchError::Decode)
    }
}

#[async_trait]
impl UserFetcher for HttpUserFetcher {
    async fn fetch_user(&self, token: &str) -> Option<User> {
        match self.request(token).await {
            Ok(user) => Some(user),
            Err(e) => {
                error!("Error fetching user: {}", e);
                None
            }
        }
    }
}
