use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use chrono::Utc;
use http::request::Parts;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::state::AppState;
use crate::utils::http_helpers::{client_ip, session_token, HTTPError};

/// The User struct represents an authenticated donor or administrator.
///
/// This is also the body of `GET /api/auth/me`, so it never carries the
/// password hash; stores keep that separately.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Unix seconds.
    #[serde(default)]
    pub created_at: i64,
}

impl User {
    /// Construct a new User with a fresh id and optional roles.
    pub fn new(username: String, email: String, roles: Option<Vec<String>>) -> Self {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email,
            roles: roles.unwrap_or_default(),
            created_at: Utc::now().timestamp(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Request extractor for User.
/// The session token is taken from `Authorization: Bearer` or the session cookie
/// and resolved through the store; anything else is a 401.
#[axum::async_trait]
impl FromRequestParts<AppState> for User {
    type Rejection = HTTPError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<User, HTTPError> {
        let ip = client_ip(parts);
        let token = match session_token(&parts.headers, &state.config.session.cookie_name) {
            Some(token) => token,
            None => {
                debug!("No session credential presented by {}", ip);
                return Err(HTTPError::new(
                    StatusCode::UNAUTHORIZED,
                    "Not authenticated",
                ));
            }
        };

        match state
            .store
            .get_session_user(&token, Utc::now().timestamp())
            .await
        {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                debug!("Unknown or expired session presented by {}", ip);
                Err(HTTPError::new(
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired session",
                ))
            }
            Err(e) => {
                error!("Session lookup failed: {}", e);
                Err(HTTPError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Session lookup failed",
                ))
            }
        }
    }
}
