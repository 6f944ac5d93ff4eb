use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A server-side session: an opaque token bound to a user until `expires_at`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds; the session stops authenticating at this instant.
    pub expires_at: i64,
}

impl Session {
    /// Issues a new session for `user_id` with a random token.
    pub fn issue(user_id: &str, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Session {
            token: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + ttl_secs,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_session_expires_after_ttl() {
        let session = Session::issue("user-1", 60);
        assert!(!session.is_expired(session.created_at));
        assert!(!session.is_expired(session.created_at + 59));
        assert!(session.is_expired(session.created_at + 60));
    }

    #[test]
    fn tokens_are_not_reused() {
        let a = Session::issue("user-1", 60);
        let b = Session::issue("user-1", 60);
        assert_ne!(a.token, b.token);
    }
}
