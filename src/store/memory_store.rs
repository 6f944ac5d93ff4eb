use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Store;
use crate::models::{Donation, Session, User};

#[derive(Default)]
struct Tables {
    /// username -> (user, password hash)
    users: HashMap<String, (User, String)>,
    sessions: HashMap<String, Session>,
    donations: Vec<Donation>,
}

/// A process-local store. Used when no database is configured and in tests.
/// Everything is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<bool, String> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.username) {
            return Ok(false);
        }
        tables.users.insert(
            user.username.clone(),
            (user.clone(), password_hash.to_string()),
        );
        Ok(true)
    }

    async fn find_credentials(&self, username: &str) -> Result<Option<(User, String)>, String> {
        Ok(self.tables.read().await.users.get(username).cloned())
    }

    async fn count_users(&self) -> Result<u64, String> {
        Ok(self.tables.read().await.users.len() as u64)
    }

    async fn add_session(&self, session: &Session) -> Result<(), String> {
        self.tables
            .write()
            .await
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get_session_user(&self, token: &str, now: i64) -> Result<Option<User>, String> {
        let tables = self.tables.read().await;
        let session = match tables.sessions.get(token) {
            Some(session) if !session.is_expired(now) => session,
            _ => return Ok(None),
        };
        Ok(tables
            .users
            .values()
            .find(|(user, _)| user.id == session.user_id)
            .map(|(user, _)| user.clone()))
    }

    async fn delete_session(&self, token: &str) -> Result<(), String> {
        self.tables.write().await.sessions.remove(token);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: i64) -> Result<u64, String> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| !session.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn add_donation(&self, donation: &Donation) -> Result<(), String> {
        self.tables.write().await.donations.push(donation.clone());
        Ok(())
    }

    async fn list_donations(&self, user_id: Option<&str>) -> Result<Vec<Donation>, String> {
        let tables = self.tables.read().await;
        let mut donations: Vec<Donation> = tables
            .donations
            .iter()
            .filter(|d| user_id.map_or(true, |id| d.user_id == id))
            .cloned()
            .collect();
        donations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(donations)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
