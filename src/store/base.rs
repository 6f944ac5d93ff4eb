use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{memory_store::MemoryStore, mongodb_store::MongoDBStore};
use crate::config::StoreBackend;
use crate::models::{Donation, Session, User};

/// The Store trait abstracts persistence of users, sessions and donations.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a user with its password hash. Returns `false` when the username is taken.
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<bool, String>;
    /// Looks up a user and its password hash by username.
    async fn find_credentials(&self, username: &str) -> Result<Option<(User, String)>, String>;
    async fn count_users(&self) -> Result<u64, String>;

    async fn add_session(&self, session: &Session) -> Result<(), String>;
    /// Resolves a session token to its user. Expired sessions resolve to `None`.
    async fn get_session_user(&self, token: &str, now: i64) -> Result<Option<User>, String>;
    async fn delete_session(&self, token: &str) -> Result<(), String>;
    /// Removes every session expired at `now`, returning how many were removed.
    async fn delete_expired_sessions(&self, now: i64) -> Result<u64, String>;

    async fn add_donation(&self, donation: &Donation) -> Result<(), String>;
    /// Lists donations, newest first, optionally restricted to one user.
    async fn list_donations(&self, user_id: Option<&str>) -> Result<Vec<Donation>, String>;

    fn is_persistent(&self) -> bool {
        // Real databases return true; the in-memory store overrides this
        // so startup can report that no database is configured.
        true
    }
}

/// Connects to the configured backend and returns it as a shared store.
pub async fn connect_db(backend: &StoreBackend) -> Result<Arc<dyn Store>, String> {
    match backend {
        StoreBackend::MongoDB(mongo_config) => match MongoDBStore::new(mongo_config).await {
            Ok(store) => {
                info!("Successfully created MongoDB store.");
                Ok(Arc::new(store))
            }
            Err(e) => {
                error!("Failed to create MongoDB store: {}", e);
                Err(e)
            }
        },
        StoreBackend::Memory => {
            info!("No MongoDB URI configured. Using in-memory store.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
