use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use super::config::ClientConfig;
use super::fetcher::{HttpUserFetcher, UserFetcher};
use super::token_store::{FileTokenStore, TokenStore};
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Not mounted yet.
    #[default]
    Uninitialized,
    /// First session check in flight.
    Loading,
    /// The check settled; `user` is authoritative.
    Resolved,
}

/// What consumers observe about the current session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthState {
    pub phase: SessionPhase,
    pub user: Option<User>,
}

impl AuthState {
    fn resolved(user: Option<User>) -> Self {
        Self {
            phase: SessionPhase::Resolved,
            user,
        }
    }

    /// True only while the initial session check is in flight.
    pub fn loading(&self) -> bool {
        self.phase == SessionPhase::Loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Owns the client's authentication state.
///
/// Created once at start-up and shared by `Arc`. Every fetch takes a ticket
/// from `latest`; a result is applied only while its ticket is still the
/// newest, so a slow response can never overwrite a newer login or logout.
pub struct AuthSession {
    tokens: Arc<dyn TokenStore>,
    fetcher: Arc<dyn UserFetcher>,
    state: watch::Sender<AuthState>,
    latest: AtomicU64,
    closed: AtomicBool,
}

impl AuthSession {
    pub fn new(tokens: Arc<dyn TokenStore>, fetcher: Arc<dyn UserFetcher>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            tokens,
            fetcher,
            state,
            latest: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// File-backed token storage and the HTTP fetcher, both from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, String> {
        let tokens = Arc::new(FileTokenStore::new(config.storage_path.clone()));
        let fetcher = Arc::new(HttpUserFetcher::new(config)?);
        Ok(Self::new(tokens, fetcher))
    }

    /// Restores the persisted session, if there is one.
    pub async fn mount(&self) {
        let token = match self.tokens.read() {
            Ok(token) => token,
            Err(e) => {
                error!("Failed to read session token: {}", e);
                None
            }
        };

        match token {
            Some(token) => {
                self.mark_initial_loading();
                self.resolve(&token).await;
            }
            None => {
                debug!("No stored session token");
                let ticket = self.next_ticket();
                self.apply(ticket, None);
            }
        }
    }

    /// Stores `token` and resolves the user it belongs to.
    pub async fn login(&self, token: &str) {
        if self.closed.load(Ordering::SeqCst) {
            debug!("Ignoring login on a closed session");
            return;
        }
        if let Err(e) = self.tokens.save(token) {
            error!("Failed to save session token: {}", e);
        }
        self.mark_initial_loading();
        self.resolve(token).await;
    }

    /// Forgets the token and signs out immediately; any fetch still in flight
    /// is discarded when it lands.
    pub fn logout(&self) {
        let ticket = self.next_ticket();
        if let Err(e) = self.tokens.clear() {
            error!("Failed to clear session token: {}", e);
        }
        self.apply(ticket, None);
        info!("Signed out");
    }

    /// Tears the session down. Later results are ignored.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.next_ticket();
        self.state.send_if_modified(|state| {
            let closed = AuthState::resolved(None);
            if *state == closed {
                return false;
            }
            *state = closed;
            true
        });
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading()
    }

    /// Change notifications for consumers.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn next_ticket(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Only the very first check shows as loading.
    fn mark_initial_loading(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.state.send_if_modified(|state| {
            if state.phase != SessionPhase::Uninitialized {
                return false;
            }
            state.phase = SessionPhase::Loading;
            true
        });
    }

    async fn resolve(&self, token: &str) {
        let ticket = self.next_ticket();
        let user = self.fetcher.fetch_user(token).await;
        self.apply(ticket, user);
    }

    /// Publishes a settled result unless a newer call (or `close`) superseded it.
    fn apply(&self, ticket: u64, user: Option<User>) -> bool {
        self.state.send_if_modified(|state| {
            if self.closed.load(Ordering::SeqCst) {
                return false;
            }
            let latest = self.latest.load(Ordering::SeqCst);
            if ticket != latest {
                debug!("Discarding stale session result {} (latest {})", ticket, latest);
                return false;
            }
            let next = AuthState::resolved(user);
            if *state == next {
                return false;
            }
            *state = next;
            true
        })
    }
}
