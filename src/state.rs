//! Shared application state.
//!
//! Contains the state that is shared across all request handlers:
//! configuration, the store, and the per-IP rate limiter.

use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;
use crate::store::Store;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// This state is cloned for each request handler; every field is a cheap `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ServerConfig>,
    /// Users, sessions and donations.
    pub store: Arc<dyn Store>,
    /// Per-IP request counters for `/api`.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>, store: Arc<dyn Store>) -> Self {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        Self {
            config,
            store,
            limiter,
        }
    }
}
