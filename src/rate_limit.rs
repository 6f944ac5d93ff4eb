//! Per-client-IP request limiting for `/api`.
//!
//! Fixed windows: the first request from an IP opens a window of
//! `window_secs`; up to `max_requests` are admitted until it closes.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::state::AppState;
use crate::utils::log_throttle::LogThrottle;

const REJECTION_MESSAGE: &str = "Too many requests, please try again later.";
const REJECTION_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RateLimitError {
    #[error("rate limit exceeded (max {limit} requests per window), retry in {}s", retry_after.as_secs())]
    Exceeded { limit: u32, retry_after: Duration },
}

/// Quota left for an admitted request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    hits: u32,
}

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Window>>,
    rejections: LogThrottle,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            windows: Mutex::new(HashMap::new()),
            rejections: LogThrottle::new(REJECTION_LOG_INTERVAL),
        }
    }

    /// Counts a request from `ip` and admits or rejects it.
    pub fn check(&self, ip: IpAddr) -> Result<Quota, RateLimitError> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Result<Quota, RateLimitError> {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let window = windows.entry(ip).or_insert(Window {
            opened_at: now,
            hits: 0,
        });
        if now.duration_since(window.opened_at) >= self.window {
            window.opened_at = now;
            window.hits = 0;
        }

        let reset_after = self
            .window
            .saturating_sub(now.duration_since(window.opened_at));
        if window.hits >= self.max_requests {
            return Err(RateLimitError::Exceeded {
                limit: self.max_requests,
                retry_after: reset_after,
            });
        }

        window.hits += 1;
        Ok(Quota {
            limit: self.max_requests,
            remaining: self.max_requests - window.hits,
            reset_after,
        })
    }

    /// Drops windows that have closed. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    fn prune_at(&self, now: Instant) -> usize {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.opened_at) < self.window);
        self.rejections.prune();
        before - windows.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

fn header_value(value: u64) -> HeaderValue {
    HeaderValue::from(value)
}

/// Middleware applied to the `/api` router.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match state.limiter.check(ip) {
        Ok(quota) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                HeaderName::from_static("ratelimit-limit"),
                header_value(quota.limit.into()),
            );
            headers.insert(
                HeaderName::from_static("ratelimit-remaining"),
                header_value(quota.remaining.into()),
            );
            headers.insert(
                HeaderName::from_static("ratelimit-reset"),
                header_value(quota.reset_after.as_secs()),
            );
            response
        }
        Err(err) => {
            let RateLimitError::Exceeded { retry_after, .. } = &err;
            if let Some(suppressed) = state.limiter.rejections.should_emit(&ip.to_string()) {
                warn!(
                    client_ip = %ip,
                    suppressed,
                    "Rejected request to {}: {}",
                    request.uri().path(),
                    err
                );
            }
            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": REJECTION_MESSAGE })))
                    .into_response();
            response.headers_mut().insert(
                axum::http::header::RETRY_AFTER,
                header_value(retry_after.as_secs().max(1)),
            );
            response
        }
    }
}
