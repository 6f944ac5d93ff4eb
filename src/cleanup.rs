//! Background housekeeping: expired sessions and idle rate-limit windows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::rate_limit::RateLimiter;
use crate::store::Store;

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
        }
    }
}

/// Runs one cleanup pass and returns the number of sessions removed.
pub async fn run_cleanup(store: &dyn Store, limiter: &RateLimiter) -> Result<u64, String> {
    let removed = store
        .delete_expired_sessions(Utc::now().timestamp())
        .await?;
    let pruned = limiter.prune();
    debug!("Cleanup pruned {} idle rate-limit windows", pruned);
    Ok(removed)
}

/// Spawns the periodic cleanup task. Returns `None` when disabled.
/// Aborting the returned handle stops the job.
pub fn start_cleanup_job(
    config: &CleanupConfig,
    store: Arc<dyn Store>,
    limiter: Arc<RateLimiter>,
) -> Option<JoinHandle<()>> {
    if !config.enabled {
        info!("Cleanup job disabled.");
        return None;
    }

    let period = Duration::from_secs(config.interval_secs.max(1));
    info!("Starting cleanup job every {}s", period.as_secs());

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match run_cleanup(store.as_ref(), &limiter).await {
                Ok(0) => debug!("Cleanup found no expired sessions"),
                Ok(removed) => info!("Cleanup removed {} expired sessions", removed),
                Err(e) => error!("Cleanup failed: {}", e),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;
    use crate::rate_limit::RateLimitConfig;
    use crate::store::memory_store::MemoryStore;

    #[tokio::test]
    async fn pass_removes_only_expired_sessions() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(&RateLimitConfig::default());

        let live = Session::issue("u1", 3600);
        let mut expired = Session::issue("u1", 3600);
        expired.expires_at = expired.created_at - 10;
        store.add_session(&live).await.unwrap();
        store.add_session(&expired).await.unwrap();

        assert_eq!(run_cleanup(&store, &limiter).await.unwrap(), 1);
        assert_eq!(run_cleanup(&store, &limiter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn job_ticks_on_interval() {
        let store = Arc::new(MemoryStore::new());
        let limiter = Arc::new(RateLimiter::new(&RateLimitConfig::default()));
        let mut expired = Session::issue("u1", 3600);
        expired.expires_at = expired.created_at - 10;
        store.add_session(&expired).await.unwrap();

        let handle = start_cleanup_job(
            &CleanupConfig {
                enabled: true,
                interval_secs: 1,
            },
            store.clone(),
            limiter,
        )
        .expect("job should start");

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(
            store.delete_expired_sessions(Utc::now().timestamp()).await.unwrap(),
            0
        );
        handle.abort();
    }

    #[test]
    fn disabled_job_is_not_spawned() {
        let config = CleanupConfig {
            enabled: false,
            interval_secs: 5,
        };
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let limiter = Arc::new(RateLimiter::new(&RateLimitConfig::default()));
        assert!(start_cleanup_job(&config, store, limiter).is_none());
    }
}
