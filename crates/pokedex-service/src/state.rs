//! Application state shared across handlers.
//!
//! The engine serializes its own store writes, so handlers share it without
//! an outer lock. Only the refresh bookkeeping needs synchronization here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use pokedex_core::Pokedex;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// The aggregation engine.
    pub pokedex: Pokedex,
    /// Configuration the service was started with.
    pub config: Config,
    /// Background refresh control state.
    pub refresh: RefreshState,
}

impl AppState {
    /// Create new application state.
    pub fn new(pokedex: Pokedex, config: Config) -> Arc<Self> {
        Arc::new(Self {
            pokedex,
            config,
            refresh: RefreshState::new(),
        })
    }
}

/// State for tracking the background cache refresh.
pub struct RefreshState {
    /// Whether a refresh is currently running.
    running: AtomicBool,
    /// When the current refresh was started (Unix timestamp).
    started_at: AtomicU64,
    /// Outcome of the last finished refresh.
    last_run: RwLock<Option<RefreshRun>>,
}

impl RefreshState {
    /// Create an idle refresh state.
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            started_at: AtomicU64::new(0),
            last_run: RwLock::new(None),
        }
    }

    /// Check if a refresh is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Claim the refresh slot.
    ///
    /// Returns `false` if another refresh already holds it.
    pub fn try_begin(&self) -> bool {
        let claimed = self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if claimed {
            let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
            self.started_at.store(now, Ordering::SeqCst);
        }
        claimed
    }

    /// When the current refresh was started, if one is running.
    pub fn started_at(&self) -> Option<OffsetDateTime> {
        if !self.is_running() {
            return None;
        }
        let ts = self.started_at.load(Ordering::SeqCst);
        if ts == 0 {
            None
        } else {
            OffsetDateTime::from_unix_timestamp(ts as i64).ok()
        }
    }

    /// Record the outcome of a refresh and release the slot.
    pub async fn finish(&self, run: RefreshRun) {
        *self.last_run.write().await = Some(run);
        self.running.store(false, Ordering::SeqCst);
    }

    /// Outcome of the last finished refresh.
    pub async fn last_run(&self) -> Option<RefreshRun> {
        self.last_run.read().await.clone()
    }
}

impl Default for RefreshState {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one finished refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRun {
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    /// Records persisted by the crawl.
    pub records: usize,
    /// Entries skipped after failing to resolve.
    pub skipped: usize,
    /// Whether the crawl reached the end of the listing.
    pub complete: bool,
    /// Error that stopped the refresh, if any.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_state_initial() {
        let state = RefreshState::new();
        assert!(!state.is_running());
        assert!(state.started_at().is_none());
    }

    #[tokio::test]
    async fn test_refresh_state_single_claim() {
        let state = RefreshState::new();
        assert!(state.try_begin());
        assert!(!state.try_begin());
        assert!(state.is_running());
        assert!(state.started_at().is_some());

        let now = OffsetDateTime::now_utc();
        state
            .finish(RefreshRun {
                started_at: now,
                finished_at: now,
                records: 3,
                skipped: 1,
                complete: true,
                error: None,
            })
            .await;

        assert!(!state.is_running());
        assert_eq!(state.last_run().await.unwrap().records, 3);
        assert!(state.try_begin());
    }

    #[test]
    fn test_refresh_run_serialization() {
        let run = RefreshRun {
            started_at: OffsetDateTime::UNIX_EPOCH,
            finished_at: OffsetDateTime::UNIX_EPOCH,
            records: 10,
            skipped: 0,
            complete: false,
            error: Some("Store error".to_string()),
        };
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["records"], 10);
        assert_eq!(json["started_at"], "1970-01-01T00:00:00Z");
        assert_eq!(json["error"], "Store error");
    }
}
