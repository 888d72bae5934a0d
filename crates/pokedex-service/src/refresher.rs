//! Background cache refresher.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{error, info};

use crate::state::{AppState, RefreshRun};

/// Runs full cache refreshes in the background, one at a time.
pub struct Refresher {
    state: Arc<AppState>,
}

impl Refresher {
    /// Create a new refresher.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Start a refresh in the background.
    ///
    /// Returns immediately; the crawl happens in a spawned task.
    pub fn start(&self) -> Result<(), RefreshError> {
        if !self.state.refresh.try_begin() {
            return Err(RefreshError::AlreadyRunning);
        }

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            run_refresh(state).await;
        });
        Ok(())
    }

    /// Start a refresh only if the cache is empty.
    ///
    /// Returns whether a refresh was started.
    pub fn warm_up(&self) -> bool {
        if self.state.pokedex.store().is_populated() {
            info!("Cache already populated, skipping warm-up crawl");
            return false;
        }
        info!("Cache is empty, starting warm-up crawl");
        self.start().is_ok()
    }
}

/// Run one refresh and record its outcome. The caller must hold the slot.
async fn run_refresh(state: Arc<AppState>) {
    let started_at = OffsetDateTime::now_utc();
    info!("Cache refresh started");

    let run = match state.pokedex.refresh_cache().await {
        Ok(report) => {
            info!(
                "Cache refresh finished: {} records, {} skipped",
                report.records.len(),
                report.skipped
            );
            RefreshRun {
                started_at,
                finished_at: OffsetDateTime::now_utc(),
                records: report.records.len(),
                skipped: report.skipped,
                complete: report.complete,
                error: None,
            }
        }
        Err(e) => {
            error!("Cache refresh failed: {}", e);
            RefreshRun {
                started_at,
                finished_at: OffsetDateTime::now_utc(),
                records: 0,
                skipped: 0,
                complete: false,
                error: Some(e.to_string()),
            }
        }
    };

    state.refresh.finish(run).await;
}

/// Refresher errors.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("A cache refresh is already running")]
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Config;
    use pokedex_core::mock::{MockUpstream, PokemonFixture};
    use pokedex_core::{Pokedex, PokedexOptions};
    use pokedex_store::MemoryStore;
    use pokedex_types::{CollectionEnvelope, DetailRecord};

    fn state_with(upstream: Arc<MockUpstream>, store: Arc<MemoryStore>) -> Arc<AppState> {
        let pokedex = Pokedex::with_options(
            upstream,
            store,
            PokedexOptions::default()
                .page_size(2)
                .crawl_delay(Duration::ZERO),
        );
        AppState::new(pokedex, Config::default())
    }

    async fn wait_idle(state: &AppState) {
        for _ in 0..200 {
            if !state.refresh.is_running() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("refresh did not finish");
    }

    #[tokio::test]
    async fn test_refresh_runs_in_background() {
        let upstream = Arc::new(MockUpstream::new());
        upstream.add_pokemon(&PokemonFixture::new(1, "bulbasaur"));
        upstream.add_listing(2, &[(1, "bulbasaur")]);
        let store = Arc::new(MemoryStore::new());
        let state = state_with(upstream, store.clone());

        Refresher::new(Arc::clone(&state)).start().unwrap();
        wait_idle(&state).await;

        let run = state.refresh.last_run().await.unwrap();
        assert_eq!(run.records, 1);
        assert!(run.complete);
        assert!(run.error.is_none());
        assert_eq!(pokedex_store::CacheStore::load(store.as_ref()).total, 1);
    }

    #[tokio::test]
    async fn test_refresh_rejects_second_start() {
        let state = state_with(
            Arc::new(MockUpstream::new()),
            Arc::new(MemoryStore::new()),
        );
        assert!(state.refresh.try_begin());

        let result = Refresher::new(Arc::clone(&state)).start();
        assert!(matches!(result, Err(RefreshError::AlreadyRunning)));
    }

    #[tokio::test]
    async fn test_warm_up_skips_populated_cache() {
        let mut envelope = CollectionEnvelope::default();
        envelope.upsert(DetailRecord::stub(1, "bulbasaur", String::new()));
        let upstream = Arc::new(MockUpstream::forbidding_calls());
        let state = state_with(upstream.clone(), Arc::new(MemoryStore::with_envelope(envelope)));

        assert!(!Refresher::new(Arc::clone(&state)).warm_up());
        assert!(!state.refresh.is_running());
        assert_eq!(upstream.total_calls(), 0);
    }
}
