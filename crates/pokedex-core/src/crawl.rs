//! Bulk crawl of the upstream catalog.
//!
//! The crawl walks the listing endpoint page by page. Every entry of a page
//! is resolved concurrently, with entry `i` waiting `i × crawl_delay` before
//! its first request. The crawl stops at the first short page or at the
//! first failed listing request; failed entries are skipped.

use std::time::Duration;

use futures::future::join_all;
use tracing::{error, info, warn};

use pokedex_types::{CollectionEnvelope, DetailRecord, resource_id};

use crate::error::Result;
use crate::pokedex::Pokedex;
use crate::resources::{ListingPage, NamedResource};
use crate::upstream::fetch_as;

/// Outcome of one bulk crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Resolved records in listing order.
    pub records: Vec<DetailRecord>,
    /// Entries that failed to resolve.
    pub skipped: usize,
    /// Listing pages fetched.
    pub pages: u32,
    /// Whether the crawl reached a short page rather than a listing failure.
    pub complete: bool,
    /// Catalog size reported by the first listing page.
    pub reported_count: Option<u32>,
}

impl Pokedex {
    /// Crawl the whole upstream catalog without touching the store.
    pub async fn crawl(&self) -> CrawlReport {
        let page_size = self.options.page_size.max(1);
        let mut report = CrawlReport::default();
        let mut offset: u32 = 0;

        loop {
            let url = self.options.endpoints.listing(offset, page_size);
            let page: ListingPage = match fetch_as(self.upstream.as_ref(), &url).await {
                Ok(page) => page,
                Err(e) => {
                    error!("Listing at offset {} failed, stopping crawl: {}", offset, e);
                    break;
                }
            };
            report.pages += 1;
            if report.reported_count.is_none() {
                report.reported_count = page.count;
            }

            let entries = page.results.len();
            let resolved = join_all(
                page.results
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| self.crawl_entry(i, entry)),
            )
            .await;

            for (entry, result) in page.results.iter().zip(resolved) {
                match result {
                    Ok(record) => report.records.push(record),
                    Err(e) => {
                        warn!("Skipping '{}' during crawl: {}", entry.name, e);
                        report.skipped += 1;
                    }
                }
            }
            info!(
                "Crawled page at offset {} ({} entries, {} records so far)",
                offset,
                entries,
                report.records.len()
            );

            if entries < page_size as usize {
                report.complete = true;
                break;
            }
            offset = offset.saturating_add(page_size);
        }

        info!(
            "Crawl finished: {} records, {} skipped, complete = {}",
            report.records.len(),
            report.skipped,
            report.complete
        );
        report
    }

    async fn crawl_entry(&self, index: usize, entry: &NamedResource) -> Result<DetailRecord> {
        let delay = self
            .options
            .crawl_delay
            .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }

        let key = match resource_id(&entry.url) {
            Ok(id) => id.to_string(),
            Err(_) => entry.name.to_lowercase(),
        };
        self.resolve_record(&key).await
    }

    /// Every record, crawling and persisting the catalog unless a complete
    /// crawl is already cached.
    ///
    /// Records cached one lookup at a time do not count as the catalog. Only
    /// one bulk crawl runs at a time; callers arriving during a crawl wait for
    /// it and are then served from the cache.
    pub async fn get_all_details(&self) -> Result<Vec<DetailRecord>> {
        if let Some(records) = self.cached_catalog() {
            return Ok(records);
        }

        let _crawl = self.crawl_lock.lock().await;
        if let Some(records) = self.cached_catalog() {
            return Ok(records);
        }

        info!("No complete catalog cached, crawling upstream");
        let report = self.crawl().await;
        self.persist_crawl(&report).await
    }

    /// Clear the store and rebuild it from a fresh crawl.
    ///
    /// Records not rediscovered by the crawl are gone afterwards.
    pub async fn refresh_cache(&self) -> Result<CrawlReport> {
        let _crawl = self.crawl_lock.lock().await;
        {
            let _guard = self.write_lock.lock().await;
            self.store.clear()?;
        }
        info!("Cache cleared, starting full refresh");

        let report = self.crawl().await;
        self.persist_crawl(&report).await?;
        Ok(report)
    }

    fn cached_catalog(&self) -> Option<Vec<DetailRecord>> {
        let envelope = self.store.load();
        (!envelope.has_more && !envelope.data.is_empty()).then_some(envelope.data)
    }

    /// Write crawled records in listing order, followed by any cached record
    /// the listing did not cover. Cached evolution steps are kept.
    async fn persist_crawl(&self, report: &CrawlReport) -> Result<Vec<DetailRecord>> {
        let _guard = self.write_lock.lock().await;
        let cached = self.store.load();

        let mut envelope = CollectionEnvelope {
            data: Vec::with_capacity(report.records.len()),
            page: 1,
            limit: self.options.page_size.max(1),
            total: 0,
            has_more: !report.complete,
        };
        for record in &report.records {
            let mut record = record.clone();
            if record.evolution_steps.is_empty()
                && let Some(existing) = cached.find_by_id(record.id)
            {
                record.evolution_steps = existing.evolution_steps.clone();
            }
            envelope.upsert(record);
        }
        for record in cached.data {
            if envelope.find_by_id(record.id).is_none() {
                envelope.upsert(record);
            }
        }

        self.store.save(&envelope)?;
        info!("Persisted {} crawled records", envelope.total);
        Ok(envelope.data)
    }
}
