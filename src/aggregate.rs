//! Region loop: fetch each prefecture in table order, enrich, accumulate.
//!
//! Strictly sequential. Region N+1 is not requested until region N has been
//! fetched (including every backoff wait) and enriched, so at most one
//! upstream request is ever in flight.

use serde_json::Value;

use crate::enrich::enrich_all;
use crate::ingest::river_level::{build_region_url, take_observations};
use crate::logging::{self, Stage};
use crate::model::{AggregateResult, EnrichedObservation, ReferenceTables};

/// Per-region bookkeeping for the crawl summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Regions with a usable code.
    pub attempted: usize,
    /// Regions whose document was retrieved.
    pub fetched: usize,
    /// Regions dropped after the fetcher gave up.
    pub skipped: usize,
}

/// Builds an `AggregateResult` from the final item sequence.
pub fn summarize(items: Vec<EnrichedObservation>) -> AggregateResult {
    let flood_count = items.iter().filter(|i| i.is_flood).count();
    let warning_count = items.iter().filter(|i| i.is_warning).count();
    AggregateResult {
        total_items: items.len(),
        flood_count,
        warning_count,
        items,
    }
}

/// Crawls every region in `tables.regions`.
///
/// `fetch` receives the region URL and returns the parsed document, or
/// `None` once its own retries are exhausted. Regions without a code are
/// skipped before any fetch.
pub fn aggregate<F>(
    tables: &ReferenceTables,
    source_template: &str,
    mut fetch: F,
) -> (AggregateResult, CrawlStats)
where
    F: FnMut(&str) -> Option<Value>,
{
    let mut items: Vec<EnrichedObservation> = Vec::new();
    let mut stats = CrawlStats::default();

    for region in &tables.regions {
        logging::info(
            Stage::Fetch,
            None,
            &format!("{}: {}", region.name, region.code.as_deref().unwrap_or("")),
        );
        let Some(code) = region.fetchable_code() else {
            continue;
        };
        stats.attempted += 1;

        let url = build_region_url(source_template, code);
        let Some(document) = fetch(&url) else {
            logging::warn(
                Stage::Fetch,
                Some(code),
                &format!("skip {} due to fetch errors", code),
            );
            stats.skipped += 1;
            continue;
        };
        stats.fetched += 1;

        let Some(observations) = take_observations(document) else {
            logging::warn(Stage::Enrich, Some(code), "document has no obss array");
            continue;
        };
        let (enriched, dropped) = enrich_all(observations, tables);
        if dropped > 0 {
            logging::warn(
                Stage::Enrich,
                Some(code),
                &format!("dropped {} non-object observation(s)", dropped),
            );
        }
        logging::debug(
            Stage::Enrich,
            Some(code),
            &format!("{} observation(s) enriched", enriched.len()),
        );
        items.extend(enriched);
    }

    logging::log_crawl_summary(stats.attempted, stats.fetched, stats.skipped);
    (summarize(items), stats)
}
