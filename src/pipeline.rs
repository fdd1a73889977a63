//! One pull-transform-publish cycle.
//!
//! Wires the fetcher, the region loop and the publisher together. The
//! transport, sleep function and clock are parameters so the whole cycle
//! can run against canned documents in tests.
//!
//! The clock is read once, after the last region has been fetched, so the
//! hour bucket and `generatedAt` reflect publish time.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::aggregate::{CrawlStats, aggregate};
use crate::config::CrawlerConfig;
use crate::ingest::fetch::{JsonSource, fetch_with_retry};
use crate::model::{CrawlError, ReferenceTables};
use crate::publish::{PublishedSnapshot, publish};

/// Crawls every region, then publishes the snapshot stamped with `clock()`.
///
/// # Errors
/// Only publish-stage failures. Fetch and enrichment problems are logged
/// and degrade to skipped regions or absent fields.
pub fn run_once<S, F, C>(
    config: &CrawlerConfig,
    tables: &ReferenceTables,
    source: &S,
    mut sleep: F,
    clock: C,
) -> Result<(PublishedSnapshot, CrawlStats), CrawlError>
where
    S: JsonSource + ?Sized,
    F: FnMut(Duration),
    C: FnOnce() -> DateTime<Utc>,
{
    let policy = config.retry_policy();
    let (result, stats) = aggregate(tables, &config.source_template, |url| {
        fetch_with_retry(source, url, &policy, &mut sleep)
    });
    let now = clock();
    let published = publish(result, &config.output_root, &config.source_template, now)?;
    Ok((published, stats))
}
