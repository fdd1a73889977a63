/// Snapshot publishing.
///
/// Writes the aggregate result twice with identical bytes:
///   <root>/<YYYY>/<MM>/<DD>/<HH>/index.json   (hour bucket, JST)
///   <root>/latest.json                          (what the viewer reads)
///
/// There is no locking. A reader polling `latest.json` mid-write can see the
/// previous version or a truncated file.
///
/// # Clock injection
/// `publish` takes `now` instead of calling `Utc::now()` so hour bucket
/// derivation is deterministic in tests.

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Timelike, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{self, Stage};
use crate::model::{
    AggregateResult, CrawlError, SNAPSHOT_OFFSET_SECS, SNAPSHOT_TIME_ZONE, SnapshotOutput,
};

/// File name inside each hour bucket.
pub const BUCKET_FILE: &str = "index.json";

/// File name of the latest pointer under the output root.
pub const LATEST_FILE: &str = "latest.json";

/// Where a snapshot was written.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedSnapshot {
    pub hour_path: String,
    pub bucket_file: PathBuf,
    pub latest_file: PathBuf,
    pub snapshot: SnapshotOutput,
}

// ---------------------------------------------------------------------------
// Hour bucket derivation
// ---------------------------------------------------------------------------

/// `YYYY/MM/DD/HH` for `now` shifted to UTC+9.
pub fn hour_path(now: DateTime<Utc>) -> String {
    let local = now.naive_utc() + Duration::seconds(i64::from(SNAPSHOT_OFFSET_SECS));
    format!(
        "{:04}/{:02}/{:02}/{:02}",
        local.year(),
        local.month(),
        local.day(),
        local.hour()
    )
}

/// ISO-8601 UTC with milliseconds and a `Z` suffix.
pub fn generated_at(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Wraps an aggregate result in the published envelope.
pub fn build_snapshot(result: AggregateResult, source: &str, now: DateTime<Utc>) -> SnapshotOutput {
    SnapshotOutput {
        generated_at: generated_at(now),
        time_zone: SNAPSHOT_TIME_ZONE.to_string(),
        hour_path: hour_path(now),
        source: source.to_string(),
        total_items: result.total_items,
        flood_count: result.flood_count,
        warning_count: result.warning_count,
        items: result.items,
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn io_error(path: &Path, source: std::io::Error) -> CrawlError {
    CrawlError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn write_file(dir: &Path, file: &Path, bytes: &[u8]) -> Result<(), CrawlError> {
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
    fs::write(file, bytes).map_err(|e| io_error(file, e))
}

/// Serializes the snapshot once and writes it to the hour bucket and to
/// `latest.json` under `output_root`.
///
/// # Errors
/// Any serialization or file-system failure. Nothing already written is
/// cleaned up.
pub fn publish(
    result: AggregateResult,
    output_root: &Path,
    source: &str,
    now: DateTime<Utc>,
) -> Result<PublishedSnapshot, CrawlError> {
    let snapshot = build_snapshot(result, source, now);
    let body = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| CrawlError::Serialize(e.to_string()))?;

    let bucket_dir = snapshot
        .hour_path
        .split('/')
        .fold(output_root.to_path_buf(), |dir, part| dir.join(part));
    let bucket_file = bucket_dir.join(BUCKET_FILE);
    write_file(&bucket_dir, &bucket_file, body.as_bytes())?;
    logging::info(
        Stage::Publish,
        None,
        &format!(
            "wrote: {} ({} flood items)",
            bucket_file.display(),
            snapshot.flood_count
        ),
    );

    let latest_file = output_root.join(LATEST_FILE);
    write_file(output_root, &latest_file, body.as_bytes())?;
    logging::info(
        Stage::Publish,
        None,
        &format!("updated latest: {}", latest_file.display()),
    );

    Ok(PublishedSnapshot {
        hour_path: snapshot.hour_path.clone(),
        bucket_file,
        latest_file,
        snapshot,
    })
}
