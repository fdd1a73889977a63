/// End-to-end tests for one crawl cycle
///
/// These tests verify:
/// 1. Regions without a code are never requested
/// 2. A region that keeps failing is retried on the backoff schedule, then skipped
/// 3. Enriched items keep region order and carry place names and flags
/// 4. The hour bucket file and latest.json are written with identical bytes
///
/// Upstream is replaced by fixture files under tests/fixtures; no network
/// access is needed.

use river_snapshot::config::CrawlerConfig;
use river_snapshot::digest::AlertDigest;
use river_snapshot::ingest::fetch::JsonSource;
use river_snapshot::model::{FetchError, SOURCE_TEMPLATE};
use river_snapshot::pipeline::run_once;
use river_snapshot::reference::load_reference_tables;

use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Serves `area_<code>.json` fixtures; any other region answers 503.
struct FixtureSource {
    requests: RefCell<Vec<String>>,
}

impl FixtureSource {
    fn new() -> Self {
        Self { requests: RefCell::new(Vec::new()) }
    }

    fn requests_for(&self, code: &str) -> usize {
        let url = SOURCE_TEMPLATE.replace("{prefCode}", code);
        self.requests.borrow().iter().filter(|u| **u == url).count()
    }
}

impl JsonSource for FixtureSource {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.requests.borrow_mut().push(url.to_string());
        let code = url
            .rsplit('/')
            .next()
            .and_then(|file| file.strip_suffix(".json"))
            .ok_or_else(|| FetchError::Transport(format!("unexpected url {}", url)))?;
        match fs::read_to_string(fixture_path(&format!("area_{}.json", code))) {
            Ok(body) => serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string())),
            Err(_) => Err(FetchError::HttpStatus(503)),
        }
    }
}

fn test_config(output_root: PathBuf) -> CrawlerConfig {
    CrawlerConfig {
        output_root,
        pref_table: fixture_path("pref.json"),
        town_table: fixture_path("twn.json"),
        ..CrawlerConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Crawl Cycle Tests
// ---------------------------------------------------------------------------

#[test]
fn test_full_cycle_against_fixtures() {
    let out = tempfile::tempdir().expect("temp dir");
    let config = test_config(out.path().join("public").join("data"));
    let tables = load_reference_tables(&config.pref_table, &config.town_table)
        .expect("fixture reference tables should load");
    let source = FixtureSource::new();
    let mut sleeps = Vec::new();
    let now = Utc.with_ymd_and_hms(2024, 1, 5, 14, 30, 0).unwrap();

    let (published, stats) = run_once(&config, &tables, &source, |d| sleeps.push(d), || now)
        .expect("publish should succeed in a temp dir");

    // Only coded regions are requested; 02 is retried twice then skipped.
    assert_eq!(source.requests.borrow().len(), 1 + 3 + 1);
    assert_eq!(source.requests_for("01"), 1);
    assert_eq!(source.requests_for("02"), 3);
    assert_eq!(source.requests_for("13"), 1);
    assert!(source.requests.borrow().iter().all(|u| !u.ends_with("/.json")));
    assert_eq!(sleeps, vec![Duration::from_millis(500), Duration::from_millis(1000)]);
    assert_eq!((stats.attempted, stats.fetched, stats.skipped), (3, 2, 1));

    let snapshot = &published.snapshot;
    assert_eq!(snapshot.hour_path, "2024/01/05/23");
    assert_eq!(snapshot.generated_at, "2024-01-05T14:30:00.000Z");
    assert_eq!(snapshot.total_items, 3);
    assert_eq!(snapshot.flood_count, 1);
    assert_eq!(snapshot.warning_count, 2);

    let codes: Vec<_> = snapshot.items.iter().filter_map(|i| i.station_code()).collect();
    assert_eq!(codes, vec!["0101100001", "0101100002", "1310100001"]);
}

#[test]
fn test_clock_is_read_after_every_fetch_and_sleep() {
    let out = tempfile::tempdir().expect("temp dir");
    let config = test_config(out.path().to_path_buf());
    let tables = load_reference_tables(&config.pref_table, &config.town_table).unwrap();
    let source = FixtureSource::new();
    let sleeps = Cell::new(0usize);
    let seen_at_clock = Cell::new(None);
    let publish_time = Utc.with_ymd_and_hms(2024, 1, 5, 15, 0, 0).unwrap();

    let (published, _) = run_once(
        &config,
        &tables,
        &source,
        |_| sleeps.set(sleeps.get() + 1),
        || {
            seen_at_clock.set(Some((source.requests.borrow().len(), sleeps.get())));
            publish_time
        },
    )
    .unwrap();

    // 01 once, 02 three times (two backoff waits), 13 once
    assert_eq!(seen_at_clock.get(), Some((5, 2)), "clock read before the crawl finished");
    assert_eq!(source.requests.borrow().len(), 5);
    assert_eq!(sleeps.get(), 2);

    // A crawl that started at 23:59 JST but finished at 00:00 lands in the new hour
    assert_eq!(published.snapshot.generated_at, "2024-01-05T15:00:00.000Z");
    assert_eq!(published.hour_path, "2024/01/06/00");
}

#[test]
fn test_published_files_are_identical_and_well_formed() {
    let out = tempfile::tempdir().expect("temp dir");
    let config = test_config(out.path().to_path_buf());
    let tables = load_reference_tables(&config.pref_table, &config.town_table).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 5, 14, 30, 0).unwrap();

    let (published, _) = run_once(&config, &tables, &FixtureSource::new(), |_| {}, || now).unwrap();

    let bucket = out.path().join("2024").join("01").join("05").join("23").join("index.json");
    let latest = out.path().join("latest.json");
    assert_eq!(published.bucket_file, bucket);
    assert_eq!(published.latest_file, latest);

    let bucket_bytes = fs::read(&bucket).expect("hour bucket file should exist");
    let latest_bytes = fs::read(&latest).expect("latest file should exist");
    assert_eq!(bucket_bytes, latest_bytes, "latest.json must mirror the hour bucket");

    let text = String::from_utf8(latest_bytes).unwrap();
    assert!(text.starts_with("{\n  \"generatedAt\""), "pretty-printed with 2 spaces");
    assert!(!text.contains("\"lat\""));
    assert!(!text.contains("\"lon\""));

    let json: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["timeZone"], "Asia/Tokyo");
    assert_eq!(json["source"], SOURCE_TEMPLATE);

    let first = &json["items"][0];
    assert_eq!(first["placePref"], "北海道");
    assert_eq!(first["placeCity"], "札幌市");
    assert_eq!(first["placeRiver"], "石狩川");
    assert_eq!(first["placeCountry"], "日本");
    assert_eq!(first["observedAt"], "2024-01-05T23:30:00.000");
    assert_eq!(first["isWarning"], true);
    assert_eq!(first["isFlood"], false);
    assert_eq!(first["latitude"], 43.06);

    // townCode fallback and string levels
    let second = &json["items"][1];
    assert_eq!(second["placeCity"], "札幌市");
    assert_eq!(second["isFlood"], true);

    // Unknown town, empty time, null level, pre-existing latitude replaced
    let third = &json["items"][2];
    assert_eq!(third["placePref"], "東京都");
    assert!(third.get("placeCity").is_none());
    assert_eq!(third["observedAt"], Value::Null);
    assert_eq!(third["isWarning"], false);
    assert_eq!(third["isFlood"], false);
    assert_eq!(third["latitude"], 35.69);
}

#[test]
fn test_second_run_in_same_hour_overwrites() {
    let out = tempfile::tempdir().expect("temp dir");
    let config = test_config(out.path().to_path_buf());
    let tables = load_reference_tables(&config.pref_table, &config.town_table).unwrap();

    let first = Utc.with_ymd_and_hms(2024, 1, 5, 14, 5, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2024, 1, 5, 14, 55, 0).unwrap();
    run_once(&config, &tables, &FixtureSource::new(), |_| {}, || first).unwrap();
    let (published, _) = run_once(&config, &tables, &FixtureSource::new(), |_| {}, || second).unwrap();

    let bucket: Value = serde_json::from_str(&fs::read_to_string(&published.bucket_file).unwrap()).unwrap();
    assert_eq!(bucket["generatedAt"], "2024-01-05T14:55:00.000Z");
    assert_eq!(
        fs::read(&published.bucket_file).unwrap(),
        fs::read(&published.latest_file).unwrap()
    );
}

#[test]
fn test_digest_reads_latest_file() {
    let out = tempfile::tempdir().expect("temp dir");
    let config = test_config(out.path().to_path_buf());
    let tables = load_reference_tables(&config.pref_table, &config.town_table).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 5, 14, 30, 0).unwrap();
    run_once(&config, &tables, &FixtureSource::new(), |_| {}, || now).unwrap();

    let digest = AlertDigest::from_file(&config.latest_path()).expect("latest.json should parse");
    assert_eq!(digest.total_items, 3);
    assert_eq!(digest.warning_count, Some(2));
    assert_eq!(digest.lines.len(), 2, "only flagged items are listed");
    assert!(digest.lines[1].contains("[FLOOD]"));
    assert_eq!(digest.remaining, 0);
}

#[test]
fn test_unwritable_output_root_is_fatal() {
    let out = tempfile::tempdir().expect("temp dir");
    let blocker = out.path().join("not_a_dir");
    fs::write(&blocker, b"file").unwrap();
    let config = test_config(blocker.join("data"));
    let tables = load_reference_tables(&config.pref_table, &config.town_table).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 5, 14, 30, 0).unwrap();

    let result = run_once(&config, &tables, &FixtureSource::new(), |_| {}, || now);
    assert!(result.is_err(), "writing under a regular file must fail");
}
