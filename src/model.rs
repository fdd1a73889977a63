/// Core data types for the river level snapshot crawler.
///
/// This module defines the shared domain model imported by all other modules:
/// reference table entries, the enriched observation record, the published
/// snapshot envelope, and the error types that cross module boundaries.
/// It contains no I/O.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Upstream constants
// ---------------------------------------------------------------------------

/// URL template for the per-prefecture current observation file.
pub const SOURCE_TEMPLATE: &str =
    "https://k.river.go.jp/swin/files/area_info/current/{prefCode}.json";

/// Placeholder substituted with the region code in `SOURCE_TEMPLATE`.
pub const REGION_PLACEHOLDER: &str = "{prefCode}";

/// Value written to `placeCountry` on every record.
pub const PLACE_COUNTRY: &str = "日本";

/// Zone label recorded in the snapshot envelope.
pub const SNAPSHOT_TIME_ZONE: &str = "Asia/Tokyo";

/// Fixed offset of the hour bucket, in seconds east of UTC (JST, no DST).
pub const SNAPSHOT_OFFSET_SECS: i32 = 9 * 60 * 60;

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// A first-level administrative region (prefecture).
///
/// `code` may be missing or empty in the source table; such regions are
/// never fetched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Region {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
}

impl Region {
    /// Returns the region code if it is present and non-empty.
    pub fn fetchable_code(&self) -> Option<&str> {
        self.code.as_deref().filter(|c| !c.is_empty())
    }
}

/// A second-level administrative locality (city, town or village).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Locality {
    pub code: String,
    pub name: String,
}

/// Both lookup tables, loaded once per run and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub regions: Vec<Region>,
    pub localities: Vec<Locality>,
}

impl ReferenceTables {
    /// First region whose code equals `code`.
    pub fn region_name(&self, code: &str) -> Option<&str> {
        self.regions
            .iter()
            .find(|r| r.code.as_deref() == Some(code))
            .map(|r| r.name.as_str())
    }

    /// First locality whose code equals `code`.
    pub fn locality_name(&self, code: &str) -> Option<&str> {
        self.localities
            .iter()
            .find(|l| l.code == code)
            .map(|l| l.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// The per-station object exactly as received from upstream.
pub type RawObservation = Map<String, Value>;

/// Result of parsing the upstream `obsTime` string.
///
/// Upstream timestamps usually carry no zone. They are kept as naive
/// date-times rather than being pinned to UTC or JST.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObservedAt {
    /// The string carried an explicit UTC offset.
    Zoned(DateTime<FixedOffset>),
    /// The string had no zone designator.
    Local(NaiveDateTime),
    /// Missing or unparseable. Serialized as `null`.
    Invalid,
}

impl Serialize for ObservedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ObservedAt::Zoned(dt) => {
                serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            ObservedAt::Local(dt) => {
                serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
            }
            ObservedAt::Invalid => serializer.serialize_none(),
        }
    }
}

/// A raw observation plus the derived place, time and alert fields.
///
/// Serializes as a single flat JSON object: the remaining raw fields in
/// upstream order, followed by the derived fields. `lat`/`lon` never appear.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedObservation {
    #[serde(flatten)]
    pub raw: RawObservation,
    #[serde(rename = "observedAt")]
    pub observed_at: ObservedAt,
    #[serde(rename = "placeCountry")]
    pub place_country: String,
    #[serde(rename = "placeRiver", skip_serializing_if = "Option::is_none")]
    pub place_river: Option<Value>,
    #[serde(rename = "placePref", skip_serializing_if = "Option::is_none")]
    pub place_pref: Option<String>,
    #[serde(rename = "placeCity", skip_serializing_if = "Option::is_none")]
    pub place_city: Option<String>,
    #[serde(rename = "isWarning")]
    pub is_warning: bool,
    #[serde(rename = "isFlood")]
    pub is_flood: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Value>,
}

impl EnrichedObservation {
    /// Station identifier (`code`) if upstream sent one as a string.
    pub fn station_code(&self) -> Option<&str> {
        self.raw.get("code").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Aggregate and snapshot types
// ---------------------------------------------------------------------------

/// Everything collected in one crawl, before publishing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    pub items: Vec<EnrichedObservation>,
    pub flood_count: usize,
    pub warning_count: usize,
    pub total_items: usize,
}

/// The published document. Field order here is the key order on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOutput {
    pub generated_at: String,
    pub time_zone: String,
    pub hour_path: String,
    pub source: String,
    pub total_items: usize,
    pub flood_count: usize,
    pub warning_count: usize,
    pub items: Vec<EnrichedObservation>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Reasons a single fetch attempt can fail. Never escapes the fetcher.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Non-2xx HTTP response.
    HttpStatus(u16),
    /// Connection, TLS, timeout or body read failure.
    Transport(String),
    /// The body was not valid JSON.
    Parse(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::HttpStatus(code) => write!(f, "HTTP {}", code),
            FetchError::Transport(msg) => write!(f, "Transport error: {}", msg),
            FetchError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Fatal errors that end a run.
#[derive(Debug)]
pub enum CrawlError {
    /// The configuration file is malformed or has invalid values.
    Config(String),
    /// A reference table could not be read or deserialized.
    Reference { path: String, message: String },
    /// Directory creation, read or write failure.
    Io { path: String, source: std::io::Error },
    /// The snapshot could not be serialized.
    Serialize(String),
}

impl std::fmt::Display for CrawlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrawlError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CrawlError::Reference { path, message } => {
                write!(f, "Reference table {}: {}", path, message)
            }
            CrawlError::Io { path, source } => write!(f, "I/O error on {}: {}", path, source),
            CrawlError::Serialize(msg) => write!(f, "Serialize error: {}", msg),
        }
    }
}

impl std::error::Error for CrawlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrawlError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
