/// Crawler configuration loader - parses crawler.toml
///
/// Keeps paths, the upstream URL template and the retry schedule out of the
/// code. Every key is optional; a missing file means every default applies.
///
/// ```toml
/// output_root = "public/data"
/// pref_table = "data/k.river.go.jp/pref.json"
/// town_table = "data/k.river.go.jp/twn.json"
///
/// [fetch]
/// max_retries = 2
/// initial_backoff_ms = 500
/// request_timeout_secs = 30
///
/// [logging]
/// level = "info"
/// timestamps = false
/// ```

use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::fetch::RetryPolicy;
use crate::logging::LogLevel;
use crate::model::{CrawlError, REGION_PLACEHOLDER, SOURCE_TEMPLATE};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "crawler.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlerConfig {
    /// Root of the published tree (hour buckets and latest.json).
    pub output_root: PathBuf,
    pub pref_table: PathBuf,
    pub town_table: PathBuf,
    /// Upstream URL with a `{prefCode}` placeholder.
    pub source_template: String,
    pub fetch: FetchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("public/data"),
            pref_table: PathBuf::from("data/k.river.go.jp/pref.json"),
            town_table: PathBuf::from("data/k.river.go.jp/twn.json"),
            source_template: SOURCE_TEMPLATE.to_string(),
            fetch: FetchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            request_timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

impl CrawlerConfig {
    /// Checks values serde cannot enforce.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.fetch.initial_backoff_ms == 0 {
            return Err(CrawlError::Config(
                "fetch.initial_backoff_ms must be greater than zero".to_string(),
            ));
        }
        if self.fetch.request_timeout_secs == 0 {
            return Err(CrawlError::Config(
                "fetch.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !self.source_template.contains(REGION_PLACEHOLDER) {
            return Err(CrawlError::Config(format!(
                "source_template must contain {}",
                REGION_PLACEHOLDER
            )));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.fetch.max_retries,
            Duration::from_millis(self.fetch.initial_backoff_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.request_timeout_secs)
    }

    pub fn log_level(&self) -> Result<LogLevel, CrawlError> {
        self.logging.level.parse().map_err(CrawlError::Config)
    }

    /// Path of the latest snapshot file under `output_root`.
    pub fn latest_path(&self) -> PathBuf {
        self.output_root.join(crate::publish::LATEST_FILE)
    }
}

/// Parses and validates configuration text.
pub fn parse_config(contents: &str) -> Result<CrawlerConfig, CrawlError> {
    let config: CrawlerConfig =
        toml::from_str(contents).map_err(|e| CrawlError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `path`, falling back to defaults when the file
/// does not exist.
///
/// # Errors
/// `CrawlError::Config` if the file exists but is malformed or invalid;
/// `CrawlError::Io` if it exists but cannot be read.
pub fn load_config(path: &Path) -> Result<CrawlerConfig, CrawlError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(CrawlerConfig::default()),
        Err(e) => Err(CrawlError::Io {
            path: path.display().to_string(),
            source: e,
        }),
    }
}
