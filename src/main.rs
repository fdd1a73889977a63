/// river_crawler: one crawl per invocation, meant to run from cron.
///
/// Reads `crawler.toml` from the working directory (defaults if absent),
/// fetches every prefecture, publishes the snapshot, and logs a digest of
/// the flood/warning stations.

use chrono::Utc;
use std::error::Error;
use std::path::Path;

use river_snapshot::config::{DEFAULT_CONFIG_PATH, load_config};
use river_snapshot::digest::AlertDigest;
use river_snapshot::ingest::fetch::build_client;
use river_snapshot::logging::{self, Stage};
use river_snapshot::pipeline::run_once;
use river_snapshot::reference::load_reference_tables;

fn main() -> Result<(), Box<dyn Error>> {
    let config = load_config(Path::new(DEFAULT_CONFIG_PATH))?;
    logging::init_logger(
        config.log_level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let tables = load_reference_tables(&config.pref_table, &config.town_table)?;
    let client = build_client(config.request_timeout())?;

    let (published, _) = run_once(&config, &tables, &client, std::thread::sleep, Utc::now)
        .inspect_err(|e| logging::error(Stage::Publish, None, &e.to_string()))?;

    let digest = AlertDigest::from_snapshot(&serde_json::to_value(&published.snapshot)?);
    for line in digest.to_string().lines() {
        logging::info(Stage::System, None, line);
    }

    Ok(())
}
