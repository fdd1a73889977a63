/// latest_digest: print the flood/warning digest of the latest snapshot.
///
/// Uses the same `crawler.toml` as the crawler to find `output_root`.

use std::error::Error;
use std::path::Path;

use river_snapshot::config::{DEFAULT_CONFIG_PATH, load_config};
use river_snapshot::digest::AlertDigest;

fn main() -> Result<(), Box<dyn Error>> {
    let config = load_config(Path::new(DEFAULT_CONFIG_PATH))?;
    let digest = AlertDigest::from_file(&config.latest_path())?;
    print!("{}", digest);
    Ok(())
}
