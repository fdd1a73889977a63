/// Reference table loader - parses the prefecture and town code lists
///
/// Both files come from k.river.go.jp and are stored alongside the crawler:
///   pref.json  →  { "prefs": [ { "code": "01", "name": "北海道" }, ... ] }
///   twn.json   →  { "towns": [ { "code": "...", "name": "..." }, ... ] }
///
/// Tables are loaded once at startup and handed to enrichment by reference.
/// No schema validation beyond what deserialization needs.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::logging::{self, Stage};
use crate::model::{CrawlError, Locality, ReferenceTables, Region};

#[derive(Debug, Deserialize)]
struct PrefFile {
    prefs: Vec<Region>,
}

#[derive(Debug, Deserialize)]
struct TownFile {
    towns: Vec<Locality>,
}

fn read_table(path: &Path) -> Result<String, CrawlError> {
    fs::read_to_string(path).map_err(|e| CrawlError::Reference {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn parse_error(path: &Path, err: serde_json::Error) -> CrawlError {
    CrawlError::Reference {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// Parses a prefecture table document.
pub fn parse_regions(json: &str) -> Result<Vec<Region>, serde_json::Error> {
    serde_json::from_str::<PrefFile>(json).map(|f| f.prefs)
}

/// Parses a town table document.
pub fn parse_localities(json: &str) -> Result<Vec<Locality>, serde_json::Error> {
    serde_json::from_str::<TownFile>(json).map(|f| f.towns)
}

/// Loads both reference tables from disk.
///
/// # Errors
/// `CrawlError::Reference` if either file is missing or malformed. The run
/// cannot resolve place names without them.
pub fn load_reference_tables(pref_path: &Path, town_path: &Path) -> Result<ReferenceTables, CrawlError> {
    let regions = parse_regions(&read_table(pref_path)?).map_err(|e| parse_error(pref_path, e))?;
    let localities =
        parse_localities(&read_table(town_path)?).map_err(|e| parse_error(town_path, e))?;

    let fetchable = regions.iter().filter(|r| r.fetchable_code().is_some()).count();
    logging::info(
        Stage::Reference,
        None,
        &format!(
            "loaded {} regions ({} with codes) and {} localities",
            regions.len(),
            fetchable,
            localities.len()
        ),
    );

    Ok(ReferenceTables { regions, localities })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_regions_tolerates_missing_code() {
        let regions = parse_regions(
            r#"{"prefs": [
                {"code": "01", "name": "北海道"},
                {"name": "全国"},
                {"code": null, "name": "不明"},
                {"code": "", "name": "空"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(regions.len(), 4);
        assert_eq!(regions[0].fetchable_code(), Some("01"));
        assert_eq!(regions[1].code, None);
        assert_eq!(regions[2].code, None);
        assert_eq!(regions[3].fetchable_code(), None);
    }

    #[test]
    fn test_parse_localities() {
        let towns = parse_localities(r#"{"towns": [{"code": "01100", "name": "札幌市"}]}"#).unwrap();
        assert_eq!(towns, vec![Locality { code: "01100".to_string(), name: "札幌市".to_string() }]);
    }

    #[test]
    fn test_parse_rejects_unwrapped_array() {
        assert!(parse_regions(r#"[{"code": "01", "name": "北海道"}]"#).is_err());
    }

    #[test]
    fn test_load_missing_file_is_reference_error() {
        let result = load_reference_tables(
            Path::new("does/not/exist/pref.json"),
            Path::new("does/not/exist/twn.json"),
        );
        match result {
            Err(CrawlError::Reference { path, .. }) => assert!(path.ends_with("pref.json")),
            other => panic!("expected reference error, got {:?}", other),
        }
    }
}
