//! Console digest of a published snapshot.
//!
//! Applies the same rules as the web viewer: keep items flagged as flood or
//! warning, show the first 20 in array order, report how many were left out.
//! Works on the JSON document rather than `SnapshotOutput` so it can read
//! any `latest.json` on disk.

use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::model::CrawlError;

/// Maximum number of alert lines shown.
pub const MAX_ALERT_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct AlertDigest {
    pub generated_at: String,
    pub hour_path: String,
    pub total_items: u64,
    pub flood_count: u64,
    /// Older snapshots may not carry this field.
    pub warning_count: Option<u64>,
    pub lines: Vec<String>,
    /// Alerts beyond `MAX_ALERT_LINES`.
    pub remaining: usize,
}

fn str_field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str)
}

fn is_set(item: &Value, key: &str) -> bool {
    item.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// One display line: `<pref> <city> <river> —[FLOOD]  Lv: <level>`.
fn alert_line(item: &Value) -> String {
    let river = str_field(item, "placeRiver")
        .or_else(|| str_field(item, "name"))
        .unwrap_or("");
    let tag = if is_set(item, "isFlood") {
        "[FLOOD] "
    } else if is_set(item, "isWarning") {
        "[WARN] "
    } else {
        ""
    };
    let level = match item.get("level") {
        Some(Value::Number(n)) => format!(" Lv: {}", n),
        _ => String::new(),
    };
    format!(
        "{} {} {} —{}{}",
        str_field(item, "placePref").unwrap_or(""),
        str_field(item, "placeCity").unwrap_or(""),
        river,
        tag,
        level
    )
}

impl AlertDigest {
    pub fn from_snapshot(snapshot: &Value) -> Self {
        let alerts: Vec<&Value> = snapshot
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|it| is_set(it, "isFlood") || is_set(it, "isWarning"))
                    .collect()
            })
            .unwrap_or_default();

        let count = |key: &str| snapshot.get(key).and_then(Value::as_u64);

        AlertDigest {
            generated_at: str_field(snapshot, "generatedAt").unwrap_or("").to_string(),
            hour_path: str_field(snapshot, "hourPath").unwrap_or("").to_string(),
            total_items: count("totalItems").unwrap_or(0),
            flood_count: count("floodCount").unwrap_or(0),
            warning_count: count("warningCount"),
            lines: alerts.iter().take(MAX_ALERT_LINES).map(|it| alert_line(it)).collect(),
            remaining: alerts.len().saturating_sub(MAX_ALERT_LINES),
        }
    }

    /// Reads and digests a snapshot file.
    pub fn from_file(path: &Path) -> Result<Self, CrawlError> {
        let body = fs::read_to_string(path).map_err(|e| CrawlError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let json: Value =
            serde_json::from_str(&body).map_err(|e| CrawlError::Serialize(e.to_string()))?;
        Ok(Self::from_snapshot(&json))
    }
}

impl fmt::Display for AlertDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "generated: {} / hour: {}", self.generated_at, self.hour_path)?;
        write!(f, "items: {} / flood: {}", self.total_items, self.flood_count)?;
        if let Some(warning_count) = self.warning_count {
            write!(f, " / warning: {}", warning_count)?;
        }
        writeln!(f)?;
        for line in &self.lines {
            writeln!(f, "  {}", line)?;
        }
        if self.remaining > 0 {
            writeln!(f, "  (+{} more)", self.remaining)?;
        }
        Ok(())
    }
}
