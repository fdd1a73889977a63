//! Warning and flood threshold checking.
//!
//! Upstream sends levels and thresholds as JSON numbers, numeric strings,
//! empty strings or `null` depending on the station. Everything is coerced
//! to `Option<f64>` first; a flag is only raised when both sides are real
//! numbers.

use serde_json::Value;

/// The two alert flags attached to every enriched observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThresholdFlags {
    pub is_warning: bool,
    pub is_flood: bool,
}

/// Coerces an upstream level field to a number.
///
/// Returns `None` for a missing field, `null`, a string that does not parse
/// as a float, any other JSON type, and non-finite values (`NaN`, `inf`).
/// Empty and blank strings are `None` on purpose, unlike JavaScript's
/// `Number("")`, which yields 0.
pub fn coerce_level(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }?;
    if n.is_finite() { Some(n) } else { None }
}

/// True when both values are numbers and `level >= threshold`.
pub fn meets_threshold(level: Option<f64>, threshold: Option<f64>) -> bool {
    match (level, threshold) {
        (Some(level), Some(threshold)) => level >= threshold,
        _ => false,
    }
}

/// Classifies an observed level against its warning and flood thresholds.
pub fn classify(
    level: Option<&Value>,
    warn_level: Option<&Value>,
    flood_level: Option<&Value>,
) -> ThresholdFlags {
    let level = coerce_level(level);
    ThresholdFlags {
        is_warning: meets_threshold(level, coerce_level(warn_level)),
        is_flood: meets_threshold(level, coerce_level(flood_level)),
    }
}
