/// Record enrichment for upstream river level observations.
///
/// Turns one raw `obss[]` entry into an `EnrichedObservation`: resolves the
/// prefecture and city names from the reference tables, parses `obsTime`,
/// copies the river name, renames `lat`/`lon`, and classifies the level
/// against its thresholds.
///
/// Enrichment never fails. Anything missing or malformed degrades to an
/// absent field, an invalid timestamp, or a `false` flag.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::alert::thresholds::classify;
use crate::model::{
    EnrichedObservation, ObservedAt, PLACE_COUNTRY, RawObservation, ReferenceTables,
};

// ---------------------------------------------------------------------------
// Upstream field names
// ---------------------------------------------------------------------------

pub const FIELD_NAME: &str = "name";
pub const FIELD_OBS_TIME: &str = "obsTime";
pub const FIELD_LEVEL: &str = "level";
pub const FIELD_WARN_LEVEL: &str = "warnLevel";
pub const FIELD_FLOOD_LEVEL: &str = "fladLevel";
pub const FIELD_PREF_CODE: &str = "prefCode";
pub const FIELD_TWN_CODE: &str = "twnCode";
pub const FIELD_TOWN_CODE: &str = "townCode";
pub const FIELD_LAT: &str = "lat";
pub const FIELD_LON: &str = "lon";

/// Keys written by enrichment. Raw keys with these names are dropped so the
/// serialized record has exactly one of each.
const DERIVED_FIELDS: &[&str] = &[
    "observedAt",
    "placeCountry",
    "placeRiver",
    "placePref",
    "placeCity",
    "isWarning",
    "isFlood",
    "latitude",
    "longitude",
];

/// Naive layouts seen in upstream `obsTime` values, tried in order.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Parses an upstream observation time without applying any zone.
///
/// Strings with an explicit offset keep it; strings without one stay naive.
pub fn parse_observed_at(raw: Option<&Value>) -> ObservedAt {
    let Some(s) = raw.and_then(Value::as_str).map(str::trim) else {
        return ObservedAt::Invalid;
    };
    if s.is_empty() {
        return ObservedAt::Invalid;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return ObservedAt::Zoned(dt);
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return ObservedAt::Local(dt);
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Some(dt) = NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return ObservedAt::Local(dt);
        }
    }
    ObservedAt::Invalid
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Locality code from `twnCode`, falling back to `townCode` when the former
/// is missing or `null`.
fn locality_code(raw: &RawObservation) -> Option<&str> {
    raw.get(FIELD_TWN_CODE)
        .filter(|v| !v.is_null())
        .or_else(|| raw.get(FIELD_TOWN_CODE))
        .and_then(Value::as_str)
}

/// Enriches a single raw observation. Pure; performs no I/O.
pub fn enrich(mut raw: RawObservation, tables: &ReferenceTables) -> EnrichedObservation {
    let observed_at = parse_observed_at(raw.get(FIELD_OBS_TIME));
    let place_river = raw.get(FIELD_NAME).cloned();
    let place_pref = raw
        .get(FIELD_PREF_CODE)
        .and_then(Value::as_str)
        .and_then(|code| tables.region_name(code))
        .map(str::to_string);
    let place_city = locality_code(&raw)
        .and_then(|code| tables.locality_name(code))
        .map(str::to_string);
    let flags = classify(
        raw.get(FIELD_LEVEL),
        raw.get(FIELD_WARN_LEVEL),
        raw.get(FIELD_FLOOD_LEVEL),
    );

    // Destructive rename: a pre-existing latitude/longitude is discarded.
    let latitude = raw.shift_remove(FIELD_LAT);
    let longitude = raw.shift_remove(FIELD_LON);
    for key in DERIVED_FIELDS {
        raw.shift_remove(*key);
    }

    EnrichedObservation {
        raw,
        observed_at,
        place_country: PLACE_COUNTRY.to_string(),
        place_river,
        place_pref,
        place_city,
        is_warning: flags.is_warning,
        is_flood: flags.is_flood,
        latitude,
        longitude,
    }
}

/// Enriches every element of an `obss` array, preserving order.
///
/// Elements that are not JSON objects carry no fields to enrich and are
/// dropped; the count of dropped elements is returned alongside.
pub fn enrich_all(
    observations: Vec<Value>,
    tables: &ReferenceTables,
) -> (Vec<EnrichedObservation>, usize) {
    let mut enriched = Vec::with_capacity(observations.len());
    let mut dropped = 0;
    for obs in observations {
        match obs {
            Value::Object(raw) => enriched.push(enrich(raw, tables)),
            _ => dropped += 1,
        }
    }
    (enriched, dropped)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
