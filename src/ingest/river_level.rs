/// k.river.go.jp current water level files.
///
/// One JSON file per prefecture:
///   https://k.river.go.jp/swin/files/area_info/current/{prefCode}.json
///
/// The document is an object whose `obss` array holds one entry per
/// observation station. Other top-level fields are ignored.

use serde_json::Value;

use crate::model::REGION_PLACEHOLDER;

/// Name of the array holding per-station observations.
pub const OBSERVATIONS_FIELD: &str = "obss";

/// Substitutes `region_code` into a source template.
pub fn build_region_url(template: &str, region_code: &str) -> String {
    template.replace(REGION_PLACEHOLDER, region_code)
}

/// Takes the `obss` array out of a fetched document.
///
/// Returns `None` when the document is not an object or has no `obss`
/// array, which callers treat as "no observations for this region".
pub fn take_observations(document: Value) -> Option<Vec<Value>> {
    match document {
        Value::Object(mut map) => match map.remove(OBSERVATIONS_FIELD) {
            Some(Value::Array(obss)) => Some(obss),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SOURCE_TEMPLATE;
    use serde_json::json;

    #[test]
    fn test_build_region_url() {
        assert_eq!(
            build_region_url(SOURCE_TEMPLATE, "01"),
            "https://k.river.go.jp/swin/files/area_info/current/01.json"
        );
    }

    #[test]
    fn test_build_region_url_custom_template() {
        assert_eq!(
            build_region_url("http://localhost:8080/{prefCode}.json", "47"),
            "http://localhost:8080/47.json"
        );
    }

    #[test]
    fn test_take_observations() {
        let doc = json!({"obss": [{"code": "1"}, {"code": "2"}], "prefCode": "01"});
        let obss = take_observations(doc).expect("obss array should be found");
        assert_eq!(obss.len(), 2);
        assert_eq!(obss[1]["code"], json!("2"));
    }

    #[test]
    fn test_take_observations_missing_or_wrong_type() {
        assert_eq!(take_observations(json!({"other": []})), None);
        assert_eq!(take_observations(json!({"obss": {"code": "1"}})), None);
        assert_eq!(take_observations(json!([1, 2, 3])), None);
        assert_eq!(take_observations(json!({"obss": []})), Some(vec![]));
    }
}
