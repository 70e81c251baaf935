//! Record representation and field-path helpers
//!
//! A record is a JSON object. Field paths address nested values with
//! dot-separated segments (`"profile.address.city"`).
//!
//! Timestamps are ISO-8601 UTC strings with millisecond precision.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

/// One stored entity: field name to JSON value.
///
/// `serde_json::Map` keeps keys sorted, so serializing a record is
/// deterministic without extra work.
pub type Record = Map<String, Value>;

/// Default primary-key field name.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Field holding the creation timestamp.
pub const CREATED_AT: &str = "createdAt";

/// Field holding the last-modified timestamp.
pub const UPDATED_AT: &str = "updatedAt";

/// Resolve a dot-separated path inside a record.
///
/// Returns `None` if any segment is missing or traverses a non-object.
pub fn get_path<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = record.get(first)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

/// Set a value at a dot-separated path, creating intermediate objects.
///
/// A non-object value in the way is replaced by an object.
pub fn set_path(record: &mut Record, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            record.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = record
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                set_path(inner, rest, value);
            }
        }
    }
}

/// Current UTC time as an ISO-8601 string.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build a record from a JSON value, if it is an object.
pub fn from_value(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        from_value(value).unwrap()
    }

    #[test]
    fn test_top_level_path() {
        let r = record(json!({"email": "a@x.com"}));
        assert_eq!(get_path(&r, "email"), Some(&json!("a@x.com")));
    }

    #[test]
    fn test_nested_path() {
        let r = record(json!({"profile": {"address": {"city": "Oslo"}}}));
        assert_eq!(get_path(&r, "profile.address.city"), Some(&json!("Oslo")));
        assert_eq!(get_path(&r, "profile.address.zip"), None);
    }

    #[test]
    fn test_path_through_scalar_is_absent() {
        let r = record(json!({"profile": "flat"}));
        assert_eq!(get_path(&r, "profile.address"), None);
    }

    #[test]
    fn test_set_path_creates_objects() {
        let mut r = record(json!({"name": "a"}));
        set_path(&mut r, "profile.city", json!("Oslo"));
        set_path(&mut r, "name", json!("b"));
        assert_eq!(Value::Object(r), json!({"name": "b", "profile": {"city": "Oslo"}}));
    }

    #[test]
    fn test_set_path_replaces_scalar() {
        let mut r = record(json!({"profile": 3}));
        set_path(&mut r, "profile.city", json!("Oslo"));
        assert_eq!(get_path(&r, "profile.city"), Some(&json!("Oslo")));
    }

    #[test]
    fn test_timestamp_is_utc_iso8601() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        assert!(from_value(json!([1, 2])).is_none());
        assert!(from_value(json!({"a": 1})).is_some());
    }
}
