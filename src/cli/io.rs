//! JSON I/O handling for CLI
//!
//! - Arguments: JSON objects and `field=value` conditions
//! - Output: one JSON document on stdout
//! - Errors: `CODE: message` on stderr

use std::io::{self, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::collection::Query;
use crate::record::{from_value, Record};

/// Parse a command-line argument that must be a JSON object
pub fn parse_record(arg: &str) -> CliResult<Record> {
    let value: Value = serde_json::from_str(arg)?;
    from_value(value).ok_or_else(|| CliError::invalid_argument("expected a JSON object"))
}

/// Build a query from `field=value` conditions.
///
/// The value is parsed as JSON; anything that is not valid JSON is taken
/// as a plain string, so `role=admin` and `role="admin"` agree.
pub fn parse_conditions(conditions: &[String]) -> CliResult<Query> {
    let mut query = Query::new();
    for condition in conditions {
        let (field, raw) = condition
            .split_once('=')
            .ok_or_else(|| CliError::invalid_argument(format!("expected FIELD=VALUE, got '{}'", condition)))?;
        if field.is_empty() {
            return Err(CliError::invalid_argument(format!("empty field in '{}'", condition)));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        query.insert(field.to_string(), value);
    }
    Ok(query)
}

/// Write a value to `out`, followed by a newline
pub fn write_value<W: Write>(out: &mut W, value: &Value, pretty: bool) -> CliResult<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write a value to stdout
pub fn write_response(value: &Value, pretty: bool) -> CliResult<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_value(&mut lock, value, pretty)
}

/// Write an error to stderr
pub fn write_error(err: &CliError) {
    eprintln!("{}: {}", err.code(), err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conditions_json_or_string() {
        let query = parse_conditions(&[
            "role=admin".to_string(),
            "age=30".to_string(),
            "meta.draft=false".to_string(),
            "name=\"ann\"".to_string(),
            "note=a=b".to_string(),
        ])
        .unwrap();

        assert_eq!(
            Value::Object(query),
            json!({"role": "admin", "age": 30, "meta.draft": false, "name": "ann", "note": "a=b"})
        );
    }

    #[test]
    fn test_condition_without_equals() {
        let err = parse_conditions(&["role".to_string()]).unwrap_err();
        assert_eq!(err.code(), "CLI_INVALID_ARGUMENT");
    }

    #[test]
    fn test_record_must_be_object() {
        assert!(parse_record(r#"{"a": 1}"#).is_ok());
        assert_eq!(parse_record("[1]").unwrap_err().code(), "CLI_INVALID_ARGUMENT");
        assert_eq!(parse_record("{").unwrap_err().code(), "CLI_JSON_ERROR");
    }

    #[test]
    fn test_write_compact() {
        let mut out = Vec::new();
        write_value(&mut out, &json!({"b": 1, "a": 2}), false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":2,\"b\":1}\n");
    }
}
