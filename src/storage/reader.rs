//! Collection file loader
//!
//! A collection file holds one JSON array of objects. A missing or blank
//! file is an empty collection. Anything else that fails to parse into
//! that shape is corruption.

use std::io;
use std::path::Path;

use serde_json::Value;
use tokio::fs;

use super::errors::{StorageError, StorageResult};
use crate::record::Record;

/// Read every record from a collection file.
pub async fn load_records(path: &Path) -> StorageResult<Vec<Record>> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "collection file absent, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    decode_records(path, &raw)
}

/// Decode the bytes of a collection file.
pub fn decode_records(path: &Path, raw: &[u8]) -> StorageResult<Vec<Record>> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| StorageError::corrupt(path, format!("invalid JSON: {}", e)))?;

    let Value::Array(items) = value else {
        return Err(StorageError::corrupt(path, "top-level value is not an array"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(StorageError::corrupt(
                path,
                format!("element {} is not an object (found {})", i, type_name(&other)),
            )),
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
