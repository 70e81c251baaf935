//! Record validation
//!
//! `Validator` is the capability a collection uses to check a candidate
//! record before it is committed. Any validation approach can plug in:
//! the built-in typed `Schema`, a closure, or a caller-defined type.
//!
//! Validation semantics for `Schema`:
//! - All required fields are present and non-null
//! - Field types exactly match schema types (no coercion)
//! - Optional fields may be absent or null
//! - Undeclared fields are rejected only in strict mode

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::errors::{ValidationDetails, ValidationErrors};
use super::types::{FieldDef, FieldType, Schema};
use crate::record::Record;

/// Checks a candidate record, returning the record to commit.
///
/// Implementations may normalize the record (fill defaults, strip
/// fields). The returned record is what gets stored.
pub trait Validator: Send + Sync {
    fn validate(&self, candidate: &Record) -> Result<Record, ValidationErrors>;
}

impl<F> Validator for F
where
    F: Fn(&Record) -> Result<Record, ValidationErrors> + Send + Sync,
{
    fn validate(&self, candidate: &Record) -> Result<Record, ValidationErrors> {
        self(candidate)
    }
}

impl Validator for Schema {
    fn validate(&self, candidate: &Record) -> Result<Record, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_object(candidate, &self.fields, self.deny_unknown_fields, "", &mut errors);
        errors.into_result()?;
        Ok(candidate.clone())
    }
}

/// Validates an object against field definitions, collecting failures.
fn validate_object(
    obj: &Map<String, Value>,
    fields: &BTreeMap<String, FieldDef>,
    deny_unknown: bool,
    path_prefix: &str,
    errors: &mut ValidationErrors,
) {
    if deny_unknown {
        for key in obj.keys() {
            if !fields.contains_key(key) {
                errors.push(ValidationDetails::extra_field(make_path(path_prefix, key)));
            }
        }
    }

    for (field_name, field_def) in fields {
        let field_path = make_path(path_prefix, field_name);

        match obj.get(field_name) {
            Some(Value::Null) if field_def.required => {
                errors.push(ValidationDetails::null_value(&field_path));
            }
            Some(Value::Null) => {}
            Some(value) => {
                validate_value(value, &field_def.field_type, deny_unknown, &field_path, errors);
            }
            None if field_def.required => {
                errors.push(ValidationDetails::missing_field(field_path));
            }
            None => {}
        }
    }
}

/// Validates a value against a field type.
fn validate_value(
    value: &Value,
    expected_type: &FieldType,
    deny_unknown: bool,
    field_path: &str,
    errors: &mut ValidationErrors,
) {
    let matches = match expected_type {
        FieldType::String => value.is_string(),
        // Must be an integer, not a float
        FieldType::Int => value.is_i64() || value.is_u64(),
        FieldType::Bool => value.is_boolean(),
        FieldType::Float => value.is_number(),
        FieldType::Object { fields } => match value.as_object() {
            Some(obj) => {
                validate_object(obj, fields, deny_unknown, field_path, errors);
                true
            }
            None => false,
        },
        FieldType::Array { element_type } => match value.as_array() {
            Some(arr) => {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}[{}]", field_path, i);
                    if elem.is_null() {
                        errors.push(ValidationDetails::null_value(&elem_path));
                        continue;
                    }
                    validate_value(elem, element_type, deny_unknown, &elem_path, errors);
                }
                true
            }
            None => false,
        },
    };

    if !matches {
        errors.push(ValidationDetails::type_mismatch(
            field_path,
            expected_type.type_name(),
            json_type_name(value),
        ));
    }
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Creates a field path from prefix and field name.
fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        crate::record::from_value(value).unwrap()
    }

    fn user_schema() -> Schema {
        let mut address = BTreeMap::new();
        address.insert("city".to_string(), FieldDef::required_string());

        Schema::new()
            .field("name", FieldDef::required_string())
            .field("age", FieldDef::optional_int())
            .field("active", FieldDef::required_bool())
            .field("address", FieldDef::optional(FieldType::Object { fields: address }))
            .field("tags", FieldDef::optional_array(FieldType::String))
    }

    #[test]
    fn test_valid_record_passes() {
        let r = rec(json!({"name": "Alice", "active": true, "age": 30}));
        assert_eq!(user_schema().validate(&r).unwrap(), r);
    }

    #[test]
    fn test_missing_required_field_fails() {
        let r = rec(json!({"active": true}));
        let err = user_schema().validate(&r).unwrap_err();
        assert_eq!(err.fields(), vec!["name"]);
    }

    #[test]
    fn test_collects_every_failure() {
        let r = rec(json!({"age": "old", "tags": ["a", 1, null]}));
        let err = user_schema().validate(&r).unwrap_err();

        let mut fields = err.fields();
        fields.sort();
        assert_eq!(fields, vec!["active", "age", "name", "tags[1]", "tags[2]"]);
    }

    #[test]
    fn test_int_rejects_float() {
        let r = rec(json!({"name": "A", "active": true, "age": 30.5}));
        let err = user_schema().validate(&r).unwrap_err();
        assert!(err.to_string().contains("expected int, got float"));
    }

    #[test]
    fn test_optional_field_may_be_null() {
        let r = rec(json!({"name": "A", "active": true, "age": null}));
        assert!(user_schema().validate(&r).is_ok());
    }

    #[test]
    fn test_required_field_null_fails() {
        let r = rec(json!({"name": null, "active": true}));
        let err = user_schema().validate(&r).unwrap_err();
        assert!(err.to_string().contains("non-null"));
    }

    #[test]
    fn test_nested_object_path() {
        let r = rec(json!({"name": "A", "active": true, "address": {}}));
        let err = user_schema().validate(&r).unwrap_err();
        assert_eq!(err.fields(), vec!["address.city"]);
    }

    #[test]
    fn test_extra_fields_allowed_unless_strict() {
        let r = rec(json!({"name": "A", "active": true, "nickname": "a"}));
        assert!(user_schema().validate(&r).is_ok());

        let err = user_schema().strict().validate(&r).unwrap_err();
        assert_eq!(err.fields(), vec!["nickname"]);
    }

    #[test]
    fn test_closure_validator_can_normalize() {
        let lowercase_email = |r: &Record| -> Result<Record, ValidationErrors> {
            let mut out = r.clone();
            match r.get("email").and_then(Value::as_str) {
                Some(email) => {
                    out.insert("email".into(), json!(email.to_lowercase()));
                    Ok(out)
                }
                None => Err(ValidationDetails::missing_field("email").into()),
            }
        };

        let normalized = lowercase_email.validate(&rec(json!({"email": "A@X.COM"}))).unwrap();
        assert_eq!(normalized["email"], "a@x.com");
        assert!(lowercase_email.validate(&rec(json!({}))).is_err());
    }
}
