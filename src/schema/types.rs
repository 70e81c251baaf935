//! Schema type definitions
//!
//! Supported types:
//! - string: UTF-8 string
//! - int: 64-bit integer
//! - bool: Boolean
//! - float: any JSON number
//! - object: Nested object with field schema
//! - array: Homogeneous array with element type

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Supported field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// 64-bit integer
    Int,
    /// Boolean
    Bool,
    /// Any JSON number
    Float,
    /// Nested object with its own field schema
    Object {
        /// Nested field definitions
        fields: BTreeMap<String, FieldDef>,
    },
    /// Homogeneous array with single element type
    Array {
        /// Element type (boxed to allow recursive types)
        #[serde(rename = "element_type")]
        element_type: Box<FieldType>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::Object { .. } => "object",
            FieldType::Array { .. } => "array",
        }
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether field must be present and non-null
    #[serde(default)]
    pub required: bool,
}

impl FieldDef {
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
        }
    }

    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
        }
    }

    /// Create a required string field
    pub fn required_string() -> Self {
        Self::required(FieldType::String)
    }

    /// Create an optional string field
    pub fn optional_string() -> Self {
        Self::optional(FieldType::String)
    }

    /// Create a required int field
    pub fn required_int() -> Self {
        Self::required(FieldType::Int)
    }

    /// Create an optional int field
    pub fn optional_int() -> Self {
        Self::optional(FieldType::Int)
    }

    /// Create a required bool field
    pub fn required_bool() -> Self {
        Self::required(FieldType::Bool)
    }

    /// Create a required object field
    pub fn required_object(fields: BTreeMap<String, FieldDef>) -> Self {
        Self::required(FieldType::Object { fields })
    }

    /// Create an optional array field
    pub fn optional_array(element_type: FieldType) -> Self {
        Self::optional(FieldType::Array {
            element_type: Box::new(element_type),
        })
    }
}

/// Typed record schema
///
/// Declared fields are checked for presence and type. Undeclared fields
/// pass unless `deny_unknown_fields` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Field definitions
    pub fields: BTreeMap<String, FieldDef>,
    /// Reject fields not listed in `fields`
    #[serde(default)]
    pub deny_unknown_fields: bool,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field definition
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Reject undeclared fields
    pub fn strict(mut self) -> Self {
        self.deny_unknown_fields = true;
        self
    }

    /// Parse a schema from its JSON form
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let schema = Schema::new()
            .field("email", FieldDef::required_string())
            .field("age", FieldDef::optional_int());
        assert_eq!(schema.fields.len(), 2);
        assert!(!schema.deny_unknown_fields);
        assert!(schema.clone().strict().deny_unknown_fields);
    }

    #[test]
    fn test_from_json() {
        let schema = Schema::from_json(
            r#"{
                "fields": {
                    "email": {"type": "string", "required": true},
                    "tags": {"type": "array", "element_type": {"type": "string"}},
                    "address": {"type": "object", "fields": {
                        "city": {"type": "string", "required": true}
                    }}
                },
                "deny_unknown_fields": true
            }"#,
        )
        .unwrap();

        assert_eq!(schema.fields["email"], FieldDef::required_string());
        assert_eq!(
            schema.fields["tags"],
            FieldDef::optional_array(FieldType::String)
        );
        assert_eq!(schema.fields["address"].field_type.type_name(), "object");
        assert!(schema.deny_unknown_fields);
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::String.type_name(), "string");
        assert_eq!(FieldType::Int.type_name(), "int");
        assert_eq!(FieldType::Bool.type_name(), "bool");
        assert_eq!(FieldType::Float.type_name(), "float");
        assert_eq!(
            FieldType::Array {
                element_type: Box::new(FieldType::String)
            }
            .type_name(),
            "array"
        );
    }
}
