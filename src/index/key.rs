//! Hashable keys for JSON values
//!
//! Two keys are equal exactly when the JSON values they came from are
//! equal under `serde_json::Value`'s `PartialEq`, so an index lookup never
//! disagrees with the residual equality filter.

use std::fmt;

use serde_json::Value;

/// Index key representing a field value or a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// JSON null
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer that fits in i64
    Int(i64),
    /// Integer above i64::MAX
    UInt(u64),
    /// Float value (stored as bits; -0.0 folded into 0.0)
    Float(u64),
    /// String value
    String(String),
    /// Array or object, as canonical JSON text
    Compound(String),
}

impl IndexKey {
    /// Create a key from a string
    pub fn from_string(v: impl Into<String>) -> Self {
        IndexKey::String(v.into())
    }

    /// Create a key from a JSON value
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    IndexKey::Int(i)
                } else if let Some(u) = n.as_u64() {
                    IndexKey::UInt(u)
                } else {
                    let f = n.as_f64().unwrap_or(0.0);
                    let f = if f == 0.0 { 0.0 } else { f };
                    IndexKey::Float(f.to_bits())
                }
            }
            Value::String(s) => IndexKey::String(s.clone()),
            // Map keys are sorted, so this text is canonical
            compound => IndexKey::Compound(compound.to_string()),
        }
    }

    /// Whether this key may serve as a primary key.
    pub fn is_valid_primary(&self) -> bool {
        matches!(self, IndexKey::String(_) | IndexKey::Int(_) | IndexKey::UInt(_))
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Null => write!(f, "null"),
            IndexKey::Bool(b) => write!(f, "{}", b),
            IndexKey::Int(i) => write!(f, "{}", i),
            IndexKey::UInt(u) => write!(f, "{}", u),
            IndexKey::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            IndexKey::String(s) => write!(f, "{:?}", s),
            IndexKey::Compound(s) => write!(f, "{}", s),
        }
    }
}
