//! Validation error types
//!
//! A failed validation reports every failing field, not just the first.

use std::fmt;

/// One failing field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field path (e.g., "user.address.city")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "extra field present")
    }

    pub fn type_mismatch(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': expected {}, got {}", self.field, self.expected, self.actual)
    }
}

/// All failures found while validating one candidate record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    details: Vec<ValidationDetails>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single free-form failure, for validators without field detail
    pub fn message(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(ValidationDetails::new(field, message, "invalid value"));
        errors
    }

    pub fn push(&mut self, details: ValidationDetails) {
        self.details.push(details);
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn details(&self) -> &[ValidationDetails] {
        &self.details
    }

    /// Names of the failing fields, in report order
    pub fn fields(&self) -> Vec<&str> {
        self.details.iter().map(|d| d.field.as_str()).collect()
    }

    /// `Ok(())` when nothing failed
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationDetails> for ValidationErrors {
    fn from(details: ValidationDetails) -> Self {
        Self {
            details: vec![details],
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.details.is_empty() {
            return write!(f, "validation failed");
        }
        for (i, details) in self.details.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
