//! Schema Validator subsystem for docstore
//!
//! Collections may carry a validator that every record must pass before
//! it is committed to memory and disk.
//!
//! # Design Principles
//!
//! - Validation before mutation: a failing record never reaches the record set
//! - No implicit type coercion
//! - All failing fields reported together
//! - Deterministic validation (fields checked in sorted order)

mod errors;
mod types;
mod validator;

pub use errors::{ValidationDetails, ValidationErrors};
pub use types::{FieldDef, FieldType, Schema};
pub use validator::Validator;
