//! Index Manager subsystem for docstore
//!
//! Indexes are derived, in-memory-only state rebuilt from the collection
//! file on load.
//!
//! # Design Principles
//!
//! - Derived state: indexes mirror the record set, never the source of truth
//! - In-memory only: nothing index-related is written to disk
//! - Check-then-apply: a rejected mutation leaves every index untouched
//!
//! # Invariants
//!
//! - For every indexed field and value, the key set equals the primary keys
//!   of records currently holding that value
//! - Absent fields are never indexed
//! - A unique index maps each value to at most one primary key

mod errors;
mod key;
mod manager;

pub use errors::{IndexError, IndexResult};
pub use key::IndexKey;
pub use manager::{IndexDef, IndexManager};
