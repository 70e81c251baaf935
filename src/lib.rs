//! docstore - a file-backed JSON record store
//!
//! Collections of JSON records, each mirrored to one file that is
//! replaced atomically on every mutation, with optional validation and
//! in-memory equality indexes.

pub mod cli;
pub mod collection;
pub mod crash_point;
pub mod database;
pub mod index;
pub mod record;
pub mod schema;
pub mod storage;

pub use collection::{CollectionOptions, CollectionStore, FindOptions, Page, Query, SortDir, StoreError, StoreResult};
pub use database::{Database, DatabaseConfig};
pub use index::{IndexDef, IndexKey};
pub use record::Record;
pub use schema::{FieldDef, FieldType, Schema, ValidationDetails, ValidationErrors, Validator};
