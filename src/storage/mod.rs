//! Collection file storage for docstore
//!
//! Each collection is one file holding a JSON array of records. The file
//! is the authoritative state; everything in memory is derived from it.
//!
//! # Design Principles
//!
//! - Whole-file snapshots, replaced atomically (temp file + rename)
//! - Deterministic encoding (sorted keys)
//! - No index data on disk
//! - Unparseable content is corruption, never silently repaired

mod errors;
mod reader;
mod writer;

pub use errors::{Severity, StorageError, StorageResult};
pub use reader::{decode_records, load_records};
pub use writer::{encode_records, persist, stage, temp_path_for, write_atomic, StagedWrite};
