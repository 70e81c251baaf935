//! Database Registry subsystem for docstore
//!
//! A database is a directory; each collection is `<data_dir>/<name>.json`.
//! The registry guarantees one store instance per collection name for the
//! life of the handle, so all writers of a collection queue on the same
//! gate.
//!
//! Configuration is read once, at construction.

mod config;
mod registry;

pub use config::{DatabaseConfig, DATA_DIR_ENV, PRETTY_ENV};
pub use registry::Database;
