//! Collection Store subsystem for docstore
//!
//! A collection is an ordered set of JSON records sharing a primary-key
//! field, mirrored to one file and optionally validated and indexed.
//!
//! # Design Principles
//!
//! - Disk before memory: a mutation is applied in memory only after its
//!   file write succeeded
//! - One writer per collection: mutations queue on a FIFO gate
//! - Lazy load: the file is read on first use, never twice
//! - Reads never wait on writes
//!
//! # Invariants
//!
//! - Primary keys are unique within a collection
//! - Every record carries `createdAt` and `updatedAt`
//! - Insertion order is preserved across updates and reloads
//! - Indexes always reflect the committed record set

mod errors;
mod options;
mod query;
mod store;

pub use errors::{StoreError, StoreResult};
pub use options::CollectionOptions;
pub use query::{compare_values, matches, paginate, FindOptions, Page, Query, SortDir};
pub use store::CollectionStore;
