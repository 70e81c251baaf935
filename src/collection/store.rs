//! Collection Store
//!
//! Owns one collection's records in memory, mirrored to one file.
//!
//! # Write path
//!
//! Every mutation runs under the collection's write gate (a FIFO async
//! mutex) and follows the same sequence:
//!
//! 1. Normalize and validate the candidate (no state touched)
//! 2. Check primary-key and unique-index constraints against current state
//! 3. Encode the would-be record set and atomically replace the file
//! 4. Apply the change to records, positions, and indexes
//!
//! Steps 1-2 reject without side effects. Steps 3-4 run in a spawned
//! task that owns the gate guard, so they finish together even when the
//! caller stops waiting. If step 3 fails, memory still matches the
//! untouched file. Step 4 cannot fail because nothing else mutates while
//! the gate is held.
//!
//! Reads take no gate and observe the last applied state.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::iter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::options::CollectionOptions;
use super::query::{self, FindOptions, Page, Query};
use crate::index::{IndexDef, IndexError, IndexKey, IndexManager};
use crate::record::{now_timestamp, set_path, Record, CREATED_AT, UPDATED_AT};
use crate::schema::{ValidationDetails, ValidationErrors, Validator};
use crate::storage;

/// In-memory state of a loaded collection
#[derive(Debug, Default)]
struct CollectionState {
    /// Records in insertion order
    records: Vec<Record>,
    /// Primary key -> position in `records`
    positions: HashMap<IndexKey, usize>,
    indexes: IndexManager,
}

/// A checked mutation, applied once the file write succeeds
enum Change {
    Insert { key: IndexKey, record: Record },
    Replace { key: IndexKey, pos: usize, old: Record, record: Record },
    Remove { key: IndexKey, pos: usize },
    Reset(CollectionState),
}

/// Why a full record set could not become a collection state
enum BuildError {
    MissingKey(usize),
    DuplicateKey(IndexKey),
    Index(IndexError),
}

impl CollectionState {
    fn empty(defs: &[IndexDef]) -> Self {
        Self {
            records: Vec::new(),
            positions: HashMap::new(),
            indexes: IndexManager::new(defs.to_vec()),
        }
    }

    fn build(primary_key: &str, defs: &[IndexDef], records: Vec<Record>) -> Result<Self, BuildError> {
        let mut positions = HashMap::with_capacity(records.len());
        let mut keys = Vec::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            let key = primary_key_of(primary_key, record).ok_or(BuildError::MissingKey(i))?;
            if positions.insert(key.clone(), i).is_some() {
                return Err(BuildError::DuplicateKey(key));
            }
            keys.push(key);
        }

        let mut indexes = IndexManager::new(defs.to_vec());
        indexes
            .rebuild(keys.into_iter().zip(records.iter()))
            .map_err(BuildError::Index)?;

        Ok(Self {
            records,
            positions,
            indexes,
        })
    }

    fn apply(&mut self, change: Change) {
        match change {
            Change::Insert { key, record } => {
                self.indexes.apply_insert(&key, &record);
                self.positions.insert(key, self.records.len());
                self.records.push(record);
            }
            Change::Replace { key, pos, old, record } => {
                self.indexes.apply_update(&key, &old, &record);
                self.records[pos] = record;
            }
            Change::Remove { key, pos } => {
                let record = self.records.remove(pos);
                self.indexes.remove(&key, &record);
                self.positions.remove(&key);
                for p in self.positions.values_mut() {
                    if *p > pos {
                        *p -= 1;
                    }
                }
            }
            Change::Reset(state) => *self = state,
        }
    }

    fn get(&self, key: &IndexKey) -> Option<&Record> {
        self.positions.get(key).map(|&pos| &self.records[pos])
    }

    /// Records that may match `query`, in insertion order.
    ///
    /// Narrows through the primary key or the most selective indexed
    /// field; falls back to every record.
    fn candidates(&self, primary_key: &str, query: &Query) -> Vec<&Record> {
        if let Some(value) = query.get(primary_key) {
            return self.get(&IndexKey::from_json(value)).into_iter().collect();
        }

        let narrowest = query
            .iter()
            .filter_map(|(field, value)| self.indexes.lookup(field, value))
            .min_by_key(|keys| keys.len());

        match narrowest {
            Some(keys) => {
                let mut positions: Vec<usize> = keys
                    .into_iter()
                    .filter_map(|k| self.positions.get(k).copied())
                    .collect();
                positions.sort_unstable();
                positions.into_iter().map(|pos| &self.records[pos]).collect()
            }
            None => self.records.iter().collect(),
        }
    }

    fn matching(&self, primary_key: &str, query: &Query) -> Vec<&Record> {
        self.candidates(primary_key, query)
            .into_iter()
            .filter(|r| query::matches(r, query))
            .collect()
    }
}

/// Primary key of a record, if present and usable as a key.
fn primary_key_of(field: &str, record: &Record) -> Option<IndexKey> {
    record
        .get(field)
        .map(IndexKey::from_json)
        .filter(IndexKey::is_valid_primary)
}

/// One collection: records in memory, one file on disk.
///
/// Obtain instances through `Database::collection` so every caller shares
/// the same write gate.
pub struct CollectionStore {
    name: String,
    path: PathBuf,
    primary_key: String,
    validator: Option<Arc<dyn Validator>>,
    index_defs: Vec<IndexDef>,
    pretty: bool,
    state: Arc<RwLock<CollectionState>>,
    loaded: OnceCell<()>,
    write_gate: Arc<Mutex<()>>,
}

impl fmt::Debug for CollectionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionStore")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}

impl CollectionStore {
    /// Create a store for the file at `path`. Nothing is read until the
    /// first operation.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, options: CollectionOptions, pretty: bool) -> Self {
        let index_defs = options.indexes;
        Self {
            name: name.into(),
            path: path.into(),
            primary_key: options.primary_key,
            validator: options.validator,
            state: Arc::new(RwLock::new(CollectionState::empty(&index_defs))),
            index_defs,
            pretty,
            loaded: OnceCell::new(),
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn index_definitions(&self) -> &[IndexDef] {
        &self.index_defs
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Record with the given primary key.
    pub async fn read(&self, id: impl Into<Value>) -> StoreResult<Option<Record>> {
        self.ensure_loaded().await?;
        let key = IndexKey::from_json(&id.into());
        Ok(self.state.read().get(&key).cloned())
    }

    /// First record (in insertion order) matching `query`.
    pub async fn find_one(&self, query: &Query) -> StoreResult<Option<Record>> {
        self.ensure_loaded().await?;
        let state = self.state.read();
        Ok(state
            .candidates(&self.primary_key, query)
            .into_iter()
            .find(|r| query::matches(r, query))
            .cloned())
    }

    /// Matching records, sorted and paged.
    pub async fn find_many(&self, query: &Query, options: &FindOptions) -> StoreResult<Page> {
        self.ensure_loaded().await?;
        let state = self.state.read();
        Ok(query::paginate(state.matching(&self.primary_key, query), options))
    }

    /// Every matching record, in insertion order.
    pub async fn find(&self, query: &Query) -> StoreResult<Vec<Record>> {
        Ok(self.find_many(query, &FindOptions::default()).await?.records)
    }

    /// Number of matching records.
    pub async fn count(&self, query: &Query) -> StoreResult<usize> {
        self.ensure_loaded().await?;
        let state = self.state.read();
        Ok(state.matching(&self.primary_key, query).len())
    }

    /// Copy of every record. Unpaged; avoid on large collections.
    pub async fn all(&self) -> StoreResult<Vec<Record>> {
        self.ensure_loaded().await?;
        Ok(self.state.read().records.clone())
    }

    /// Primary keys indexed under `value` for `field`, or `None` when the
    /// field has no index.
    pub async fn index_lookup(&self, field: &str, value: &Value) -> StoreResult<Option<Vec<IndexKey>>> {
        self.ensure_loaded().await?;
        let state = self.state.read();
        Ok(state
            .indexes
            .lookup(field, value)
            .map(|keys| keys.into_iter().cloned().collect()))
    }

    /// Every value -> primary keys entry of one index.
    pub async fn index_entries(&self, field: &str) -> StoreResult<Option<Vec<(IndexKey, Vec<IndexKey>)>>> {
        self.ensure_loaded().await?;
        let state = self.state.read();
        Ok(state.indexes.postings(field).map(|postings| {
            postings
                .iter()
                .map(|(value, keys)| (value.clone(), keys.iter().cloned().collect()))
                .collect()
        }))
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Insert a new record. Generates a primary key if absent.
    pub async fn create(&self, record: Record) -> StoreResult<Record> {
        self.ensure_loaded().await?;
        let gate = self.lock_gate().await;
        self.create_locked(gate, record).await
    }

    /// Merge `patch` over the record with primary key `id`.
    pub async fn update(&self, id: impl Into<Value>, patch: Record) -> StoreResult<Record> {
        self.ensure_loaded().await?;
        let gate = self.lock_gate().await;
        self.update_locked(gate, &id.into(), patch).await
    }

    /// Update the first record matching `query`, or create one from
    /// `query` merged with `payload`. Runs as one critical section.
    pub async fn upsert(&self, query: &Query, payload: Record) -> StoreResult<Record> {
        self.ensure_loaded().await?;
        let gate = self.lock_gate().await;

        let existing_id = self.first_match_id(query);
        match existing_id {
            Some(id) => self.update_locked(gate, &id, payload).await,
            None => self.create_locked(gate, merge_query(query, payload)).await,
        }
    }

    /// Create a record from `query` merged with `payload` unless some
    /// record already matches `query`. Returns the created record.
    pub async fn create_if_absent(&self, query: &Query, payload: Record) -> StoreResult<Option<Record>> {
        self.ensure_loaded().await?;
        let gate = self.lock_gate().await;

        if self.first_match_id(query).is_some() {
            return Ok(None);
        }
        self.create_locked(gate, merge_query(query, payload)).await.map(Some)
    }

    /// Delete the record with primary key `id`. Returns whether it existed.
    pub async fn remove(&self, id: impl Into<Value>) -> StoreResult<bool> {
        self.ensure_loaded().await?;
        let gate = self.lock_gate().await;

        let key = IndexKey::from_json(&id.into());
        let (pos, bytes) = {
            let state = self.state.read();
            let Some(&pos) = state.positions.get(&key) else {
                return Ok(false);
            };
            let remaining = state
                .records
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != pos)
                .map(|(_, r)| r);
            (pos, self.encode(remaining)?)
        };

        self.commit(gate, bytes, Change::Remove { key, pos }).await?;
        Ok(true)
    }

    /// Replace the whole collection.
    ///
    /// Every record is normalized and validated; any failure, duplicate
    /// primary key, or unique-index clash rejects the entire set.
    pub async fn replace_all(&self, records: Vec<Record>) -> StoreResult<()> {
        self.ensure_loaded().await?;
        let gate = self.lock_gate().await;

        let now = now_timestamp();
        let normalized = records
            .into_iter()
            .map(|r| self.normalize_replacement(r, &now))
            .collect::<StoreResult<Vec<_>>>()?;

        let state = CollectionState::build(&self.primary_key, &self.index_defs, normalized)
            .map_err(|e| self.build_error(e))?;
        let bytes = self.encode(&state.records)?;
        let count = state.records.len();

        self.commit(gate, bytes, Change::Reset(state)).await?;
        tracing::info!(collection = %self.name, records = count, "replaced collection");
        Ok(())
    }

    /// Discard memory and reload from disk.
    ///
    /// On a corrupt file the previous in-memory state is kept.
    pub async fn reload(&self) -> StoreResult<()> {
        self.ensure_loaded().await?;
        let _gate = self.lock_gate().await;

        let state = self.load_state().await?;
        let count = state.records.len();
        self.state.write().apply(Change::Reset(state));
        tracing::info!(collection = %self.name, records = count, "reloaded collection");
        Ok(())
    }

    /// Wait until no mutation is in flight.
    pub(crate) async fn wait_idle(&self) {
        let _gate = self.lock_gate().await;
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn ensure_loaded(&self) -> StoreResult<()> {
        self.loaded
            .get_or_try_init(|| async {
                let state = self.load_state().await?;
                let count = state.records.len();
                *self.state.write() = state;
                tracing::debug!(collection = %self.name, records = count, "loaded collection");
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    async fn load_state(&self) -> StoreResult<CollectionState> {
        let records = storage::load_records(&self.path)
            .await
            .map_err(|e| StoreError::from_storage(&self.name, e))?;

        CollectionState::build(&self.primary_key, &self.index_defs, records).map_err(|e| {
            let reason = match e {
                BuildError::MissingKey(i) => {
                    format!("record {} has no usable '{}' field", i, self.primary_key)
                }
                BuildError::DuplicateKey(key) => format!("primary key {} appears twice", key),
                BuildError::Index(err) => err.to_string(),
            };
            tracing::error!(collection = %self.name, path = %self.path.display(), %reason, "corrupt collection file");
            StoreError::CorruptStore {
                collection: self.name.clone(),
                reason,
            }
        })
    }

    async fn lock_gate(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.write_gate).lock_owned().await
    }

    async fn create_locked(&self, gate: OwnedMutexGuard<()>, input: Record) -> StoreResult<Record> {
        let (key, record) = self.prepare_new(input)?;

        let bytes = {
            let state = self.state.read();
            if state.positions.contains_key(&key) {
                return Err(StoreError::DuplicateKey {
                    collection: self.name.clone(),
                    key: key.to_string(),
                });
            }
            state
                .indexes
                .check_insert(&key, &record)
                .map_err(|e| self.index_error(e))?;
            self.encode(state.records.iter().chain(iter::once(&record)))?
        };

        let change = Change::Insert {
            key,
            record: record.clone(),
        };
        self.commit(gate, bytes, change).await?;
        Ok(record)
    }

    async fn update_locked(&self, gate: OwnedMutexGuard<()>, id: &Value, patch: Record) -> StoreResult<Record> {
        let key = IndexKey::from_json(id);
        let not_found = || StoreError::NotFound {
            collection: self.name.clone(),
            key: key.to_string(),
        };
        let current = self.state.read().get(&key).cloned().ok_or_else(not_found)?;

        if let Some(new_id) = patch.get(&self.primary_key) {
            if IndexKey::from_json(new_id) != key {
                return Err(StoreError::PrimaryKeyImmutable {
                    collection: self.name.clone(),
                    field: self.primary_key.clone(),
                    key: key.to_string(),
                });
            }
        }

        let mut merged = current.clone();
        merged.remove(CREATED_AT);
        merged.remove(UPDATED_AT);
        for (field, value) in patch {
            if field != CREATED_AT && field != UPDATED_AT {
                merged.insert(field, value);
            }
        }

        let mut record = self.run_validator(merged)?;
        if let Some(id_value) = current.get(&self.primary_key) {
            record.insert(self.primary_key.clone(), id_value.clone());
        }
        let now = now_timestamp();
        let created = current
            .get(CREATED_AT)
            .cloned()
            .unwrap_or_else(|| Value::String(now.clone()));
        record.insert(CREATED_AT.to_string(), created);
        record.insert(UPDATED_AT.to_string(), Value::String(now));

        let (pos, bytes) = {
            let state = self.state.read();
            let pos = state.positions.get(&key).copied().ok_or_else(not_found)?;
            state
                .indexes
                .check_update(&key, &current, &record)
                .map_err(|e| self.index_error(e))?;
            let next = state
                .records
                .iter()
                .enumerate()
                .map(|(i, r)| if i == pos { &record } else { r });
            (pos, self.encode(next)?)
        };

        let change = Change::Replace {
            key,
            pos,
            old: current,
            record: record.clone(),
        };
        self.commit(gate, bytes, change).await?;
        Ok(record)
    }

    /// Write `bytes` over the file, then apply `change` to memory.
    ///
    /// Runs in its own task holding `gate`. Dropping the caller's future
    /// detaches the task instead of cancelling it, so a rename is always
    /// followed by its apply.
    async fn commit(&self, gate: OwnedMutexGuard<()>, bytes: Vec<u8>, change: Change) -> StoreResult<()> {
        let state = Arc::clone(&self.state);
        let path = self.path.clone();
        let name = self.name.clone();

        let task = tokio::spawn(async move {
            let _gate = gate;
            storage::write_atomic(&path, &bytes)
                .await
                .map_err(|source| StoreError::Io {
                    collection: name.clone(),
                    source,
                })?;
            tracing::debug!(collection = %name, bytes = bytes.len(), "persisted collection");
            state.write().apply(change);
            Ok::<(), StoreError>(())
        });

        task.await.map_err(|e| {
            tracing::error!(collection = %self.name, error = %e, "commit task failed");
            StoreError::Io {
                collection: self.name.clone(),
                source: io::Error::new(io::ErrorKind::Other, e),
            }
        })?
    }

    /// Primary key value of the first record matching `query`.
    fn first_match_id(&self, query: &Query) -> Option<Value> {
        let state = self.state.read();
        state
            .candidates(&self.primary_key, query)
            .into_iter()
            .find(|r| query::matches(r, query))
            .and_then(|r| r.get(&self.primary_key).cloned())
    }

    /// Assign key and timestamps to a new record and validate it.
    fn prepare_new(&self, mut candidate: Record) -> StoreResult<(IndexKey, Record)> {
        let id_value = match candidate.get(&self.primary_key) {
            Some(v) if !v.is_null() => v.clone(),
            _ => {
                let id = Value::String(Uuid::new_v4().to_string());
                candidate.insert(self.primary_key.clone(), id.clone());
                id
            }
        };
        let key = self.checked_key(&id_value)?;

        candidate.remove(CREATED_AT);
        candidate.remove(UPDATED_AT);

        let mut record = self.run_validator(candidate)?;
        record.insert(self.primary_key.clone(), id_value);
        let now = Value::String(now_timestamp());
        record.insert(CREATED_AT.to_string(), now.clone());
        record.insert(UPDATED_AT.to_string(), now);

        Ok((key, record))
    }

    /// Normalize one record of a `replace_all` batch.
    ///
    /// Existing timestamps are kept; missing ones are set to `now`.
    fn normalize_replacement(&self, mut candidate: Record, now: &str) -> StoreResult<Record> {
        let id_value = match candidate.get(&self.primary_key) {
            Some(v) if !v.is_null() => v.clone(),
            _ => Value::String(Uuid::new_v4().to_string()),
        };
        candidate.insert(self.primary_key.clone(), id_value.clone());
        self.checked_key(&id_value)?;

        let created = candidate.remove(CREATED_AT);
        let updated = candidate.remove(UPDATED_AT);

        let mut record = self.run_validator(candidate)?;
        record.insert(self.primary_key.clone(), id_value);
        record.insert(
            CREATED_AT.to_string(),
            created.unwrap_or_else(|| Value::String(now.to_string())),
        );
        record.insert(
            UPDATED_AT.to_string(),
            updated.unwrap_or_else(|| Value::String(now.to_string())),
        );
        Ok(record)
    }

    fn checked_key(&self, id_value: &Value) -> StoreResult<IndexKey> {
        let key = IndexKey::from_json(id_value);
        if key.is_valid_primary() {
            return Ok(key);
        }
        Err(StoreError::Validation {
            collection: self.name.clone(),
            errors: ValidationDetails::type_mismatch(
                self.primary_key.clone(),
                "string or integer primary key",
                key.to_string(),
            )
            .into(),
        })
    }

    fn run_validator(&self, candidate: Record) -> StoreResult<Record> {
        match &self.validator {
            None => Ok(candidate),
            Some(validator) => validator
                .validate(&candidate)
                .map_err(|errors: ValidationErrors| StoreError::Validation {
                    collection: self.name.clone(),
                    errors,
                }),
        }
    }

    fn encode<'a, I>(&self, records: I) -> StoreResult<Vec<u8>>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        storage::encode_records(records, self.pretty).map_err(|e| StoreError::Io {
            collection: self.name.clone(),
            source: e.into(),
        })
    }

    fn index_error(&self, source: IndexError) -> StoreError {
        StoreError::UniqueIndexViolation {
            collection: self.name.clone(),
            source,
        }
    }

    fn build_error(&self, err: BuildError) -> StoreError {
        match err {
            BuildError::DuplicateKey(key) => StoreError::DuplicateKey {
                collection: self.name.clone(),
                key: key.to_string(),
            },
            BuildError::Index(e) => self.index_error(e),
            // Normalization always assigns a key
            BuildError::MissingKey(i) => StoreError::Validation {
                collection: self.name.clone(),
                errors: ValidationDetails::missing_field(format!("[{}].{}", i, self.primary_key)).into(),
            },
        }
    }
}

/// Record built from an equality query with `payload` laid over it.
fn merge_query(query: &Query, payload: Record) -> Record {
    let mut record = Record::new();
    for (path, value) in query {
        set_path(&mut record, path, value.clone());
    }
    for (field, value) in payload {
        record.insert(field, value);
    }
    record
}
