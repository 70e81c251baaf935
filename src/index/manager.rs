//! Index Manager for docstore
//!
//! Maintains equality indexes over declared field paths. Each index maps a
//! field value to the set of primary keys of records holding that value.
//!
//! # API
//!
//! - `insert(pk, record)` - Index a new record
//! - `remove(pk, record)` - Drop a record from every index
//! - `update(pk, old, new)` - Move a record between values where they changed
//! - `rebuild(records)` - Replace all index contents from a full record set
//! - `lookup(field, value)` - Exact match lookup
//!
//! Every mutating call checks uniqueness for all affected indexes before
//! touching any of them, so a rejected call leaves the indexes unchanged.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{IndexError, IndexResult};
use super::key::IndexKey;
use crate::record::{get_path, Record};

/// Declaration of one equality index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Dot-separated field path
    pub field: String,
    /// At most one record per value
    #[serde(default)]
    pub unique: bool,
}

impl IndexDef {
    /// Non-unique index on `field`
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: false,
        }
    }

    /// Unique index on `field`
    pub fn unique(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: true,
        }
    }
}

impl From<&str> for IndexDef {
    fn from(field: &str) -> Self {
        IndexDef::new(field)
    }
}

impl From<String> for IndexDef {
    fn from(field: String) -> Self {
        IndexDef::new(field)
    }
}

impl From<(&str, bool)> for IndexDef {
    fn from((field, unique): (&str, bool)) -> Self {
        Self {
            field: field.to_string(),
            unique,
        }
    }
}

/// Value -> primary keys
type Postings = HashMap<IndexKey, HashSet<IndexKey>>;

#[derive(Debug, Clone)]
struct FieldIndex {
    def: IndexDef,
    postings: Postings,
}

impl FieldIndex {
    fn key_of(&self, record: &Record) -> Option<IndexKey> {
        get_path(record, &self.def.field).map(IndexKey::from_json)
    }

    /// Fails if `value` is already held by a record other than `pk`.
    fn check_unique(&self, pk: &IndexKey, value: &IndexKey) -> IndexResult<()> {
        if !self.def.unique {
            return Ok(());
        }
        if let Some(holder) = self
            .postings
            .get(value)
            .and_then(|keys| keys.iter().find(|k| *k != pk))
        {
            return Err(IndexError::UniqueViolation {
                field: self.def.field.clone(),
                value: value.to_string(),
                existing: holder.to_string(),
            });
        }
        Ok(())
    }

    fn add(&mut self, pk: &IndexKey, value: IndexKey) {
        self.postings.entry(value).or_default().insert(pk.clone());
    }

    fn drop_key(&mut self, pk: &IndexKey, value: &IndexKey) {
        if let Some(keys) = self.postings.get_mut(value) {
            keys.remove(pk);
            if keys.is_empty() {
                self.postings.remove(value);
            }
        }
    }
}

/// Index Manager that maintains in-memory equality indexes
#[derive(Debug, Clone, Default)]
pub struct IndexManager {
    indexes: Vec<FieldIndex>,
}

impl IndexManager {
    /// Creates an empty manager for the given definitions.
    ///
    /// A field declared more than once gets one index, unique if any
    /// declaration asked for it.
    pub fn new<I>(defs: I) -> Self
    where
        I: IntoIterator<Item = IndexDef>,
    {
        let mut indexes: Vec<FieldIndex> = Vec::new();
        for def in defs {
            match indexes.iter_mut().find(|ix| ix.def.field == def.field) {
                Some(existing) => existing.def.unique |= def.unique,
                None => indexes.push(FieldIndex {
                    def,
                    postings: HashMap::new(),
                }),
            }
        }
        Self { indexes }
    }

    /// Declared indexes, in declaration order
    pub fn definitions(&self) -> impl Iterator<Item = &IndexDef> {
        self.indexes.iter().map(|ix| &ix.def)
    }

    /// Whether `field` has an index
    pub fn has_index(&self, field: &str) -> bool {
        self.find(field).is_some()
    }

    fn find(&self, field: &str) -> Option<&FieldIndex> {
        self.indexes.iter().find(|ix| ix.def.field == field)
    }

    /// Check that inserting `record` under `pk` violates no unique index.
    pub fn check_insert(&self, pk: &IndexKey, record: &Record) -> IndexResult<()> {
        for ix in &self.indexes {
            if let Some(value) = ix.key_of(record) {
                ix.check_unique(pk, &value)?;
            }
        }
        Ok(())
    }

    /// Index a record. Absent fields are skipped.
    pub fn insert(&mut self, pk: &IndexKey, record: &Record) -> IndexResult<()> {
        self.check_insert(pk, record)?;
        self.apply_insert(pk, record);
        Ok(())
    }

    /// Index a record already accepted by `check_insert`.
    pub fn apply_insert(&mut self, pk: &IndexKey, record: &Record) {
        for ix in &mut self.indexes {
            if let Some(value) = ix.key_of(record) {
                ix.add(pk, value);
            }
        }
    }

    /// Drop a record from every index.
    pub fn remove(&mut self, pk: &IndexKey, record: &Record) {
        for ix in &mut self.indexes {
            if let Some(value) = ix.key_of(record) {
                ix.drop_key(pk, &value);
            }
        }
    }

    /// Check that replacing `old` with `new` violates no unique index.
    pub fn check_update(&self, pk: &IndexKey, old: &Record, new: &Record) -> IndexResult<()> {
        for ix in &self.indexes {
            let new_value = ix.key_of(new);
            if new_value == ix.key_of(old) {
                continue;
            }
            if let Some(value) = new_value {
                ix.check_unique(pk, &value)?;
            }
        }
        Ok(())
    }

    /// Re-index fields whose value changed between `old` and `new`.
    pub fn update(&mut self, pk: &IndexKey, old: &Record, new: &Record) -> IndexResult<()> {
        self.check_update(pk, old, new)?;
        self.apply_update(pk, old, new);
        Ok(())
    }

    /// Re-index a change already accepted by `check_update`.
    pub fn apply_update(&mut self, pk: &IndexKey, old: &Record, new: &Record) {
        for ix in &mut self.indexes {
            let old_value = ix.key_of(old);
            let new_value = ix.key_of(new);
            if old_value == new_value {
                continue;
            }
            if let Some(value) = old_value {
                ix.drop_key(pk, &value);
            }
            if let Some(value) = new_value {
                ix.add(pk, value);
            }
        }
    }

    /// Clear every index and re-insert all records.
    ///
    /// On a unique violation the manager is left as it was before the call.
    pub fn rebuild<'a, I>(&mut self, records: I) -> IndexResult<()>
    where
        I: IntoIterator<Item = (IndexKey, &'a Record)>,
    {
        let mut fresh = IndexManager::new(self.definitions().cloned().collect::<Vec<_>>());
        for (pk, record) in records {
            fresh.insert(&pk, record)?;
        }
        *self = fresh;
        Ok(())
    }

    /// Primary keys of records whose `field` equals `value`.
    ///
    /// Returns `None` if `field` has no index.
    pub fn lookup(&self, field: &str, value: &Value) -> Option<Vec<&IndexKey>> {
        let ix = self.find(field)?;
        let key = IndexKey::from_json(value);
        Some(
            ix.postings
                .get(&key)
                .map(|keys| keys.iter().collect())
                .unwrap_or_default(),
        )
    }

    /// Full value -> primary keys map of one index.
    pub fn postings(&self, field: &str) -> Option<&HashMap<IndexKey, HashSet<IndexKey>>> {
        self.find(field).map(|ix| &ix.postings)
    }
}
