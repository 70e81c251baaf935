//! Database Registry
//!
//! Hands out one `CollectionStore` per collection name. Every caller of a
//! collection shares the same instance, and with it the same write gate.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::config::DatabaseConfig;
use crate::collection::{CollectionOptions, CollectionStore, Query, StoreError, StoreResult};
use crate::record::Record;

/// Handle to a data directory of collections
pub struct Database {
    config: DatabaseConfig,
    collections: Mutex<HashMap<String, Arc<CollectionStore>>>,
    closed: AtomicBool,
}

impl Database {
    pub fn open(config: DatabaseConfig) -> Self {
        tracing::info!(data_dir = %config.data_dir.display(), pretty = config.pretty, "opened database");
        Self {
            config,
            collections: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn open_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::open(DatabaseConfig::with_data_dir(data_dir.as_ref()))
    }

    /// Open the directory named by `DATA_DIR`
    pub fn from_env() -> Self {
        Self::open(DatabaseConfig::from_env())
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.config.data_dir()
    }

    /// Store for `name`, created on first request.
    ///
    /// Later calls return the cached store; their `options` are ignored.
    pub fn collection(&self, name: &str, options: CollectionOptions) -> StoreResult<Arc<CollectionStore>> {
        validate_name(name)?;

        let mut collections = self.collections.lock();
        // Checked under the map lock so close() cannot race a new entry in
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }

        if let Some(existing) = collections.get(name) {
            return Ok(Arc::clone(existing));
        }

        let store = Arc::new(CollectionStore::new(
            name,
            self.config.collection_path(name),
            options,
            self.config.pretty,
        ));
        collections.insert(name.to_string(), Arc::clone(&store));
        tracing::debug!(collection = name, path = %store.path().display(), "registered collection");
        Ok(store)
    }

    /// Names of collections opened so far, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait for in-flight mutations, then drop every cached store.
    ///
    /// Handles obtained earlier stay usable; the registry hands out no new ones.
    pub async fn close(&self) {
        let stores: Vec<Arc<CollectionStore>> = {
            let mut collections = self.collections.lock();
            self.closed.store(true, Ordering::Release);
            collections.drain().map(|(_, store)| store).collect()
        };

        for store in &stores {
            store.wait_idle().await;
        }
        tracing::info!(collections = stores.len(), "closed database");
    }

    /// Make sure a record matching `query` exists in `name`.
    ///
    /// Best effort: failures are logged and swallowed. Returns whether a
    /// record was created.
    pub async fn seed(&self, name: &str, options: CollectionOptions, query: &Query, payload: Record) -> bool {
        let store = match self.collection(name, options) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(collection = name, code = e.code(), error = %e, "seed skipped");
                return false;
            }
        };

        match store.create_if_absent(query, payload).await {
            Ok(Some(record)) => {
                let id = record.get(store.primary_key()).cloned().unwrap_or_default();
                tracing::info!(collection = name, id = %id, "seeded record");
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(collection = name, code = e.code(), error = %e, "seed failed");
                false
            }
        }
    }
}

/// A collection name must be usable as a single file name.
fn validate_name(name: &str) -> StoreResult<()> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidCollectionName(name.to_string()));
    }
    Ok(())
}
