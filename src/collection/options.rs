//! Per-collection configuration

use std::fmt;
use std::sync::Arc;

use crate::index::IndexDef;
use crate::record::DEFAULT_PRIMARY_KEY;
use crate::schema::Validator;

/// How a collection is keyed, validated, and indexed.
#[derive(Clone)]
pub struct CollectionOptions {
    /// Top-level field holding the primary key
    pub primary_key: String,
    /// Checked against every record before commit
    pub validator: Option<Arc<dyn Validator>>,
    /// Equality indexes
    pub indexes: Vec<IndexDef>,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            validator: None,
            indexes: Vec::new(),
        }
    }
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Add an index from a field path or a `(field, unique)` pair
    pub fn index(mut self, def: impl Into<IndexDef>) -> Self {
        self.indexes.push(def.into());
        self
    }

    pub fn unique(self, field: impl Into<String>) -> Self {
        self.index(IndexDef::unique(field))
    }

    pub fn indexes<I, D>(mut self, defs: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<IndexDef>,
    {
        self.indexes.extend(defs.into_iter().map(Into::into));
        self
    }
}

impl fmt::Debug for CollectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionOptions")
            .field("primary_key", &self.primary_key)
            .field("validator", &self.validator.as_ref().map(|_| "<validator>"))
            .field("indexes", &self.indexes)
            .finish()
    }
}
