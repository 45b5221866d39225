//! Index configuration.

use crate::error::{CoreError, CoreResult};
use crate::index::{open_index, Index, IndexKey, IndexKind, DEFAULT_CAPACITY, DEFAULT_ORDER, MIN_ORDER};
use serde::{Deserialize, Serialize};

/// Configuration for building an index.
///
/// Deserializing fills missing fields from [`IndexConfig::default`], so a
/// stored config only has to name what differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Which structure to build.
    pub kind: IndexKind,

    /// Tree order. Used by the B-tree and B+-tree only.
    pub order: usize,

    /// Bucket count. Used by the hash index only.
    pub capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            kind: IndexKind::BPlusTree,
            order: DEFAULT_ORDER,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl IndexConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the index kind.
    #[must_use]
    pub const fn kind(mut self, kind: IndexKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the tree order.
    #[must_use]
    pub const fn order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Sets the hash bucket count.
    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Checks the parameter the configured kind uses.
    pub fn validate(&self) -> CoreResult<()> {
        match self.kind {
            IndexKind::BTree | IndexKind::BPlusTree if self.order < MIN_ORDER => {
                Err(CoreError::invalid_order(self.order, MIN_ORDER))
            }
            IndexKind::Hash if self.capacity == 0 => Err(CoreError::invalid_capacity(self.capacity)),
            _ => Ok(()),
        }
    }

    /// Builds the configured index. See [`open_index`].
    pub fn open<K, V>(&self) -> CoreResult<Box<dyn Index<K, V> + Send + Sync>>
    where
        K: IndexKey + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        open_index(self)
    }
}
