//! Index implementations.
//!
//! Three interchangeable structures sit behind one [`Index`] contract, so
//! the layer above picks a variant by configuration and never touches
//! structure-specific code.
//!
//! # Index Types
//!
//! - [`BPlusTreeIndex`]: values in chained leaves; ordered scans and range queries
//! - [`BTreeIndex`]: values in every node; ordered scans
//! - [`HashIndex`]: fixed bucket array; O(1) expected equality lookup, unordered scans
//!
//! Use [`open_index`] to build the variant an [`IndexConfig`] selects and
//! [`SharedIndex`] to share one index between threads.

mod bplus;
mod btree;
mod hash;
mod shared;
mod traits;

pub use bplus::{BPlusTreeIndex, Iter as BPlusTreeIter};
pub use btree::{BTreeIndex, Iter as BTreeIter};
pub use hash::{DefaultHashBuilder, HashIndex, DEFAULT_CAPACITY};
pub use shared::SharedIndex;
pub use traits::{Index, IndexKey, IndexKind};

use crate::config::IndexConfig;
use crate::error::CoreResult;
use tracing::debug;

/// Smallest accepted tree order.
pub const MIN_ORDER: usize = 2;

/// Tree order used when none is configured.
pub const DEFAULT_ORDER: usize = 4;

/// Builds the index variant selected by `config`.
///
/// Only the parameter relevant to the chosen kind is checked: a hash index
/// ignores `order` and the trees ignore `capacity`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidOrder`](crate::CoreError::InvalidOrder) or
/// [`CoreError::InvalidCapacity`](crate::CoreError::InvalidCapacity) when
/// that parameter is out of range.
///
/// # Example
///
/// ```rust
/// use motordb_core::{open_index, IndexConfig, IndexKind};
///
/// let config = IndexConfig::new().kind(IndexKind::Hash).capacity(64);
/// let mut index = open_index::<String, u32>(&config).unwrap();
/// index.insert("alice".to_string(), 1);
/// assert_eq!(index.search(&"alice".to_string()), Some(&1));
/// assert_eq!(index.kind(), IndexKind::Hash);
/// ```
pub fn open_index<K, V>(config: &IndexConfig) -> CoreResult<Box<dyn Index<K, V> + Send + Sync>>
where
    K: IndexKey + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    config.validate()?;
    debug!(kind = %config.kind, order = config.order, capacity = config.capacity, "opening index");
    let index: Box<dyn Index<K, V> + Send + Sync> = match config.kind {
        IndexKind::BTree => Box::new(BTreeIndex::new(config.order)?),
        IndexKind::BPlusTree => Box::new(BPlusTreeIndex::new(config.order)?),
        IndexKind::Hash => Box::new(HashIndex::new(config.capacity)?),
    };
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn open_each_kind() {
        for kind in [IndexKind::BTree, IndexKind::BPlusTree, IndexKind::Hash] {
            let mut index = open_index::<i32, i32>(&IndexConfig::new().kind(kind)).unwrap();
            assert_eq!(index.kind(), kind);

            for key in [3, 1, 2] {
                assert_eq!(index.insert(key, key * 100), None);
            }
            assert_eq!(index.insert(2, 7), Some(200));
            assert_eq!(index.len(), 3);
            assert!(index.delete(&1));
            assert!(!index.delete(&1));

            let mut values = index.all_values();
            if !kind.is_ordered() {
                values.sort_unstable();
            }
            assert_eq!(values, vec![7, 300]);
        }
    }

    #[test]
    fn open_checks_only_relevant_parameter() {
        let hash = IndexConfig::new().kind(IndexKind::Hash).order(0);
        assert!(open_index::<u8, u8>(&hash).is_ok());

        let tree = IndexConfig::new().kind(IndexKind::BTree).capacity(0);
        assert!(open_index::<u8, u8>(&tree).is_ok());

        let bad = IndexConfig::new().kind(IndexKind::BPlusTree).order(1);
        assert_eq!(
            open_index::<u8, u8>(&bad).err(),
            Some(CoreError::InvalidOrder { order: 1, min: MIN_ORDER })
        );

        let bad = IndexConfig::new().kind(IndexKind::Hash).capacity(0);
        assert_eq!(
            open_index::<u8, u8>(&bad).err(),
            Some(CoreError::InvalidCapacity { capacity: 0 })
        );
    }
}
