//! Index contract and key types.

use crate::error::{CoreError, CoreResult};
use crate::stats::IndexStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// A key that can be stored in any index variant.
///
/// Index keys must be:
/// - Orderable (for [`BTreeIndex`](super::BTreeIndex) and
///   [`BPlusTreeIndex`](super::BPlusTreeIndex))
/// - Hashable (for [`HashIndex`](super::HashIndex))
///
/// The concrete variants only ask for the bounds they use; this trait is
/// what variant-agnostic code such as [`open_index`](super::open_index)
/// requires.
pub trait IndexKey: Clone + Eq + Hash + Ord {}

impl<T: Clone + Eq + Hash + Ord> IndexKey for T {}

/// The structure backing an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Order-m B-tree, values stored in every node.
    BTree,
    /// B+-tree with linked leaves, values stored in leaves only.
    #[default]
    BPlusTree,
    /// Fixed-capacity hash table with collision chains.
    Hash,
}

impl IndexKind {
    /// Returns true if full scans of this kind come back in key order.
    pub const fn is_ordered(self) -> bool {
        matches!(self, Self::BTree | Self::BPlusTree)
    }

    /// Returns the canonical lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BTree => "btree",
            Self::BPlusTree => "bplustree",
            Self::Hash => "hash",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "btree" | "b-tree" => Ok(Self::BTree),
            "bplustree" | "bplus" | "b+tree" | "b+" => Ok(Self::BPlusTree),
            "hash" => Ok(Self::Hash),
            other => Err(CoreError::invalid_config(format!(
                "unknown index kind '{other}'"
            ))),
        }
    }
}

/// Core index trait.
///
/// All three variants implement these operations with identical semantics,
/// so calling code can be written once against `dyn Index<K, V>`.
///
/// Misses are not errors: `search` returns `None` and `delete` returns
/// `false` for unknown keys.
pub trait Index<K, V> {
    /// Returns which structure backs this index.
    fn kind(&self) -> IndexKind;

    /// Inserts a key-value pair.
    ///
    /// If the key is already present its value is replaced and the old value
    /// is returned; otherwise a new entry is added and `None` is returned.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    /// Looks up the value stored for `key`.
    fn search(&self, key: &K) -> Option<&V>;

    /// Removes `key`. Returns true if an entry existed and was removed.
    fn delete(&mut self, key: &K) -> bool;

    /// Returns every stored value.
    ///
    /// Tree variants return values in ascending key order; the hash variant
    /// makes no ordering promise.
    fn all_values(&self) -> Vec<V>;

    /// Returns the number of distinct keys.
    fn len(&self) -> usize;

    /// Returns true if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if the index contains a key.
    fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// Removes every entry, keeping the structural parameters.
    fn clear(&mut self);

    /// Returns the operation counters of this index.
    fn stats(&self) -> &IndexStats;

    /// Checks the structural invariants of the backing structure.
    ///
    /// Returns [`CoreError::Corruption`] describing the first violation found.
    fn verify(&self) -> CoreResult<()>;
}

impl<K, V, I: Index<K, V> + ?Sized> Index<K, V> for Box<I> {
    fn kind(&self) -> IndexKind {
        (**self).kind()
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        (**self).insert(key, value)
    }

    fn search(&self, key: &K) -> Option<&V> {
        (**self).search(key)
    }

    fn delete(&mut self, key: &K) -> bool {
        (**self).delete(key)
    }

    fn all_values(&self) -> Vec<V> {
        (**self).all_values()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn clear(&mut self) {
        (**self).clear();
    }

    fn stats(&self) -> &IndexStats {
        (**self).stats()
    }

    fn verify(&self) -> CoreResult<()> {
        (**self).verify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parse_and_display() {
        for kind in [IndexKind::BTree, IndexKind::BPlusTree, IndexKind::Hash] {
            assert_eq!(kind.to_string().parse::<IndexKind>().unwrap(), kind);
        }
        assert_eq!("B+Tree".parse::<IndexKind>().unwrap(), IndexKind::BPlusTree);
        assert!("skiplist".parse::<IndexKind>().is_err());
    }

    #[test]
    fn kind_ordering() {
        assert!(IndexKind::BTree.is_ordered());
        assert!(IndexKind::BPlusTree.is_ordered());
        assert!(!IndexKind::Hash.is_ordered());
        assert_eq!(IndexKind::default(), IndexKind::BPlusTree);
    }

    #[test]
    fn kind_serde_names() {
        let json = serde_json::to_string(&IndexKind::BPlusTree).unwrap();
        assert_eq!(json, "\"b_plus_tree\"");
        let kind: IndexKind = serde_json::from_str("\"hash\"").unwrap();
        assert_eq!(kind, IndexKind::Hash);
    }
}
