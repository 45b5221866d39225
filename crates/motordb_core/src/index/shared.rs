//! Thread-shared index handle.

use crate::index::traits::Index;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::marker::PhantomData;
use std::sync::Arc;

/// A cloneable handle that shares one index between threads.
///
/// The index itself is single-threaded; this handle serializes access with
/// a reader-writer lock. Any number of readers may search or scan at once,
/// while an insert or delete holds the lock exclusively.
///
/// Point lookups return owned values because the lock guard cannot outlive
/// the call. Use [`read`](Self::read) to borrow for longer.
///
/// # Example
///
/// ```rust
/// use motordb_core::{BPlusTreeIndex, SharedIndex};
/// use std::thread;
///
/// let shared = SharedIndex::new(BPlusTreeIndex::new(4).unwrap());
/// let writer = shared.clone();
/// thread::spawn(move || writer.insert(1u32, "one")).join().unwrap();
/// assert_eq!(shared.get(&1), Some("one"));
/// ```
pub struct SharedIndex<K, V, I> {
    inner: Arc<RwLock<I>>,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V, I: Index<K, V>> SharedIndex<K, V, I> {
    /// Wraps an index for shared access.
    pub fn new(index: I) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
            _marker: PhantomData,
        }
    }

    /// Acquires shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, I> {
        self.inner.read()
    }

    /// Acquires exclusive write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, I> {
        self.inner.write()
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    /// Returns a copy of the value stored for `key`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.read().search(key).cloned()
    }

    /// Removes `key`, returning true if it was present.
    pub fn delete(&self, key: &K) -> bool {
        self.inner.write().delete(key)
    }

    /// Returns every stored value, in the wrapped index's scan order.
    pub fn all_values(&self) -> Vec<V> {
        self.inner.read().all_values()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of handles sharing this index.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<K, V, I> Clone for SharedIndex<K, V, I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _marker: PhantomData,
        }
    }
}

impl<K, V, I: std::fmt::Debug> std::fmt::Debug for SharedIndex<K, V, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedIndex")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::index::{open_index, HashIndex, IndexKind};
    use std::thread;

    #[test]
    fn concurrent_writers_disjoint_keys() {
        let shared = SharedIndex::new(HashIndex::new(8).unwrap());

        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let index = shared.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        index.insert(t * 1000 + i, i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.len(), 1000);
        assert_eq!(shared.get(&3_249), Some(249));
        assert_eq!(shared.read().stats().snapshot().inserts, 1000);
        shared.read().verify().unwrap();
    }

    #[test]
    fn readers_see_writes() {
        let config = IndexConfig::new().kind(IndexKind::BTree).order(3);
        let shared = SharedIndex::new(open_index::<u32, u32>(&config).unwrap());
        for key in 0..100 {
            shared.insert(key, key + 1);
        }

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let index = shared.clone();
                thread::spawn(move || (0..100).all(|k| index.get(&k) == Some(k + 1)))
            })
            .collect();
        for reader in readers {
            assert!(reader.join().unwrap());
        }

        assert!(shared.delete(&50));
        assert!(!shared.delete(&50));
        assert_eq!(shared.all_values().len(), 99);
        assert_eq!(shared.handle_count(), 1);
    }
}
