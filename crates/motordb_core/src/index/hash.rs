//! Hash index implementation.

use crate::error::{CoreError, CoreResult};
use crate::index::traits::{Index, IndexKind};
use crate::stats::IndexStats;
use rustc_hash::FxHasher;
use std::hash::{BuildHasher, BuildHasherDefault, Hash};
use std::mem;
use tracing::debug;

/// Bucket count used by [`HashIndex::default`].
pub const DEFAULT_CAPACITY: usize = 16;

/// Deterministic hasher used when none is supplied.
pub type DefaultHashBuilder = BuildHasherDefault<FxHasher>;

/// One link of a collision chain.
struct Entry<K, V> {
    key: K,
    value: V,
    next: Option<Box<Entry<K, V>>>,
}

type Chain<K, V> = Option<Box<Entry<K, V>>>;

/// Hash-based index for O(1) average equality lookups.
///
/// `HashIndex` is a fixed array of buckets, each holding a singly linked
/// chain of entries whose keys hash to that bucket. The bucket count is
/// chosen at construction and never changes, so many colliding keys
/// degrade operations to a linear chain walk.
///
/// The hasher is pluggable through [`BuildHasher`]. The default is FxHash,
/// which gives the same bucket for the same key on every run.
///
/// # Example
///
/// ```rust
/// use motordb_core::{HashIndex, Index};
///
/// let mut index = HashIndex::new(16).unwrap();
/// index.insert("alice".to_string(), 1);
/// assert_eq!(index.search(&"alice".to_string()), Some(&1));
/// assert!(index.delete(&"alice".to_string()));
/// ```
pub struct HashIndex<K, V, S = DefaultHashBuilder> {
    buckets: Vec<Chain<K, V>>,
    hasher: S,
    len: usize,
    stats: IndexStats,
}

impl<K: Hash + Eq, V> HashIndex<K, V> {
    /// Creates a hash index with `capacity` buckets.
    ///
    /// Returns [`CoreError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> CoreResult<Self> {
        Self::with_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> HashIndex<K, V, S> {
    /// Creates a hash index with `capacity` buckets and a custom hasher.
    pub fn with_hasher(capacity: usize, hasher: S) -> CoreResult<Self> {
        if capacity == 0 {
            return Err(CoreError::invalid_capacity(capacity));
        }
        debug!(capacity, "creating hash index");
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize_with(capacity, || None);
        Ok(Self {
            buckets,
            hasher,
            len: 0,
            stats: IndexStats::new(),
        })
    }

    /// Returns the fixed number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the average chain length.
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    /// Returns the bucket a key maps to.
    pub fn bucket_of(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.buckets.len() as u64) as usize
    }

    /// Returns the number of entries chained in bucket `bucket`.
    ///
    /// Out-of-range buckets are reported as empty.
    pub fn bucket_len(&self, bucket: usize) -> usize {
        self.buckets
            .get(bucket)
            .map_or(0, |head| Self::chain(head).count())
    }

    /// Iterates over all entries, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.buckets
            .iter()
            .flat_map(|head| Self::chain(head).map(|entry| (&entry.key, &entry.value)))
    }

    /// Checks that every entry sits in the bucket its key hashes to, that keys
    /// are distinct within a chain, and that the entry count matches `len`.
    pub fn verify(&self) -> CoreResult<()> {
        let mut total = 0;
        for (bucket, head) in self.buckets.iter().enumerate() {
            let entries: Vec<&Entry<K, V>> = Self::chain(head).collect();
            for (i, entry) in entries.iter().enumerate() {
                if self.bucket_of(&entry.key) != bucket {
                    return Err(CoreError::corruption(format!(
                        "entry in bucket {bucket} hashes elsewhere"
                    )));
                }
                if entries[i + 1..].iter().any(|other| other.key == entry.key) {
                    return Err(CoreError::corruption(format!(
                        "duplicate key in bucket {bucket}"
                    )));
                }
            }
            total += entries.len();
        }
        if total != self.len {
            return Err(CoreError::corruption(format!(
                "hash index holds {total} entries but reports {}",
                self.len
            )));
        }
        Ok(())
    }

    fn chain(head: &Chain<K, V>) -> impl Iterator<Item = &Entry<K, V>> {
        std::iter::successors(head.as_deref(), |entry| entry.next.as_deref())
    }
}

impl<K, V, S> HashIndex<K, V, S> {
    /// Unlinks every chain one entry at a time.
    fn drain_chains(&mut self) {
        for head in &mut self.buckets {
            let mut cur = head.take();
            while let Some(mut entry) = cur {
                cur = entry.next.take();
            }
        }
        self.len = 0;
    }
}

impl<K: Hash + Eq, V> Default for HashIndex<K, V> {
    fn default() -> Self {
        let mut buckets = Vec::with_capacity(DEFAULT_CAPACITY);
        buckets.resize_with(DEFAULT_CAPACITY, || None);
        Self {
            buckets,
            hasher: DefaultHashBuilder::default(),
            len: 0,
            stats: IndexStats::new(),
        }
    }
}

impl<K, V, S> Drop for HashIndex<K, V, S> {
    fn drop(&mut self) {
        // Long chains would otherwise drop recursively.
        self.drain_chains();
    }
}

impl<K: Hash + Eq, V: Clone, S: BuildHasher> Index<K, V> for HashIndex<K, V, S> {
    fn kind(&self) -> IndexKind {
        IndexKind::Hash
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        let bucket = self.bucket_of(&key);
        let mut slot = &mut self.buckets[bucket];
        loop {
            match slot {
                Some(entry) if entry.key == key => {
                    self.stats.record_update();
                    return Some(mem::replace(&mut entry.value, value));
                }
                Some(entry) => slot = &mut entry.next,
                None => break,
            }
        }
        *slot = Some(Box::new(Entry {
            key,
            value,
            next: None,
        }));
        self.len += 1;
        self.stats.record_insert();
        None
    }

    fn search(&self, key: &K) -> Option<&V> {
        let bucket = self.bucket_of(key);
        let found = Self::chain(&self.buckets[bucket])
            .find(|entry| entry.key == *key)
            .map(|entry| &entry.value);
        self.stats.record_search(found.is_some());
        found
    }

    fn delete(&mut self, key: &K) -> bool {
        let bucket = self.bucket_of(key);
        let mut slot = &mut self.buckets[bucket];
        loop {
            match slot {
                Some(entry) if entry.key == *key => {
                    *slot = entry.next.take();
                    self.len -= 1;
                    self.stats.record_delete();
                    return true;
                }
                Some(entry) => slot = &mut entry.next,
                None => return false,
            }
        }
    }

    fn all_values(&self) -> Vec<V> {
        self.stats.record_scan();
        self.iter().map(|(_, value)| value.clone()).collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.drain_chains();
    }

    fn stats(&self) -> &IndexStats {
        &self.stats
    }

    fn verify(&self) -> CoreResult<()> {
        HashIndex::verify(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::Hasher;

    /// Hashes integers to themselves so bucket placement is predictable.
    #[derive(Default)]
    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            for byte in bytes {
                self.0 = (self.0 << 8) | u64::from(*byte);
            }
        }

        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
    }

    type Identity = BuildHasherDefault<IdentityHasher>;

    fn identity_index(capacity: usize) -> HashIndex<u64, &'static str, Identity> {
        HashIndex::with_hasher(capacity, Identity::default()).unwrap()
    }

    #[test]
    fn insert_and_search() {
        let mut index = HashIndex::new(16).unwrap();
        assert_eq!(index.insert("key1".to_string(), 1), None);

        assert_eq!(index.search(&"key1".to_string()), Some(&1));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn search_missing() {
        let index: HashIndex<String, i32> = HashIndex::new(16).unwrap();
        assert_eq!(index.search(&"missing".to_string()), None);
    }

    #[test]
    fn insert_existing_replaces() {
        let mut index = HashIndex::new(4).unwrap();
        index.insert("key".to_string(), 1);
        assert_eq!(index.insert("key".to_string(), 2), Some(1));

        assert_eq!(index.search(&"key".to_string()), Some(&2));
        assert_eq!(index.len(), 1);
        assert_eq!(index.stats().snapshot().updates, 1);
    }

    #[test]
    fn zero_capacity_rejected() {
        let result: CoreResult<HashIndex<u64, u64>> = HashIndex::new(0);
        assert_eq!(result.err(), Some(CoreError::InvalidCapacity { capacity: 0 }));
    }

    #[test]
    fn default_capacity() {
        let index: HashIndex<u64, u64> = HashIndex::default();
        assert_eq!(index.capacity(), DEFAULT_CAPACITY);
        assert!(index.is_empty());
    }

    #[test]
    fn colliding_keys_share_a_chain() {
        let mut index = identity_index(4);
        index.insert(4, "four");
        index.insert(8, "eight");
        index.insert(12, "twelve");

        assert_eq!(index.bucket_of(&4), 0);
        assert_eq!(index.bucket_len(0), 3);
        assert_eq!(index.search(&4), Some(&"four"));
        assert_eq!(index.search(&8), Some(&"eight"));
        assert_eq!(index.search(&12), Some(&"twelve"));
        index.verify().unwrap();
    }

    #[test]
    fn delete_head_middle_and_tail_of_chain() {
        let mut index = identity_index(4);
        for key in [4, 8, 12, 16] {
            index.insert(key, "v");
        }

        // middle
        assert!(index.delete(&8));
        assert_eq!(index.search(&8), None);
        assert_eq!(index.search(&4), Some(&"v"));
        assert_eq!(index.search(&12), Some(&"v"));

        // head
        assert!(index.delete(&4));
        assert_eq!(index.search(&12), Some(&"v"));

        // tail
        assert!(index.delete(&16));
        assert_eq!(index.bucket_len(0), 1);
        assert_eq!(index.len(), 1);
        index.verify().unwrap();
    }

    #[test]
    fn delete_missing_is_noop() {
        let mut index = identity_index(4);
        index.insert(4, "four");

        assert!(!index.delete(&8));
        assert!(!index.delete(&5));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn single_bucket_matches_wide_table() {
        let mut narrow = HashIndex::new(1).unwrap();
        let mut wide = HashIndex::new(1024).unwrap();
        for i in 0..200u32 {
            narrow.insert(i, i * 3);
            wide.insert(i, i * 3);
        }
        for i in (0..200u32).step_by(3) {
            assert_eq!(narrow.delete(&i), wide.delete(&i));
        }
        for i in 0..220u32 {
            assert_eq!(narrow.search(&i), wide.search(&i));
        }
        assert_eq!(narrow.len(), wide.len());

        let mut a = narrow.all_values();
        let mut b = wide.all_values();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
        narrow.verify().unwrap();
    }

    #[test]
    fn load_factor_and_clear() {
        let mut index = HashIndex::new(4).unwrap();
        for i in 0..8u64 {
            index.insert(i, i);
        }
        assert!((index.load_factor() - 2.0).abs() < f64::EPSILON);

        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.iter().count(), 0);
        assert_eq!(index.capacity(), 4);
    }

    #[test]
    fn long_chain_drops_without_recursion() {
        let mut index = HashIndex::new(1).unwrap();
        for i in 0..10_000u32 {
            index.insert(i, ());
        }
        assert_eq!(index.bucket_len(0), 10_000);
        drop(index);
    }
}
