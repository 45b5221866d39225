//! Test fixtures and index helpers.

use motordb_core::{
    open_index, BPlusTreeIndex, BTreeIndex, HashIndex, Index, IndexConfig, IndexKind,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::hash::{BuildHasherDefault, Hasher};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// A boxed index as produced by [`open_index`].
pub type DynIndex<K, V> = Box<dyn Index<K, V> + Send + Sync>;

static TRACING: Once = Once::new();

/// Installs a test subscriber honoring `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Every index kind.
pub const ALL_KINDS: [IndexKind; 3] = [IndexKind::BTree, IndexKind::BPlusTree, IndexKind::Hash];

/// Opens one index of each kind with the given tree order and hash capacity.
pub fn open_all<K, V>(order: usize, capacity: usize) -> Vec<DynIndex<K, V>>
where
    K: motordb_core::IndexKey + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    ALL_KINDS
        .iter()
        .map(|&kind| {
            let config = IndexConfig::new().kind(kind).order(order).capacity(capacity);
            open_index(&config).expect("fixture config is valid")
        })
        .collect()
}

/// Builds a B+-tree holding `key -> key * 10` for every key.
pub fn bplus_with_keys(order: usize, keys: impl IntoIterator<Item = i32>) -> BPlusTreeIndex<i32, i32> {
    let mut index = BPlusTreeIndex::new(order).expect("valid order");
    for key in keys {
        index.insert(key, key * 10);
    }
    index
}

/// Builds a B-tree holding `key -> key * 10` for every key.
pub fn btree_with_keys(order: usize, keys: impl IntoIterator<Item = i32>) -> BTreeIndex<i32, i32> {
    let mut index = BTreeIndex::new(order).expect("valid order");
    for key in keys {
        index.insert(key, key * 10);
    }
    index
}

/// Returns `0..n` in an order fixed by `seed`.
pub fn shuffled_keys(n: i32, seed: u64) -> Vec<i32> {
    let mut keys: Vec<i32> = (0..n).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(seed));
    keys
}

/// Hasher that returns integer keys unchanged.
///
/// With it, bucket placement is `key % capacity`, which makes collisions
/// easy to arrange.
#[derive(Debug, Default)]
pub struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 = (self.0 << 8) | u64::from(*byte);
        }
    }

    fn write_i32(&mut self, value: i32) {
        self.0 = value as u64;
    }

    fn write_u64(&mut self, value: u64) {
        self.0 = value;
    }
}

/// [`BuildHasher`](std::hash::BuildHasher) for [`IdentityHasher`].
pub type IdentityBuildHasher = BuildHasherDefault<IdentityHasher>;

/// Creates a hash index whose bucket for integer key `k` is `k % capacity`.
pub fn identity_hash_index<V>(capacity: usize) -> HashIndex<i32, V, IdentityBuildHasher> {
    HashIndex::with_hasher(capacity, IdentityBuildHasher::default()).expect("valid capacity")
}
