//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use motordb_core::{open_index, Index, IndexConfig, IndexKind};
use rand::seq::SliceRandom;
use rand::Rng;

/// Index kinds compared by every benchmark group.
pub const KINDS: [IndexKind; 3] = [IndexKind::BTree, IndexKind::BPlusTree, IndexKind::Hash];

/// Returns `0..count` in random order.
pub fn shuffled_keys(count: u64) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..count).collect();
    keys.shuffle(&mut rand::thread_rng());
    keys
}

/// Returns `count` random keys drawn from `0..bound`, repeats allowed.
pub fn random_keys(count: usize, bound: u64) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen_range(0..bound)).collect()
}

/// Opens an index of `kind` sized for `expected` entries.
///
/// Trees use order 32; the hash table gets one bucket per expected entry
/// so chains stay short.
pub fn open_for(kind: IndexKind, expected: usize) -> Box<dyn Index<u64, u64> + Send + Sync> {
    let config = IndexConfig::new()
        .kind(kind)
        .order(32)
        .capacity(expected.max(1));
    open_index(&config).expect("benchmark config is valid")
}

/// Opens an index of `kind` holding `key -> key` for every key.
pub fn filled(kind: IndexKind, keys: &[u64]) -> Box<dyn Index<u64, u64> + Send + Sync> {
    let mut index = open_for(kind, keys.len());
    for &key in keys {
        index.insert(key, key);
    }
    index
}
