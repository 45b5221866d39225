//! Property-based test generators using proptest.
//!
//! Keys are drawn from a narrow range so generated sequences revisit the
//! same keys often: overwrites, repeated deletes and hash collisions are
//! the interesting cases, not fresh inserts.

use motordb_core::{IndexConfig, IndexKind};
use proptest::prelude::*;

/// Keys used by the default operation strategies.
pub const KEY_SPACE: i32 = 128;

/// One operation against an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOp {
    /// Insert or replace a value.
    Insert {
        /// Key
        key: i32,
        /// Value
        value: i32,
    },
    /// Delete a key.
    Delete {
        /// Key
        key: i32,
    },
    /// Look up a key.
    Search {
        /// Key
        key: i32,
    },
}

impl IndexOp {
    /// Returns the key this operation touches.
    pub fn key(&self) -> i32 {
        match *self {
            Self::Insert { key, .. } | Self::Delete { key } | Self::Search { key } => key,
        }
    }
}

/// Strategy for keys in `0..KEY_SPACE`.
pub fn key_strategy() -> impl Strategy<Value = i32> {
    0..KEY_SPACE
}

/// Strategy for generating index operations, weighted towards inserts.
pub fn index_op_strategy() -> impl Strategy<Value = IndexOp> {
    prop_oneof![
        4 => (key_strategy(), any::<i32>()).prop_map(|(key, value)| IndexOp::Insert { key, value }),
        2 => key_strategy().prop_map(|key| IndexOp::Delete { key }),
        1 => key_strategy().prop_map(|key| IndexOp::Search { key }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn op_sequence_strategy(min_ops: usize, max_ops: usize) -> impl Strategy<Value = Vec<IndexOp>> {
    prop::collection::vec(index_op_strategy(), min_ops..max_ops)
}

/// Strategy for tree orders, kept small so trees grow several levels.
pub fn order_strategy() -> impl Strategy<Value = usize> {
    2usize..=8
}

/// Strategy for hash capacities, including the single-bucket case.
pub fn capacity_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![Just(1usize), 2usize..=64]
}

/// Strategy for index kinds.
pub fn kind_strategy() -> impl Strategy<Value = IndexKind> {
    prop_oneof![
        Just(IndexKind::BTree),
        Just(IndexKind::BPlusTree),
        Just(IndexKind::Hash),
    ]
}

/// Strategy for valid index configurations.
pub fn index_config_strategy() -> impl Strategy<Value = IndexConfig> {
    (kind_strategy(), order_strategy(), capacity_strategy())
        .prop_map(|(kind, order, capacity)| IndexConfig::new().kind(kind).order(order).capacity(capacity))
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
