//! Property tests of the index contract across all three variants.

use motordb_core::{open_index, BPlusTreeIndex, HashIndex, Index, IndexConfig};
use motordb_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn any_index_matches_model(
        config in index_config_strategy(),
        ops in op_sequence_strategy(1, 300),
    ) {
        init_tracing();
        let mut index = open_index::<i32, i32>(&config).unwrap();
        let result = replay(&mut index, &ops);
        prop_assert!(result.is_ok(), "{:?} with {:?}", result, config);
    }

    #[test]
    fn tree_scans_are_strictly_ascending(
        order in order_strategy(),
        keys in prop::collection::vec(-1000i32..1000, 0..400),
    ) {
        let index = bplus_with_keys(order, keys.iter().copied());
        let scanned: Vec<i32> = index.iter().map(|(k, _)| *k).collect();
        prop_assert!(scanned.windows(2).all(|w| w[0] < w[1]));

        let tree = btree_with_keys(order, keys.iter().copied());
        let values = tree.all_values();
        prop_assert!(values.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(values, index.all_values());
    }

    #[test]
    fn delete_of_absent_key_is_noop(
        config in index_config_strategy(),
        keys in prop::collection::vec(0i32..500, 0..200),
        absent in 500i32..1000,
    ) {
        let mut index = open_index::<i32, i32>(&config).unwrap();
        for &key in &keys {
            index.insert(key, key);
        }
        let len = index.len();
        prop_assert!(!index.delete(&absent));
        prop_assert!(!index.delete(&absent));
        prop_assert_eq!(index.len(), len);
    }

    #[test]
    fn bplus_range_equals_filtered_scan(
        order in order_strategy(),
        keys in prop::collection::vec(0i32..500, 0..300),
        deletes in prop::collection::vec(0i32..500, 0..150),
        start in -10i32..510,
        end in -10i32..510,
    ) {
        let mut index = bplus_with_keys(order, keys);
        for key in &deletes {
            index.delete(key);
        }
        index.verify().unwrap();

        let expected: Vec<i32> = index
            .iter()
            .filter(|(k, _)| start <= **k && **k <= end)
            .map(|(_, v)| *v)
            .collect();
        prop_assert_eq!(index.range(&start, &end), expected);
    }

    #[test]
    fn single_bucket_behaves_like_wide_table(ops in op_sequence_strategy(1, 300)) {
        let mut narrow: HashIndex<i32, i32> = HashIndex::new(1).unwrap();
        let mut wide: HashIndex<i32, i32> = HashIndex::new(1024).unwrap();
        let narrow_model = replay(&mut narrow, &ops).unwrap();
        let wide_model = replay(&mut wide, &ops).unwrap();
        prop_assert_eq!(narrow_model, wide_model);

        let mut a = narrow.all_values();
        let mut b = wide.all_values();
        a.sort_unstable();
        b.sort_unstable();
        prop_assert_eq!(a, b);
        prop_assert_eq!(narrow.bucket_len(0), narrow.len());
    }

    #[test]
    fn variants_agree(ops in op_sequence_strategy(1, 200), order in order_strategy()) {
        let mut finals = Vec::new();
        for mut index in open_all::<i32, i32>(order, 7) {
            finals.push(replay(&mut index, &ops).unwrap());
        }
        prop_assert!(finals.windows(2).all(|w| w[0] == w[1]));
    }
}

#[test]
fn bplus_clear_then_reuse() {
    let config = IndexConfig::new().order(3);
    let mut index = open_index::<i32, i32>(&config).unwrap();
    let keys = shuffled_keys(500, 11);
    for &key in &keys {
        index.insert(key, key);
    }
    index.clear();
    assert!(index.is_empty());
    index.verify().unwrap();

    let mut harness = ModelHarness::new(&mut index).verify_each_step(true);
    for &key in keys.iter().take(100) {
        harness.apply(IndexOp::Insert { key, value: -key }).unwrap();
    }
    harness.check().unwrap();
}

#[test]
fn bplus_heavy_delete_then_reinsert() {
    let mut index: BPlusTreeIndex<i32, i32> = BPlusTreeIndex::new(4).unwrap();
    let keys = shuffled_keys(2_000, 3);
    for &key in &keys {
        index.insert(key, key);
    }
    let leaves = index.leaf_count();
    for &key in keys.iter().filter(|k| **k % 10 != 0) {
        assert!(index.delete(&key));
    }
    assert_eq!(index.len(), 200);
    assert_eq!(index.leaf_count(), leaves);
    index.verify().unwrap();
    assert_eq!(index.range(&95, &125), vec![100, 110, 120]);

    for &key in &keys {
        index.insert(key, key);
    }
    assert_eq!(index.len(), 2_000);
    index.verify().unwrap();
}
