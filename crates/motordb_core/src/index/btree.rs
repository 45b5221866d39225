//! B-tree index implementation.
//!
//! A classic order-`t` B-tree (`t` being the minimum degree): every node
//! holds between `t - 1` and `2t - 1` entries (the root may hold fewer),
//! and values live next to their keys in leaves and internal nodes alike.
//!
//! Insertion splits full nodes on the way down, so a split never has to
//! travel back up. Deletion fills thin children on the way down (borrowing
//! from a sibling or merging with one) so the node a key is removed from
//! can always afford to lose it.

use crate::error::{CoreError, CoreResult};
use crate::index::traits::{Index, IndexKind};
use crate::index::MIN_ORDER;
use crate::stats::IndexStats;
use std::cmp::Ordering;
use std::mem;
use tracing::{debug, trace};

/// A B-tree node.
#[derive(Debug)]
enum Node<K, V> {
    /// Entries only.
    Leaf { entries: Vec<(K, V)> },
    /// Entries plus `entries.len() + 1` children.
    Internal {
        entries: Vec<(K, V)>,
        children: Vec<Box<Node<K, V>>>,
    },
}

impl<K: Ord, V> Node<K, V> {
    fn empty_leaf() -> Box<Self> {
        Box::new(Node::Leaf {
            entries: Vec::new(),
        })
    }

    fn entries(&self) -> &Vec<(K, V)> {
        match self {
            Node::Leaf { entries } | Node::Internal { entries, .. } => entries,
        }
    }

    fn entries_mut(&mut self) -> &mut Vec<(K, V)> {
        match self {
            Node::Leaf { entries } | Node::Internal { entries, .. } => entries,
        }
    }

    fn len(&self) -> usize {
        self.entries().len()
    }

    /// Position of the first entry whose key is `>= key`, and whether it
    /// is an exact match.
    fn find(&self, key: &K) -> (usize, bool) {
        match self.entries().binary_search_by(|(k, _)| k.cmp(key)) {
            Ok(idx) => (idx, true),
            Err(idx) => (idx, false),
        }
    }
}

/// Moves the upper half of the full child `children[idx]` into a new
/// sibling and promotes the child's median entry into `entries[idx]`.
fn split_child<K: Ord, V>(
    entries: &mut Vec<(K, V)>,
    children: &mut Vec<Box<Node<K, V>>>,
    idx: usize,
    order: usize,
) {
    let full = &mut children[idx];
    debug_assert_eq!(full.len(), 2 * order - 1);

    let right_entries = full.entries_mut().split_off(order);
    let Some(median) = full.entries_mut().pop() else {
        return;
    };
    let sibling = match &mut **full {
        Node::Leaf { .. } => Node::Leaf {
            entries: right_entries,
        },
        Node::Internal { children, .. } => Node::Internal {
            entries: right_entries,
            children: children.split_off(order),
        },
    };

    entries.insert(idx, median);
    children.insert(idx + 1, Box::new(sibling));
    trace!(idx, "split b-tree child");
}

/// Merges `children[idx + 1]` and the separator `entries[idx]` into
/// `children[idx]`.
fn merge_children<K: Ord, V>(
    entries: &mut Vec<(K, V)>,
    children: &mut Vec<Box<Node<K, V>>>,
    idx: usize,
) {
    let right = children.remove(idx + 1);
    let separator = entries.remove(idx);
    let left = &mut children[idx];

    left.entries_mut().push(separator);
    match (&mut **left, *right) {
        (
            Node::Internal {
                entries: left_entries,
                children: left_children,
            },
            Node::Internal {
                entries: mut right_entries,
                children: mut right_children,
            },
        ) => {
            left_entries.append(&mut right_entries);
            left_children.append(&mut right_children);
        }
        (left, right) => {
            let Node::Leaf {
                entries: mut right_entries,
            } = right
            else {
                return;
            };
            left.entries_mut().append(&mut right_entries);
        }
    }
    trace!(idx, "merged b-tree children");
}

/// Child `idx` takes one entry through the parent from its left sibling.
fn borrow_from_prev<K: Ord, V>(
    entries: &mut [(K, V)],
    children: &mut [Box<Node<K, V>>],
    idx: usize,
) {
    let (left_part, right_part) = children.split_at_mut(idx);
    let left = &mut left_part[idx - 1];
    let child = &mut right_part[0];

    let Some(donated) = left.entries_mut().pop() else {
        return;
    };
    let separator = mem::replace(&mut entries[idx - 1], donated);
    child.entries_mut().insert(0, separator);

    if let (
        Node::Internal {
            children: left_children,
            ..
        },
        Node::Internal {
            children: child_children,
            ..
        },
    ) = (&mut **left, &mut **child)
    {
        if let Some(moved) = left_children.pop() {
            child_children.insert(0, moved);
        }
    }
}

/// Child `idx` takes one entry through the parent from its right sibling.
fn borrow_from_next<K: Ord, V>(
    entries: &mut [(K, V)],
    children: &mut [Box<Node<K, V>>],
    idx: usize,
) {
    let (left_part, right_part) = children.split_at_mut(idx + 1);
    let child = &mut left_part[idx];
    let right = &mut right_part[0];

    let donated = right.entries_mut().remove(0);
    let separator = mem::replace(&mut entries[idx], donated);
    child.entries_mut().push(separator);

    if let (
        Node::Internal {
            children: child_children,
            ..
        },
        Node::Internal {
            children: right_children,
            ..
        },
    ) = (&mut **child, &mut **right)
    {
        if !right_children.is_empty() {
            child_children.push(right_children.remove(0));
        }
    }
}

/// Makes sure `children[idx]` holds at least `order` entries before the
/// caller descends into it. Returns the index of the child to descend into,
/// which moves left by one when the child was merged into its left sibling.
fn fill_child<K: Ord, V>(
    entries: &mut Vec<(K, V)>,
    children: &mut Vec<Box<Node<K, V>>>,
    idx: usize,
    order: usize,
    stats: &IndexStats,
) -> usize {
    if children[idx].len() >= order {
        return idx;
    }
    if idx > 0 && children[idx - 1].len() >= order {
        borrow_from_prev(entries, children, idx);
        idx
    } else if idx + 1 < children.len() && children[idx + 1].len() >= order {
        borrow_from_next(entries, children, idx);
        idx
    } else if idx + 1 < children.len() {
        merge_children(entries, children, idx);
        stats.record_merge();
        idx
    } else {
        merge_children(entries, children, idx - 1);
        stats.record_merge();
        idx - 1
    }
}

/// B-tree based index with values stored in every node.
///
/// `order` is the minimum degree: a node is full at `2 * order - 1` keys.
///
/// # Example
///
/// ```rust
/// use motordb_core::{BTreeIndex, Index};
///
/// let mut index = BTreeIndex::new(2).unwrap();
/// for (key, value) in [(30, "c"), (10, "a"), (20, "b")] {
///     index.insert(key, value);
/// }
/// assert_eq!(index.all_values(), vec!["a", "b", "c"]);
/// assert!(index.delete(&20));
/// assert_eq!(index.search(&20), None);
/// ```
#[derive(Debug)]
pub struct BTreeIndex<K, V> {
    order: usize,
    root: Box<Node<K, V>>,
    len: usize,
    stats: IndexStats,
}

impl<K: Ord, V> BTreeIndex<K, V> {
    /// Creates an empty B-tree with minimum degree `order`.
    ///
    /// Returns [`CoreError::InvalidOrder`] if `order` is below 2.
    pub fn new(order: usize) -> CoreResult<Self> {
        if order < MIN_ORDER {
            return Err(CoreError::invalid_order(order, MIN_ORDER));
        }
        debug!(order, "creating b-tree index");
        Ok(Self {
            order,
            root: Node::empty_leaf(),
            len: 0,
            stats: IndexStats::new(),
        })
    }

    /// Returns the minimum degree.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Most entries a node may hold.
    fn max_entries(&self) -> usize {
        2 * self.order - 1
    }

    /// Returns the number of levels, counting a lone root leaf as 1.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &*self.root;
        while let Node::Internal { children, .. } = node {
            height += 1;
            node = &children[0];
        }
        height
    }

    /// Returns the smallest key.
    pub fn min_key(&self) -> Option<&K> {
        let mut node = &*self.root;
        while let Node::Internal { children, .. } = node {
            node = &children[0];
        }
        node.entries().first().map(|(k, _)| k)
    }

    /// Returns the largest key.
    pub fn max_key(&self) -> Option<&K> {
        let mut node = &*self.root;
        while let Node::Internal { children, .. } = node {
            node = &children[children.len() - 1];
        }
        node.entries().last().map(|(k, _)| k)
    }

    /// Iterates over all entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            stack: vec![(&*self.root, 0)],
        }
    }

    /// Checks every structural invariant: key order and bounds, child
    /// counts, node occupancy, uniform leaf depth, and the entry count.
    pub fn verify(&self) -> CoreResult<()> {
        let mut leaf_depth = None;
        let count = self.verify_node(&self.root, None, None, 1, true, &mut leaf_depth)?;
        if count != self.len {
            return Err(CoreError::corruption(format!(
                "b-tree holds {count} entries but reports {}",
                self.len
            )));
        }
        Ok(())
    }

    fn verify_node(
        &self,
        node: &Node<K, V>,
        lower: Option<&K>,
        upper: Option<&K>,
        depth: usize,
        is_root: bool,
        leaf_depth: &mut Option<usize>,
    ) -> CoreResult<usize> {
        let entries = node.entries();
        if entries.len() > self.max_entries() {
            return Err(CoreError::corruption(format!(
                "b-tree node at depth {depth} holds {} entries, max {}",
                entries.len(),
                self.max_entries()
            )));
        }
        if !is_root && entries.len() < self.order - 1 {
            return Err(CoreError::corruption(format!(
                "b-tree node at depth {depth} underflows with {} entries",
                entries.len()
            )));
        }
        if entries.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(CoreError::corruption(format!(
                "b-tree node at depth {depth} has unordered keys"
            )));
        }
        if let (Some(lower), Some((first, _))) = (lower, entries.first()) {
            if first <= lower {
                return Err(CoreError::corruption("b-tree key below its separator"));
            }
        }
        if let (Some(upper), Some((last, _))) = (upper, entries.last()) {
            if last >= upper {
                return Err(CoreError::corruption("b-tree key above its separator"));
            }
        }

        match node {
            Node::Leaf { entries } => {
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(CoreError::corruption(format!(
                            "b-tree leaves at depths {expected} and {depth}"
                        )));
                    }
                    Some(_) => {}
                }
                Ok(entries.len())
            }
            Node::Internal { entries, children } => {
                if children.len() != entries.len() + 1 {
                    return Err(CoreError::corruption(format!(
                        "b-tree internal node with {} keys has {} children",
                        entries.len(),
                        children.len()
                    )));
                }
                let mut count = entries.len();
                for (i, child) in children.iter().enumerate() {
                    let lo = if i == 0 { lower } else { Some(&entries[i - 1].0) };
                    let hi = entries.get(i).map(|(k, _)| k).or(upper);
                    count += self.verify_node(child, lo, hi, depth + 1, false, leaf_depth)?;
                }
                Ok(count)
            }
        }
    }

    fn insert_non_full(
        node: &mut Node<K, V>,
        key: K,
        value: V,
        order: usize,
        stats: &IndexStats,
    ) -> Option<V> {
        let (mut idx, found) = node.find(&key);
        if found {
            return Some(mem::replace(&mut node.entries_mut()[idx].1, value));
        }
        match node {
            Node::Leaf { entries } => {
                entries.insert(idx, (key, value));
                None
            }
            Node::Internal { entries, children } => {
                if children[idx].len() == 2 * order - 1 {
                    split_child(entries, children, idx, order);
                    stats.record_split();
                    match key.cmp(&entries[idx].0) {
                        Ordering::Greater => idx += 1,
                        Ordering::Equal => {
                            return Some(mem::replace(&mut entries[idx].1, value));
                        }
                        Ordering::Less => {}
                    }
                }
                Self::insert_non_full(&mut children[idx], key, value, order, stats)
            }
        }
    }

    fn remove_from(
        node: &mut Node<K, V>,
        key: &K,
        order: usize,
        stats: &IndexStats,
    ) -> Option<V> {
        let (idx, found) = node.find(key);
        match node {
            Node::Leaf { entries } => found.then(|| entries.remove(idx).1),
            Node::Internal { entries, children } => {
                if !found {
                    let idx = fill_child(entries, children, idx, order, stats);
                    return Self::remove_from(&mut children[idx], key, order, stats);
                }
                if children[idx].len() >= order {
                    let predecessor = Self::remove_max(&mut children[idx], order, stats)?;
                    Some(mem::replace(&mut entries[idx], predecessor).1)
                } else if children[idx + 1].len() >= order {
                    let successor = Self::remove_min(&mut children[idx + 1], order, stats)?;
                    Some(mem::replace(&mut entries[idx], successor).1)
                } else {
                    merge_children(entries, children, idx);
                    stats.record_merge();
                    Self::remove_from(&mut children[idx], key, order, stats)
                }
            }
        }
    }

    /// Removes and returns the largest entry of a subtree whose root can
    /// afford to lose one entry.
    fn remove_max(node: &mut Node<K, V>, order: usize, stats: &IndexStats) -> Option<(K, V)> {
        match node {
            Node::Leaf { entries } => entries.pop(),
            Node::Internal { entries, children } => {
                let last = children.len() - 1;
                let idx = fill_child(entries, children, last, order, stats);
                Self::remove_max(&mut children[idx], order, stats)
            }
        }
    }

    /// Removes and returns the smallest entry of a subtree whose root can
    /// afford to lose one entry.
    fn remove_min(node: &mut Node<K, V>, order: usize, stats: &IndexStats) -> Option<(K, V)> {
        match node {
            Node::Leaf { entries } => (!entries.is_empty()).then(|| entries.remove(0)),
            Node::Internal { entries, children } => {
                let idx = fill_child(entries, children, 0, order, stats);
                Self::remove_min(&mut children[idx], order, stats)
            }
        }
    }
}

impl<K: Ord, V: Clone> Index<K, V> for BTreeIndex<K, V> {
    fn kind(&self) -> IndexKind {
        IndexKind::BTree
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        if self.root.len() == self.max_entries() {
            let old_root = mem::replace(&mut self.root, Node::empty_leaf());
            let mut entries = Vec::with_capacity(self.max_entries());
            let mut children = vec![old_root];
            split_child(&mut entries, &mut children, 0, self.order);
            self.stats.record_split();
            self.root = Box::new(Node::Internal { entries, children });
            debug!(height = self.height(), "b-tree root split");
        }

        let previous = Self::insert_non_full(&mut self.root, key, value, self.order, &self.stats);
        match previous {
            Some(_) => self.stats.record_update(),
            None => {
                self.len += 1;
                self.stats.record_insert();
            }
        }
        previous
    }

    fn search(&self, key: &K) -> Option<&V> {
        let mut node = &*self.root;
        let found = loop {
            let (idx, found) = node.find(key);
            if found {
                break Some(&node.entries()[idx].1);
            }
            match node {
                Node::Leaf { .. } => break None,
                Node::Internal { children, .. } => node = &children[idx],
            }
        };
        self.stats.record_search(found.is_some());
        found
    }

    fn delete(&mut self, key: &K) -> bool {
        let removed = Self::remove_from(&mut self.root, key, self.order, &self.stats).is_some();

        if let Node::Internal { entries, children } = &mut *self.root {
            if entries.is_empty() {
                if let Some(child) = children.pop() {
                    self.root = child;
                    debug!(height = self.height(), "b-tree root shrank");
                }
            }
        }

        if removed {
            self.len -= 1;
            self.stats.record_delete();
        }
        removed
    }

    fn all_values(&self) -> Vec<V> {
        self.stats.record_scan();
        self.iter().map(|(_, value)| value.clone()).collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.root = Node::empty_leaf();
        self.len = 0;
    }

    fn stats(&self) -> &IndexStats {
        &self.stats
    }

    fn verify(&self) -> CoreResult<()> {
        BTreeIndex::verify(self)
    }
}

/// In-order iterator over a [`BTreeIndex`].
pub struct Iter<'a, K, V> {
    /// Nodes on the current path with the next step to take in each.
    ///
    /// In an internal node step `2i` descends into child `i` and step
    /// `2i + 1` yields entry `i`.
    stack: Vec<(&'a Node<K, V>, usize)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            let (node, step) = (top.0, top.1);
            top.1 += 1;
            match node {
                Node::Leaf { entries } => match entries.get(step) {
                    Some((k, v)) => return Some((k, v)),
                    None => {
                        self.stack.pop();
                    }
                },
                Node::Internal { entries, children } => {
                    if step % 2 == 0 {
                        match children.get(step / 2) {
                            Some(child) => self.stack.push((&**child, 0)),
                            None => {
                                self.stack.pop();
                            }
                        }
                    } else if let Some((k, v)) = entries.get(step / 2) {
                        return Some((k, v));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(order: usize, keys: impl IntoIterator<Item = i32>) -> BTreeIndex<i32, i32> {
        let mut index = BTreeIndex::new(order).unwrap();
        for key in keys {
            index.insert(key, key * 10);
        }
        index
    }

    #[test]
    fn insert_and_search() {
        let index = filled(2, [5, 1, 9, 3, 7]);
        assert_eq!(index.search(&3), Some(&30));
        assert_eq!(index.search(&4), None);
        assert_eq!(index.len(), 5);
        index.verify().unwrap();
    }

    #[test]
    fn order_below_two_rejected() {
        let result: CoreResult<BTreeIndex<i32, i32>> = BTreeIndex::new(1);
        assert_eq!(result.err(), Some(CoreError::InvalidOrder { order: 1, min: 2 }));
    }

    #[test]
    fn root_split_grows_height() {
        // order 2: a node is full at three keys
        let mut index = filled(2, [1, 2, 3]);
        assert_eq!(index.height(), 1);

        index.insert(4, 40);
        assert_eq!(index.height(), 2);
        assert_eq!(index.stats().snapshot().splits, 1);
        index.verify().unwrap();
    }

    #[test]
    fn overwrite_keeps_len() {
        let mut index = filled(2, 0..20);
        // covers keys promoted into internal nodes as well as leaf keys
        for key in 0..20 {
            assert_eq!(index.insert(key, -key), Some(key * 10));
        }

        assert_eq!(index.len(), 20);
        assert_eq!(index.search(&7), Some(&-7));
        assert_eq!(index.stats().snapshot().updates, 20);
        index.verify().unwrap();
    }

    #[test]
    fn scan_is_ordered() {
        let index = filled(3, [50, 10, 40, 20, 30, 60, 0, 25, 35, 45, 55]);
        let keys: Vec<i32> = index.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![0, 10, 20, 25, 30, 35, 40, 45, 50, 55, 60]);
        assert_eq!(
            index.all_values(),
            keys.iter().map(|k| k * 10).collect::<Vec<_>>()
        );
    }

    #[test]
    fn delete_leaf_key() {
        let mut index = filled(2, 0..10);
        assert!(index.delete(&9));
        assert_eq!(index.search(&9), None);
        assert_eq!(index.len(), 9);
        index.verify().unwrap();
    }

    #[test]
    fn delete_internal_key() {
        let mut index = filled(2, 0..30);
        let root_key = index.root.entries()[0].0;

        assert!(index.delete(&root_key));
        assert_eq!(index.search(&root_key), None);
        assert_eq!(index.len(), 29);
        index.verify().unwrap();

        let keys: Vec<i32> = index.iter().map(|(k, _)| *k).collect();
        let expected: Vec<i32> = (0..30).filter(|k| *k != root_key).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn delete_missing_is_noop() {
        let mut index = filled(2, 0..10);
        assert!(!index.delete(&100));
        assert!(!index.delete(&-1));
        assert_eq!(index.len(), 10);
        index.verify().unwrap();
    }

    #[test]
    fn delete_everything_shrinks_to_leaf() {
        let mut index = filled(2, 0..100);
        assert!(index.height() > 2);

        for key in (0..100).rev().step_by(2) {
            assert!(index.delete(&key));
            index.verify().unwrap();
        }
        for key in (0..100).step_by(2) {
            assert!(index.delete(&key));
            index.verify().unwrap();
        }

        assert!(index.is_empty());
        assert_eq!(index.height(), 1);
        assert!(index.stats().snapshot().merges > 0);
        assert_eq!(index.min_key(), None);
    }

    #[test]
    fn min_and_max() {
        let index = filled(2, [42, 7, 99, 13]);
        assert_eq!(index.min_key(), Some(&7));
        assert_eq!(index.max_key(), Some(&99));
    }

    #[test]
    fn clear_resets() {
        let mut index = filled(2, 0..50);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.height(), 1);
        assert_eq!(index.iter().count(), 0);
        index.insert(1, 1);
        assert_eq!(index.search(&1), Some(&1));
    }

    #[test]
    fn string_keys() {
        let mut index = BTreeIndex::new(2).unwrap();
        for name in ["dog", "cat", "eel", "ant", "bee"] {
            index.insert(name.to_string(), name.len());
        }
        let keys: Vec<&str> = index.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["ant", "bee", "cat", "dog", "eel"]);
    }
}
