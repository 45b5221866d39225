//! B+-tree index implementation.
//!
//! Values live only in leaves; internal nodes hold separator keys. Leaves
//! are chained left to right so full and range scans walk the chain rather
//! than re-descending from the root.
//!
//! Nodes are kept in two arenas owned by the index and addressed by
//! position. A child reference is a [`NodeRef`] that says which arena to
//! look in; the leaf chain is a plain leaf position and owns nothing.
//!
//! Deletion removes the entry from its leaf and nothing else: leaves are
//! never merged or redistributed, so heavy deletion can leave sparse or
//! empty leaves behind. Lookups, scans and later inserts stay correct.

use crate::error::{CoreError, CoreResult};
use crate::index::traits::{Index, IndexKind};
use crate::index::MIN_ORDER;
use crate::stats::IndexStats;
use std::mem;
use tracing::{debug, trace};

/// Reference from an internal node to one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeRef {
    /// Position in the internal-node arena.
    Internal(usize),
    /// Position in the leaf arena.
    Leaf(usize),
}

#[derive(Debug)]
struct InternalNode<K> {
    /// Separator keys; child `i` holds keys in `[keys[i - 1], keys[i])`.
    keys: Vec<K>,
    /// `keys.len() + 1` children.
    children: Vec<NodeRef>,
}

#[derive(Debug)]
struct LeafNode<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
    /// Next leaf in key order.
    next: Option<usize>,
}

impl<K, V> LeafNode<K, V> {
    fn empty() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            next: None,
        }
    }
}

/// One step of a root-to-leaf descent: the internal node and the child
/// position taken in it.
type PathStep = (usize, usize);

/// B+-tree based index for ordered traversal and range queries.
///
/// A leaf holds at most `order - 1` keys. Inserting into a full leaf splits
/// the `order` entries at `order / 2`, links the new right leaf after the
/// original, and pushes the right leaf's first key into the parent. Internal
/// nodes split the same way once they reach `order` separators.
///
/// # Example
///
/// ```rust
/// use motordb_core::{BPlusTreeIndex, Index};
///
/// let mut index = BPlusTreeIndex::new(4).unwrap();
/// for key in (10..=100).step_by(10) {
///     index.insert(key, key * 2);
/// }
/// assert_eq!(index.search(&70), Some(&140));
/// assert_eq!(index.range(&25, &65), vec![60, 80, 100, 120]);
/// ```
#[derive(Debug)]
pub struct BPlusTreeIndex<K, V> {
    order: usize,
    internals: Vec<InternalNode<K>>,
    leaves: Vec<LeafNode<K, V>>,
    root: NodeRef,
    /// Leftmost leaf, where the chain starts.
    head: usize,
    len: usize,
    stats: IndexStats,
}

impl<K: Ord + Clone, V> BPlusTreeIndex<K, V> {
    /// Creates an empty B+-tree of the given order.
    ///
    /// Returns [`CoreError::InvalidOrder`] if `order` is below 2.
    pub fn new(order: usize) -> CoreResult<Self> {
        if order < MIN_ORDER {
            return Err(CoreError::invalid_order(order, MIN_ORDER));
        }
        debug!(order, "creating b+tree index");
        Ok(Self {
            order,
            internals: Vec::new(),
            leaves: vec![LeafNode::empty()],
            root: NodeRef::Leaf(0),
            head: 0,
            len: 0,
            stats: IndexStats::new(),
        })
    }

    /// Returns the order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Most keys a leaf or internal node may hold.
    fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Returns the number of levels, counting a lone root leaf as 1.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = self.root;
        while let NodeRef::Internal(id) = node {
            height += 1;
            node = self.internals[id].children[0];
        }
        height
    }

    /// Returns the number of leaves, empty ones included.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Returns the smallest key.
    pub fn min_key(&self) -> Option<&K> {
        self.iter().next().map(|(k, _)| k)
    }

    /// Returns the largest key.
    pub fn max_key(&self) -> Option<&K> {
        let mut last = None;
        let mut leaf = Some(self.head);
        while let Some(id) = leaf {
            let node = &self.leaves[id];
            if let Some(key) = node.keys.last() {
                last = Some(key);
            }
            leaf = node.next;
        }
        last
    }

    /// Iterates over all entries in ascending key order by walking the
    /// leaf chain.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            leaves: &self.leaves,
            leaf: Some(self.head),
            pos: 0,
        }
    }

    /// Iterates in key order starting at the first key `>= start`.
    fn iter_from(&self, start: &K) -> Iter<'_, K, V> {
        let leaf = self.find_leaf(start);
        let pos = self.leaves[leaf].keys.partition_point(|k| k < start);
        Iter {
            leaves: &self.leaves,
            leaf: Some(leaf),
            pos,
        }
    }

    /// Returns the values whose keys fall in `[start, end]`, in key order.
    ///
    /// Descends once to the leaf for `start`, then follows the leaf chain
    /// until a key exceeds `end`. An inverted range yields nothing.
    pub fn range(&self, start: &K, end: &K) -> Vec<V>
    where
        V: Clone,
    {
        self.stats.record_scan();
        if start > end {
            return Vec::new();
        }
        self.iter_from(start)
            .take_while(|(k, _)| *k <= end)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Child position to follow for `key`: the number of separators that
    /// are `<= key`.
    fn child_slot(node: &InternalNode<K>, key: &K) -> usize {
        node.keys.partition_point(|k| k <= key)
    }

    fn find_leaf(&self, key: &K) -> usize {
        let mut node = self.root;
        loop {
            match node {
                NodeRef::Leaf(id) => return id,
                NodeRef::Internal(id) => {
                    let internal = &self.internals[id];
                    node = internal.children[Self::child_slot(internal, key)];
                }
            }
        }
    }

    /// Like [`find_leaf`](Self::find_leaf), also recording the path so a
    /// split can walk back up without searching for parents.
    fn find_leaf_with_path(&self, key: &K) -> (usize, Vec<PathStep>) {
        let mut path = Vec::with_capacity(self.height());
        let mut node = self.root;
        loop {
            match node {
                NodeRef::Leaf(id) => return (id, path),
                NodeRef::Internal(id) => {
                    let internal = &self.internals[id];
                    let slot = Self::child_slot(internal, key);
                    path.push((id, slot));
                    node = internal.children[slot];
                }
            }
        }
    }

    /// Splits an overflowing leaf and links the new right half into the
    /// chain directly after it.
    fn split_leaf(&mut self, leaf_id: usize, path: Vec<PathStep>) {
        let mid = self.order / 2;
        let right_id = self.leaves.len();

        let leaf = &mut self.leaves[leaf_id];
        let keys = leaf.keys.split_off(mid);
        let values = leaf.values.split_off(mid);
        let next = leaf.next.replace(right_id);
        let separator = keys[0].clone();

        self.leaves.push(LeafNode { keys, values, next });
        self.stats.record_split();
        trace!(leaf = leaf_id, right = right_id, "split b+tree leaf");

        self.insert_in_parent(NodeRef::Leaf(leaf_id), separator, NodeRef::Leaf(right_id), path);
    }

    /// Hangs `right` next to `left` under `separator`, splitting ancestors
    /// as long as they overflow and growing a new root when the split
    /// reaches the top.
    fn insert_in_parent(
        &mut self,
        mut left: NodeRef,
        mut separator: K,
        mut right: NodeRef,
        mut path: Vec<PathStep>,
    ) {
        loop {
            let Some((parent_id, slot)) = path.pop() else {
                let root_id = self.internals.len();
                self.internals.push(InternalNode {
                    keys: vec![separator],
                    children: vec![left, right],
                });
                self.root = NodeRef::Internal(root_id);
                debug!(height = self.height(), "b+tree root split");
                return;
            };

            let max_keys = self.max_keys();
            let parent = &mut self.internals[parent_id];
            parent.keys.insert(slot, separator);
            parent.children.insert(slot + 1, right);
            if parent.keys.len() <= max_keys {
                return;
            }

            let mid = parent.keys.len() / 2;
            let right_keys = parent.keys.split_off(mid + 1);
            let right_children = parent.children.split_off(mid + 1);
            let Some(promoted) = parent.keys.pop() else {
                return;
            };

            let new_id = self.internals.len();
            self.internals.push(InternalNode {
                keys: right_keys,
                children: right_children,
            });
            self.stats.record_split();
            trace!(node = parent_id, right = new_id, "split b+tree internal node");

            left = NodeRef::Internal(parent_id);
            separator = promoted;
            right = NodeRef::Internal(new_id);
        }
    }

    /// Checks every structural invariant: key order and separator bounds,
    /// child counts, node capacity, uniform leaf depth, the leaf chain
    /// visiting exactly the tree's leaves in order, and the entry count.
    pub fn verify(&self) -> CoreResult<()> {
        let mut tree_leaves = Vec::new();
        let mut leaf_depth = None;
        self.verify_node(self.root, None, None, 1, &mut leaf_depth, &mut tree_leaves)?;

        let mut chain = Vec::with_capacity(tree_leaves.len());
        let mut leaf = Some(self.head);
        while let Some(id) = leaf {
            if chain.len() > self.leaves.len() {
                return Err(CoreError::corruption("b+tree leaf chain has a cycle"));
            }
            chain.push(id);
            leaf = self.leaves[id].next;
        }
        if chain != tree_leaves {
            return Err(CoreError::corruption(
                "b+tree leaf chain does not match the tree's leaves",
            ));
        }

        let mut count = 0;
        let mut previous: Option<&K> = None;
        for (key, _) in self.iter() {
            if previous.is_some_and(|p| p >= key) {
                return Err(CoreError::corruption("b+tree leaf chain out of order"));
            }
            previous = Some(key);
            count += 1;
        }
        if count != self.len {
            return Err(CoreError::corruption(format!(
                "b+tree holds {count} entries but reports {}",
                self.len
            )));
        }
        Ok(())
    }

    fn verify_node(
        &self,
        node: NodeRef,
        lower: Option<&K>,
        upper: Option<&K>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<usize>,
    ) -> CoreResult<()> {
        let keys = match node {
            NodeRef::Leaf(id) => &self.leaves[id].keys,
            NodeRef::Internal(id) => &self.internals[id].keys,
        };
        if keys.len() > self.max_keys() {
            return Err(CoreError::corruption(format!(
                "b+tree node at depth {depth} holds {} keys, max {}",
                keys.len(),
                self.max_keys()
            )));
        }
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::corruption(format!(
                "b+tree node at depth {depth} has unordered keys"
            )));
        }
        let out_of_bounds = keys.iter().any(|k| {
            lower.is_some_and(|lo| k < lo) || upper.is_some_and(|hi| k >= hi)
        });
        if out_of_bounds {
            return Err(CoreError::corruption(format!(
                "b+tree node at depth {depth} holds a key outside its separators"
            )));
        }

        match node {
            NodeRef::Leaf(id) => {
                let leaf = &self.leaves[id];
                if leaf.values.len() != leaf.keys.len() {
                    return Err(CoreError::corruption(format!(
                        "b+tree leaf {id} has {} keys and {} values",
                        leaf.keys.len(),
                        leaf.values.len()
                    )));
                }
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(CoreError::corruption(format!(
                            "b+tree leaves at depths {expected} and {depth}"
                        )));
                    }
                    Some(_) => {}
                }
                leaves.push(id);
                Ok(())
            }
            NodeRef::Internal(id) => {
                let internal = &self.internals[id];
                if internal.children.len() != internal.keys.len() + 1 {
                    return Err(CoreError::corruption(format!(
                        "b+tree internal node with {} keys has {} children",
                        internal.keys.len(),
                        internal.children.len()
                    )));
                }
                for (i, child) in internal.children.iter().enumerate() {
                    let lo = if i == 0 { lower } else { Some(&internal.keys[i - 1]) };
                    let hi = internal.keys.get(i).or(upper);
                    self.verify_node(*child, lo, hi, depth + 1, leaf_depth, leaves)?;
                }
                Ok(())
            }
        }
    }
}

impl<K: Ord + Clone, V: Clone> Index<K, V> for BPlusTreeIndex<K, V> {
    fn kind(&self) -> IndexKind {
        IndexKind::BPlusTree
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (leaf_id, path) = self.find_leaf_with_path(&key);
        let max_keys = self.max_keys();
        let leaf = &mut self.leaves[leaf_id];

        match leaf.keys.binary_search(&key) {
            Ok(pos) => {
                self.stats.record_update();
                Some(mem::replace(&mut leaf.values[pos], value))
            }
            Err(pos) => {
                leaf.keys.insert(pos, key);
                leaf.values.insert(pos, value);
                let overflow = leaf.keys.len() > max_keys;

                self.len += 1;
                self.stats.record_insert();
                if overflow {
                    self.split_leaf(leaf_id, path);
                }
                None
            }
        }
    }

    fn search(&self, key: &K) -> Option<&V> {
        let leaf = &self.leaves[self.find_leaf(key)];
        let found = leaf
            .keys
            .binary_search(key)
            .ok()
            .map(|pos| &leaf.values[pos]);
        self.stats.record_search(found.is_some());
        found
    }

    fn delete(&mut self, key: &K) -> bool {
        let leaf_id = self.find_leaf(key);
        let leaf = &mut self.leaves[leaf_id];
        let Ok(pos) = leaf.keys.binary_search(key) else {
            return false;
        };
        leaf.keys.remove(pos);
        leaf.values.remove(pos);
        self.len -= 1;
        self.stats.record_delete();
        true
    }

    fn all_values(&self) -> Vec<V> {
        self.stats.record_scan();
        self.iter().map(|(_, v)| v.clone()).collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.internals.clear();
        self.leaves.clear();
        self.leaves.push(LeafNode::empty());
        self.root = NodeRef::Leaf(0);
        self.head = 0;
        self.len = 0;
    }

    fn stats(&self) -> &IndexStats {
        &self.stats
    }

    fn verify(&self) -> CoreResult<()> {
        BPlusTreeIndex::verify(self)
    }
}

/// Iterator along the leaf chain of a [`BPlusTreeIndex`].
pub struct Iter<'a, K, V> {
    leaves: &'a [LeafNode<K, V>],
    leaf: Option<usize>,
    pos: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let leaves = self.leaves;
        loop {
            let leaf = &leaves[self.leaf?];
            if let (Some(k), Some(v)) = (leaf.keys.get(self.pos), leaf.values.get(self.pos)) {
                self.pos += 1;
                return Some((k, v));
            }
            self.leaf = leaf.next;
            self.pos = 0;
        }
    }
}
