use core::borrow::Borrow;

use crate::error::{Error, Result};
use crate::tracing_helpers::{debug_log, trace_log};

use super::handle::Handle;
use super::node::{Node, SearchResult};
use super::raw_bplus_tree::RawBPlusTree;

/// Neighbours of an underflowing node under its parent.
struct Siblings {
    parent: Handle,
    left: Option<Handle>,
    right: Option<Handle>,
}

impl<K: Ord + Clone, V> RawBPlusTree<K, V> {
    /// Removes a key from the tree and returns its value.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let leaf_handle = self.find_leaf(key);
        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        let idx = match leaf.search(key) {
            SearchResult::Found(idx) => idx,
            SearchResult::NotFound(_) => return Err(Error::NotFound),
        };

        let (_, value) = leaf.remove(idx);
        self.len -= 1;

        let was_max = idx == leaf.key_count();
        let underflow = leaf.key_count() < self.config.min_keys();

        // The root leaf has no parent, so neither step touches it.
        if was_max {
            self.update_parent(leaf_handle);
        }
        if underflow {
            self.rebalance(leaf_handle);
        }
        Ok(value)
    }

    /// Restores minimum occupancy for `node`, borrowing from a sibling when one can
    /// spare an entry and merging otherwise. A merge removes a child from the parent,
    /// so the parent is checked next; the climb ends at the root.
    fn rebalance(&mut self, mut node: Handle) {
        loop {
            let Some(siblings) = self.siblings(node) else {
                self.collapse_root();
                return;
            };
            if self.nodes.get(node).key_count() >= self.config.min_keys() {
                return;
            }

            if let Some(left) = siblings.left
                && self.can_lend(left)
            {
                self.borrow_from_left(node, left, siblings.parent);
                return;
            }
            if let Some(right) = siblings.right
                && self.can_lend(right)
            {
                self.borrow_from_right(node, right, siblings.parent);
                return;
            }

            match (siblings.left, siblings.right) {
                (Some(left), _) => self.merge(left, node, siblings.parent),
                (None, Some(right)) => self.merge(node, right, siblings.parent),
                (None, None) => unreachable!("`RawBPlusTree::rebalance()` - non-root node has no sibling!"),
            }
            node = siblings.parent;
        }
    }

    /// Returns the parent and adjacent siblings of `node`, or `None` for the root.
    fn siblings(&self, node: Handle) -> Option<Siblings> {
        let parent = self.nodes.get(node).parent()?;
        let internal = self.nodes.get(parent).as_internal();
        let idx = internal.position_of(node);
        Some(Siblings {
            parent,
            left: idx.checked_sub(1).map(|i| internal.child(i)),
            right: internal.children().get(idx + 1).copied(),
        })
    }

    fn can_lend(&self, handle: Handle) -> bool {
        self.nodes.get(handle).key_count() > self.config.min_keys()
    }

    /// Moves the left sibling's last entry (or child) to the front of `node`.
    fn borrow_from_left(&mut self, node: Handle, left: Handle, parent: Handle) {
        match self.nodes.get_mut(left) {
            Node::Leaf(leaf) => {
                let (key, value) = leaf.pop().expect("`RawBPlusTree::borrow_from_left()` - lender is empty!");
                self.nodes.get_mut(node).as_leaf_mut().push_front(key, value);
            }
            Node::Internal(internal) => {
                let (key, child) =
                    internal.pop_child().expect("`RawBPlusTree::borrow_from_left()` - lender is empty!");
                self.nodes.get_mut(node).as_internal_mut().push_child_front(key, child);
                self.nodes.get_mut(child).set_parent(Some(node));
                self.update_internal_keys(left);
                self.update_internal_keys(node);
            }
        }
        self.update_internal_keys(parent);

        trace_log!(node = ?node, lender = ?left, keys = self.nodes.get(node).key_count(), "borrowed from left");
    }

    /// Moves the right sibling's first entry (or child) to the back of `node`.
    fn borrow_from_right(&mut self, node: Handle, right: Handle, parent: Handle) {
        match self.nodes.get_mut(right) {
            Node::Leaf(leaf) => {
                let (key, value) =
                    leaf.pop_front().expect("`RawBPlusTree::borrow_from_right()` - lender is empty!");
                self.nodes.get_mut(node).as_leaf_mut().push(key, value);
            }
            Node::Internal(internal) => {
                let (key, child) =
                    internal.pop_child_front().expect("`RawBPlusTree::borrow_from_right()` - lender is empty!");
                self.nodes.get_mut(node).as_internal_mut().push_child(key, child);
                self.nodes.get_mut(child).set_parent(Some(node));
                self.update_internal_keys(right);
                self.update_internal_keys(node);
            }
        }
        self.update_internal_keys(parent);

        trace_log!(node = ?node, lender = ?right, keys = self.nodes.get(node).key_count(), "borrowed from right");
    }

    /// Absorbs `right` into its left neighbour `left`, releases `right`, and drops
    /// its slot from `parent`.
    fn merge(&mut self, left: Handle, right: Handle, parent: Handle) {
        match self.nodes.take(right) {
            Node::Leaf(absorbed) => {
                self.nodes.get_mut(left).as_leaf_mut().merge_with_right(absorbed);
            }
            Node::Internal(absorbed) => {
                for &child in absorbed.children() {
                    self.nodes.get_mut(child).set_parent(Some(left));
                }
                self.nodes.get_mut(left).as_internal_mut().merge_with_right(absorbed);
                self.update_internal_keys(left);
            }
        }

        let internal = self.nodes.get_mut(parent).as_internal_mut();
        let pos = internal.position_of(right);
        internal.remove_child(pos);
        self.update_internal_keys(parent);

        trace_log!(survivor = ?left, released = ?right, keys = self.nodes.get(left).key_count(), "merged nodes");
    }

    /// Replaces an internal root that is down to a single child with that child.
    fn collapse_root(&mut self) {
        let Node::Internal(root) = self.nodes.get(self.root) else {
            return;
        };
        if root.child_count() != 1 {
            return;
        }

        let child = root.child(0);
        self.nodes.free(self.root);
        self.nodes.get_mut(child).set_parent(None);
        self.root = child;

        debug_log!(root = ?child, height = self.height(), "collapsed root");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::Config;
    use alloc::vec;
    use alloc::vec::Vec;
    use pretty_assertions::assert_eq;

    const REFERENCE_KEYS: [i32; 9] = [4, 7, 1, 9, 2, 5, 8, 3, 6];

    fn tree_of(max_keys: usize, keys: &[i32]) -> RawBPlusTree<i32, i32> {
        let mut tree = RawBPlusTree::new(Config::new(max_keys));
        for &k in keys {
            tree.insert(k, k * 10);
        }
        tree.validate_invariants();
        tree
    }

    fn all_keys(tree: &RawBPlusTree<i32, i32>) -> Vec<i32> {
        tree.leaf_keys().into_iter().flatten().collect()
    }

    #[test]
    fn absent_key_is_not_found_and_leaves_tree_untouched() {
        let mut empty: RawBPlusTree<i32, i32> = RawBPlusTree::new(Config::default());
        assert_eq!(empty.remove(&1), Err(Error::NotFound));
        empty.validate_invariants();

        let mut tree = tree_of(3, &REFERENCE_KEYS);
        let before = tree.leaf_keys();
        assert_eq!(tree.remove(&100), Err(Error::NotFound));
        assert_eq!(tree.leaf_keys(), before);
        assert_eq!(tree.len(), 9);
    }

    #[test]
    fn removing_rightmost_maximum_rewrites_ancestor_key() {
        let mut tree = tree_of(3, &REFERENCE_KEYS);
        let height = tree.height();
        assert_eq!(tree.leaf_keys().last(), Some(&vec![8, 9]));

        // [8] falls below minimum and takes 7 from its left neighbour.
        assert_eq!(tree.remove(&9), Ok(90));
        tree.validate_invariants();
        assert_eq!(tree.leaf_keys().last(), Some(&vec![7, 8]));
        assert_eq!(tree.node(tree.root()).max_key(), Some(&8));
        assert_eq!(tree.height(), height);
    }

    #[test]
    fn underflow_after_reference_removals_is_repaired() {
        let mut tree = tree_of(3, &REFERENCE_KEYS);
        assert_eq!(tree.remove(&9), Ok(90));
        assert_eq!(tree.remove(&5), Ok(50));
        tree.validate_invariants();
        assert_eq!(all_keys(&tree), vec![1, 2, 3, 4, 6, 7, 8]);
        assert_eq!(tree.get(&5), None);
        assert_eq!(tree.get(&6), Some(&60));
    }

    #[test]
    fn leaf_borrows_from_left_sibling() {
        // Leaves [0, 1, 2] [3, 4]; removing 4 leaves [3] short.
        let mut tree = tree_of(3, &[1, 2, 3, 4, 0]);
        assert_eq!(tree.leaf_keys(), vec![vec![0, 1, 2], vec![3, 4]]);

        tree.remove(&4).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.leaf_keys(), vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(tree.node(tree.root()).as_internal().keys(), &[1, 3]);
    }

    #[test]
    fn leaf_borrows_from_right_sibling() {
        // Leaves [1, 2] [3, 4, 5]; removing 1 leaves [2] with no left sibling.
        let mut tree = tree_of(3, &[1, 2, 3, 4, 5]);
        assert_eq!(tree.leaf_keys(), vec![vec![1, 2], vec![3, 4, 5]]);

        tree.remove(&1).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.leaf_keys(), vec![vec![2, 3], vec![4, 5]]);
    }

    #[test]
    fn leaf_merge_collapses_root() {
        let mut tree = tree_of(3, &[1, 2, 3, 4]);
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.node_count(), 3);

        tree.remove(&4).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.leaf_keys(), vec![vec![1, 2, 3]]);
        assert!(tree.node(tree.root()).parent().is_none());
    }

    #[test]
    fn leftmost_leaf_absorbs_right_sibling() {
        let mut tree = tree_of(3, &[1, 2, 3, 4]);
        let first = tree.first_leaf();

        tree.remove(&1).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.root(), first);
        assert_eq!(tree.leaf_keys(), vec![vec![2, 3, 4]]);
    }

    #[test]
    fn merge_cascade_shrinks_height() {
        let mut tree = tree_of(3, &(1..=8).collect::<Vec<_>>());
        assert_eq!(tree.height(), 3);

        for k in (3..=8).rev() {
            tree.remove(&k).unwrap();
            tree.validate_invariants();
        }
        assert_eq!(tree.height(), 1);
        assert_eq!(all_keys(&tree), vec![1, 2]);
    }

    #[test]
    fn internal_borrow_retargets_child_parent() {
        let mut tree = tree_of(3, &(1..=12).collect::<Vec<_>>());
        assert_eq!(tree.height(), 3);

        // Merges the two leftmost internal nodes, leaving a left internal node with three children.
        tree.remove(&1).unwrap();
        tree.validate_invariants();

        // The rightmost internal node drops to one child and takes [7, 8] from the left.
        tree.remove(&12).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.height(), 3);

        let root = tree.node(tree.root()).as_internal();
        assert_eq!(root.keys(), &[6, 11]);
        let right = root.child(1);
        let borrowed = tree.node(right).as_internal().child(0);
        assert_eq!(tree.node(borrowed).as_leaf().keys(), &[7, 8]);
        assert_eq!(tree.node(borrowed).parent(), Some(right));
        assert_eq!(all_keys(&tree), (2..=11).collect::<Vec<_>>());
    }

    #[test]
    fn root_leaf_may_empty_completely() {
        let mut tree = tree_of(3, &[1]);
        assert_eq!(tree.remove(&1), Ok(10));
        tree.validate_invariants();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);

        tree.insert(2, 20);
        tree.validate_invariants();
        assert_eq!(tree.get(&2), Some(&20));
    }
}
