use crate::tracing_helpers::{debug_log, trace_log};

use super::handle::Handle;
use super::node::{Children, InternalNode, Node, SearchResult};
use super::raw_bplus_tree::RawBPlusTree;

impl<K: Ord + Clone, V> RawBPlusTree<K, V> {
    /// Inserts a key-value pair into the tree.
    /// Returns the old value if the key was already present; the tree shape is then unchanged.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let leaf_handle = self.find_leaf(&key);
        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();

        match leaf.search(&key) {
            SearchResult::Found(idx) => Some(core::mem::replace(leaf.value_mut(idx), value)),
            SearchResult::NotFound(idx) => {
                leaf.insert(idx, key, value);
                self.len += 1;

                let new_max = idx + 1 == leaf.key_count();
                let overflow = leaf.key_count() > self.config.max_keys();

                if new_max {
                    self.update_parent(leaf_handle);
                }
                if overflow {
                    self.split_and_propagate(leaf_handle);
                }
                None
            }
        }
    }

    /// Splits an overflowing node and keeps splitting ancestors that overflow in turn.
    /// The tree grows in height only when the root itself splits.
    fn split_and_propagate(&mut self, mut node: Handle) {
        loop {
            let right = self.split_node(node);

            let Some(parent) = self.nodes.get(node).parent() else {
                self.promote_root(node, right);
                return;
            };

            self.insert_sibling(parent, node, right);

            if self.nodes.get(parent).key_count() <= self.config.max_keys() {
                self.update_parent(right);
                return;
            }
            node = parent;
        }
    }

    /// Moves the upper half of `handle` into a freshly allocated right sibling and
    /// returns the sibling's handle.
    fn split_node(&mut self, handle: Handle) -> Handle {
        let right = match self.nodes.get_mut(handle) {
            Node::Leaf(leaf) => Node::Leaf(leaf.split()),
            Node::Internal(internal) => Node::Internal(internal.split()),
        };
        let is_leaf = right.is_leaf();
        let right_handle = self.nodes.alloc(right);

        if is_leaf {
            self.nodes.get_mut(handle).as_leaf_mut().set_next(Some(right_handle));
        } else {
            let moved = Children::from_slice(self.nodes.get(right_handle).as_internal().children());
            for child in moved {
                self.nodes.get_mut(child).set_parent(Some(right_handle));
            }
            self.update_internal_keys(handle);
            self.update_internal_keys(right_handle);
        }

        trace_log!(
            left = ?handle,
            right = ?right_handle,
            leaf = is_leaf,
            left_keys = self.nodes.get(handle).key_count(),
            right_keys = self.nodes.get(right_handle).key_count(),
            "split node"
        );
        right_handle
    }

    /// Lists `right` directly after `left` in their shared parent. Both cached
    /// maxima are rewritten because the split changed both.
    fn insert_sibling(&mut self, parent: Handle, left: Handle, right: Handle) {
        let left_max = self.max_key_of(left);
        let right_max = self.max_key_of(right);

        let internal = self.nodes.get_mut(parent).as_internal_mut();
        let pos = internal.position_of(left);
        internal.set_key(pos, left_max);
        internal.insert_child(pos + 1, right_max, right);
    }

    /// Replaces the root after it split into `left` and `right`.
    fn promote_root(&mut self, left: Handle, right: Handle) {
        let mut root = InternalNode::new();
        root.push_child(self.max_key_of(left), left);
        root.push_child(self.max_key_of(right), right);

        let root_handle = self.nodes.alloc(Node::Internal(root));
        self.nodes.get_mut(left).set_parent(Some(root_handle));
        self.nodes.get_mut(right).set_parent(Some(root_handle));
        self.root = root_handle;

        debug_log!(root = ?root_handle, height = self.height(), "promoted new root");
    }

    fn max_key_of(&self, handle: Handle) -> K {
        self.nodes
            .get(handle)
            .max_key()
            .cloned()
            .expect("`RawBPlusTree::max_key_of()` - split produced an empty node!")
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

    fn insert_all(max_keys: usize, keys: &[i32]) -> RawBPlusTree<i32, i32> {
        let mut tree = RawBPlusTree::new(Config::new(max_keys));
        for &k in keys {
            assert_eq!(tree.insert(k, k * 10), None);
            tree.validate_invariants();
        }
        tree
    }

    fn root_keys(tree: &RawBPlusTree<i32, i32>) -> Vec<i32> {
        tree.node(tree.root()).as_internal().keys().to_vec()
    }

    #[test]
    fn root_leaf_fills_to_max_without_splitting() {
        let tree = insert_all(3, &[3, 1, 2]);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.leaf_keys(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn root_leaf_split_promotes_two_child_root() {
        let tree = insert_all(3, &[1, 2, 3, 4]);
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.leaf_keys(), vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(root_keys(&tree), vec![2, 4]);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn new_maximum_updates_ancestor_keys() {
        let mut tree = insert_all(3, &[1, 2, 3, 4]);
        tree.insert(10, 100);
        assert_eq!(root_keys(&tree), vec![2, 10]);
        tree.validate_invariants();
    }

    #[test]
    fn leaf_split_rewrites_both_parent_keys() {
        // Leaves [1, 2] [3, 4, 5]; inserting 6 splits the right leaf into [3, 4] [5, 6].
        let mut tree = insert_all(3, &[1, 2, 3, 4, 5]);
        assert_eq!(root_keys(&tree), vec![2, 5]);

        tree.insert(6, 60);
        tree.validate_invariants();
        assert_eq!(tree.leaf_keys(), vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        assert_eq!(root_keys(&tree), vec![2, 4, 6]);
    }

    #[test]
    fn internal_split_grows_height() {
        let tree = insert_all(3, &(1..=8).collect::<Vec<_>>());
        assert_eq!(tree.height(), 3);
        let root = tree.node(tree.root()).as_internal();
        assert_eq!(root.child_count(), 2);
        for &child in root.children() {
            assert_eq!(tree.node(child).parent(), Some(tree.root()));
        }
    }

    #[test]
    fn duplicate_key_overwrites_in_place() {
        let mut tree = insert_all(3, &[1, 2, 3, 4, 5]);
        let nodes = tree.node_count();

        assert_eq!(tree.insert(4, 400), Some(40));
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.node_count(), nodes);
        assert_eq!(tree.get(&4), Some(&400));
        tree.validate_invariants();
    }

    #[test]
    fn reference_sequence_builds_ordered_leaf_chain() {
        let tree = insert_all(3, &[4, 7, 1, 9, 2, 5, 8, 3, 6]);
        let keys: Vec<i32> = tree.leaf_keys().into_iter().flatten().collect();
        assert_eq!(keys, (1..=9).collect::<Vec<_>>());
        assert_eq!(tree.get(&7), Some(&70));
    }

    #[test]
    fn descending_inserts_stay_balanced() {
        let keys: Vec<i32> = (0..500).rev().collect();
        let tree = insert_all(5, &keys);
        assert_eq!(tree.len(), 500);
        assert_eq!(tree.first_key_value(), Some((&0, &0)));
        assert_eq!(tree.last_key_value(), Some((&499, &4990)));
    }
}
