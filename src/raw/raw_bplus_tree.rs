use core::borrow::Borrow;

use crate::config::Config;
use crate::error::{Error, Result};

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Keys, LeafNode, Node, SearchResult};

/// The core B+tree backing `BPlusTree`.
///
/// The tree owns every node through the arena; the root always exists and is a
/// leaf while the tree holds at most `max_keys` entries.
#[derive(Clone)]
pub(crate) struct RawBPlusTree<K, V> {
    /// Arena storing all tree nodes.
    pub(super) nodes: Arena<Node<K, V>>,
    /// Handle to the root node.
    pub(super) root: Handle,
    /// Total number of key-value pairs in the tree.
    pub(super) len: usize,
    pub(super) config: Config,
}

impl<K, V> RawBPlusTree<K, V> {
    /// Creates a tree whose root is a single empty leaf.
    pub(crate) fn new(config: Config) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::Leaf(LeafNode::new()));
        Self {
            nodes,
            root,
            len: 0,
            config,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) const fn config(&self) -> Config {
        self.config
    }

    /// Number of live nodes, leaves and internal nodes together.
    pub(crate) const fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drops every entry and node, leaving a single empty root leaf.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.nodes.alloc(Node::Leaf(LeafNode::new()));
        self.len = 0;
    }

    pub(crate) fn root(&self) -> Handle {
        self.root
    }

    pub(crate) fn node(&self, handle: Handle) -> &Node<K, V> {
        self.nodes.get(handle)
    }

    /// Number of levels from the root down to the leaves; a lone root leaf is height 1.
    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(0);
            height += 1;
        }
        height
    }

    /// Returns the leftmost leaf, where the leaf chain starts.
    pub(crate) fn first_leaf(&self) -> Handle {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(0);
        }
        current
    }

    /// Returns the rightmost leaf, where the leaf chain ends.
    pub(crate) fn last_leaf(&self) -> Handle {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(internal.child_count() - 1);
        }
        current
    }

    pub(crate) fn first_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.get(self.first_leaf()).as_leaf();
        if leaf.key_count() == 0 {
            return None;
        }
        Some((leaf.key(0), leaf.value(0)))
    }

    pub(crate) fn last_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.get(self.last_leaf()).as_leaf();
        let count = leaf.key_count();
        if count == 0 {
            return None;
        }
        Some((leaf.key(count - 1), leaf.value(count - 1)))
    }
}

impl<K: Ord + Clone, V> RawBPlusTree<K, V> {
    /// Descends from the root to the unique leaf that holds `key`, or would hold it
    /// if it were inserted.
    pub(crate) fn find_leaf<Q>(&self, key: &Q) -> Handle
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => current = internal.child(internal.search_child(key)),
                Node::Leaf(_) => return current,
            }
        }
    }

    /// Searches for a key and returns the leaf handle and index if found.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<(Handle, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let leaf_handle = self.find_leaf(key);
        match self.nodes.get(leaf_handle).as_leaf().search(key) {
            SearchResult::Found(idx) => Some((leaf_handle, idx)),
            SearchResult::NotFound(_) => None,
        }
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf_handle, idx) = self.search(key)?;
        Some(self.nodes.get(leaf_handle).as_leaf().value(idx))
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf_handle, idx) = self.search(key)?;
        Some(self.nodes.get_mut(leaf_handle).as_leaf_mut().value_mut(idx))
    }

    /// Overwrites the value stored under `key` and returns the old one.
    /// The key, and therefore the shape of the tree, is untouched.
    pub(crate) fn modify<Q>(&mut self, key: &Q, value: V) -> Result<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let slot = self.get_mut(key).ok_or(Error::NotFound)?;
        Ok(core::mem::replace(slot, value))
    }

    /// Rewrites the cached maximum of `child` in each ancestor, climbing until the
    /// root or until an ancestor's own maximum is unaffected.
    pub(super) fn update_parent(&mut self, mut child: Handle) {
        while let Some(parent) = self.nodes.get(child).parent() {
            let max = self
                .nodes
                .get(child)
                .max_key()
                .cloned()
                .expect("`RawBPlusTree::update_parent()` - non-root node is empty!");

            let internal = self.nodes.get_mut(parent).as_internal_mut();
            let idx = internal.position_of(child);
            internal.set_key(idx, max);

            // Only the last slot carries the parent's own maximum.
            if idx + 1 != internal.child_count() {
                return;
            }
            child = parent;
        }
    }

    /// Recomputes every key of an internal node from its children's maxima.
    pub(super) fn update_internal_keys(&mut self, handle: Handle) {
        let keys: Keys<K> = self
            .nodes
            .get(handle)
            .as_internal()
            .children()
            .iter()
            .map(|&child| {
                self.nodes
                    .get(child)
                    .max_key()
                    .cloned()
                    .expect("`RawBPlusTree::update_internal_keys()` - child node is empty!")
            })
            .collect();
        self.nodes.get_mut(handle).as_internal_mut().set_keys(keys);
    }
}
