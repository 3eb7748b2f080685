use core::borrow::Borrow;

use smallvec::SmallVec;

use super::handle::Handle;

/// Entries stored inline before a node spills to the heap.
/// Covers the default fanout plus the one transient overflow entry before a split.
pub(crate) const INLINE_ENTRIES: usize = 8;

pub(crate) type Keys<K> = SmallVec<[K; INLINE_ENTRIES]>;
pub(crate) type Values<V> = SmallVec<[V; INLINE_ENTRIES]>;
pub(crate) type Children = SmallVec<[Handle; INLINE_ENTRIES]>;

#[allow(clippy::large_enum_variant)]
#[derive(Clone)]
pub(crate) enum Node<K, V> {
    Internal(InternalNode<K>),
    Leaf(LeafNode<K, V>),
}

// Internal nodes pair every child with a key: keys[i] == max key reachable through children[i].
#[derive(Clone)]
pub(crate) struct InternalNode<K> {
    parent: Option<Handle>,
    keys: Keys<K>,
    children: Children,
}

// Leaf nodes hold the entries and the forward link of the leaf chain.
#[derive(Clone)]
pub(crate) struct LeafNode<K, V> {
    parent: Option<Handle>,
    next: Option<Handle>,
    keys: Keys<K>,
    values: Values<V>,
}

/// Result of searching for a key in a leaf.
pub(crate) enum SearchResult {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is where it would be inserted.
    NotFound(usize),
}

impl<K, V> Node<K, V> {
    /// Returns true if this is a leaf node.
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Returns the leaf node, panicking if this is not a leaf.
    pub(crate) fn as_leaf(&self) -> &LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the internal node, panicking if this is not internal.
    pub(crate) fn as_internal(&self) -> &InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Returns the internal node mutably, panicking if this is not internal.
    pub(crate) fn as_internal_mut(&mut self) -> &mut InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Returns the number of keys in this node.
    pub(crate) fn key_count(&self) -> usize {
        match self {
            Node::Internal(internal) => internal.key_count(),
            Node::Leaf(leaf) => leaf.key_count(),
        }
    }

    /// Returns the largest key reachable through this node.
    pub(crate) fn max_key(&self) -> Option<&K> {
        match self {
            Node::Internal(internal) => internal.keys.last(),
            Node::Leaf(leaf) => leaf.keys.last(),
        }
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        match self {
            Node::Internal(internal) => internal.parent,
            Node::Leaf(leaf) => leaf.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        match self {
            Node::Internal(internal) => internal.parent = parent,
            Node::Leaf(leaf) => leaf.parent = parent,
        }
    }
}

impl<K> InternalNode<K> {
    /// Creates a new, childless internal node.
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            keys: SmallVec::new(),
            children: SmallVec::new(),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    /// Returns the position of `child` in this node's child list.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not listed; the parent link and child list disagree.
    pub(crate) fn position_of(&self, child: Handle) -> usize {
        self.children
            .iter()
            .position(|&c| c == child)
            .expect("`InternalNode::position_of()` - child is missing from its parent!")
    }

    /// Selects the child to descend into for `key`: the first child whose maximum is
    /// `>= key`, or the last child when `key` exceeds every maximum.
    #[inline]
    pub(crate) fn search_child<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let idx = match self.keys.binary_search_by(|k| k.borrow().cmp(key)) {
            Ok(idx) | Err(idx) => idx,
        };
        idx.min(self.children.len().saturating_sub(1))
    }

    pub(crate) fn set_key(&mut self, index: usize, key: K) {
        self.keys[index] = key;
    }

    /// Replaces the whole key sequence; one key per child.
    pub(crate) fn set_keys(&mut self, keys: Keys<K>) {
        debug_assert_eq!(keys.len(), self.children.len());
        self.keys = keys;
    }

    /// Inserts a child and its key at the given position.
    pub(crate) fn insert_child(&mut self, index: usize, key: K, child: Handle) {
        self.keys.insert(index, key);
        self.children.insert(index, child);
    }

    /// Removes the child and key at the given position.
    pub(crate) fn remove_child(&mut self, index: usize) -> (K, Handle) {
        let key = self.keys.remove(index);
        let child = self.children.remove(index);
        (key, child)
    }

    pub(crate) fn push_child(&mut self, key: K, child: Handle) {
        self.keys.push(key);
        self.children.push(child);
    }

    pub(crate) fn push_child_front(&mut self, key: K, child: Handle) {
        self.insert_child(0, key, child);
    }

    pub(crate) fn pop_child(&mut self) -> Option<(K, Handle)> {
        let key = self.keys.pop()?;
        let child = self.children.pop()?;
        Some((key, child))
    }

    pub(crate) fn pop_child_front(&mut self) -> Option<(K, Handle)> {
        if self.keys.is_empty() {
            None
        } else {
            Some(self.remove_child(0))
        }
    }

    /// Moves the upper half of the children (from `child_count / 2`) into a new sibling.
    /// The sibling shares this node's parent; the moved children still point here.
    pub(crate) fn split(&mut self) -> InternalNode<K> {
        let mid = self.children.len() / 2;

        let mut right = InternalNode::new();
        right.parent = self.parent;
        right.keys = self.keys.drain(mid..).collect();
        right.children = self.children.drain(mid..).collect();
        right
    }

    /// Appends every child of `right` after this node's children.
    pub(crate) fn merge_with_right(&mut self, mut right: InternalNode<K>) {
        self.keys.append(&mut right.keys);
        self.children.append(&mut right.children);
    }
}

impl<K, V> LeafNode<K, V> {
    /// Creates a new empty leaf node.
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            next: None,
            keys: SmallVec::new(),
            values: SmallVec::new(),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn next(&self) -> Option<Handle> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<Handle>) {
        self.next = next;
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn value(&self, index: usize) -> &V {
        &self.values[index]
    }

    #[inline]
    pub(crate) fn value_mut(&mut self, index: usize) -> &mut V {
        &mut self.values[index]
    }

    /// Searches for a key in this leaf.
    #[inline]
    pub(crate) fn search<Q>(&self, key: &Q) -> SearchResult
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.keys.binary_search_by(|k| k.borrow().cmp(key)) {
            Ok(idx) => SearchResult::Found(idx),
            Err(idx) => SearchResult::NotFound(idx),
        }
    }

    /// Inserts a key and value at the given position.
    pub(crate) fn insert(&mut self, index: usize, key: K, value: V) {
        self.keys.insert(index, key);
        self.values.insert(index, value);
    }

    /// Removes the key and value at the given position.
    pub(crate) fn remove(&mut self, index: usize) -> (K, V) {
        let key = self.keys.remove(index);
        let value = self.values.remove(index);
        (key, value)
    }

    pub(crate) fn push(&mut self, key: K, value: V) {
        self.keys.push(key);
        self.values.push(value);
    }

    pub(crate) fn push_front(&mut self, key: K, value: V) {
        self.insert(0, key, value);
    }

    pub(crate) fn pop(&mut self) -> Option<(K, V)> {
        let key = self.keys.pop()?;
        let value = self.values.pop()?;
        Some((key, value))
    }

    pub(crate) fn pop_front(&mut self) -> Option<(K, V)> {
        if self.keys.is_empty() {
            None
        } else {
            Some(self.remove(0))
        }
    }

    /// Moves the upper half of the entries (from `key_count / 2`) into a new sibling.
    ///
    /// The sibling inherits this leaf's parent and forward link; the caller links
    /// this leaf to the sibling once it has a handle.
    pub(crate) fn split(&mut self) -> LeafNode<K, V> {
        let mid = self.keys.len() / 2;

        let mut right = LeafNode::new();
        right.parent = self.parent;
        right.next = self.next;
        right.keys = self.keys.drain(mid..).collect();
        right.values = self.values.drain(mid..).collect();
        right
    }

    /// Appends every entry of `right` and splices `right` out of the leaf chain.
    pub(crate) fn merge_with_right(&mut self, mut right: LeafNode<K, V>) {
        self.keys.append(&mut right.keys);
        self.values.append(&mut right.values);
        self.next = right.next;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn leaf_of(keys: &[i32]) -> LeafNode<i32, i32> {
        let mut leaf = LeafNode::new();
        for &k in keys {
            leaf.push(k, k * 10);
        }
        leaf
    }

    #[test]
    fn leaf_split_keeps_lower_half() {
        let mut leaf = leaf_of(&[1, 2, 3, 4]);
        leaf.set_next(Some(Handle::from_index(9)));

        let right = leaf.split();
        assert_eq!(leaf.keys(), &[1, 2]);
        assert_eq!(right.keys(), &[3, 4]);
        assert_eq!(*right.value(0), 30);
        assert_eq!(right.next(), Some(Handle::from_index(9)));
    }

    #[test]
    fn odd_leaf_split_moves_the_larger_half() {
        let mut leaf = leaf_of(&[1, 2, 3]);
        let right = leaf.split();
        assert_eq!(leaf.keys(), &[1]);
        assert_eq!(right.keys(), &[2, 3]);
    }

    #[test]
    fn leaf_merge_splices_chain() {
        let mut left = leaf_of(&[1, 2]);
        let mut right = leaf_of(&[5]);
        right.set_next(Some(Handle::from_index(3)));

        left.merge_with_right(right);
        assert_eq!(left.keys(), &[1, 2, 5]);
        assert_eq!(left.next(), Some(Handle::from_index(3)));
    }

    #[test]
    fn leaf_search_reports_insertion_point() {
        let leaf = leaf_of(&[2, 4, 6]);
        assert!(matches!(leaf.search(&4), SearchResult::Found(1)));
        assert!(matches!(leaf.search(&5), SearchResult::NotFound(2)));
        assert!(matches!(leaf.search(&7), SearchResult::NotFound(3)));
    }

    #[test]
    fn search_child_picks_first_max_at_or_above_key() {
        let mut node: InternalNode<i32> = InternalNode::new();
        for (i, k) in [3, 6, 9].into_iter().enumerate() {
            node.push_child(k, Handle::from_index(i));
        }

        assert_eq!(node.search_child(&1), 0);
        assert_eq!(node.search_child(&3), 0);
        assert_eq!(node.search_child(&4), 1);
        assert_eq!(node.search_child(&9), 2);
        // A new maximum descends into the last child.
        assert_eq!(node.search_child(&100), 2);
    }

    #[test]
    fn internal_split_moves_upper_children() {
        let mut node: InternalNode<i32> = InternalNode::new();
        node.parent = Some(Handle::from_index(40));
        for (i, k) in [1, 2, 3, 4].into_iter().enumerate() {
            node.push_child(k, Handle::from_index(i));
        }

        let right = node.split();
        assert_eq!(node.keys(), &[1, 2]);
        assert_eq!(right.keys(), &[3, 4]);
        assert_eq!(right.children(), &[Handle::from_index(2), Handle::from_index(3)]);
        assert_eq!(right.parent, Some(Handle::from_index(40)));
    }

    #[test]
    #[should_panic(expected = "child is missing from its parent")]
    fn position_of_unknown_child_panics() {
        let mut node: InternalNode<i32> = InternalNode::new();
        node.push_child(1, Handle::from_index(0));
        let _ = node.position_of(Handle::from_index(5));
    }
}
