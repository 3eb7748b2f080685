use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::config::Config;
use crate::error::Result;
use crate::raw::{Handle, RawBPlusTree};

/// An in-memory ordered index based on a [B+tree].
///
/// Entries live only in the leaves, which are linked in ascending key order. Every
/// internal node caches, for each child, the largest key reachable through that
/// child; lookups descend into the first child whose cached maximum is not below
/// the search key.
///
/// Node capacity is fixed at construction by a [`Config`]. Every node except the
/// root keeps between [`min_keys`](BPlusTree::min_keys) and
/// [`max_keys`](BPlusTree::max_keys) keys; insertion splits overflowing nodes and
/// removal borrows from or merges with a sibling when a node runs short.
///
/// Nodes are stored in an arena and refer to their parent, children and next leaf
/// by index, so the tree is a single owned value with no reference cycles.
///
/// # Examples
///
/// ```
/// use bplus_index::{BPlusTree, Error};
///
/// let mut index = BPlusTree::new();
/// for key in [4, 7, 1, 9, 2, 5, 8, 3, 6] {
///     index.insert(key, key * 10);
/// }
///
/// assert_eq!(index.search(&7), Some(&70));
/// assert_eq!(index.remove(&9), Ok(90));
/// assert_eq!(index.remove(&9), Err(Error::NotFound));
/// assert_eq!(index.modify(&1, 11), Ok(10));
///
/// let values: Vec<_> = index.values().copied().collect();
/// assert_eq!(values, [11, 20, 30, 40, 50, 60, 70, 80]);
/// ```
///
/// [B+tree]: https://en.wikipedia.org/wiki/B%2B_tree
#[derive(Clone)]
pub struct BPlusTree<K, V> {
    raw: RawBPlusTree<K, V>,
}

/// An iterator over the entries of a `BPlusTree`, in ascending key order.
///
/// This `struct` is created by the [`iter`] method on [`BPlusTree`]. It walks the
/// leaf chain starting at the leftmost leaf.
///
/// # Examples
///
/// ```
/// use bplus_index::BPlusTree;
///
/// let index: BPlusTree<_, _> = [(2, "b"), (1, "a")].into_iter().collect();
/// let mut iter = index.iter();
/// assert_eq!(iter.next(), Some((&1, &"a")));
/// assert_eq!(iter.next(), Some((&2, &"b")));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`iter`]: BPlusTree::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    tree: &'a RawBPlusTree<K, V>,
    leaf: Option<Handle>,
    index: usize,
    remaining: usize,
}

/// An iterator over the keys of a `BPlusTree`, in ascending order.
///
/// This `struct` is created by the [`keys`] method on [`BPlusTree`].
///
/// [`keys`]: BPlusTree::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over the values of a `BPlusTree`, in ascending key order.
///
/// This `struct` is created by the [`values`] method on [`BPlusTree`].
///
/// [`values`]: BPlusTree::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> BPlusTree<K, V> {
    /// Makes a new, empty `BPlusTree` with the default [`Config`].
    ///
    /// The tree starts as a single empty root leaf.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::BPlusTree;
    ///
    /// let mut index = BPlusTree::new();
    /// index.insert(1, "a");
    /// assert_eq!(index.max_keys(), 3);
    /// ```
    #[must_use]
    pub fn new() -> BPlusTree<K, V> {
        Self::with_config(Config::default())
    }

    /// Makes a new, empty `BPlusTree` with the given node capacity.
    #[must_use]
    pub fn with_config(config: Config) -> BPlusTree<K, V> {
        BPlusTree {
            raw: RawBPlusTree::new(config),
        }
    }

    /// Makes a new, empty `BPlusTree` holding at most `max_keys` keys per node.
    ///
    /// # Panics
    ///
    /// Panics if `max_keys < 3`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::BPlusTree;
    ///
    /// let index: BPlusTree<u32, u32> = BPlusTree::with_max_keys(16);
    /// assert_eq!(index.min_keys(), 8);
    /// ```
    #[must_use]
    pub fn with_max_keys(max_keys: usize) -> BPlusTree<K, V> {
        Self::with_config(Config::new(max_keys))
    }

    /// Returns the configuration fixed at construction.
    #[must_use]
    pub fn config(&self) -> Config {
        self.raw.config()
    }

    /// Maximum number of keys per node.
    #[must_use]
    pub fn max_keys(&self) -> usize {
        self.raw.config().max_keys()
    }

    /// Minimum number of keys per non-root node.
    #[must_use]
    pub fn min_keys(&self) -> usize {
        self.raw.config().min_keys()
    }

    /// Returns the number of entries in the tree.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the number of levels in the tree. A tree whose root is a leaf,
    /// including an empty tree, has height 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::BPlusTree;
    ///
    /// let mut index = BPlusTree::with_max_keys(3);
    /// index.extend([(1, ()), (2, ()), (3, ())]);
    /// assert_eq!(index.height(), 1);
    /// index.insert(4, ());
    /// assert_eq!(index.height(), 2);
    /// ```
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns the number of live nodes, leaves and internal nodes together.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.raw.node_count()
    }

    /// Removes every entry, leaving a single empty root leaf. The configuration is kept.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the entry with the smallest key.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first_key_value()
    }

    /// Returns the entry with the largest key.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last_key_value()
    }

    /// Gets an iterator over the entries of the tree, sorted by key.
    ///
    /// Each call starts a fresh walk of the leaf chain from the leftmost leaf, so it
    /// always reflects the tree as it is now.
    ///
    /// # Complexity
    ///
    /// O(height) to create the iterator; O(1) per step.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tree: &self.raw,
            leaf: Some(self.raw.first_leaf()),
            index: 0,
            remaining: self.raw.len(),
        }
    }

    /// Gets an iterator over the keys of the tree, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the tree, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Inserts a key-value pair into the tree.
    ///
    /// If the key was absent, `None` is returned and the entry is added, splitting
    /// full nodes on the way back up. If the key was present, its value is
    /// overwritten in place and the old value is returned; keys stay unique.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::BPlusTree;
    ///
    /// let mut index = BPlusTree::new();
    /// assert_eq!(index.insert(37, "a"), None);
    /// assert_eq!(index.insert(37, "b"), Some("a"));
    /// assert_eq!(index.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.raw.insert(key, value)
    }

    /// Removes a key from the tree, returning its value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) without modifying the tree
    /// if the key is absent.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove(key)
    }

    /// Replaces the value stored under `key`, returning the previous value. The tree
    /// structure is never changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the key is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::{BPlusTree, Error};
    ///
    /// let mut index = BPlusTree::new();
    /// index.insert("k", 1);
    /// assert_eq!(index.modify("k", 2), Ok(1));
    /// assert_eq!(index.search("k"), Some(&2));
    /// assert_eq!(index.modify("x", 3), Err(Error::NotFound));
    /// ```
    pub fn modify<Q>(&mut self, key: &Q, value: V) -> Result<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.modify(key, value)
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// The key may be any borrowed form of the tree's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    pub fn search<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get(key)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn search_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get_mut(key)
    }

    /// Returns `true` if the tree holds an entry for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.search(key).is_some()
    }
}

impl<K, V> Default for BPlusTree<K, V> {
    fn default() -> Self {
        BPlusTree::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BPlusTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for BPlusTree<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for BPlusTree<K, V> {}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for BPlusTree<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = BPlusTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord + Clone, V> Extend<(K, V)> for BPlusTree<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a BPlusTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, Q, V> Index<&Q> for BPlusTree<K, V>
where
    K: Borrow<Q> + Ord + Clone,
    Q: ?Sized + Ord,
{
    type Output = V;

    /// Returns a reference to the value stored under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the tree.
    #[inline]
    fn index(&self, key: &Q) -> &V {
        self.search(key).expect("no entry found for key")
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let leaf = self.tree.node(self.leaf?).as_leaf();
        let item = (leaf.key(self.index), leaf.value(self.index));

        self.remaining -= 1;
        self.index += 1;

        // Move to next leaf if needed
        if self.index >= leaf.key_count() {
            self.leaf = leaf.next();
            self.index = 0;
        }

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            leaf: self.leaf,
            index: self.index,
            remaining: self.remaining,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Keys<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for Values<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}
