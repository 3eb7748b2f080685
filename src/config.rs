//! Fanout configuration.

/// Fanout used by [`Config::default`].
pub const DEFAULT_MAX_KEYS: usize = 3;

/// Smallest supported `max_keys`. Below it a node at minimum occupancy leaves
/// nothing for a sibling to borrow.
pub const MIN_MAX_KEYS: usize = 3;

/// Node capacity of a [`BPlusTree`](crate::BPlusTree), fixed at construction.
///
/// `max_keys` bounds the number of keys in every node, leaf or internal. Every
/// node except the root must keep at least [`min_keys`](Config::min_keys) keys.
///
/// # Examples
///
/// ```
/// use bplus_index::Config;
///
/// let config = Config::new(4);
/// assert_eq!(config.max_keys(), 4);
/// assert_eq!(config.min_keys(), 2);
///
/// assert_eq!(Config::new(5).min_keys(), 3);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Config {
    max_keys: usize,
}

impl Config {
    /// Creates a configuration holding at most `max_keys` keys per node.
    ///
    /// # Panics
    ///
    /// Panics if `max_keys` is less than [`MIN_MAX_KEYS`].
    #[must_use]
    pub const fn new(max_keys: usize) -> Self {
        assert!(max_keys >= MIN_MAX_KEYS, "`Config::new()` - `max_keys` < 3!");
        Self { max_keys }
    }

    /// Maximum number of keys in any node.
    #[must_use]
    pub const fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Minimum number of keys in any non-root node: half of `max_keys`, rounded up.
    #[must_use]
    pub const fn min_keys(&self) -> usize {
        self.max_keys.div_ceil(2)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_KEYS)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_holds_three_keys() {
        let config = Config::default();
        assert_eq!(config.max_keys(), 3);
        assert_eq!(config.min_keys(), 2);
    }

    #[test]
    #[should_panic(expected = "`Config::new()` - `max_keys` < 3!")]
    fn degenerate_fanout_panics() {
        let _ = Config::new(2);
    }

    proptest! {
        #[test]
        fn min_keys_is_half_rounded_up(max_keys in MIN_MAX_KEYS..1024usize) {
            let min = Config::new(max_keys).min_keys();
            if max_keys % 2 == 0 {
                prop_assert_eq!(min, max_keys / 2);
            } else {
                prop_assert_eq!(min, (max_keys + 1) / 2);
            }
            // A merge of an underflowing node with a sibling at minimum must fit.
            prop_assert!(2 * min - 1 <= max_keys);
        }
    }
}
