//! An in-memory B+tree index for Rust.
//!
//! This crate provides [`BPlusTree`], an ordered key-value index that keeps every
//! entry in its leaves and links the leaves in ascending key order. Node capacity is
//! chosen at construction through a [`Config`], which makes the tree usable both as a
//! general ordered map and as a model for studying how B+tree nodes split, borrow and
//! merge.
//!
//! # Example
//!
//! ```
//! use bplus_index::{BPlusTree, Error};
//!
//! let mut index = BPlusTree::with_max_keys(3);
//! for key in [4, 7, 1, 9, 2, 5, 8, 3, 6] {
//!     index.insert(key, key * 10);
//! }
//!
//! // Point lookups descend from the root to a single leaf.
//! assert_eq!(index.search(&7), Some(&70));
//! assert_eq!(index.height(), 3);
//!
//! // Removal rebalances underfull nodes and may shrink the tree.
//! assert_eq!(index.remove(&9), Ok(90));
//! assert_eq!(index.remove(&5), Ok(50));
//! assert_eq!(index.remove(&5), Err(Error::NotFound));
//!
//! // Ordered traversal follows the leaf chain.
//! let keys: Vec<_> = index.keys().copied().collect();
//! assert_eq!(keys, [1, 2, 3, 4, 6, 7, 8]);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **`tracing`** - Emits structural events (root growth and collapse at `DEBUG`;
//!   splits, borrows and merges at `TRACE`) through the [`tracing`] crate
//!
//! # Implementation
//!
//! Nodes live in an arena and refer to each other by index. Each node records its
//! parent, each internal node caches the maximum key of every child, and each leaf
//! records its right neighbour. Insertion and removal repair the tree bottom-up by
//! following parent links, so no operation recurses.
//!
//! [`tracing`]: https://docs.rs/tracing

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod tracing_helpers;

mod raw;

pub mod bplus_tree;
pub mod config;
pub mod error;

pub use bplus_tree::BPlusTree;
pub use config::Config;
pub use error::{Error, Result};
