//! Error types for index operations.

use thiserror::Error as ThisError;

/// Convenient result alias for index operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors returned by [`BPlusTree`](crate::BPlusTree) operations.
///
/// Structural corruption is not represented here: a broken parent link or a
/// released node handle is a bug in the maintenance algorithms and panics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, ThisError)]
pub enum Error {
    /// The key has no entry in the tree.
    #[error("key not found")]
    NotFound,
}
