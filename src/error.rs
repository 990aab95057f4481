//! Error types for persistent vector operations.
//!
//! Every failure in this crate is a programmer error: it is deterministic
//! given the same inputs and never worth retrying. [`VectorError::kind`]
//! groups the variants into the two broad categories callers usually care
//! about.

use thiserror::Error;

/// The broad category of a [`VectorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An index or range fell outside the valid bounds of a collection.
    OutOfBounds,
    /// The operation is not valid in the collection's current state.
    InvalidState,
}

/// Errors raised by [`PersistentVector`](crate::PersistentVector),
/// [`SubVector`](crate::SubVector) and [`TransientVector`](crate::TransientVector).
///
/// # Examples
///
/// ```rust
/// use trie_vector::{ErrorKind, PersistentVector, VectorError};
///
/// let vector: PersistentVector<i32> = (0..3).collect();
/// let error = vector.get(3).unwrap_err();
///
/// assert_eq!(error, VectorError::OutOfBounds { index: 3, length: 3 });
/// assert_eq!(error.kind(), ErrorKind::OutOfBounds);
/// assert_eq!(error.to_string(), "index 3 is out of bounds for length 3");
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VectorError {
    /// An index was outside `[0, length)`.
    #[error("index {index} is out of bounds for length {length}")]
    OutOfBounds {
        /// The offending index.
        index: usize,
        /// The length of the collection at the time of the call.
        length: usize,
    },

    /// A sub-range `[start, end)` did not fit inside the collection.
    #[error("range {start}..{end} is out of bounds for length {length}")]
    RangeOutOfBounds {
        /// Inclusive lower bound of the requested range.
        start: usize,
        /// Exclusive upper bound of the requested range.
        end: usize,
        /// The length of the collection being sliced.
        length: usize,
    },

    /// `pop` was called on an empty collection.
    #[error("cannot pop an empty collection")]
    EmptyCollection,

    /// A transient was used after it had been frozen with `persistent()`.
    #[error("transient vector used after persistent()")]
    TransientFrozen,
}

impl VectorError {
    /// Returns the broad category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfBounds { .. } | Self::RangeOutOfBounds { .. } => ErrorKind::OutOfBounds,
            Self::EmptyCollection | Self::TransientFrozen => ErrorKind::InvalidState,
        }
    }
}
