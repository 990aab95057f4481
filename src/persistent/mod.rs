//! Persistent (immutable) vector and its companions.
//!
//! This module provides a 32-way bitmapped trie with structural sharing:
//!
//! - [`PersistentVector`]: the immutable vector value
//! - [`SubVector`]: a zero-copy window over a vector
//! - [`TransientVector`]: a mutable builder sharing the vector's representation
//! - [`ChunkedIter`]: sequential traversal shared by all three
//!
//! # Structural Sharing
//!
//! Appending, removing from the end, or replacing an element clones only the
//! nodes on the path from the root to the affected leaf. Every other subtree
//! is shared between the old and the new version.
//!
//! # Examples
//!
//! ## `PersistentVector`
//!
//! ```rust
//! use trie_vector::persistent::PersistentVector;
//!
//! let vector = PersistentVector::new().conj("a").conj("b").conj("c");
//! let changed = vector.assoc(2, "C").unwrap().conj("d");
//!
//! assert_eq!(changed.iter().copied().collect::<Vec<_>>(), ["a", "b", "C", "d"]);
//! assert_eq!(vector.iter().copied().collect::<Vec<_>>(), ["a", "b", "c"]); // Original unchanged
//! ```
//!
//! ## `SubVector`
//!
//! ```rust
//! use trie_vector::persistent::PersistentVector;
//!
//! let vector: PersistentVector<i32> = (0..10).collect();
//! let window = vector.slice(2, 5).unwrap();
//!
//! assert_eq!(window.len(), 3);
//! assert_eq!(window.get(0), Ok(&2));
//! ```
//!
//! ## `TransientVector`
//!
//! ```rust
//! use trie_vector::persistent::PersistentVector;
//!
//! let vector: PersistentVector<i32> = (0..3).collect();
//! let mut transient = vector.transient();
//! transient.conj(3).unwrap().conj(4).unwrap();
//!
//! let extended = transient.persistent().unwrap();
//! assert_eq!(extended.len(), 5);
//! assert_eq!(vector.len(), 3);
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod chunked_iterator;
mod node;
mod sequence;
mod session;
mod subvector;
mod transient;
mod vector;

pub use chunked_iterator::ChunkSource;
pub use chunked_iterator::ChunkedIter;
pub use sequence::PersistentSequence;
pub use session::SessionId;
pub use session::SessionIdSource;
pub use subvector::SubVector;
pub use transient::TransientVector;
pub use vector::PersistentVector;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod reference_counter_tests {
    use super::ReferenceCounter;
    use rstest::rstest;

    #[rstest]
    fn test_reference_counter_get_mut_requires_unique_owner() {
        let mut reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(42);
        assert!(ReferenceCounter::get_mut(&mut reference_counter).is_some());

        let shared = reference_counter.clone();
        assert!(ReferenceCounter::get_mut(&mut reference_counter).is_none());

        drop(shared);
        assert!(ReferenceCounter::get_mut(&mut reference_counter).is_some());
    }
}
