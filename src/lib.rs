//! # trie-vector
//!
//! An immutable, structurally-shared sequence for Rust.
//!
//! ## Overview
//!
//! This library provides a persistent vector in the style of Clojure's
//! `PersistentVector`: a 32-way bitmapped trie with a tail buffer. Every
//! "modifying" operation returns a new value and leaves the receiver intact,
//! while sharing every untouched subtree with it.
//!
//! - **[`PersistentVector`]**: O(log32 N) indexed read/replace, amortized O(1)
//!   append and remove-from-end
//! - **[`SubVector`]**: zero-copy sub-range views over a vector
//! - **[`TransientVector`]**: an ownership-tagged mutable builder for batch
//!   construction, frozen back into a [`PersistentVector`]
//! - **[`ChunkedIter`]**: sequential iteration that descends the trie once per
//!   32-element chunk
//!
//! ## Feature Flags
//!
//! - `arc`: use `Arc` instead of `Rc` so vectors and views are `Send + Sync`
//! - `serde`: `Serialize`/`Deserialize` support
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use trie_vector::prelude::*;
//!
//! let vector: PersistentVector<i32> = (0..100).collect();
//! let updated = vector.assoc(50, 999).unwrap();
//!
//! assert_eq!(vector.get(50), Ok(&50));
//! assert_eq!(updated.get(50), Ok(&999));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use trie_vector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::*;
    pub use crate::persistent::*;
}

pub mod error;
pub mod persistent;

pub use error::{ErrorKind, VectorError};
pub use persistent::{
    ChunkSource, ChunkedIter, PersistentSequence, PersistentVector, SessionId, SessionIdSource,
    SubVector, TransientVector,
};
