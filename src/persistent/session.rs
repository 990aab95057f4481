//! Session tags for transient editing.
//!
//! Every trie node carries a [`SessionId`]. [`SessionId::FROZEN`] marks a node
//! as shared and immutable; any other value names the transient session that
//! owns the node exclusively and may therefore edit it in place.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies the transient session that owns a node, or
/// [`FROZEN`](Self::FROZEN) for shared nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// The tag carried by every node reachable from a persistent value.
    pub const FROZEN: Self = Self(0);

    /// Returns `true` if this is the frozen tag.
    #[inline]
    #[must_use]
    pub const fn is_frozen(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw numeric value of this tag.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_frozen() {
            write!(formatter, "frozen")
        } else {
            write!(formatter, "session#{}", self.0)
        }
    }
}

/// A monotonic source of fresh, non-frozen [`SessionId`]s.
///
/// Identifiers are handed out in allocation order and are unique per source.
/// A single atomic counter backs the source, so it can be shared freely (for
/// example in a `static`).
///
/// Two distinct sources may hand out equal identifiers. That only costs a few
/// extra node copies: a transient never edits a node it does not hold the
/// sole reference to, whatever its tag says.
///
/// # Examples
///
/// ```rust
/// use trie_vector::persistent::{PersistentVector, SessionIdSource};
///
/// let sessions = SessionIdSource::new();
/// let first = sessions.next_id();
/// let second = sessions.next_id();
/// assert!(first < second);
/// assert!(!first.is_frozen());
///
/// let vector: PersistentVector<i32> = (0..3).collect();
/// let mut transient = vector.transient_in(&sessions);
/// transient.conj(3).unwrap();
/// assert_eq!(transient.persistent().unwrap().len(), 4);
/// ```
#[derive(Debug)]
pub struct SessionIdSource {
    next: AtomicU64,
}

impl SessionIdSource {
    /// Creates a source whose first identifier is `1`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocates the next identifier.
    pub fn next_id(&self) -> SessionId {
        let mut raw = self.next.fetch_add(1, Ordering::Relaxed);
        // The counter only reaches zero again after wrapping around.
        if raw == 0 {
            raw = self.next.fetch_add(1, Ordering::Relaxed);
        }
        SessionId(raw)
    }
}

impl Default for SessionIdSource {
    fn default() -> Self {
        Self::new()
    }
}

/// The source used by [`PersistentVector::transient`](super::PersistentVector::transient)
/// and [`TransientVector::new`](super::TransientVector::new).
pub static DEFAULT_SESSION_IDS: SessionIdSource = SessionIdSource::new();
