//! Transient (mutable) builder over the persistent vector representation.
//!
//! A [`TransientVector`] owns a session id. Trie nodes tagged with that id
//! belong to the transient and are edited in place; every other node is
//! copied once, retagged, and then edited in place from there on. Freezing
//! the transient with [`TransientVector::persistent`] retags the root as
//! frozen and ends the session for good.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use super::ReferenceCounter;
use super::chunked_iterator::{ChunkSource, ChunkedIter};
use super::node::{BITS_PER_LEVEL, BRANCHING_FACTOR, Chunk, MASK, Node, root_overflows, tail_offset};
use super::session::{DEFAULT_SESSION_IDS, SessionId, SessionIdSource};
use super::vector::PersistentVector;
use crate::error::VectorError;

/// A mutable builder for [`PersistentVector`].
///
/// Obtained from [`PersistentVector::transient`] or [`TransientVector::new`].
/// All mutating methods return `&mut Self` so calls can be chained with `?`.
/// Once [`persistent`](Self::persistent) has been called, every further
/// mutation fails with [`VectorError::TransientFrozen`].
///
/// A transient is confined to the thread that created it: it is neither
/// `Send` nor `Sync`, whichever reference counter the crate is built with.
///
/// # Examples
///
/// ```rust
/// use trie_vector::{PersistentVector, VectorError};
///
/// let vector: PersistentVector<i32> = (0..3).collect();
/// let mut transient = vector.transient();
/// transient.conj(3)?.conj(4)?.assoc(0, 100)?.pop()?;
///
/// let built = transient.persistent()?;
/// assert_eq!(built.iter().copied().collect::<Vec<_>>(), [100, 1, 2, 3]);
/// assert_eq!(vector.iter().copied().collect::<Vec<_>>(), [0, 1, 2]);
///
/// assert_eq!(transient.conj(5).unwrap_err(), VectorError::TransientFrozen);
/// # Ok::<(), VectorError>(())
/// ```
pub struct TransientVector<T> {
    length: usize,
    shift: usize,
    root: ReferenceCounter<Node<T>>,
    tail: Chunk<T>,
    /// `SessionId::FROZEN` once the transient has been frozen
    session: SessionId,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientVector<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientVector<String>: Send, Sync);

#[cfg(feature = "arc")]
mod arc_send_sync_verification {
    use super::TransientVector;
    use std::sync::Arc;

    static_assertions::assert_not_impl_any!(TransientVector<Arc<i32>>: Send, Sync);
}

impl<T> TransientVector<T> {
    /// Creates an empty transient with a session id from the crate's default
    /// source.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::TransientVector;
    ///
    /// let mut transient = TransientVector::new();
    /// for element in 0..100 {
    ///     transient.conj(element).unwrap();
    /// }
    /// assert_eq!(transient.persistent().unwrap().len(), 100);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(&DEFAULT_SESSION_IDS)
    }

    /// Creates an empty transient with a session id drawn from `sessions`.
    #[must_use]
    pub fn new_in(sessions: &SessionIdSource) -> Self {
        let session = sessions.next_id();
        tracing::trace!(%session, length = 0, "transient opened");
        Self {
            length: 0,
            shift: BITS_PER_LEVEL,
            root: ReferenceCounter::new(Node::empty_inner(session)),
            tail: Chunk::new(),
            session,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements. A frozen transient reports zero.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the transient holds no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns `true` once [`persistent`](Self::persistent) has been called.
    #[inline]
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.session.is_frozen()
    }

    /// Returns the session id owning this transient's nodes, or
    /// [`SessionId::FROZEN`] after freezing.
    #[inline]
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    const fn ensure_active(&self) -> Result<(), VectorError> {
        if self.session.is_frozen() {
            Err(VectorError::TransientFrozen)
        } else {
            Ok(())
        }
    }

    fn chunk_for(&self, index: usize) -> (&[T], usize) {
        let chunk = if index >= tail_offset(self.length) {
            self.tail.as_slice()
        } else {
            self.root.chunk(index, self.shift)
        };
        (chunk, index & MASK)
    }

    /// Returns a reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::TransientFrozen`] after freezing, and
    /// [`VectorError::OutOfBounds`] unless `index < len()`.
    pub fn get(&self, index: usize) -> Result<&T, VectorError> {
        self.ensure_active()?;
        let out_of_bounds = VectorError::OutOfBounds {
            index,
            length: self.length,
        };
        if index >= self.length {
            return Err(out_of_bounds);
        }
        let (chunk, offset) = self.chunk_for(index);
        chunk.get(offset).ok_or(out_of_bounds)
    }

    /// Returns an iterator over the current elements, in index order.
    #[must_use]
    pub fn iter(&self) -> ChunkedIter<'_, Self> {
        ChunkedIter::new(self, 0, self.length)
    }
}

impl<T: Clone> TransientVector<T> {
    /// Opens a session over `vector`, sharing its trie until first touched.
    pub(crate) fn from_vector(vector: &PersistentVector<T>, sessions: &SessionIdSource) -> Self {
        let session = sessions.next_id();
        tracing::trace!(%session, length = vector.len(), "transient opened");
        Self {
            length: vector.len(),
            shift: vector.shift(),
            root: vector.root().clone(),
            tail: vector.tail().iter().cloned().collect(),
            session,
            _marker: PhantomData,
        }
    }

    /// Appends in place. The session must be active.
    pub(crate) fn push(&mut self, element: T) {
        if self.tail.len() < BRANCHING_FACTOR {
            self.tail.push(element);
            self.length += 1;
            return;
        }

        let tail_node = Node::Leaf {
            session: self.session,
            elements: std::mem::take(&mut self.tail),
        };
        self.tail.push(element);
        tracing::trace!(length = self.length, session = %self.session, "tail flushed into trie");

        if root_overflows(self.length, self.shift) {
            let path = Node::new_path(self.session, self.shift, tail_node);
            let grown = Node::branch_of_two(self.session, self.root.clone(), path);
            let shift = self.shift + BITS_PER_LEVEL;
            tracing::trace!(length = self.length, shift, "trie height grown");
            self.root = ReferenceCounter::new(grown);
            self.shift = shift;
        } else {
            Node::transient_push_tail(
                &mut self.root,
                self.session,
                self.length,
                self.shift,
                tail_node,
            );
        }
        self.length += 1;
    }

    /// Removes the last element in place. The transient must be active and
    /// non-empty.
    fn remove_last(&mut self) {
        if self.length == 1 {
            self.length = 0;
            self.shift = BITS_PER_LEVEL;
            self.root = ReferenceCounter::new(Node::empty_inner(self.session));
            self.tail.clear();
            return;
        }

        if self.tail.len() > 1 {
            self.tail.pop();
            self.length -= 1;
            return;
        }

        let tail: Chunk<T> = self
            .root
            .chunk(self.length - 2, self.shift)
            .iter()
            .cloned()
            .collect();

        let emptied =
            Node::transient_pop_tail(&mut self.root, self.session, self.length, self.shift);
        if emptied {
            self.root = ReferenceCounter::new(Node::empty_inner(self.session));
            self.shift = BITS_PER_LEVEL;
        } else if self.shift > BITS_PER_LEVEL
            && let Some(child) = self.root.only_child().cloned()
        {
            let shift = self.shift - BITS_PER_LEVEL;
            tracing::trace!(length = self.length - 1, shift, "trie height shrunk");
            self.root = child;
            self.shift = shift;
        }

        self.tail = tail;
        self.length -= 1;
    }

    /// Ends the session and hands the contents over to a persistent vector.
    ///
    /// Leaves `self` empty and frozen.
    pub(crate) fn freeze(&mut self) -> PersistentVector<T> {
        let mut root = std::mem::replace(
            &mut self.root,
            ReferenceCounter::new(Node::empty_inner(SessionId::FROZEN)),
        );
        Node::freeze_root(&mut root);
        let tail: ReferenceCounter<[T]> = std::mem::take(&mut self.tail).into_iter().collect();
        let vector = PersistentVector::from_parts(self.length, self.shift, root, tail);

        tracing::trace!(session = %self.session, length = self.length, "transient frozen");
        self.length = 0;
        self.shift = BITS_PER_LEVEL;
        self.session = SessionId::FROZEN;
        vector
    }

    /// Appends an element in place.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::TransientFrozen`] after freezing.
    pub fn conj(&mut self, element: T) -> Result<&mut Self, VectorError> {
        self.ensure_active()?;
        self.push(element);
        Ok(self)
    }

    /// Removes the last element in place.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::TransientFrozen`] after freezing, and
    /// [`VectorError::EmptyCollection`] if there is nothing to remove.
    pub fn pop(&mut self) -> Result<&mut Self, VectorError> {
        self.ensure_active()?;
        if self.length == 0 {
            return Err(VectorError::EmptyCollection);
        }
        self.remove_last();
        Ok(self)
    }

    /// Replaces the element at `index` in place. `index == len()` appends.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::TransientFrozen`] after freezing, and
    /// [`VectorError::OutOfBounds`] if `index > len()`.
    pub fn assoc(&mut self, index: usize, element: T) -> Result<&mut Self, VectorError> {
        self.ensure_active()?;
        if index == self.length {
            self.push(element);
        } else if index > self.length {
            return Err(VectorError::OutOfBounds {
                index,
                length: self.length,
            });
        } else if index >= tail_offset(self.length) {
            self.tail[index & MASK] = element;
        } else {
            Node::transient_assoc(&mut self.root, self.session, index, self.shift, element);
        }
        Ok(self)
    }

    /// Appends every element of `elements` in place.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::TransientFrozen`] after freezing.
    pub fn concat<I>(&mut self, elements: I) -> Result<&mut Self, VectorError>
    where
        I: IntoIterator<Item = T>,
    {
        self.ensure_active()?;
        for element in elements {
            self.push(element);
        }
        Ok(self)
    }

    /// Freezes the transient into a [`PersistentVector`].
    ///
    /// The transient is dead afterwards: it reports a length of zero and
    /// every mutation fails.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::TransientFrozen`] if called a second time.
    pub fn persistent(&mut self) -> Result<PersistentVector<T>, VectorError> {
        self.ensure_active()?;
        Ok(self.freeze())
    }
}

impl<T> ChunkSource for TransientVector<T> {
    type Element = T;

    #[inline]
    fn chunk_at(&self, index: usize) -> (&[T], usize) {
        self.chunk_for(index)
    }
}

impl<'a, T> IntoIterator for &'a TransientVector<T> {
    type Item = &'a T;
    type IntoIter = ChunkedIter<'a, TransientVector<T>>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Default for TransientVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FromIterator<T> for TransientVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut transient = Self::new();
        for element in iter {
            transient.push(element);
        }
        transient
    }
}

impl<T: fmt::Debug> fmt::Debug for TransientVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TransientVector")
            .field("session", &format_args!("{}", self.session))
            .field("length", &self.length)
            .field("elements", &DebugElements(self))
            .finish_non_exhaustive()
    }
}

struct DebugElements<'a, T>(&'a TransientVector<T>);

impl<T: fmt::Debug> fmt::Debug for DebugElements<'_, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.0.iter()).finish()
    }
}
