//! Persistent (immutable) vector based on a 32-way bitmapped trie.
//!
//! The vector keeps its most recently appended elements in a tail buffer of
//! at most 32 elements. Only when the tail is full is it flushed into the
//! trie as a leaf, which makes appending amortized O(1).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;
use std::sync::OnceLock;

use super::ReferenceCounter;
use super::chunked_iterator::{ChunkSource, ChunkedIter};
use super::node::{BITS_PER_LEVEL, BRANCHING_FACTOR, MASK, Node, root_overflows, tail_offset};
use super::sequence::{self, PersistentSequence};
use super::session::{DEFAULT_SESSION_IDS, SessionId, SessionIdSource};
use super::subvector::SubVector;
use super::transient::TransientVector;
use crate::error::VectorError;

// =============================================================================
// PersistentVector Definition
// =============================================================================

/// A persistent (immutable) vector.
///
/// Every operation returns a new vector and leaves the receiver unchanged;
/// unchanged parts of the trie are shared between versions.
///
/// # Time Complexity
///
/// | Operation   | Complexity                  |
/// |-------------|-----------------------------|
/// | `new`       | O(1)                        |
/// | `get`       | O(log32 N)                  |
/// | `conj`      | O(log32 N), amortized O(1)  |
/// | `pop`       | O(log32 N), amortized O(1)  |
/// | `assoc`     | O(log32 N)                  |
/// | `slice`     | O(1)                        |
/// | `len`       | O(1)                        |
/// | `iter`      | O(1) to create, O(N) to iterate |
///
/// # Examples
///
/// ```rust
/// use trie_vector::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..100).collect();
/// assert_eq!(vector.len(), 100);
/// assert_eq!(vector.get(50), Ok(&50));
/// assert_eq!(vector[99], 99);
/// ```
#[derive(Clone)]
pub struct PersistentVector<T> {
    /// Total number of elements
    length: usize,
    /// Height of the trie, in bits: the trie addresses `32^(shift / 5)` elements
    shift: usize,
    /// Root node of the trie, always frozen
    root: ReferenceCounter<Node<T>>,
    /// Elements at and after `tail_offset(length)`
    tail: ReferenceCounter<[T]>,
    /// Memoised order-sensitive hash
    hash: OnceLock<u64>,
}

impl<T> PersistentVector<T> {
    /// Creates a new empty vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = PersistentVector::new();
    /// assert!(vector.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(
            0,
            BITS_PER_LEVEL,
            ReferenceCounter::new(Node::empty_inner(SessionId::FROZEN)),
            ReferenceCounter::from(Vec::new()),
        )
    }

    /// Creates a vector containing a single element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::singleton(42);
    /// assert_eq!(vector.len(), 1);
    /// assert_eq!(vector.get(0), Ok(&42));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self::from_parts(
            1,
            BITS_PER_LEVEL,
            ReferenceCounter::new(Node::empty_inner(SessionId::FROZEN)),
            ReferenceCounter::from(vec![element]),
        )
    }

    pub(crate) fn from_parts(
        length: usize,
        shift: usize,
        root: ReferenceCounter<Node<T>>,
        tail: ReferenceCounter<[T]>,
    ) -> Self {
        debug_assert!(shift >= BITS_PER_LEVEL);
        debug_assert!(shift.is_multiple_of(BITS_PER_LEVEL));
        debug_assert_eq!(tail.len(), length - tail_offset(length));
        debug_assert!(root.session().is_frozen());
        Self {
            length,
            shift,
            root,
            tail,
            hash: OnceLock::new(),
        }
    }

    pub(crate) const fn shift(&self) -> usize {
        self.shift
    }

    pub(crate) const fn root(&self) -> &ReferenceCounter<Node<T>> {
        &self.root
    }

    pub(crate) fn tail(&self) -> &[T] {
        &self.tail
    }

    /// Returns the number of elements in the vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// assert_eq!(vector.len(), 5);
    /// ```
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the vector contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the chunk holding `index` and the offset of `index` inside it.
    fn chunk_for(&self, index: usize) -> (&[T], usize) {
        let chunk = if index >= tail_offset(self.length) {
            &*self.tail
        } else {
            self.root.chunk(index, self.shift)
        };
        (chunk, index & MASK)
    }

    /// Returns a reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::OutOfBounds`] unless `index < len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::{PersistentVector, VectorError};
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// assert_eq!(vector.get(0), Ok(&1));
    /// assert_eq!(vector.get(4), Ok(&5));
    /// assert_eq!(vector.get(5), Err(VectorError::OutOfBounds { index: 5, length: 5 }));
    /// ```
    pub fn get(&self, index: usize) -> Result<&T, VectorError> {
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

    /// Returns the first element, or `None` if the vector is empty.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0).ok()
    }

    /// Returns the last element, or `None` if the vector is empty.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.tail.last()
    }

    /// Returns an iterator over references to the elements, in index order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=3).collect();
    /// let collected: Vec<&i32> = vector.iter().collect();
    /// assert_eq!(collected, vec![&1, &2, &3]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> ChunkedIter<'_, Self> {
        ChunkedIter::new(self, 0, self.length)
    }

    /// Memoised order-sensitive hash of the elements.
    pub(crate) fn hash_code(&self) -> u64
    where
        T: Hash,
    {
        *self
            .hash
            .get_or_init(|| sequence::hash_elements(self.iter()))
    }

    pub(crate) fn memoised_hash(&self) -> Option<u64> {
        self.hash.get().copied()
    }
}

impl<T: Clone> PersistentVector<T> {
    /// Creates a vector holding clones of the elements of `slice`.
    #[must_use]
    pub fn from_slice(slice: &[T]) -> Self {
        slice.iter().cloned().collect()
    }

    /// Appends an element to the end of the vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::new().conj(1).conj(2).conj(3);
    /// assert_eq!(vector.len(), 3);
    /// assert_eq!(vector.get(2), Ok(&3));
    /// ```
    #[must_use]
    pub fn conj(&self, element: T) -> Self {
        if self.tail.len() < BRANCHING_FACTOR {
            let mut tail = Vec::with_capacity(self.tail.len() + 1);
            tail.extend_from_slice(&self.tail);
            tail.push(element);
            return Self::from_parts(
                self.length + 1,
                self.shift,
                self.root.clone(),
                ReferenceCounter::from(tail),
            );
        }

        let tail_node = Node::Leaf {
            session: SessionId::FROZEN,
            elements: self.tail.iter().cloned().collect(),
        };
        tracing::trace!(length = self.length, "tail flushed into trie");

        let (root, shift) = if root_overflows(self.length, self.shift) {
            let shift = self.shift + BITS_PER_LEVEL;
            tracing::trace!(length = self.length, shift, "trie height grown");
            let root = Node::branch_of_two(
                SessionId::FROZEN,
                self.root.clone(),
                Node::new_path(SessionId::FROZEN, self.shift, tail_node),
            );
            (root, shift)
        } else {
            (
                self.root.push_tail(self.length, self.shift, tail_node),
                self.shift,
            )
        };

        Self::from_parts(
            self.length + 1,
            shift,
            ReferenceCounter::new(root),
            ReferenceCounter::from(vec![element]),
        )
    }

    /// Removes the last element.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::EmptyCollection`] if the vector is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::{PersistentVector, VectorError};
    ///
    /// let vector: PersistentVector<i32> = (1..=3).collect();
    /// let popped = vector.pop().unwrap();
    /// assert_eq!(popped.len(), 2);
    /// assert_eq!(popped.last(), Some(&2));
    ///
    /// let empty: PersistentVector<i32> = PersistentVector::new();
    /// assert_eq!(empty.pop(), Err(VectorError::EmptyCollection));
    /// ```
    pub fn pop(&self) -> Result<Self, VectorError> {
        match self.length {
            0 => return Err(VectorError::EmptyCollection),
            1 => return Ok(Self::new()),
            _ => {}
        }

        if self.tail.len() > 1 {
            return Ok(Self::from_parts(
                self.length - 1,
                self.shift,
                self.root.clone(),
                ReferenceCounter::from(&self.tail[..self.tail.len() - 1]),
            ));
        }

        // The rightmost leaf of the trie becomes the new tail.
        let tail = ReferenceCounter::from(self.root.chunk(self.length - 2, self.shift));

        let (root, shift) = match self.root.pop_tail(self.length, self.shift) {
            None => (
                ReferenceCounter::new(Node::empty_inner(SessionId::FROZEN)),
                BITS_PER_LEVEL,
            ),
            Some(root) => {
                let collapsed = if self.shift > BITS_PER_LEVEL {
                    root.only_child().cloned()
                } else {
                    None
                };
                match collapsed {
                    Some(mut child) => {
                        // A child built by a transient may still carry its session.
                        Node::freeze_root(&mut child);
                        let shift = self.shift - BITS_PER_LEVEL;
                        tracing::trace!(length = self.length - 1, shift, "trie height shrunk");
                        (child, shift)
                    }
                    None => (ReferenceCounter::new(root), self.shift),
                }
            }
        };

        Ok(Self::from_parts(self.length - 1, shift, root, tail))
    }

    /// Replaces the element at `index`. `index == len()` appends instead.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::OutOfBounds`] if `index > len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..10).collect();
    /// let updated = vector.assoc(5, 100).unwrap();
    /// assert_eq!(updated.get(5), Ok(&100));
    /// assert_eq!(vector.get(5), Ok(&5));
    ///
    /// assert_eq!(vector.assoc(10, 10).unwrap().len(), 11);
    /// assert!(vector.assoc(11, 11).is_err());
    /// ```
    pub fn assoc(&self, index: usize, element: T) -> Result<Self, VectorError> {
        if index == self.length {
            return Ok(self.conj(element));
        }
        if index > self.length {
            return Err(VectorError::OutOfBounds {
                index,
                length: self.length,
            });
        }

        Ok(self.replace(index, element))
    }

    /// Replaces the element at `index`, which must be below `len()`.
    pub(crate) fn replace(&self, index: usize, element: T) -> Self {
        debug_assert!(index < self.length);
        if index >= tail_offset(self.length) {
            let mut tail = self.tail.to_vec();
            tail[index & MASK] = element;
            Self::from_parts(
                self.length,
                self.shift,
                self.root.clone(),
                ReferenceCounter::from(tail),
            )
        } else {
            let root = self.root.assoc(index, self.shift, element);
            Self::from_parts(
                self.length,
                self.shift,
                ReferenceCounter::new(root),
                self.tail.clone(),
            )
        }
    }

    /// Appends every element of `elements`, in order.
    ///
    /// The result is the same as calling [`conj`](Self::conj) once per
    /// element, but the intermediate versions are built in place by a
    /// transient and never allocated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=3).collect();
    /// let extended = vector.concat(4..=6);
    ///
    /// assert_eq!(extended.iter().copied().collect::<Vec<_>>(), [1, 2, 3, 4, 5, 6]);
    /// assert_eq!(vector.len(), 3);
    /// ```
    #[must_use]
    pub fn concat<I>(&self, elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut transient = TransientVector::from_vector(self, &DEFAULT_SESSION_IDS);
        for element in elements {
            transient.push(element);
        }
        transient.freeze()
    }

    /// Returns a view over the elements in `[start, end)`.
    ///
    /// The view shares this vector and copies no elements.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeOutOfBounds`] unless
    /// `start <= end <= len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..10).collect();
    /// let window = vector.slice(3, 6).unwrap();
    /// assert_eq!(window.iter().copied().collect::<Vec<_>>(), [3, 4, 5]);
    /// assert!(vector.slice(6, 11).is_err());
    /// ```
    pub fn slice(&self, start: usize, end: usize) -> Result<SubVector<T>, VectorError> {
        SubVector::new(self.clone(), start, end)
    }

    /// Opens a transient session over this vector, with a session id from
    /// the crate's default source.
    ///
    /// The transient shares this vector's trie; nodes are copied lazily, the
    /// first time the transient touches them.
    #[must_use]
    pub fn transient(&self) -> TransientVector<T> {
        TransientVector::from_vector(self, &DEFAULT_SESSION_IDS)
    }

    /// Like [`transient`](Self::transient), drawing the session id from
    /// `sessions`.
    #[must_use]
    pub fn transient_in(&self, sessions: &SessionIdSource) -> TransientVector<T> {
        TransientVector::from_vector(self, sessions)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<T> ChunkSource for PersistentVector<T> {
    type Element = T;

    #[inline]
    fn chunk_at(&self, index: usize) -> (&[T], usize) {
        self.chunk_for(index)
    }
}

impl<T: Clone> PersistentSequence for PersistentVector<T> {
    type Element = T;
    type Iter<'a>
        = ChunkedIter<'a, Self>
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.length
    }

    fn get(&self, index: usize) -> Result<&T, VectorError> {
        Self::get(self, index)
    }

    fn conj(&self, element: T) -> Self {
        Self::conj(self, element)
    }

    fn pop(&self) -> Result<Self, VectorError> {
        Self::pop(self)
    }

    fn assoc(&self, index: usize, element: T) -> Result<Self, VectorError> {
        Self::assoc(self, index, element)
    }

    fn concat<I>(&self, elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::concat(self, elements)
    }

    fn iter(&self) -> Self::Iter<'_> {
        Self::iter(self)
    }
}

impl<T> Default for PersistentVector<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for PersistentVector<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `index >= len()`.
    fn index(&self, index: usize) -> &T {
        self.get(index).unwrap_or_else(|error| panic!("{error}"))
    }
}

impl<T: Clone> FromIterator<T> for PersistentVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut transient = TransientVector::new();
        for element in iter {
            transient.push(element);
        }
        transient.freeze()
    }
}

impl<'a, T> IntoIterator for &'a PersistentVector<T> {
    type Item = &'a T;
    type IntoIter = ChunkedIter<'a, PersistentVector<T>>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for PersistentVector<T> {
    fn eq(&self, other: &Self) -> bool {
        sequence::sequences_equal(
            self.iter(),
            self.memoised_hash(),
            other.iter(),
            other.memoised_hash(),
        )
    }
}

impl<T: Eq> Eq for PersistentVector<T> {}

/// Hashes the length and every element in order. The value is computed on
/// first use and memoised; a [`SubVector`] over the same elements hashes
/// identically.
///
/// # Examples
///
/// ```rust
/// use trie_vector::persistent::PersistentVector;
/// use std::collections::HashMap;
///
/// let mut map: HashMap<PersistentVector<i32>, &str> = HashMap::new();
/// let key: PersistentVector<i32> = (1..=3).collect();
/// map.insert(key.clone(), "value");
/// assert_eq!(map.get(&key), Some(&"value"));
/// ```
impl<T: Hash> Hash for PersistentVector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for PersistentVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        for (index, element) in self.iter().enumerate() {
            if index > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentVector<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
struct PersistentVectorVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for PersistentVectorVisitor<T>
where
    T: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentVector<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut transient = TransientVector::new();
        while let Some(element) = seq.next_element()? {
            transient.push(element);
        }
        Ok(transient.freeze())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentVector<T>
where
    T: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentVectorVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
impl<T> PersistentVector<T> {
    /// Asserts the structural invariants of the representation.
    pub(crate) fn check_invariants(&self) {
        assert!(self.shift >= BITS_PER_LEVEL);
        assert!(self.shift.is_multiple_of(BITS_PER_LEVEL));
        assert_eq!(self.tail.len(), self.length - tail_offset(self.length));
        assert!(self.tail.len() <= BRANCHING_FACTOR);
        assert!(self.root.session().is_frozen());
        assert_eq!(
            self.root.leaf_count() * BRANCHING_FACTOR,
            tail_offset(self.length)
        );
        if self.shift > BITS_PER_LEVEL {
            assert!(self.root.only_child().is_none());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // =========================================================================
    // Display Tests
    // =========================================================================

    #[rstest]
    fn test_display_empty_vector() {
        let vector: PersistentVector<i32> = PersistentVector::new();
        assert_eq!(format!("{vector}"), "[]");
    }

    #[rstest]
    fn test_display_multiple_elements_vector() {
        let vector: PersistentVector<i32> = (1..=3).collect();
        assert_eq!(format!("{vector}"), "[1, 2, 3]");
        assert_eq!(format!("{vector:?}"), "[1, 2, 3]");
    }

    // =========================================================================
    // Construction and Read Tests
    // =========================================================================

    #[rstest]
    fn test_new_creates_empty() {
        let vector: PersistentVector<i32> = PersistentVector::new();
        assert!(vector.is_empty());
        assert_eq!(vector.first(), None);
        assert_eq!(vector.last(), None);
        vector.check_invariants();
    }

    #[rstest]
    fn test_singleton() {
        let vector = PersistentVector::singleton(42);
        assert_eq!(vector.len(), 1);
        assert_eq!(vector.first(), Some(&42));
        assert_eq!(vector.last(), Some(&42));
        vector.check_invariants();
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(32)]
    #[case(33)]
    #[case(1024)]
    #[case(1056)]
    #[case(1057)]
    #[case(5000)]
    fn test_get_every_index(#[case] length: usize) {
        let vector: PersistentVector<usize> = (0..length).collect();
        vector.check_invariants();
        for index in 0..length {
            assert_eq!(vector.get(index), Ok(&index));
        }
        assert_eq!(
            vector.get(length),
            Err(VectorError::OutOfBounds {
                index: length,
                length,
            })
        );
    }

    #[rstest]
    #[should_panic(expected = "index 3 is out of bounds for length 3")]
    fn test_index_panics_out_of_bounds() {
        let vector: PersistentVector<i32> = (0..3).collect();
        let _ = vector[3];
    }

    // =========================================================================
    // Conj Tests
    // =========================================================================

    #[rstest]
    fn test_conj_flushes_tail_once_after_32_elements() {
        let mut vector = PersistentVector::new();
        for element in 0..32 {
            vector = vector.conj(element);
            assert_eq!(vector.root.leaf_count(), 0);
        }
        assert_eq!(vector.tail.len(), 32);

        let vector = vector.conj(32);
        assert_eq!(vector.root.leaf_count(), 1);
        assert_eq!(vector.tail.len(), 1);
        assert_eq!(vector.tail[0], 32);
        assert_eq!(vector.shift, BITS_PER_LEVEL);
        vector.check_invariants();
    }

    #[rstest]
    fn test_conj_grows_height_when_trie_is_full() {
        let vector: PersistentVector<usize> = (0..1056).collect();
        assert_eq!(vector.shift, BITS_PER_LEVEL);
        assert_eq!(vector.root.leaf_count(), 32);

        let grown = vector.conj(1056);
        assert_eq!(grown.shift, 2 * BITS_PER_LEVEL);
        assert_eq!(grown.root.leaf_count(), 33);
        grown.check_invariants();
        assert_eq!(grown.get(1055), Ok(&1055));
        assert_eq!(grown.get(1056), Ok(&1056));
    }

    #[rstest]
    fn test_conj_shares_untouched_leaves() {
        let vector: PersistentVector<usize> = (0..96).collect();
        let appended = vector.conj(96);

        let (Node::Inner { children: old, .. }, Node::Inner { children: new, .. }) =
            (vector.root.as_ref(), appended.root.as_ref())
        else {
            panic!("expected inner roots");
        };
        assert!(ReferenceCounter::ptr_eq(&old[0], &new[0]));
        assert!(ReferenceCounter::ptr_eq(&old[1], &new[1]));
        assert_eq!(new.len(), 3);
    }

    #[rstest]
    fn test_conj_leaves_original_unchanged() {
        let vector = PersistentVector::new().conj("a").conj("b").conj("c");
        let changed = vector.assoc(2, "C").unwrap().conj("d");

        let changed: Vec<_> = changed.iter().copied().collect();
        assert_eq!(changed, ["a", "b", "C", "d"]);
        assert_eq!(vector.iter().copied().collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    // =========================================================================
    // Pop Tests
    // =========================================================================

    #[rstest]
    fn test_pop_empty_fails() {
        let vector: PersistentVector<i32> = PersistentVector::new();
        assert_eq!(vector.pop(), Err(VectorError::EmptyCollection));
    }

    #[rstest]
    fn test_pop_single_element_yields_fresh_empty() {
        let popped = PersistentVector::singleton(1).pop().unwrap();
        assert!(popped.is_empty());
        assert_eq!(popped.shift, BITS_PER_LEVEL);
        popped.check_invariants();
    }

    #[rstest]
    fn test_pop_pulls_last_leaf_into_tail() {
        let vector: PersistentVector<usize> = (0..33).collect();
        let popped = vector.pop().unwrap();

        assert_eq!(popped.len(), 32);
        assert_eq!(popped.root.leaf_count(), 0);
        assert_eq!(popped.tail.len(), 32);
        popped.check_invariants();
    }

    #[rstest]
    fn test_pop_collapses_height() {
        let vector: PersistentVector<usize> = (0..1057).collect();
        assert_eq!(vector.shift, 2 * BITS_PER_LEVEL);

        let popped = vector.pop().unwrap();
        assert_eq!(popped.shift, BITS_PER_LEVEL);
        assert_eq!(popped.len(), 1056);
        popped.check_invariants();
        assert_eq!(popped, (0..1056).collect::<PersistentVector<_>>());
    }

    /// Builds a vector by repeated `conj`, never opening a transient.
    fn conjed(length: usize) -> PersistentVector<usize> {
        let mut vector = PersistentVector::new();
        for element in 0..length {
            vector = vector.conj(element);
        }
        vector
    }

    #[rstest]
    fn test_pop_collapse_freezes_adopted_root() {
        let built: PersistentVector<usize> = (0..1057).collect();
        let Node::Inner { children, .. } = built.root.as_ref() else {
            panic!("expected inner root");
        };
        assert!(!children[0].session().is_frozen());

        let popped = built.pop().unwrap();
        assert!(popped.root.session().is_frozen());
        popped.check_invariants();
        assert_eq!(built.get(1056), Ok(&1056));
    }

    #[rstest]
    fn test_pop_keeps_invariants_across_heights(
        #[values(1057, 32_801, 33_825)] length: usize,
        #[values(false, true)] through_transient: bool,
    ) {
        let mut vector: PersistentVector<usize> = if through_transient {
            (0..length).collect()
        } else {
            conjed(length)
        };
        vector.check_invariants();

        for expected_length in (0..length).rev() {
            vector = vector.pop().unwrap();
            vector.check_invariants();
            assert_eq!(vector.len(), expected_length);
            assert_eq!(vector.last(), expected_length.checked_sub(1).as_ref());
        }
    }

    #[rstest]
    fn test_pop_down_to_empty() {
        let mut vector: PersistentVector<usize> = (0..2000).collect();
        for expected_length in (0..2000).rev() {
            vector = vector.pop().unwrap();
            vector.check_invariants();
            assert_eq!(vector.len(), expected_length);
            assert_eq!(vector.last(), expected_length.checked_sub(1).as_ref());
        }
    }

    // =========================================================================
    // Assoc Tests
    // =========================================================================

    #[rstest]
    #[case(0)]
    #[case(31)]
    #[case(32)]
    #[case(500)]
    #[case(1099)]
    fn test_assoc_replaces_single_element(#[case] index: usize) {
        let vector: PersistentVector<usize> = (0..1100).collect();
        let updated = vector.assoc(index, usize::MAX).unwrap();
        updated.check_invariants();

        for position in 0..1100 {
            let expected = if position == index {
                usize::MAX
            } else {
                position
            };
            assert_eq!(updated.get(position), Ok(&expected));
        }
        assert_eq!(vector.get(index), Ok(&index));
    }

    #[rstest]
    fn test_assoc_at_length_appends() {
        let vector: PersistentVector<i32> = (0..32).collect();
        assert_eq!(vector.assoc(32, 32).unwrap(), vector.conj(32));
    }

    #[rstest]
    fn test_assoc_past_length_fails() {
        let vector: PersistentVector<i32> = (0..3).collect();
        assert_eq!(
            vector.assoc(4, 0),
            Err(VectorError::OutOfBounds {
                index: 4,
                length: 3,
            })
        );
    }

    // =========================================================================
    // Concat, Equality and Hash Tests
    // =========================================================================

    #[rstest]
    fn test_concat_matches_repeated_conj() {
        let vector: PersistentVector<usize> = (0..40).collect();
        let concatenated = vector.concat(40..1200);
        concatenated.check_invariants();

        let mut expected = vector.clone();
        for element in 40..1200 {
            expected = expected.conj(element);
        }
        assert_eq!(concatenated, expected);
        assert_eq!(vector.len(), 40);
    }

    #[rstest]
    fn test_equality_ignores_memoised_state() {
        let left: PersistentVector<i32> = (0..100).collect();
        let right: PersistentVector<i32> = (0..100).collect();
        let _ = left.hash_code();
        assert_eq!(left, right);
        let _ = right.hash_code();
        assert_eq!(left, right);
        assert_ne!(left, right.assoc(99, -1).unwrap());
    }

    #[rstest]
    fn test_hash_is_memoised() {
        let vector: PersistentVector<i32> = (0..100).collect();
        assert_eq!(vector.memoised_hash(), None);
        let hash = vector.hash_code();
        assert_eq!(vector.memoised_hash(), Some(hash));
        assert_eq!(vector.conj(100).memoised_hash(), None);
    }
}

// =============================================================================
// Thread Safety Tests (arc feature only)
// =============================================================================
