//! The operations shared by every persistent sequence value.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::error::VectorError;

/// An immutable, indexed sequence supporting end-append, end-removal and
/// index replacement.
///
/// Implemented by [`PersistentVector`](super::PersistentVector) and
/// [`SubVector`](super::SubVector). Every operation returns a new value and
/// leaves the receiver untouched.
///
/// # Examples
///
/// ```rust
/// use trie_vector::persistent::{PersistentSequence, PersistentVector};
///
/// fn append_twice<S: PersistentSequence>(sequence: &S, element: S::Element) -> S
/// where
///     S::Element: Clone,
/// {
///     sequence.conj(element.clone()).conj(element)
/// }
///
/// let vector: PersistentVector<i32> = (0..5).collect();
/// let window = vector.slice(1, 3).unwrap();
///
/// assert_eq!(append_twice(&vector, 9).len(), 7);
/// assert_eq!(append_twice(&window, 9).iter().copied().collect::<Vec<_>>(), [1, 2, 9, 9]);
/// ```
pub trait PersistentSequence: Sized {
    /// The element type.
    type Element;

    /// The iterator returned by [`iter`](Self::iter).
    type Iter<'a>: Iterator<Item = &'a Self::Element>
    where
        Self: 'a,
        Self::Element: 'a;

    /// Returns the number of elements.
    fn len(&self) -> usize;

    /// Returns `true` if the sequence holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// [`VectorError::OutOfBounds`] unless `index < len()`.
    fn get(&self, index: usize) -> Result<&Self::Element, VectorError>;

    /// Returns a sequence with `element` appended.
    #[must_use]
    fn conj(&self, element: Self::Element) -> Self;

    /// Returns a sequence without its last element.
    ///
    /// # Errors
    ///
    /// [`VectorError::EmptyCollection`] if the sequence is empty.
    fn pop(&self) -> Result<Self, VectorError>;

    /// Returns a sequence with the element at `index` replaced.
    /// `index == len()` appends.
    ///
    /// # Errors
    ///
    /// [`VectorError::OutOfBounds`] if `index > len()`.
    fn assoc(&self, index: usize, element: Self::Element) -> Result<Self, VectorError>;

    /// Returns a sequence with every element of `elements` appended in order.
    #[must_use]
    fn concat<I>(&self, elements: I) -> Self
    where
        I: IntoIterator<Item = Self::Element>;

    /// Returns an iterator over the elements in index order.
    fn iter(&self) -> Self::Iter<'_>;
}

/// Order-sensitive hash of a sequence: the length followed by each element.
pub fn hash_elements<'a, T, I>(elements: I) -> u64
where
    T: Hash + 'a,
    I: ExactSizeIterator<Item = &'a T>,
{
    let mut hasher = FxHasher::default();
    elements.len().hash(&mut hasher);
    for element in elements {
        element.hash(&mut hasher);
    }
    hasher.finish()
}

/// Elementwise equality with two cheap early exits: differing lengths, and
/// differing hashes when both sides have already memoised theirs.
pub fn sequences_equal<'a, 'b, T, L, R>(
    left: L,
    left_hash: Option<u64>,
    right: R,
    right_hash: Option<u64>,
) -> bool
where
    T: PartialEq + 'a + 'b,
    L: ExactSizeIterator<Item = &'a T>,
    R: ExactSizeIterator<Item = &'b T>,
{
    if left.len() != right.len() {
        return false;
    }
    if let (Some(left_hash), Some(right_hash)) = (left_hash, right_hash)
        && left_hash != right_hash
    {
        return false;
    }
    left.zip(right).all(|(left, right)| left == right)
}
