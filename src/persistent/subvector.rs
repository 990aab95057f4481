//! Zero-copy windows over a persistent vector.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;
use std::sync::OnceLock;

use super::chunked_iterator::ChunkedIter;
use super::sequence::{self, PersistentSequence};
use super::vector::PersistentVector;
use crate::error::VectorError;

/// A window `[start, end)` over a [`PersistentVector`].
///
/// Created by [`PersistentVector::slice`]. Reads are forwarded to the backing
/// vector with an offset, so a window costs O(1) to create and never copies
/// elements. Slicing a window yields another window over the same backing
/// vector, never a window over a window.
///
/// Appending to a window writes at its end in the backing vector: elements
/// of the backing vector after the window are replaced in the new version,
/// which is never visible through the window itself.
///
/// # Examples
///
/// ```rust
/// use trie_vector::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..10).collect();
/// let window = vector.slice(2, 8).unwrap().slice(1, 3).unwrap();
///
/// assert_eq!(window.iter().copied().collect::<Vec<_>>(), [3, 4]);
/// assert_eq!(window.conj(100).iter().copied().collect::<Vec<_>>(), [3, 4, 100]);
/// assert_eq!(window, vector.slice(3, 5).unwrap());
/// ```
#[derive(Clone)]
pub struct SubVector<T> {
    backing: PersistentVector<T>,
    start: usize,
    end: usize,
    hash: OnceLock<u64>,
}

impl<T> SubVector<T> {
    pub(crate) fn new(
        backing: PersistentVector<T>,
        start: usize,
        end: usize,
    ) -> Result<Self, VectorError> {
        if start > end || end > backing.len() {
            return Err(VectorError::RangeOutOfBounds {
                start,
                end,
                length: backing.len(),
            });
        }
        Ok(Self {
            backing,
            start,
            end,
            hash: OnceLock::new(),
        })
    }

    /// Returns the number of elements in the window.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the window is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the vector this window reads from.
    #[must_use]
    pub const fn backing(&self) -> &PersistentVector<T> {
        &self.backing
    }

    /// Returns the window's bounds within [`backing`](Self::backing).
    #[must_use]
    pub const fn bounds(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    /// Returns a reference to the element at `index` within the window.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::OutOfBounds`] unless `index < len()`.
    pub fn get(&self, index: usize) -> Result<&T, VectorError> {
        if index >= self.len() {
            return Err(VectorError::OutOfBounds {
                index,
                length: self.len(),
            });
        }
        self.backing.get(self.start + index)
    }

    /// Returns the first element, or `None` if the window is empty.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0).ok()
    }

    /// Returns the last element, or `None` if the window is empty.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.len()
            .checked_sub(1)
            .and_then(|index| self.get(index).ok())
    }

    /// Returns an iterator over the window's elements, in index order.
    #[must_use]
    pub fn iter(&self) -> ChunkedIter<'_, PersistentVector<T>> {
        ChunkedIter::new(&self.backing, self.start, self.end)
    }

    pub(crate) fn hash_code(&self) -> u64
    where
        T: Hash,
    {
        *self
            .hash
            .get_or_init(|| sequence::hash_elements(self.iter()))
    }

    fn memoised_hash(&self) -> Option<u64> {
        self.hash.get().copied()
    }
}

impl<T: Clone> SubVector<T> {
    const fn with_backing(&self, backing: PersistentVector<T>, end: usize) -> Self {
        Self {
            backing,
            start: self.start,
            end,
            hash: OnceLock::new(),
        }
    }

    /// Returns a window one element longer, ending in `element`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trie_vector::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..5).collect();
    /// let window = vector.slice(0, 2).unwrap().conj(9);
    ///
    /// assert_eq!(window.iter().copied().collect::<Vec<_>>(), [0, 1, 9]);
    /// assert_eq!(vector.get(2), Ok(&2));
    /// ```
    #[must_use]
    pub fn conj(&self, element: T) -> Self {
        let backing = if self.end == self.backing.len() {
            self.backing.conj(element)
        } else {
            self.backing.replace(self.end, element)
        };
        self.with_backing(backing, self.end + 1)
    }

    /// Returns the window without its last element. The backing vector is
    /// shared unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::EmptyCollection`] if the window is empty.
    pub fn pop(&self) -> Result<Self, VectorError> {
        if self.is_empty() {
            return Err(VectorError::EmptyCollection);
        }
        Ok(self.with_backing(self.backing.clone(), self.end - 1))
    }

    /// Replaces the element at `index` within the window. `index == len()`
    /// appends.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::OutOfBounds`] if `index > len()`.
    pub fn assoc(&self, index: usize, element: T) -> Result<Self, VectorError> {
        if index == self.len() {
            return Ok(self.conj(element));
        }
        if index > self.len() {
            return Err(VectorError::OutOfBounds {
                index,
                length: self.len(),
            });
        }
        let backing = self.backing.replace(self.start + index, element);
        Ok(self.with_backing(backing, self.end))
    }

    /// Appends every element of `elements` past the window's end.
    #[must_use]
    pub fn concat<I>(&self, elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        elements
            .into_iter()
            .fold(self.clone(), |window, element| window.conj(element))
    }

    /// Returns a window over `[start, end)` of this window, expressed
    /// directly over the backing vector.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeOutOfBounds`] unless
    /// `start <= end <= len()`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, VectorError> {
        if start > end || end > self.len() {
            return Err(VectorError::RangeOutOfBounds {
                start,
                end,
                length: self.len(),
            });
        }
        Self::new(self.backing.clone(), self.start + start, self.start + end)
    }

    /// Copies the window's elements into a vector of their own, releasing
    /// the rest of the backing vector.
    #[must_use]
    pub fn to_vector(&self) -> PersistentVector<T> {
        self.iter().cloned().collect()
    }
}

impl<T: Clone> PersistentSequence for SubVector<T> {
    type Element = T;
    type Iter<'a>
        = ChunkedIter<'a, PersistentVector<T>>
    where
        Self: 'a;

    fn len(&self) -> usize {
        Self::len(self)
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

impl<T: Clone> From<SubVector<T>> for PersistentVector<T> {
    fn from(window: SubVector<T>) -> Self {
        if window.start == 0 && window.end == window.backing.len() {
            window.backing
        } else {
            window.to_vector()
        }
    }
}

impl<T> Index<usize> for SubVector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        self.get(index).unwrap_or_else(|error| panic!("{error}"))
    }
}

impl<'a, T> IntoIterator for &'a SubVector<T> {
    type Item = &'a T;
    type IntoIter = ChunkedIter<'a, PersistentVector<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Equality and Hash
// =============================================================================

impl<T: PartialEq> PartialEq for SubVector<T> {
    fn eq(&self, other: &Self) -> bool {
        sequence::sequences_equal(
            self.iter(),
            self.memoised_hash(),
            other.iter(),
            other.memoised_hash(),
        )
    }
}

impl<T: Eq> Eq for SubVector<T> {}

impl<T: PartialEq> PartialEq<PersistentVector<T>> for SubVector<T> {
    fn eq(&self, other: &PersistentVector<T>) -> bool {
        sequence::sequences_equal(
            self.iter(),
            self.memoised_hash(),
            other.iter(),
            other.memoised_hash(),
        )
    }
}

impl<T: PartialEq> PartialEq<SubVector<T>> for PersistentVector<T> {
    fn eq(&self, other: &SubVector<T>) -> bool {
        other == self
    }
}

impl<T: Hash> Hash for SubVector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl<T: fmt::Debug> fmt::Debug for SubVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for SubVector<T> {
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

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for SubVector<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent::ReferenceCounter;
    use rstest::rstest;
    use std::hash::DefaultHasher;

    fn hash_of<H: Hash>(value: &H) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn window_of(length: usize, start: usize, end: usize) -> SubVector<usize> {
        (0..length)
            .collect::<PersistentVector<_>>()
            .slice(start, end)
            .unwrap()
    }

    #[rstest]
    #[case(5, 0)]
    #[case(3, 2)]
    #[case(0, 11)]
    fn test_invalid_windows_are_rejected(#[case] start: usize, #[case] end: usize) {
        let vector: PersistentVector<usize> = (0..10).collect();
        assert_eq!(
            vector.slice(start, end).unwrap_err(),
            VectorError::RangeOutOfBounds {
                start,
                end,
                length: 10,
            }
        );
    }

    #[rstest]
    fn test_get_is_offset_and_bounded() {
        let window = window_of(100, 40, 50);
        assert_eq!(window.get(0), Ok(&40));
        assert_eq!(window[9], 49);
        assert_eq!(
            window.get(10),
            Err(VectorError::OutOfBounds {
                index: 10,
                length: 10,
            })
        );
    }

    #[rstest]
    fn test_nested_slices_flatten() {
        let outer = window_of(100, 10, 90);
        let inner = outer.slice(5, 20).unwrap();
        assert_eq!(inner.bounds(), (15, 30));
        assert!(ReferenceCounter::ptr_eq(
            inner.backing().root(),
            outer.backing().root()
        ));
        assert_eq!(inner.first(), Some(&15));
        assert_eq!(inner.last(), Some(&29));
    }

    #[rstest]
    fn test_nested_slice_is_bounded_by_receiver() {
        let outer = window_of(100, 10, 20);
        assert_eq!(
            outer.slice(5, 11).unwrap_err(),
            VectorError::RangeOutOfBounds {
                start: 5,
                end: 11,
                length: 10,
            }
        );
    }

    #[rstest]
    fn test_conj_overwrites_past_window_in_new_backing() {
        let original = window_of(10, 2, 4);
        let appended = original.conj(100);

        assert_eq!(appended.bounds(), (2, 5));
        assert_eq!(appended.get(2), Ok(&100));
        assert_eq!(appended.backing().get(4), Ok(&100));
        assert_eq!(original.backing().get(4), Ok(&4));
        assert_eq!(original.len(), 2);
    }

    #[rstest]
    fn test_conj_at_backing_end_appends() {
        let window = window_of(32, 30, 32).conj(32);
        assert_eq!(window.backing().len(), 33);
        assert_eq!(window.last(), Some(&32));
    }

    #[rstest]
    fn test_pop_and_empty() {
        let window = window_of(10, 3, 5);
        let popped = window.pop().unwrap().pop().unwrap();
        assert!(popped.is_empty());
        assert_eq!(popped.pop().unwrap_err(), VectorError::EmptyCollection);
        assert!(ReferenceCounter::ptr_eq(
            popped.backing().root(),
            window.backing().root()
        ));
    }

    #[rstest]
    fn test_assoc_within_and_at_end() {
        let window = window_of(10, 3, 6);
        let replaced = window.assoc(1, 0).unwrap();
        assert_eq!(replaced.iter().copied().collect::<Vec<_>>(), [3, 0, 5]);
        assert_eq!(replaced.assoc(3, 6).unwrap().len(), 4);
        assert_eq!(
            window.assoc(4, 0).unwrap_err(),
            VectorError::OutOfBounds {
                index: 4,
                length: 3,
            }
        );
    }

    #[rstest]
    fn test_equality_and_hash_across_types() {
        let vector: PersistentVector<usize> = (3..7).collect();
        let window = window_of(50, 3, 7);

        assert_eq!(window, vector);
        assert_eq!(vector, window);
        assert_eq!(hash_of(&window), hash_of(&vector));
        assert_ne!(window, window.pop().unwrap());
    }

    #[rstest]
    fn test_to_vector_releases_backing() {
        let window = window_of(100, 64, 70);
        let vector = window.to_vector();
        vector.check_invariants();
        assert_eq!(vector.len(), 6);
        assert_eq!(vector, window);

        let whole = window_of(5, 0, 5);
        let whole_root = ReferenceCounter::as_ptr(whole.backing().root());
        let vector = PersistentVector::from(whole);
        assert_eq!(ReferenceCounter::as_ptr(vector.root()), whole_root);
    }

    #[rstest]
    fn test_display() {
        assert_eq!(window_of(10, 2, 5).to_string(), "[2, 3, 4]");
        assert_eq!(format!("{:?}", window_of(10, 4, 4)), "[]");
    }
}
