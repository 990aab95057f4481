//! Chunked sequential iteration.
//!
//! Walking a trie element by element would cost one root-to-leaf descent per
//! element. [`ChunkedIter`] instead caches the 32-element chunk containing the
//! current position and only asks its [`ChunkSource`] for a new chunk once
//! the cached one is exhausted, so a full traversal is O(N).

use std::fmt;
use std::iter::FusedIterator;

/// A value that can hand out the contiguous chunk of elements around an index.
///
/// Implemented by [`PersistentVector`](super::PersistentVector) and
/// [`TransientVector`](super::TransientVector); [`SubVector`](super::SubVector)
/// traverses through its backing vector.
pub trait ChunkSource {
    /// The element type stored in the chunks.
    type Element;

    /// Returns the chunk holding `index` together with the offset of `index`
    /// inside that chunk.
    ///
    /// Callers only ask for indices inside the source's valid range.
    fn chunk_at(&self, index: usize) -> (&[Self::Element], usize);
}

/// An iterator over references to elements of a [`ChunkSource`].
///
/// The iterator is lazy, finite and cannot be restarted. Cloning it produces
/// an independent cursor: advancing the clone never affects the original.
///
/// # Examples
///
/// ```rust
/// use trie_vector::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..100).collect();
/// let mut iterator = vector.iter();
/// iterator.next();
///
/// let snapshot = iterator.clone();
/// assert_eq!(iterator.count(), 99);
/// assert_eq!(snapshot.copied().next(), Some(1));
/// ```
pub struct ChunkedIter<'a, S: ChunkSource + ?Sized> {
    /// Source consulted whenever the cached chunk runs out
    source: &'a S,
    /// Absolute index of the next element to yield
    position: usize,
    /// Absolute index one past the last element to yield
    end: usize,
    /// Currently cached chunk
    chunk: &'a [S::Element],
    /// Offset of `position` within `chunk`
    offset: usize,
}

impl<'a, S: ChunkSource + ?Sized> ChunkedIter<'a, S> {
    /// Creates an iterator over the absolute index range `[start, end)` of
    /// `source`.
    pub(crate) fn new(source: &'a S, start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        let (chunk, offset) = if start < end {
            source.chunk_at(start)
        } else {
            (&[][..], 0)
        };
        Self {
            source,
            position: start,
            end,
            chunk,
            offset,
        }
    }
}

impl<S: ChunkSource + ?Sized> Clone for ChunkedIter<'_, S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            position: self.position,
            end: self.end,
            chunk: self.chunk,
            offset: self.offset,
        }
    }
}

impl<'a, S: ChunkSource + ?Sized> Iterator for ChunkedIter<'a, S> {
    type Item = &'a S::Element;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.end {
            return None;
        }

        if self.offset >= self.chunk.len() {
            let (chunk, offset) = self.source.chunk_at(self.position);
            self.chunk = chunk;
            self.offset = offset;
        }

        let element = self.chunk.get(self.offset)?;
        self.position += 1;
        self.offset += 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl<S: ChunkSource + ?Sized> ExactSizeIterator for ChunkedIter<'_, S> {
    fn len(&self) -> usize {
        self.end.saturating_sub(self.position)
    }
}

impl<S: ChunkSource + ?Sized> FusedIterator for ChunkedIter<'_, S> {}

impl<S: ChunkSource + ?Sized> fmt::Debug for ChunkedIter<'_, S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ChunkedIter")
            .field("position", &self.position)
            .field("end", &self.end)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;

    /// Fixed-size chunks over a flat list, counting every lookup.
    struct Chunks {
        chunks: Vec<Vec<u64>>,
        size: usize,
        lookups: Cell<usize>,
    }

    impl Chunks {
        fn fibonacci(count: usize, size: usize) -> Self {
            let mut flat = vec![0_u64, 1];
            while flat.len() < count {
                let next = flat[flat.len() - 1] + flat[flat.len() - 2];
                flat.push(next);
            }
            flat.truncate(count);
            Self {
                chunks: flat.chunks(size).map(<[u64]>::to_vec).collect(),
                size,
                lookups: Cell::new(0),
            }
        }

        fn flatten(&self) -> Vec<u64> {
            self.chunks.iter().flatten().copied().collect()
        }
    }

    impl ChunkSource for Chunks {
        type Element = u64;

        fn chunk_at(&self, index: usize) -> (&[u64], usize) {
            self.lookups.set(self.lookups.get() + 1);
            (&self.chunks[index / self.size], index % self.size)
        }
    }

    #[rstest]
    fn test_yields_all_chunks_in_order() {
        // 32 elements in chunks of 5: 5, 5, 5, 5, 5, 5, 2
        let source = Chunks::fibonacci(32, 5);
        let collected: Vec<u64> = ChunkedIter::new(&source, 0, 32).copied().collect();

        assert_eq!(collected, source.flatten());
        assert_eq!(collected[31], 1_346_269);
    }

    #[rstest]
    fn test_one_lookup_per_chunk() {
        let source = Chunks::fibonacci(32, 5);
        assert_eq!(ChunkedIter::new(&source, 0, 32).count(), 32);
        assert_eq!(source.lookups.get(), 7);
    }

    #[rstest]
    #[case(3, 17)]
    #[case(5, 10)]
    #[case(0, 1)]
    #[case(31, 32)]
    fn test_partial_range(#[case] start: usize, #[case] end: usize) {
        let source = Chunks::fibonacci(32, 5);
        let collected: Vec<u64> = ChunkedIter::new(&source, start, end).copied().collect();
        assert_eq!(collected, source.flatten()[start..end]);
    }

    #[rstest]
    fn test_empty_range_never_looks_up() {
        let source = Chunks::fibonacci(32, 5);
        let mut iterator = ChunkedIter::new(&source, 4, 4);
        assert_eq!(iterator.len(), 0);
        assert_eq!(iterator.next(), None);
        assert_eq!(source.lookups.get(), 0);
    }

    #[rstest]
    fn test_clones_advance_independently() {
        let source = Chunks::fibonacci(32, 5);
        let mut first = ChunkedIter::new(&source, 0, 32);
        first.nth(6);

        let mut second = first.clone();
        assert_eq!(second.next(), Some(&13));
        assert_eq!(second.next(), Some(&21));
        assert_eq!(first.next(), Some(&13));
        assert_eq!(first.len(), 24);
        assert_eq!(second.len(), 23);
    }

    #[rstest]
    fn test_fused_after_end() {
        let source = Chunks::fibonacci(8, 5);
        let mut iterator = ChunkedIter::new(&source, 0, 8);
        assert_eq!(iterator.by_ref().count(), 8);
        assert_eq!(iterator.next(), None);
        assert_eq!(iterator.next(), None);
    }
}
