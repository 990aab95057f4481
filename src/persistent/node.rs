//! Trie nodes backing the persistent vector.
//!
//! The trie is keyed by 5-bit slices of the element index, most significant
//! first: at height `shift` the child slot is `(index >> shift) & MASK`, and
//! at `shift == 0` the leaf slot is `index & MASK`. Both the read and write
//! paths use this scheme exclusively.
//!
//! Every function here comes in a persistent flavour (copy the path from the
//! root to the leaf, share everything else) and a transient flavour working on
//! `&mut ReferenceCounter<Node<T>>`, which edits nodes owned by the caller's
//! session in place and clones any other node exactly once.

use arrayvec::ArrayVec;

use super::ReferenceCounter;
use super::session::SessionId;

// =============================================================================
// Constants
// =============================================================================

/// Branching factor (2^5 = 32)
pub const BRANCHING_FACTOR: usize = 32;

/// Bits per level in the trie
pub const BITS_PER_LEVEL: usize = 5;

/// Bit mask for extracting index within a node
pub const MASK: usize = BRANCHING_FACTOR - 1;

/// Index of the first element held in the tail of a vector of `length`
/// elements. Everything below it lives in the trie.
#[inline]
pub const fn tail_offset(length: usize) -> usize {
    if length < BRANCHING_FACTOR {
        0
    } else {
        ((length - 1) >> BITS_PER_LEVEL) << BITS_PER_LEVEL
    }
}

/// Whether a trie of height `shift` is out of leaf slots once the full tail
/// of a `length`-element vector is flushed into it.
#[inline]
pub const fn root_overflows(length: usize, shift: usize) -> bool {
    (length >> BITS_PER_LEVEL) > (1 << shift)
}

/// Child references of an inner node.
pub type Children<T> = ArrayVec<ReferenceCounter<Node<T>>, BRANCHING_FACTOR>;

/// Elements of a leaf, or of a transient tail buffer.
pub type Chunk<T> = ArrayVec<T, BRANCHING_FACTOR>;

// =============================================================================
// Node Definition
// =============================================================================

/// Internal node structure for the bitmapped trie.
///
/// Inner nodes hold up to 32 children (fewer only along the rightmost spine);
/// leaves reachable from a vector's root always hold exactly 32 elements.
#[derive(Clone)]
pub enum Node<T> {
    /// Branch node containing child nodes
    Inner {
        session: SessionId,
        children: Children<T>,
    },
    /// Leaf node containing actual elements
    Leaf {
        session: SessionId,
        elements: Chunk<T>,
    },
}

impl<T> Node<T> {
    /// Creates an inner node with no children.
    pub const fn empty_inner(session: SessionId) -> Self {
        Self::Inner {
            session,
            children: ArrayVec::new_const(),
        }
    }

    pub const fn session(&self) -> SessionId {
        match self {
            Self::Inner { session, .. } | Self::Leaf { session, .. } => *session,
        }
    }

    pub const fn set_session(&mut self, tag: SessionId) {
        match self {
            Self::Inner { session, .. } | Self::Leaf { session, .. } => *session = tag,
        }
    }

    /// Returns the leaf holding `index`, descending from height `shift`.
    ///
    /// Returns an empty slice if the path does not exist, which only happens
    /// for an index outside the trie.
    pub fn chunk(&self, index: usize, shift: usize) -> &[T] {
        let mut node = self;
        let mut level = shift;

        loop {
            match node {
                Self::Inner { children, .. } if level > 0 => {
                    let Some(child) = children.get((index >> level) & MASK) else {
                        return &[];
                    };
                    node = child;
                    level -= BITS_PER_LEVEL;
                }
                Self::Leaf { elements, .. } => return elements,
                Self::Inner { .. } => return &[],
            }
        }
    }

    /// Returns the only child of an inner node with exactly one child.
    ///
    /// Used after removing a leaf to detect that the trie height can shrink.
    pub fn only_child(&self) -> Option<&ReferenceCounter<Self>> {
        match self {
            Self::Inner { children, .. } if children.len() == 1 => children.first(),
            _ => None,
        }
    }

    /// Wraps `node` in `shift / 5` single-child inner nodes.
    pub fn new_path(session: SessionId, shift: usize, node: Self) -> Self {
        if shift == 0 {
            node
        } else {
            let child = Self::new_path(session, shift - BITS_PER_LEVEL, node);
            let mut children = Children::new();
            children.push(ReferenceCounter::new(child));
            Self::Inner { session, children }
        }
    }

    /// Builds an inner node from exactly two children, used when the trie
    /// grows by one level.
    pub fn branch_of_two(session: SessionId, left: ReferenceCounter<Self>, right: Self) -> Self {
        let mut children = Children::new();
        children.push(left);
        children.push(ReferenceCounter::new(right));
        Self::Inner { session, children }
    }

    /// Number of leaves below this node. Only used to check invariants.
    #[cfg(test)]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Inner { children, .. } => children.iter().map(|child| child.leaf_count()).sum(),
            Self::Leaf { .. } => 1,
        }
    }
}

// =============================================================================
// Persistent Operations
// =============================================================================

impl<T: Clone> Node<T> {
    /// Replaces the element at `index`, copying every node from here down to
    /// the leaf and sharing all siblings.
    pub fn assoc(&self, index: usize, shift: usize, element: T) -> Self {
        match self {
            Self::Inner { children, .. } => {
                let subindex = (index >> shift) & MASK;
                let mut new_children = children.clone();
                if let Some(child) = children.get(subindex) {
                    let updated = child.assoc(index, shift - BITS_PER_LEVEL, element);
                    new_children[subindex] = ReferenceCounter::new(updated);
                }
                Self::Inner {
                    session: SessionId::FROZEN,
                    children: new_children,
                }
            }
            Self::Leaf { elements, .. } => {
                let mut new_elements = elements.clone();
                if let Some(slot) = new_elements.get_mut(index & MASK) {
                    *slot = element;
                }
                Self::Leaf {
                    session: SessionId::FROZEN,
                    elements: new_elements,
                }
            }
        }
    }

    /// Splices a full tail leaf in at the next free slot.
    ///
    /// `count` is the vector length before the append, so `count - 1` is the
    /// index of the last element held by `tail_node`.
    ///
    /// # Panics
    ///
    /// Panics if called on a leaf: tails are only ever spliced below inner
    /// nodes.
    pub fn push_tail(&self, count: usize, shift: usize, tail_node: Self) -> Self {
        let Self::Inner { children, .. } = self else {
            unreachable!("tail pushed into a leaf at height {shift}");
        };

        let subindex = ((count - 1) >> shift) & MASK;
        let mut new_children = children.clone();

        let child = if shift == BITS_PER_LEVEL {
            tail_node
        } else if let Some(existing) = children.get(subindex) {
            existing.push_tail(count, shift - BITS_PER_LEVEL, tail_node)
        } else {
            Self::new_path(SessionId::FROZEN, shift - BITS_PER_LEVEL, tail_node)
        };

        if subindex < new_children.len() {
            new_children[subindex] = ReferenceCounter::new(child);
        } else {
            debug_assert_eq!(subindex, new_children.len());
            new_children.push(ReferenceCounter::new(child));
        }

        Self::Inner {
            session: SessionId::FROZEN,
            children: new_children,
        }
    }

    /// Removes the rightmost leaf.
    ///
    /// `count` is the vector length before the removal. Returns `None` exactly
    /// when the sole remaining child at this level was removed, which tells
    /// the caller to drop this level as well.
    ///
    /// # Panics
    ///
    /// Panics if called on a leaf.
    pub fn pop_tail(&self, count: usize, shift: usize) -> Option<Self> {
        let Self::Inner { children, .. } = self else {
            unreachable!("tail popped from a leaf at height {shift}");
        };

        let subindex = ((count - 2) >> shift) & MASK;

        if shift > BITS_PER_LEVEL
            && let Some(new_child) = children
                .get(subindex)
                .and_then(|child| child.pop_tail(count, shift - BITS_PER_LEVEL))
        {
            let mut new_children = children.clone();
            new_children[subindex] = ReferenceCounter::new(new_child);
            return Some(Self::Inner {
                session: SessionId::FROZEN,
                children: new_children,
            });
        }

        debug_assert_eq!(subindex + 1, children.len());
        if subindex == 0 {
            None
        } else {
            let mut new_children = children.clone();
            new_children.pop();
            Some(Self::Inner {
                session: SessionId::FROZEN,
                children: new_children,
            })
        }
    }

    /// Retags `node` as frozen so it can serve as the root of a persistent
    /// vector. A shared node is cloned before retagging.
    pub fn freeze_root(node: &mut ReferenceCounter<Self>) {
        if !node.session().is_frozen() {
            ReferenceCounter::make_mut(node).set_session(SessionId::FROZEN);
        }
    }

    // =========================================================================
    // Transient Operations
    // =========================================================================

    /// Returns `node` ready for in-place editing by `session`.
    ///
    /// A node already tagged with `session` is edited directly; any other node
    /// is replaced by one shallow clone retagged to `session`. The clone never
    /// happens twice for the same node within a session.
    pub fn transient_version(node: &mut ReferenceCounter<Self>, session: SessionId) -> &mut Self {
        if node.session() != session {
            let mut copy = (**node).clone();
            copy.set_session(session);
            *node = ReferenceCounter::new(copy);
        }
        // Only copies when a node tagged to this session is unexpectedly shared.
        ReferenceCounter::make_mut(node)
    }

    /// In-place counterpart of [`assoc`](Self::assoc).
    pub fn transient_assoc(
        node: &mut ReferenceCounter<Self>,
        session: SessionId,
        index: usize,
        shift: usize,
        element: T,
    ) {
        match Self::transient_version(node, session) {
            Self::Inner { children, .. } => {
                if let Some(child) = children.get_mut((index >> shift) & MASK) {
                    Self::transient_assoc(child, session, index, shift - BITS_PER_LEVEL, element);
                }
            }
            Self::Leaf { elements, .. } => {
                if let Some(slot) = elements.get_mut(index & MASK) {
                    *slot = element;
                }
            }
        }
    }

    /// In-place counterpart of [`push_tail`](Self::push_tail).
    ///
    /// # Panics
    ///
    /// Panics if called on a leaf.
    pub fn transient_push_tail(
        node: &mut ReferenceCounter<Self>,
        session: SessionId,
        count: usize,
        shift: usize,
        tail_node: Self,
    ) {
        let Self::Inner { children, .. } = Self::transient_version(node, session) else {
            unreachable!("tail pushed into a leaf at height {shift}");
        };

        let subindex = ((count - 1) >> shift) & MASK;

        if shift == BITS_PER_LEVEL {
            debug_assert_eq!(subindex, children.len());
            children.push(ReferenceCounter::new(tail_node));
        } else if let Some(child) = children.get_mut(subindex) {
            Self::transient_push_tail(child, session, count, shift - BITS_PER_LEVEL, tail_node);
        } else {
            let path = Self::new_path(session, shift - BITS_PER_LEVEL, tail_node);
            children.push(ReferenceCounter::new(path));
        }
    }

    /// In-place counterpart of [`pop_tail`](Self::pop_tail).
    ///
    /// Returns `true` when this level lost its sole child; the caller must
    /// then drop the node.
    ///
    /// # Panics
    ///
    /// Panics if called on a leaf.
    pub fn transient_pop_tail(
        node: &mut ReferenceCounter<Self>,
        session: SessionId,
        count: usize,
        shift: usize,
    ) -> bool {
        let Self::Inner { children, .. } = Self::transient_version(node, session) else {
            unreachable!("tail popped from a leaf at height {shift}");
        };

        let subindex = ((count - 2) >> shift) & MASK;

        if shift > BITS_PER_LEVEL
            && let Some(child) = children.get_mut(subindex)
            && !Self::transient_pop_tail(child, session, count, shift - BITS_PER_LEVEL)
        {
            return false;
        }

        debug_assert_eq!(subindex + 1, children.len());
        if subindex == 0 {
            return true;
        }
        children.pop();
        false
    }
}

// =============================================================================
// Tests
// =============================================================================
