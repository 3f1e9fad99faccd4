#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Long-clause storage for the simplification engine.
//!
//! Binary and ternary clauses are inlined directly in the watch lists, so the
//! allocator only ever holds clauses of length four or more. Clause bodies
//! are owned here and referenced everywhere else by a stable [`ClauseRef`]
//! offset. Freed clauses become tombstones; offsets stay valid until an
//! explicit [`ClauseAllocator::consolidate`] between simplification phases.

use crate::sat::literal::{Literal, PackedLiteral};
use smallvec::SmallVec;
use std::ops::{Index, IndexMut};

/// Stable offset of a long clause inside the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClauseRef(u32);

impl ClauseRef {
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A clause of length >= 4, watched on its first two literals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LongClause<L: Literal = PackedLiteral> {
    pub literals: SmallVec<[L; 8]>,
    /// Number of distinct decision levels at learning time. Consumed by the
    /// external clause reducer, carried through here untouched.
    pub glue: u32,
    /// How often the clause participated in propagation since the last
    /// database sweep.
    pub used: u32,
    pub learnt: bool,
    deleted: bool,
}

impl<L: Literal> LongClause<L> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.literals.iter()
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        self.literals.swap(i, j);
    }
}

impl<L: Literal> Index<usize> for LongClause<L> {
    type Output = L;

    fn index(&self, index: usize) -> &Self::Output {
        &self.literals[index]
    }
}

impl<L: Literal> IndexMut<usize> for LongClause<L> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.literals[index]
    }
}

/// Arena of long clauses addressed by [`ClauseRef`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClauseAllocator<L: Literal = PackedLiteral> {
    clauses: Vec<LongClause<L>>,
    freed: usize,
}

impl<L: Literal> ClauseAllocator<L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clauses: Vec::new(),
            freed: 0,
        }
    }

    /// Acquires a new clause block.
    ///
    /// # Panics
    ///
    /// Long clauses have at least four literals.
    pub fn alloc(&mut self, literals: &[L], learnt: bool) -> ClauseRef {
        assert!(literals.len() >= 4, "long clause of length {}", literals.len());
        #[allow(clippy::cast_possible_truncation)]
        let offset = ClauseRef(self.clauses.len() as u32);
        self.clauses.push(LongClause {
            literals: SmallVec::from_slice(literals),
            glue: 0,
            used: 0,
            learnt,
            deleted: false,
        });
        offset
    }

    /// Frees a clause block. The slot becomes a tombstone; the offset must
    /// not be dereferenced afterwards.
    pub fn free(&mut self, offset: ClauseRef) {
        let clause = &mut self.clauses[offset.0 as usize];
        debug_assert!(!clause.deleted, "double free of clause {offset:?}");
        clause.deleted = true;
        clause.literals.clear();
        self.freed += 1;
    }

    /// Offsets of all live clauses.
    pub fn iter_refs(&self) -> impl Iterator<Item = ClauseRef> + '_ {
        self.clauses
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.deleted)
            .map(|(i, _)| {
                #[allow(clippy::cast_possible_truncation)]
                let offset = ClauseRef(i as u32);
                offset
            })
    }

    #[must_use]
    pub fn num_live(&self) -> usize {
        self.clauses.len() - self.freed
    }

    #[must_use]
    pub fn num_freed(&self) -> usize {
        self.freed
    }

    /// Compacts tombstones away. Every outstanding [`ClauseRef`] is
    /// invalidated; the caller must have detached all watch references
    /// beforehand and reattach from the returned state.
    pub fn consolidate(&mut self) {
        self.clauses.retain(|c| !c.deleted);
        self.freed = 0;
    }
}

impl<L: Literal> Index<ClauseRef> for ClauseAllocator<L> {
    type Output = LongClause<L>;

    fn index(&self, offset: ClauseRef) -> &Self::Output {
        let clause = &self.clauses[offset.0 as usize];
        debug_assert!(!clause.deleted, "access to freed clause {offset:?}");
        clause
    }
}

impl<L: Literal> IndexMut<ClauseRef> for ClauseAllocator<L> {
    fn index_mut(&mut self, offset: ClauseRef) -> &mut Self::Output {
        let clause = &mut self.clauses[offset.0 as usize];
        debug_assert!(!clause.deleted, "access to freed clause {offset:?}");
        clause
    }
}
