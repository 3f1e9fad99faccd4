#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Watch lists over binary, ternary and long clauses.
//!
//! Binary and ternary clauses exist only as watch entries: a binary `{a, b}`
//! has a [`Watched::Binary`] entry in the lists of both `a` and `b`, a
//! ternary `{a, b, c}` an entry in all three lists (partner literals stored
//! sorted), and a long clause sits in exactly the lists of its first two
//! literals. Every insertion or removal must be mirrored in the partner
//! lists; the `find_and_remove_*` helpers are total and panic when the
//! partner entry is missing, because a one-sided watch is a corrupted
//! database, not a recoverable condition.

use crate::sat::clause::ClauseRef;
use crate::sat::literal::{Literal, PackedLiteral};
use smallvec::SmallVec;
use std::ops::{Index, IndexMut};

/// One watch-list cell: a dense tagged sum, three machine words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watched<L: Literal = PackedLiteral> {
    Binary { other: L, learnt: bool },
    Ternary { a: L, b: L, learnt: bool },
    Long { offset: ClauseRef },
}

impl<L: Literal> Watched<L> {
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Binary { .. })
    }

    #[must_use]
    pub const fn is_ternary(&self) -> bool {
        matches!(self, Self::Ternary { .. })
    }

    #[must_use]
    pub const fn is_long(&self) -> bool {
        matches!(self, Self::Long { .. })
    }
}

pub type WatchList<L> = SmallVec<[Watched<L>; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchLists<L: Literal = PackedLiteral>(Vec<WatchList<L>>);

impl<L: Literal> WatchLists<L> {
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self(vec![SmallVec::new(); num_vars * 2])
    }

    pub fn grow_to(&mut self, num_vars: usize) {
        while self.0.len() < num_vars * 2 {
            self.0.push(SmallVec::new());
        }
    }

    #[must_use]
    pub fn num_lists(&self) -> usize {
        self.0.len()
    }

    /// Attaches the binary `{a, b}` to both partner lists.
    pub fn attach_bin(&mut self, a: L, b: L, learnt: bool) {
        debug_assert_ne!(a.variable(), b.variable());
        self[a].push(Watched::Binary { other: b, learnt });
        self[b].push(Watched::Binary { other: a, learnt });
    }

    /// Attaches the ternary `{a, b, c}` to all three lists, partner pairs
    /// stored sorted so duplicates compare equal.
    pub fn attach_tri(&mut self, a: L, b: L, c: L, learnt: bool) {
        debug_assert!(a.variable() != b.variable() && b.variable() != c.variable());
        self[a].push(Self::tri_entry(b, c, learnt));
        self[b].push(Self::tri_entry(a, c, learnt));
        self[c].push(Self::tri_entry(a, b, learnt));
    }

    fn tri_entry(x: L, y: L, learnt: bool) -> Watched<L> {
        if x.index() < y.index() {
            Watched::Ternary { a: x, b: y, learnt }
        } else {
            Watched::Ternary { a: y, b: x, learnt }
        }
    }

    /// Attaches a long clause to the lists of its first two literals.
    pub fn attach_long(&mut self, first: L, second: L, offset: ClauseRef) {
        self[first].push(Watched::Long { offset });
        self[second].push(Watched::Long { offset });
    }

    /// Removes the entry for binary `{of, other}` from `of`'s list.
    ///
    /// # Panics
    ///
    /// The entry must exist; a missing partner means the two-directional
    /// bookkeeping was broken earlier.
    pub fn find_and_remove_bin(&mut self, of: L, other: L, learnt: bool) {
        let list = &mut self[of];
        let pos = list
            .iter()
            .position(|w| matches!(w, Watched::Binary { other: o, learnt: l } if *o == other && *l == learnt))
            .unwrap_or_else(|| panic!("missing binary watch {of:?} -> {other:?}"));
        list.swap_remove(pos);
    }

    /// Removes the entry for ternary `{of, x, y}` from `of`'s list.
    ///
    /// # Panics
    ///
    /// The entry must exist.
    pub fn find_and_remove_tri(&mut self, of: L, x: L, y: L, learnt: bool) {
        let entry = Self::tri_entry(x, y, learnt);
        let list = &mut self[of];
        let pos = list
            .iter()
            .position(|w| *w == entry)
            .unwrap_or_else(|| panic!("missing ternary watch {of:?} -> {x:?} {y:?}"));
        list.swap_remove(pos);
    }

    /// Removes a long-clause entry from `of`'s list.
    ///
    /// # Panics
    ///
    /// The entry must exist.
    pub fn find_and_remove_long(&mut self, of: L, offset: ClauseRef) {
        let list = &mut self[of];
        let pos = list
            .iter()
            .position(|w| matches!(w, Watched::Long { offset: o } if *o == offset))
            .unwrap_or_else(|| panic!("missing long watch {of:?} -> {offset:?}"));
        list.swap_remove(pos);
    }

    /// Detaches a binary from both partner lists.
    pub fn detach_bin(&mut self, a: L, b: L, learnt: bool) {
        self.find_and_remove_bin(a, b, learnt);
        self.find_and_remove_bin(b, a, learnt);
    }

    /// Detaches a ternary from all three partner lists.
    pub fn detach_tri(&mut self, a: L, b: L, c: L, learnt: bool) {
        self.find_and_remove_tri(a, b, c, learnt);
        self.find_and_remove_tri(b, a, c, learnt);
        self.find_and_remove_tri(c, a, b, learnt);
    }

    /// Flips the learnt bit of the binary `{of, other}` in `of`'s list.
    ///
    /// # Panics
    ///
    /// The learnt entry must exist.
    pub fn promote_bin(&mut self, of: L, other: L) {
        let list = &mut self[of];
        let entry = list
            .iter_mut()
            .find(|w| matches!(w, Watched::Binary { other: o, learnt: true } if *o == other))
            .unwrap_or_else(|| panic!("missing learnt binary watch {of:?} -> {other:?}"));
        if let Watched::Binary { learnt, .. } = entry {
            *learnt = false;
        }
    }

    pub fn clear_all(&mut self) {
        for list in &mut self.0 {
            list.clear();
        }
    }

    pub fn take_list(&mut self, index: usize) -> WatchList<L> {
        std::mem::take(&mut self.0[index])
    }

    pub fn put_list(&mut self, index: usize, list: WatchList<L>) {
        debug_assert!(self.0[index].is_empty());
        self.0[index] = list;
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &WatchList<L>)> {
        self.0.iter().enumerate()
    }
}

impl<L: Literal> Index<usize> for WatchLists<L> {
    type Output = WatchList<L>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<L: Literal> IndexMut<usize> for WatchLists<L> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<L: Literal> Index<L> for WatchLists<L> {
    type Output = WatchList<L>;

    fn index(&self, index: L) -> &Self::Output {
        &self.0[index.index()]
    }
}

impl<L: Literal> IndexMut<L> for WatchLists<L> {
    fn index_mut(&mut self, index: L) -> &mut Self::Output {
        &mut self.0[index.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::literal::PackedLiteral;

    fn lit(value: i32) -> PackedLiteral {
        PackedLiteral::from_i32(value)
    }

    #[test]
    fn test_attach_bin_mirrors() {
        let mut watches: WatchLists<PackedLiteral> = WatchLists::new(4);
        watches.attach_bin(lit(1), lit(-2), false);

        assert_eq!(watches[lit(1)].len(), 1);
        assert_eq!(watches[lit(-2)].len(), 1);
        assert_eq!(watches[lit(2)].len(), 0);
        assert!(matches!(
            watches[lit(1)][0],
            Watched::Binary { other, learnt: false } if other == lit(-2)
        ));
    }

    #[test]
    fn test_attach_tri_sorted_partners() {
        let mut watches: WatchLists<PackedLiteral> = WatchLists::new(5);
        watches.attach_tri(lit(3), lit(1), lit(-2), true);

        // Partner pairs are sorted by index regardless of attach order.
        let Watched::Ternary { a, b, learnt } = watches[lit(3)][0] else {
            panic!("expected ternary entry");
        };
        assert!(a.index() < b.index());
        assert!(learnt);
        assert_eq!(watches[lit(1)].len(), 1);
        assert_eq!(watches[lit(-2)].len(), 1);
    }

    #[test]
    fn test_detach_bin_removes_both_sides() {
        let mut watches: WatchLists<PackedLiteral> = WatchLists::new(4);
        watches.attach_bin(lit(1), lit(2), false);
        watches.attach_bin(lit(1), lit(3), true);
        watches.detach_bin(lit(1), lit(2), false);

        assert_eq!(watches[lit(1)].len(), 1);
        assert_eq!(watches[lit(2)].len(), 0);
        assert_eq!(watches[lit(3)].len(), 1);
    }

    #[test]
    #[should_panic(expected = "missing binary watch")]
    fn test_find_and_remove_bin_is_total() {
        let mut watches: WatchLists<PackedLiteral> = WatchLists::new(4);
        watches.find_and_remove_bin(lit(1), lit(2), false);
    }

    #[test]
    fn test_promote_bin() {
        let mut watches: WatchLists<PackedLiteral> = WatchLists::new(4);
        watches.attach_bin(lit(1), lit(2), true);
        watches.promote_bin(lit(1), lit(2));
        watches.promote_bin(lit(2), lit(1));

        assert!(matches!(
            watches[lit(1)][0],
            Watched::Binary { learnt: false, .. }
        ));
        assert!(matches!(
            watches[lit(2)][0],
            Watched::Binary { learnt: false, .. }
        ));
    }
}
