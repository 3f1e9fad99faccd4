#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Unit propagation over the watch lists.
//!
//! Three entry points, all running over the same trail and sharing one
//! propagation counter (the currency every budgeted pass is measured in):
//!
//! - [`Propagator::propagate`]: full propagation over binary, ternary and
//!   long clauses, to fixpoint. Returns the conflicting clause as a value;
//!   a conflict is never fatal to the propagator itself.
//! - [`Propagator::propagate_bin`]: restricted to binary clauses. Used by
//!   the prober where only shortest-chain implications matter.
//! - [`Propagator::propagate_bin_one_level`]: a single BFS step from the
//!   current decision literal, for useless-binary detection.
//!
//! At entry the trail must be consistent with the watch lists. On a clean
//! exit every clause is satisfied or has two unassigned literals; on
//! conflict exactly one clause has all literals false and is returned.

use crate::sat::assignment::Reason;
use crate::sat::clause::{ClauseAllocator, ClauseRef};
use crate::sat::literal::Literal;
use crate::sat::trail::Trail;
use crate::sat::watch::{Watched, WatchLists};

/// The clause found falsified, by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict<L: Literal> {
    Binary(L, L),
    Ternary(L, L, L),
    Long(ClauseRef),
}

#[derive(Debug, Clone, Default)]
pub struct Propagator {
    /// Total propagation steps performed, shared across all entry points.
    pub propagations: u64,
}

impl Propagator {
    #[must_use]
    pub fn new() -> Self {
        Self { propagations: 0 }
    }

    /// Full propagation to fixpoint.
    pub fn propagate<L: Literal>(
        &mut self,
        trail: &mut Trail<L>,
        watches: &mut WatchLists<L>,
        db: &mut ClauseAllocator<L>,
    ) -> Option<Conflict<L>> {
        while trail.head < trail.len() {
            let p = trail.lit_at(trail.head);
            trail.head += 1;
            self.propagations += 1;

            let false_lit = p.negated();
            let index = false_lit.index();
            let mut list = watches.take_list(index);

            let mut conflict = None;
            let mut kept = 0;
            let mut i = 0;
            while i < list.len() {
                let entry = list[i];
                i += 1;
                match entry {
                    Watched::Binary { other, .. } => {
                        list[kept] = entry;
                        kept += 1;
                        match trail.value_lit(other) {
                            Some(true) => {}
                            None => trail.unchecked_enqueue(other, Reason::Binary(false_lit)),
                            Some(false) => {
                                conflict = Some(Conflict::Binary(false_lit, other));
                            }
                        }
                    }
                    Watched::Ternary { a, b, .. } => {
                        list[kept] = entry;
                        kept += 1;
                        let va = trail.value_lit(a);
                        let vb = trail.value_lit(b);
                        if va == Some(true) || vb == Some(true) {
                            continue;
                        }
                        match (va, vb) {
                            (None, Some(false)) => {
                                trail.unchecked_enqueue(a, Reason::Ternary(false_lit, b));
                            }
                            (Some(false), None) => {
                                trail.unchecked_enqueue(b, Reason::Ternary(false_lit, a));
                            }
                            (Some(false), Some(false)) => {
                                conflict = Some(Conflict::Ternary(false_lit, a, b));
                            }
                            _ => {}
                        }
                    }
                    Watched::Long { offset } => {
                        let clause = &mut db[offset];
                        if clause[0] == false_lit {
                            clause.swap(0, 1);
                        }
                        debug_assert_eq!(clause[1], false_lit);
                        let first = clause[0];
                        if trail.value_lit(first) == Some(true) {
                            list[kept] = entry;
                            kept += 1;
                            continue;
                        }
                        let replacement = (2..clause.len())
                            .find(|&k| trail.value_lit(clause[k]) != Some(false));
                        if let Some(k) = replacement {
                            clause.swap(1, k);
                            let new_watch = clause[1];
                            // Entry migrates to the replacement literal's
                            // list; nothing is kept here.
                            watches[new_watch].push(Watched::Long { offset });
                        } else {
                            list[kept] = entry;
                            kept += 1;
                            match trail.value_lit(first) {
                                None => {
                                    db[offset].used = db[offset].used.wrapping_add(1);
                                    trail.unchecked_enqueue(first, Reason::Long(offset));
                                }
                                Some(false) => conflict = Some(Conflict::Long(offset)),
                                Some(true) => unreachable!(),
                            }
                        }
                    }
                }
                if conflict.is_some() {
                    // Keep the unprocessed tail of the list intact.
                    while i < list.len() {
                        list[kept] = list[i];
                        kept += 1;
                        i += 1;
                    }
                    break;
                }
            }
            list.truncate(kept);
            watches.put_list(index, list);

            if conflict.is_some() {
                trail.head = trail.len();
                return conflict;
            }
        }
        None
    }

    /// Propagation restricted to binary clauses, to fixpoint over the
    /// binary implication graph.
    pub fn propagate_bin<L: Literal>(
        &mut self,
        trail: &mut Trail<L>,
        watches: &WatchLists<L>,
    ) -> Option<Conflict<L>> {
        while trail.head < trail.len() {
            let p = trail.lit_at(trail.head);
            trail.head += 1;
            self.propagations += 1;

            let false_lit = p.negated();
            let list = &watches[false_lit];
            for k in 0..list.len() {
                if let Watched::Binary { other, .. } = list[k] {
                    match trail.value_lit(other) {
                        Some(true) => {}
                        None => trail.unchecked_enqueue(other, Reason::Binary(false_lit)),
                        Some(false) => {
                            trail.head = trail.len();
                            return Some(Conflict::Binary(false_lit, other));
                        }
                    }
                }
            }
        }
        None
    }

    /// One BFS step: the binary implications of the literal that opened the
    /// current decision level, and nothing further.
    pub fn propagate_bin_one_level<L: Literal>(
        &mut self,
        trail: &mut Trail<L>,
        watches: &WatchLists<L>,
    ) -> Option<Conflict<L>> {
        debug_assert!(trail.decision_level() > 0);
        let limit = trail.level_limit(trail.decision_level() - 1);
        debug_assert!(limit < trail.len());
        let p = trail.lit_at(limit);
        self.propagations += 1;

        let false_lit = p.negated();
        let list = &watches[false_lit];
        for k in 0..list.len() {
            if let Watched::Binary { other, .. } = list[k] {
                match trail.value_lit(other) {
                    Some(true) => {}
                    None => trail.unchecked_enqueue(other, Reason::Binary(false_lit)),
                    Some(false) => {
                        trail.head = trail.len();
                        return Some(Conflict::Binary(false_lit, other));
                    }
                }
            }
        }
        trail.head = trail.len();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::literal::PackedLiteral;

    type TestTrail = Trail<PackedLiteral>;
    type TestWatches = WatchLists<PackedLiteral>;
    type TestDb = ClauseAllocator<PackedLiteral>;

    fn lit(value: i32) -> PackedLiteral {
        PackedLiteral::from_i32(value)
    }

    fn setup(num_vars: usize) -> (TestTrail, TestWatches, TestDb, Propagator) {
        (
            Trail::new(num_vars),
            WatchLists::new(num_vars),
            ClauseAllocator::new(),
            Propagator::new(),
        )
    }

    #[test]
    fn test_binary_chain_propagates() {
        let (mut trail, mut watches, mut db, mut prop) = setup(5);
        watches.attach_bin(lit(-1), lit(2), false);
        watches.attach_bin(lit(-2), lit(3), false);

        trail.new_decision_level();
        trail.unchecked_enqueue(lit(1), Reason::Decision);
        let conflict = prop.propagate(&mut trail, &mut watches, &mut db);

        assert!(conflict.is_none());
        assert_eq!(trail.len(), 3);
        assert_eq!(trail.value_lit(lit(2)), Some(true));
        assert_eq!(trail.value_lit(lit(3)), Some(true));
        assert_eq!(trail.reason(2), Reason::Binary(lit(-1)));
    }

    #[test]
    fn test_binary_conflict_is_a_value() {
        let (mut trail, mut watches, mut db, mut prop) = setup(4);
        watches.attach_bin(lit(-1), lit(2), false);
        watches.attach_bin(lit(-1), lit(-2), false);

        trail.new_decision_level();
        trail.unchecked_enqueue(lit(1), Reason::Decision);
        let conflict = prop.propagate(&mut trail, &mut watches, &mut db);

        assert!(matches!(conflict, Some(Conflict::Binary(_, _))));
    }

    #[test]
    fn test_ternary_propagates_when_two_false() {
        let (mut trail, mut watches, mut db, mut prop) = setup(5);
        watches.attach_tri(lit(1), lit(2), lit(3), false);

        trail.new_decision_level();
        trail.unchecked_enqueue(lit(-1), Reason::Decision);
        trail.unchecked_enqueue(lit(-2), Reason::Decision);
        let conflict = prop.propagate(&mut trail, &mut watches, &mut db);

        assert!(conflict.is_none());
        assert_eq!(trail.value_lit(lit(3)), Some(true));
    }

    #[test]
    fn test_long_clause_watch_migration() {
        let (mut trail, mut watches, mut db, mut prop) = setup(6);
        let c = db.alloc(
            &[lit(1), lit(2), lit(3), lit(4)],
            false,
        );
        watches.attach_long(lit(1), lit(2), c);

        trail.new_decision_level();
        trail.unchecked_enqueue(lit(-2), Reason::Decision);
        let conflict = prop.propagate(&mut trail, &mut watches, &mut db);
        assert!(conflict.is_none());
        assert_eq!(trail.len(), 1);

        // The watch moved off the falsified literal.
        assert!(watches[lit(-2).negated()].is_empty());
        let watched: Vec<bool> = [lit(1), lit(3), lit(4)]
            .iter()
            .map(|&l| watches[l].iter().any(Watched::is_long))
            .collect();
        assert_eq!(watched.iter().filter(|&&w| w).count(), 2);
    }

    #[test]
    fn test_long_clause_unit_and_conflict() {
        let (mut trail, mut watches, mut db, mut prop) = setup(6);
        let c = db.alloc(&[lit(1), lit(2), lit(3), lit(4)], false);
        watches.attach_long(lit(1), lit(2), c);

        trail.new_decision_level();
        trail.unchecked_enqueue(lit(-2), Reason::Decision);
        trail.unchecked_enqueue(lit(-3), Reason::Decision);
        trail.unchecked_enqueue(lit(-4), Reason::Decision);
        let conflict = prop.propagate(&mut trail, &mut watches, &mut db);
        assert!(conflict.is_none());
        assert_eq!(trail.value_lit(lit(1)), Some(true));
        assert_eq!(trail.reason(1), Reason::Long(c));

        trail.cancel_until(0);
        trail.new_decision_level();
        for v in [-1, -2, -3, -4] {
            trail.unchecked_enqueue(lit(v), Reason::Decision);
        }
        let conflict = prop.propagate(&mut trail, &mut watches, &mut db);
        assert_eq!(conflict, Some(Conflict::Long(c)));
    }

    #[test]
    fn test_propagate_bin_ignores_longer_clauses() {
        let (mut trail, mut watches, mut db, mut prop) = setup(6);
        watches.attach_bin(lit(-1), lit(2), false);
        watches.attach_tri(lit(-1), lit(-2), lit(5), false);
        let c = db.alloc(&[lit(-1), lit(-2), lit(3), lit(4)], false);
        watches.attach_long(lit(-1), lit(-2), c);

        trail.new_decision_level();
        trail.unchecked_enqueue(lit(1), Reason::Decision);
        let conflict = prop.propagate_bin(&mut trail, &watches);

        assert!(conflict.is_none());
        assert_eq!(trail.len(), 2);
        assert_eq!(trail.value_lit(lit(2)), Some(true));
        // Ternary and long clauses did not fire.
        assert_eq!(trail.value_lit(lit(5)), None);
    }

    #[test]
    fn test_propagate_bin_one_level_is_one_hop() {
        let (mut trail, mut watches, _db, mut prop) = setup(6);
        watches.attach_bin(lit(-1), lit(2), false);
        watches.attach_bin(lit(-1), lit(3), false);
        watches.attach_bin(lit(-2), lit(4), false);

        trail.new_decision_level();
        trail.unchecked_enqueue(lit(1), Reason::Decision);
        let conflict = prop.propagate_bin_one_level(&mut trail, &watches);

        assert!(conflict.is_none());
        assert_eq!(trail.len(), 3);
        assert_eq!(trail.value_lit(lit(2)), Some(true));
        assert_eq!(trail.value_lit(lit(3)), Some(true));
        // 4 is two hops away and must not appear.
        assert_eq!(trail.value_lit(lit(4)), None);
    }
}
