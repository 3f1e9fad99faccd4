#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Equivalent-literal registry: a union-find over literals carrying a parity
//! bit along each edge.
//!
//! Every variable maps to a representative literal `rep(v) = sign * root`.
//! Representatives are fixed points (`rep(root(v)) == root(v)`), and the
//! whole class is re-pointed on union, so lookup is a single table read.
//! When two roots are united the one with the smaller variable index wins,
//! which keeps the choice stable across runs.
//!
//! The registry itself only records equivalences; substituting
//! representatives into the clause database is the solver's
//! `perform_replace`, which drains the pending counter kept here.

use crate::sat::assignment::ElimState;
use crate::sat::literal::{Literal, Variable};
use crate::sat::trail::Trail;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct VarReplacer<L: Literal> {
    /// `table[v]` is the representative literal of `v`.
    table: Vec<L>,
    /// Members (excluding the root itself) of each non-trivial class.
    classes: FxHashMap<Variable, Vec<Variable>>,
    /// Units implied by an equivalence whose partner already had a root
    /// value; applied by `perform_replace`.
    pending_units: Vec<L>,
    /// Equivalences recorded since the last `perform_replace`.
    new_pending: usize,
    /// Total variables ever replaced.
    pub replaced_vars: u64,
}

impl<L: Literal> VarReplacer<L> {
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self {
            table: Self::identity(num_vars),
            classes: FxHashMap::default(),
            pending_units: Vec::new(),
            new_pending: 0,
            replaced_vars: 0,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn identity(num_vars: usize) -> Vec<L> {
        (0..num_vars).map(|v| L::new(v as Variable, true)).collect()
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn grow_to(&mut self, num_vars: usize) {
        while self.table.len() < num_vars {
            let v = self.table.len() as Variable;
            self.table.push(L::new(v, true));
        }
    }

    /// Representative of a variable.
    #[must_use]
    pub fn rep_of(&self, var: Variable) -> L {
        self.table[var as usize]
    }

    /// Representative of a literal, parity composed through the table.
    #[must_use]
    pub fn rep_lit(&self, lit: L) -> L {
        let rep = self.table[lit.variable() as usize];
        if lit.polarity() {
            rep
        } else {
            rep.negated()
        }
    }

    #[must_use]
    pub fn is_replaced(&self, var: Variable) -> bool {
        self.table[var as usize].variable() != var
    }

    /// Count of equivalences recorded since the last flush. The prober reads
    /// deltas of this to attribute discoveries to its sub-passes.
    #[must_use]
    pub fn num_new_pending(&self) -> usize {
        self.new_pending
    }

    pub fn clear_new_pending(&mut self) {
        self.new_pending = 0;
    }

    pub fn drain_pending_units(&mut self) -> Vec<L> {
        std::mem::take(&mut self.pending_units)
    }

    #[must_use]
    pub fn has_work(&self) -> bool {
        self.new_pending > 0 || !self.pending_units.is_empty()
    }

    /// Variables that currently map to another variable's literal.
    pub fn replaced_iter(&self) -> impl Iterator<Item = Variable> + '_ {
        self.classes.values().flatten().copied()
    }

    /// Records the equivalence `x ⊕ y = invert`.
    ///
    /// Self-equivalences collapse to a no-op when the parity agrees and
    /// latch unsatisfiability when it does not. If one side already has a
    /// root-level value the implied unit of the other side is queued instead
    /// of unioning. Returns `false` only when the equivalence contradicts an
    /// existing unit or itself; the caller latches its `ok` flag on that.
    #[must_use]
    pub fn replace(
        &mut self,
        x: Variable,
        y: Variable,
        invert: bool,
        trail: &mut Trail<L>,
    ) -> bool {
        let la = self.table[x as usize];
        let lb = self.table[y as usize];
        // x = var(la) ^ !pol(la), y likewise, so the root relation is:
        let parity = invert ^ !la.polarity() ^ !lb.polarity();
        let (va, vb) = (la.variable(), lb.variable());

        if va == vb {
            // x ⊕ x = 1 has no model.
            return !parity;
        }

        match (trail.root_value(va), trail.root_value(vb)) {
            (Some(a), Some(b)) => a ^ b == parity,
            (Some(a), None) => {
                self.pending_units.push(L::new(vb, a ^ parity));
                true
            }
            (None, Some(b)) => {
                self.pending_units.push(L::new(va, b ^ parity));
                true
            }
            (None, None) => {
                self.union(va, vb, parity, trail);
                true
            }
        }
    }

    /// Unites the classes of two root variables; the smaller index wins.
    fn union(&mut self, va: Variable, vb: Variable, parity: bool, trail: &mut Trail<L>) {
        let (root, loser) = if va < vb { (va, vb) } else { (vb, va) };
        // loser = root ^ parity
        self.table[loser as usize] = L::new(root, !parity);

        let members = self.classes.remove(&loser).unwrap_or_default();
        let root_class = self.classes.entry(root).or_default();
        for member in members {
            let old = self.table[member as usize];
            debug_assert_eq!(old.variable(), loser);
            self.table[member as usize] = L::new(root, old.polarity() ^ parity);
            root_class.push(member);
        }
        root_class.push(loser);

        trail.set_elim(loser, ElimState::QueuedForReplace);
        self.new_pending += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::assignment::Reason;
    use crate::sat::literal::PackedLiteral;

    type TestReplacer = VarReplacer<PackedLiteral>;

    fn lit(value: i32) -> PackedLiteral {
        PackedLiteral::from_i32(value)
    }

    #[test]
    fn test_union_smaller_var_wins() {
        let mut trail: Trail<PackedLiteral> = Trail::new(6);
        let mut replacer = TestReplacer::new(6);

        assert!(replacer.replace(3, 2, false, &mut trail));
        assert_eq!(replacer.rep_of(3), lit(2));
        assert_eq!(replacer.rep_of(2), lit(2));
        assert_eq!(trail.elim(3), ElimState::QueuedForReplace);
        assert_eq!(replacer.num_new_pending(), 1);
    }

    #[test]
    fn test_parity_composes_through_chains() {
        let mut trail: Trail<PackedLiteral> = Trail::new(8);
        let mut replacer = TestReplacer::new(8);

        // 2 = ¬3, 3 = 4  =>  2 = ¬4, and all roots are var 2.
        assert!(replacer.replace(2, 3, true, &mut trail));
        assert!(replacer.replace(3, 4, false, &mut trail));

        assert_eq!(replacer.rep_of(3), lit(-2));
        assert_eq!(replacer.rep_of(4), lit(-2));
        assert_eq!(replacer.rep_lit(lit(-4)), lit(2));

        // Representatives are fixed points.
        for v in 0..8 {
            let rep = replacer.rep_of(v);
            assert_eq!(replacer.rep_of(rep.variable()).variable(), rep.variable());
        }
    }

    #[test]
    fn test_self_equivalence_collapses_or_fails() {
        let mut trail: Trail<PackedLiteral> = Trail::new(4);
        let mut replacer = TestReplacer::new(4);

        assert!(replacer.replace(1, 2, false, &mut trail));
        // 1 = 2 again: consistent, no-op.
        assert!(replacer.replace(1, 2, false, &mut trail));
        assert_eq!(replacer.num_new_pending(), 1);
        // 1 = ¬2 now contradicts.
        assert!(!replacer.replace(1, 2, true, &mut trail));
    }

    #[test]
    fn test_assigned_side_queues_unit() {
        let mut trail: Trail<PackedLiteral> = Trail::new(4);
        let mut replacer = TestReplacer::new(4);
        trail.unchecked_enqueue(lit(1), Reason::Decision);

        // 1 = ¬2 with 1 true queues the unit ¬2.
        assert!(replacer.replace(1, 2, true, &mut trail));
        assert_eq!(replacer.drain_pending_units(), vec![lit(-2)]);
        assert!(!replacer.is_replaced(2));

        // A clash with the existing unit fails.
        trail.unchecked_enqueue(lit(2), Reason::Decision);
        assert!(!replacer.replace(1, 2, true, &mut trail));
    }
}
