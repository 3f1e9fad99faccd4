#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Implicit-clause subsumption and strengthening over the watch lists.
//!
//! Binary and ternary clauses live only as watch entries, so keeping them
//! canonical is a watch-list cleanup: per literal, sort the list so
//! identical shapes are adjacent (binaries first, then ternaries, then long
//! entries; non-learnt before learnt within a shape), collapse duplicates,
//! drop ternaries subsumed by a binary, then strengthen. A binary pair
//! `{l, x}`, `{l, ¬x}` forces `l`; a ternary `{l, a, b}` next to a binary
//! `{¬l, a}` degenerates to the binary `{a, b}`.
//!
//! Removals mirror into partner lists immediately; forced literals and
//! replacement binaries are applied in a delayed pass (enqueues, then
//! propagation, then clause additions) so the per-literal scan never sees a
//! half-updated database.

use crate::sat::literal::Literal;
use crate::sat::solver::Solver;
use crate::sat::watch::{WatchList, Watched};
use log::debug;
use std::cmp::Ordering;
use std::time::Instant;

/// Total order grouping identical binaries and ternaries together:
/// binaries, then ternaries, then long entries; within a shape by partner
/// literals, non-learnt before learnt.
fn watch_order<L: Literal>(x: &Watched<L>, y: &Watched<L>) -> Ordering {
    fn rank<L: Literal>(w: &Watched<L>) -> u8 {
        match w {
            Watched::Binary { .. } => 0,
            Watched::Ternary { .. } => 1,
            Watched::Long { .. } => 2,
        }
    }
    match (x, y) {
        (
            Watched::Binary { other: o1, learnt: l1 },
            Watched::Binary { other: o2, learnt: l2 },
        ) => o1.index().cmp(&o2.index()).then(l1.cmp(l2)),
        (
            Watched::Ternary { a: a1, b: b1, learnt: l1 },
            Watched::Ternary { a: a2, b: b2, learnt: l2 },
        ) => a1
            .index()
            .cmp(&a2.index())
            .then(b1.index().cmp(&b2.index()))
            .then(l1.cmp(l2)),
        (Watched::Long { offset: o1 }, Watched::Long { offset: o2 }) => o1.cmp(o2),
        _ => rank(x).cmp(&rank(y)),
    }
}

impl<L: Literal> Solver<L> {
    /// One subsumption-and-strengthening sweep over every watch list.
    /// Returns the `ok` flag.
    #[allow(clippy::too_many_lines)]
    pub fn subsume_and_strengthen_implicit(&mut self) -> bool {
        if !self.ok {
            return false;
        }
        debug_assert_eq!(self.trail.decision_level(), 0);
        let start = Instant::now();

        let mut rem_bins = 0u64;
        let mut rem_tris = 0u64;
        let mut forced_lits = 0u64;
        let mut strengthened_tris = 0u64;

        let mut to_enqueue: Vec<L> = Vec::new();
        let mut bins_to_add: Vec<(L, L, bool)> = Vec::new();

        for index in 0..self.watches.num_lists() {
            let lit = L::from_index(index);
            if self.watches[index].len() < 2 {
                continue;
            }

            let mut list = self.watches.take_list(index);
            list.sort_by(watch_order);

            // Subsumption: duplicates collapse, binaries eat ternaries.
            let mut kept: WatchList<L> = smallvec::SmallVec::new();
            // Partners of kept binaries, sorted because the list is.
            let mut bin_partners: Vec<L> = Vec::new();
            let mut last_tri: Option<(L, L)> = None;
            for entry in list.drain(..) {
                match entry {
                    Watched::Binary { other, learnt } => {
                        if bin_partners.last() == Some(&other) {
                            // The sort puts the non-learnt instance first,
                            // so the survivor is never the weaker copy.
                            self.watches.find_and_remove_bin(other, lit, learnt);
                            if learnt {
                                self.stats.red_bins -= 1;
                                self.stats.red_lits -= 2;
                            } else {
                                self.stats.irred_bins -= 1;
                                self.stats.irred_lits -= 2;
                            }
                            rem_bins += 1;
                            continue;
                        }
                        bin_partners.push(other);
                        kept.push(entry);
                    }
                    Watched::Ternary { a, b, learnt } => {
                        let subsuming = [a, b]
                            .iter()
                            .find_map(|p| bin_partners.binary_search_by_key(&p.index(), |q| q.index()).ok());
                        if let Some(pos) = subsuming {
                            if let Watched::Binary {
                                other: partner,
                                learnt: bin_learnt,
                            } = kept[pos]
                            {
                                if bin_learnt && !learnt {
                                    // An irredundant ternary may not be
                                    // subsumed away by a weaker clause:
                                    // upgrade the binary on both sides.
                                    kept[pos] = Watched::Binary {
                                        other: partner,
                                        learnt: false,
                                    };
                                    self.watches.promote_bin(partner, lit);
                                    self.stats.red_bins -= 1;
                                    self.stats.red_lits -= 2;
                                    self.stats.irred_bins += 1;
                                    self.stats.irred_lits += 2;
                                }
                            }
                            self.watches.find_and_remove_tri(a, lit, b, learnt);
                            self.watches.find_and_remove_tri(b, lit, a, learnt);
                            if learnt {
                                self.stats.red_tris -= 1;
                                self.stats.red_lits -= 3;
                            } else {
                                self.stats.irred_tris -= 1;
                                self.stats.irred_lits -= 3;
                            }
                            rem_tris += 1;
                            continue;
                        }
                        if last_tri == Some((a, b)) {
                            self.watches.find_and_remove_tri(a, lit, b, learnt);
                            self.watches.find_and_remove_tri(b, lit, a, learnt);
                            if learnt {
                                self.stats.red_tris -= 1;
                                self.stats.red_lits -= 3;
                            } else {
                                self.stats.irred_tris -= 1;
                                self.stats.irred_lits -= 3;
                            }
                            rem_tris += 1;
                            continue;
                        }
                        last_tri = Some((a, b));
                        kept.push(entry);
                    }
                    Watched::Long { .. } => kept.push(entry),
                }
            }

            // Strengthening.
            let mut out: WatchList<L> = smallvec::SmallVec::new();
            for entry in kept.drain(..) {
                match entry {
                    Watched::Binary { other, .. } => {
                        out.push(entry);
                        // Each complementary pair fires once.
                        if other.index() < other.negated().index()
                            && bin_partners
                                .binary_search_by_key(&other.negated().index(), |q| q.index())
                                .is_ok()
                        {
                            to_enqueue.push(lit);
                            forced_lits += 1;
                        }
                    }
                    Watched::Ternary { a, b, learnt } => {
                        let rem = self.watches[lit.negated()].iter().any(|w| {
                            matches!(w, Watched::Binary { other, .. }
                                if *other == a || *other == b)
                        });
                        if !rem {
                            out.push(entry);
                            continue;
                        }
                        self.watches.find_and_remove_tri(a, lit, b, learnt);
                        self.watches.find_and_remove_tri(b, lit, a, learnt);
                        if learnt {
                            self.stats.red_tris -= 1;
                            self.stats.red_lits -= 3;
                        } else {
                            self.stats.irred_tris -= 1;
                            self.stats.irred_lits -= 3;
                        }
                        strengthened_tris += 1;
                        bins_to_add.push((a, b, learnt));
                    }
                    Watched::Long { .. } => out.push(entry),
                }
            }

            self.watches.put_list(index, out);
        }

        // Delayed application: enqueues, propagation, then the replacement
        // binaries.
        for lit in to_enqueue {
            if !self.enqueue_root(lit) {
                return false;
            }
        }
        if self.propagate().is_some() {
            self.ok = false;
            return false;
        }
        for (a, b, learnt) in bins_to_add {
            if !self.add_clause_int(&[a, b], learnt) {
                return false;
            }
        }

        self.stats.subsume_time += start.elapsed().as_secs_f64();
        debug!(
            "implicit: rem-bin {rem_bins} rem-tri {rem_tris} forced {forced_lits} \
             tri-to-bin {strengthened_tris}"
        );
        self.ok
    }
}

#[cfg(test)]
mod tests {
    use crate::sat::configs::SolverConfig;
    use crate::sat::literal::{Literal, PackedLiteral};
    use crate::sat::solver::Solver;
    use crate::sat::watch::Watched;

    type TestSolver = Solver<PackedLiteral>;

    fn lit(value: i32) -> PackedLiteral {
        PackedLiteral::from_i32(value)
    }

    fn empty_solver(num_vars: usize) -> TestSolver {
        let mut solver = TestSolver::new(SolverConfig::default());
        solver.new_vars(num_vars + 1);
        solver
    }

    #[test]
    fn test_duplicate_binaries_keep_non_learnt() {
        let mut solver = empty_solver(4);
        solver.attach_bin_clause(lit(1), lit(2), true);
        solver.attach_bin_clause(lit(1), lit(2), false);

        assert!(solver.subsume_and_strengthen_implicit());
        solver.check_clause_attach();

        assert_eq!(solver.stats.irred_bins, 1);
        assert_eq!(solver.stats.red_bins, 0);
        assert!(matches!(
            solver.watches[lit(1)][0],
            Watched::Binary { learnt: false, .. }
        ));
    }

    #[test]
    fn test_binary_subsumes_ternary_with_counters() {
        let mut solver = empty_solver(4);
        solver.attach_bin_clause(lit(1), lit(2), true);
        solver.attach_bin_clause(lit(1), lit(2), false);
        solver.attach_tri_clause(lit(1), lit(2), lit(3), false);

        let irred_lits_before = solver.stats.irred_lits;
        assert!(solver.subsume_and_strengthen_implicit());
        solver.check_clause_attach();

        assert_eq!(solver.stats.irred_bins, 1);
        assert_eq!(solver.stats.red_bins, 0);
        assert_eq!(solver.stats.irred_tris, 0);
        // The duplicate that vanished was the learnt copy.
        assert_eq!(solver.stats.irred_lits, irred_lits_before - 3);
        assert_eq!(solver.stats.red_lits, 0);
    }

    #[test]
    fn test_learnt_binary_promoted_when_subsuming_irred_ternary() {
        let mut solver = empty_solver(4);
        solver.attach_bin_clause(lit(1), lit(2), true);
        solver.attach_tri_clause(lit(1), lit(2), lit(3), false);

        assert!(solver.subsume_and_strengthen_implicit());
        solver.check_clause_attach();

        // The learnt binary took over the irredundant ternary's role, so it
        // must itself become irredundant, on both watch sides.
        assert_eq!(solver.stats.irred_bins, 1);
        assert_eq!(solver.stats.red_bins, 0);
        assert_eq!(solver.stats.irred_tris, 0);
        for l in [lit(1), lit(2)] {
            assert!(matches!(
                solver.watches[l][0],
                Watched::Binary { learnt: false, .. }
            ));
        }
    }

    #[test]
    fn test_duplicate_ternaries_collapse() {
        let mut solver = empty_solver(5);
        solver.attach_tri_clause(lit(1), lit(2), lit(3), false);
        solver.attach_tri_clause(lit(2), lit(3), lit(1), true);

        assert!(solver.subsume_and_strengthen_implicit());
        solver.check_clause_attach();

        assert_eq!(solver.stats.irred_tris, 1);
        assert_eq!(solver.stats.red_tris, 0);
    }

    #[test]
    fn test_complementary_binaries_force_literal() {
        let mut solver = empty_solver(4);
        solver.attach_bin_clause(lit(1), lit(2), false);
        solver.attach_bin_clause(lit(1), lit(-2), false);

        assert!(solver.subsume_and_strengthen_implicit());
        assert_eq!(solver.value(lit(1)), Some(true));
        solver.check_clause_attach();
    }

    #[test]
    fn test_ternary_strengthened_to_binary() {
        let mut solver = empty_solver(5);
        solver.attach_tri_clause(lit(1), lit(2), lit(3), false);
        solver.attach_bin_clause(lit(-1), lit(2), false);
        // A second entry so list-size pruning does not skip lit 1's list.
        solver.attach_bin_clause(lit(1), lit(4), false);

        assert!(solver.subsume_and_strengthen_implicit());
        solver.check_clause_attach();

        // {1,2,3} resolved with {-1,2} gives {2,3}.
        assert_eq!(solver.stats.irred_tris, 0);
        assert!(solver.watches[lit(2)]
            .iter()
            .any(|w| matches!(w, Watched::Binary { other, .. } if *other == lit(3))));
    }

    #[test]
    fn test_fixpoint_is_stable() {
        let mut solver = empty_solver(5);
        solver.attach_bin_clause(lit(1), lit(2), false);
        solver.attach_tri_clause(lit(2), lit(3), lit(4), false);

        assert!(solver.subsume_and_strengthen_implicit());
        let stats_before = solver.stats.clone();
        assert!(solver.subsume_and_strengthen_implicit());

        assert_eq!(solver.stats.irred_bins, stats_before.irred_bins);
        assert_eq!(solver.stats.irred_tris, stats_before.irred_tris);
        assert_eq!(solver.stats.irred_lits, stats_before.irred_lits);
        solver.check_clause_attach();
    }
}
