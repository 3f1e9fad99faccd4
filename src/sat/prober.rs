#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Failed-literal probing and its by-products.
//!
//! The prober walks the unassigned decision variables in round-robin and
//! performs a paired probe of each: assert the variable true, propagate,
//! read the trail; assert it false, propagate, read again. Four harvests
//! come out of the two trails:
//!
//! - a conflict in either pass makes the probed literal a failed literal,
//!   so its negation is a root-level fact;
//! - a variable forced to the same polarity by both passes is a necessary
//!   assignment;
//! - a variable forced to opposite polarities is equivalent (up to parity)
//!   to the probed variable and goes to the equivalence registry;
//! - an XOR constraint whose live size reaches two in both passes with the
//!   same residual parity yields an equivalence between its two survivors.
//!
//! After a successful pass, hyper-binary resolution compares the full
//! propagation trail against binary-only reachability and adds learnt
//! binaries for the descendants the binary implication graph cannot
//! explain, visiting candidates in order of a sampled degree heuristic.
//!
//! Everything is budgeted in propagation steps. An exhausted budget records
//! the variable to resume from; a productive round multiplies the next
//! round's budget, capped at five times the base.

use crate::sat::assignment::Reason;
use crate::sat::literal::{Literal, Variable};
use crate::sat::solver::Solver;
use crate::sat::xor_index::{TwoLongXor, XorIndex};
use bit_vec::BitVec;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use std::time::Instant;

/// Scratch state of the failed-literal prober, kept across rounds for the
/// resume point and budget multiplier.
#[derive(Debug, Clone)]
pub struct Prober {
    finished_last_time: bool,
    resume_var: Variable,
    num_props_multiplier: f64,
    last_time_found: usize,
    pub num_calls: u64,

    /// Per-variable: set when the first pass propagated the variable.
    propagated: BitVec,
    /// Per-variable: polarity the most recent pass propagated it to.
    prop_value: BitVec,
    both_same: Vec<(Variable, bool)>,
    two_long_xors: FxHashSet<TwoLongXor>,

    /// Per-variable: propagated by full BCP but not yet explained by the
    /// binary implication graph.
    propagated_bin: BitVec,
    propagated_vars: Vec<Variable>,
    my_implies: BitVec,
    /// Per-literal sampled degree in the binary implication graph.
    lit_degrees: Vec<u32>,
    hyperbin_props: u64,
    max_hyperbin_props: u64,

    /// Per-literal marker for useless-binary detection.
    one_hop: Vec<bool>,

    pub index: XorIndex,
    last_trail_size: usize,
    bin_xor_find: bool,
    to_replace_before: usize,

    rng: StdRng,
}

impl Prober {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            finished_last_time: true,
            resume_var: 0,
            num_props_multiplier: 1.0,
            last_time_found: 0,
            num_calls: 0,
            propagated: BitVec::new(),
            prop_value: BitVec::new(),
            both_same: Vec::new(),
            two_long_xors: FxHashSet::default(),
            propagated_bin: BitVec::new(),
            propagated_vars: Vec::new(),
            my_implies: BitVec::new(),
            lit_degrees: Vec::new(),
            hyperbin_props: 0,
            max_hyperbin_props: 0,
            one_hop: Vec::new(),
            index: XorIndex::new(),
            last_trail_size: 0,
            bin_xor_find: false,
            to_replace_before: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn resize(&mut self, num_vars: usize) {
        for bits in [
            &mut self.propagated,
            &mut self.prop_value,
            &mut self.propagated_bin,
            &mut self.my_implies,
        ] {
            if bits.len() < num_vars {
                let missing = num_vars - bits.len();
                bits.grow(missing, false);
            }
        }
    }
}

impl<L: Literal> Solver<L> {
    /// One probe round over the decision variables, within the configured
    /// propagation budget. Returns the `ok` flag.
    #[allow(clippy::too_many_lines)]
    pub fn probe(&mut self) -> bool {
        if !self.ok {
            return false;
        }
        debug_assert_eq!(self.trail.decision_level(), 0);
        #[cfg(debug_assertions)]
        self.check_clause_attach();

        let start = Instant::now();
        let orig_props = self.propagator.propagations;
        self.prober.num_calls += 1;

        let num_vars = self.n_vars();
        let free_before = self.trail.num_free_vars();

        // A productive round earns a bigger budget next time, up to 5x.
        #[allow(clippy::cast_precision_loss)]
        let productive = self.prober.last_time_found > self.config.found_threshold
            || self.prober.last_time_found as f64
                > free_before as f64 * self.config.found_fraction;
        if productive {
            self.prober.num_props_multiplier = (self.prober.num_props_multiplier
                * self.config.budget_growth)
                .min(self.config.max_budget_multiplier);
        } else {
            self.prober.num_props_multiplier = 1.0;
        }
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let budget = (self.config.probe_budget as f64 * self.prober.num_props_multiplier) as u64;

        self.prober.resize(num_vars);
        self.prober.both_same.clear();
        let orig_trail_size = self.trail.len();
        self.prober.to_replace_before = self.replacer.num_new_pending();

        // 2-long XOR discovery only pays off inside the size limits.
        self.prober.bin_xor_find = self.config.bin_xor_find
            && self.xors.len() >= self.config.min_xor_clauses
            && self.xors.len() <= self.config.max_xor_clauses
            && free_before <= self.config.max_xor_vars
            && self.n_clauses() <= self.config.max_clauses_for_xor;
        if self.prober.bin_xor_find {
            if !self.clean_xor_clauses() {
                return false;
            }
            if self.propagate().is_some() {
                self.ok = false;
                return false;
            }
            self.prober.index.build(&self.xors, num_vars);
        } else {
            self.prober.index.disable();
        }
        self.prober.last_trail_size = self.trail.len();

        self.prober.hyperbin_props = 0;
        if self.config.add_extra_bins {
            if !self.order_lits() {
                return false;
            }
            self.prober.max_hyperbin_props = self.config.hyperbin_budget(budget);
        }

        #[allow(clippy::cast_possible_truncation)]
        let num_vars_u32 = num_vars as Variable;
        let from_var = if self.prober.finished_last_time
            || self.prober.resume_var >= num_vars_u32
        {
            0
        } else {
            self.prober.resume_var
        };
        self.prober.finished_last_time = true;
        self.prober.resume_var = num_vars_u32;

        for var in from_var..num_vars_u32 {
            if self.trail.value_var(var).is_assigned() || !self.trail.is_decision_var(var) {
                continue;
            }
            if self.propagator.propagations - orig_props >= budget {
                self.prober.finished_last_time = false;
                self.prober.resume_var = var;
                break;
            }
            if !self.try_both(L::new(var, true), L::new(var, false)) {
                break;
            }
        }

        let fixed = self.trail.len() - orig_trail_size;
        self.prober.last_time_found = fixed;
        self.stats.probe_time += start.elapsed().as_secs_f64();
        self.stats
            .log_probe_round(self.propagator.propagations - orig_props, start.elapsed().as_secs_f64());

        if self.ok && fixed > 0 {
            let shrunk = free_before - self.trail.num_free_vars();
            if shrunk > free_before / self.config.reattach_fraction
                && self.n_clauses() >= self.config.reattach_min_clauses
            {
                if !self.detach_and_reattach() {
                    return false;
                }
            } else if !self.remove_and_clean_all() {
                return false;
            }
        }

        #[cfg(debug_assertions)]
        if self.ok {
            self.check_clause_attach();
        }
        self.ok
    }

    /// A paired probe. Usually `lit2 == ¬lit1`; the routine also accepts two
    /// literals of a length-two clause, of which at least one must hold.
    ///
    /// The decision level is back at zero on return, the trail has only
    /// gained root-level facts, and every probe-local side effect (XOR
    /// decrements, marker bits) has been unwound.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn try_both(&mut self, lit1: L, lit2: L) -> bool {
        debug_assert_eq!(self.trail.decision_level(), 0);
        self.prober.resize(self.n_vars());

        if self.prober.bin_xor_find {
            // Fold root-level growth since the previous probe into the live
            // sizes for good.
            if self.prober.last_trail_size < self.trail.len() {
                for c in self.prober.last_trail_size..self.trail.len() {
                    let var = self.trail.lit_at(c).variable();
                    self.prober.index.remove_var(var);
                }
            }
            self.prober.last_trail_size = self.trail.len();
            self.prober.index.reset_touched();
        }
        self.prober.propagated.clear();
        self.prober.two_long_xors.clear();
        // Stale hyper-binary pending bits survive a budget-exhausted probe.
        if !self.prober.propagated_vars.is_empty() {
            for i in 0..self.prober.propagated_vars.len() {
                let var = self.prober.propagated_vars[i];
                self.prober.propagated_bin.set(var as usize, false);
            }
            self.prober.propagated_vars.clear();
        }

        // First pass.
        self.trail.new_decision_level();
        self.trail.unchecked_enqueue(lit1, Reason::Decision);
        if self.propagate().is_some() {
            self.trail.cancel_until(0);
            self.stats.num_failed += 1;
            if !self.enqueue_root(lit1.negated()) {
                return false;
            }
            if self.propagate().is_some() {
                self.ok = false;
                return false;
            }
            return true;
        }
        debug_assert!(self.trail.decision_level() > 0);
        let limit = self.trail.level_limit(0);
        for c in (limit..self.trail.len()).rev() {
            let x = self.trail.lit_at(c);
            let var = x.variable();
            self.prober.propagated.set(var as usize, true);
            if self.config.add_extra_bins {
                self.prober.propagated_bin.set(var as usize, true);
                self.prober.propagated_vars.push(var);
            }
            self.prober.prop_value.set(var as usize, x.polarity());
            if self.prober.bin_xor_find {
                self.prober.index.remove_var(var);
            }
        }
        if self.prober.bin_xor_find {
            for i in self.prober.index.investigate().to_vec() {
                if self.prober.index.size(i) == 2 {
                    let two = XorIndex::two_long(&self.xors[i as usize], &self.trail);
                    self.prober.two_long_xors.insert(two);
                }
            }
            for c in (limit..self.trail.len()).rev() {
                self.prober.index.add_var(self.trail.lit_at(c).variable());
            }
            self.prober.index.reset_touched();
        }
        self.trail.cancel_until(0);

        if self.config.add_extra_bins && self.prober.hyperbin_props < self.prober.max_hyperbin_props
        {
            self.add_hyper_bins(lit1);
        }

        // Second pass.
        self.trail.new_decision_level();
        self.trail.unchecked_enqueue(lit2, Reason::Decision);
        if self.propagate().is_some() {
            self.trail.cancel_until(0);
            self.stats.num_failed += 1;
            if !self.enqueue_root(lit2.negated()) {
                return false;
            }
            if self.propagate().is_some() {
                self.ok = false;
                return false;
            }
            return true;
        }
        debug_assert!(self.trail.decision_level() > 0);
        let limit = self.trail.level_limit(0);
        for c in (limit..self.trail.len()).rev() {
            let x = self.trail.lit_at(c);
            let var = x.variable();
            if self.prober.propagated[var as usize] {
                if self.config.add_extra_bins {
                    self.prober.propagated_bin.set(var as usize, true);
                    self.prober.propagated_vars.push(var);
                }
                if self.prober.prop_value[var as usize] == x.polarity() {
                    // Both polarities force the same value.
                    self.prober.both_same.push((var, x.polarity()));
                } else if c != limit {
                    let (v1, v2, invert) = if lit1.variable() == lit2.variable() {
                        debug_assert!(lit1.polarity() && !lit2.polarity());
                        // lit1 forces x to prop_value, ¬lit1 to the
                        // opposite, so var(lit1) ⊕ var(x) = !prop_value.
                        (
                            lit1.variable(),
                            var,
                            !self.prober.prop_value[var as usize],
                        )
                    } else {
                        // Opposite forcings under two literals of a binary
                        // clause mean exactly one of them holds.
                        (
                            lit1.variable(),
                            lit2.variable(),
                            lit1.polarity() == lit2.polarity(),
                        )
                    };
                    if !self.replacer.replace(v1, v2, invert, &mut self.trail) {
                        self.ok = false;
                        return false;
                    }
                    let pending = self.replacer.num_new_pending();
                    self.stats.both_invert +=
                        (pending - self.prober.to_replace_before) as u64;
                    self.prober.to_replace_before = pending;
                }
            }
            self.prober.prop_value.set(var as usize, x.polarity());
            if self.prober.bin_xor_find {
                self.prober.index.remove_var(var);
            }
        }
        if self.prober.bin_xor_find {
            if !self.prober.two_long_xors.is_empty() {
                for i in self.prober.index.investigate().to_vec() {
                    if self.prober.index.size(i) == 2 {
                        let two = XorIndex::two_long(&self.xors[i as usize], &self.trail);
                        // Only an XOR residue common to both passes, parity
                        // included, is implied unconditionally.
                        if self.prober.two_long_xors.contains(&two) {
                            if !self
                                .replacer
                                .replace(two.vars[0], two.vars[1], two.rhs, &mut self.trail)
                            {
                                self.ok = false;
                                return false;
                            }
                            let pending = self.replacer.num_new_pending();
                            self.stats.new_bin_xor +=
                                (pending - self.prober.to_replace_before) as u64;
                            self.prober.to_replace_before = pending;
                        }
                    }
                }
            }
            for c in (limit..self.trail.len()).rev() {
                self.prober.index.add_var(self.trail.lit_at(c).variable());
            }
            self.prober.index.reset_touched();
        }
        self.trail.cancel_until(0);

        if self.config.add_extra_bins && self.prober.hyperbin_props < self.prober.max_hyperbin_props
        {
            self.add_hyper_bins(lit2);
        }

        let both_same = std::mem::take(&mut self.prober.both_same);
        self.stats.good_both_same += both_same.len() as u64;
        for (var, polarity) in both_same {
            if !self.enqueue_root(L::new(var, polarity)) {
                return false;
            }
        }
        if self.propagate().is_some() {
            self.ok = false;
            return false;
        }
        true
    }

    /// Hyper-binary resolution rooted at `lit`: rebuild the level-1 trail
    /// with binary-only propagation, then add a learnt binary towards each
    /// descendant the binary implication graph leaves unexplained. Heavily
    /// connected literals are visited first so one addition covers as many
    /// pending descendants as possible.
    fn add_hyper_bins(&mut self, lit: L) {
        let old_props = self.propagator.propagations;
        let mut to_visit: Vec<L> = Vec::new();

        self.trail.new_decision_level();
        self.trail.unchecked_enqueue(lit, Reason::Decision);
        let failed = self
            .propagator
            .propagate_bin(&mut self.trail, &self.watches)
            .is_some();
        debug_assert!(!failed);
        let limit = self.trail.level_limit(0);
        for c in (limit..self.trail.len()).rev() {
            let x = self.trail.lit_at(c);
            self.prober.propagated_bin.set(x.variable() as usize, false);
            to_visit.push(x);
        }
        self.trail.cancel_until(0);

        to_visit.sort_by(|a, b| {
            self.prober.lit_degrees[b.index()]
                .cmp(&self.prober.lit_degrees[a.index()])
                .then(a.index().cmp(&b.index()))
        });

        if !self.prober.propagated_bin.none() {
            for l in to_visit {
                self.prober.my_implies.clear();
                self.fill_implies(l);
                for i in 0..self.prober.propagated_vars.len() {
                    let var = self.prober.propagated_vars[i];
                    if self.prober.propagated_bin[var as usize]
                        && self.prober.my_implies[var as usize]
                    {
                        let target = L::new(var, self.prober.prop_value[var as usize]);
                        let added = self.add_learnt_bin(l.negated(), target);
                        debug_assert!(added);
                        self.stats.hyperbin_added += 1;
                        self.prober
                            .propagated_bin
                            .difference(&self.prober.my_implies);
                        break;
                    }
                }
                if self.prober.propagated_bin.none() {
                    break;
                }
            }
            debug_assert!(self.prober.propagated_bin.none());
        }

        for i in 0..self.prober.propagated_vars.len() {
            let var = self.prober.propagated_vars[i];
            self.prober.propagated_bin.set(var as usize, false);
        }
        self.prober.propagated_vars.clear();
        self.prober.hyperbin_props += self.propagator.propagations - old_props;
    }

    /// Marks every full-propagation descendant of `lit` in `my_implies`.
    fn fill_implies(&mut self, lit: L) {
        self.trail.new_decision_level();
        self.trail.unchecked_enqueue(lit, Reason::Decision);
        let conflict = self.propagate();
        debug_assert!(conflict.is_none());
        let limit = self.trail.level_limit(0);
        for c in (limit..self.trail.len()).rev() {
            let x = self.trail.lit_at(c);
            self.prober.my_implies.set(x.variable() as usize, true);
        }
        self.trail.cancel_until(0);
    }

    /// Per-literal degree sampling over the binary implication graph: up to
    /// `max_degree_samples` random decision literals are binary-propagated
    /// and each consequence's degree incremented. The sampled propagations
    /// are not charged against the probe budget.
    fn order_lits(&mut self) -> bool {
        let old_props = self.propagator.propagations;
        let start = Instant::now();
        let mut num_checked = 0u64;
        self.prober.lit_degrees.clear();
        self.prober.lit_degrees.resize(self.n_vars() * 2, 0);

        #[allow(clippy::cast_possible_truncation)]
        let num_vars = self.n_vars() as Variable;
        if num_vars == 0 {
            return true;
        }
        let mut samples = 0;
        while samples < self.config.max_degree_samples {
            if self.propagator.propagations - old_props > self.config.degree_sample_budget {
                break;
            }
            samples += 1;
            let var = self.prober.rng.gen_range(0..num_vars);
            if self.trail.value_var(var).is_assigned() || !self.trail.is_decision_var(var) {
                continue;
            }
            let rand_lit = L::new(var, self.prober.rng.gen::<bool>());
            num_checked += 1;

            self.trail.new_decision_level();
            self.trail.unchecked_enqueue(rand_lit, Reason::Decision);
            let failed = self
                .propagator
                .propagate_bin(&mut self.trail, &self.watches)
                .is_some();
            if failed {
                self.trail.cancel_until(0);
                self.stats.num_failed += 1;
                if !self.enqueue_root(rand_lit.negated()) {
                    return false;
                }
                if self.propagate().is_some() {
                    self.ok = false;
                    return false;
                }
                continue;
            }
            let limit = self.trail.level_limit(0);
            for c in ((limit + 1)..self.trail.len()).rev() {
                let x = self.trail.lit_at(c);
                self.prober.lit_degrees[x.index()] += 1;
            }
            self.trail.cancel_until(0);
        }

        debug!(
            "binary degree sampling: {num_checked} literals in {:.2}s",
            start.elapsed().as_secs_f64()
        );
        self.propagator.propagations = old_props;
        true
    }

    /// Removes binary edges already implied by a longer path in the binary
    /// implication graph. Must not run while any learnt clause exists: a
    /// non-learnt edge whose witnessing path runs through learnt clauses
    /// would otherwise die with them.
    pub fn remove_useless_bins_all(&mut self) -> bool {
        if !self.ok {
            return false;
        }
        debug_assert_eq!(self.trail.decision_level(), 0);
        if self.stats.red_bins > 0 || self.stats.red_tris > 0 || self.stats.red_longs > 0 {
            debug!("useless-binary elimination skipped: learnt clauses present");
            return true;
        }

        let start = Instant::now();
        let old_props = self.propagator.propagations;
        let removed_before = self.stats.useless_bin_removed;
        self.prober.one_hop.clear();
        self.prober.one_hop.resize(self.n_vars() * 2, false);

        #[allow(clippy::cast_possible_truncation)]
        let num_vars = self.n_vars() as Variable;
        for var in 0..num_vars {
            if self.propagator.propagations - old_props > self.config.useless_bin_budget {
                break;
            }
            if self.trail.value_var(var).is_assigned() || !self.trail.is_decision_var(var) {
                continue;
            }

            let lit = L::new(var, true);
            if !self.remove_useless_binaries(lit) {
                self.trail.cancel_until(0);
                self.stats.num_failed += 1;
                if !self.enqueue_root(lit.negated()) {
                    return false;
                }
                if self.propagate().is_some() {
                    self.ok = false;
                    return false;
                }
                continue;
            }

            let lit = lit.negated();
            if !self.remove_useless_binaries(lit) {
                self.trail.cancel_until(0);
                self.stats.num_failed += 1;
                if !self.enqueue_root(lit.negated()) {
                    return false;
                }
                if self.propagate().is_some() {
                    self.ok = false;
                    return false;
                }
            }
        }

        self.stats.useless_bin_time += start.elapsed().as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        let mega_props = (self.propagator.propagations - old_props) as f64 / 1_000_000.0;
        debug!(
            "useless bins removed: {} props {mega_props:.2}M",
            self.stats.useless_bin_removed - removed_before,
        );
        self.ok
    }

    /// Checks the one-hop binary implications of `lit` for redundancy: any
    /// one-hop literal reachable from another one-hop literal has a
    /// redundant direct edge. Returns `false` when `lit` turns out to be a
    /// failed literal; the caller may then be left above level zero.
    fn remove_useless_binaries(&mut self, lit: L) -> bool {
        self.trail.new_decision_level();
        self.trail.unchecked_enqueue(lit, Reason::Decision);
        if self
            .propagator
            .propagate_bin_one_level(&mut self.trail, &self.watches)
            .is_some()
        {
            return false;
        }

        let limit = self.trail.level_limit(0);
        let mut one_hop_away: Vec<L> = Vec::new();
        for c in ((limit + 1)..self.trail.len()).rev() {
            let x = self.trail.lit_at(c);
            self.prober.one_hop[x.index()] = true;
            one_hop_away.push(x);
        }
        self.trail.cancel_until(0);

        let mut wrong: Vec<L> = Vec::new();
        for &hop in &one_hop_away {
            if !self.fill_bin_implies_minus_last(lit, hop, &mut wrong) {
                for &x in &one_hop_away {
                    self.prober.one_hop[x.index()] = false;
                }
                return false;
            }
        }

        for &target in &wrong {
            self.detach_bin_clause(lit.negated(), target, false);
            self.stats.useless_bin_removed += 1;
        }
        for &x in &one_hop_away {
            self.prober.one_hop[x.index()] = false;
        }
        true
    }

    /// Binary-propagates `lit` and moves every still-marked one-hop literal
    /// among its strict descendants into `wrong`. Skips collection when the
    /// propagation cycles back to `orig`, where redundancy cannot be
    /// concluded.
    fn fill_bin_implies_minus_last(&mut self, orig: L, lit: L, wrong: &mut Vec<L>) -> bool {
        self.trail.new_decision_level();
        self.trail.unchecked_enqueue(lit, Reason::Decision);
        if self
            .propagator
            .propagate_bin(&mut self.trail, &self.watches)
            .is_some()
        {
            return false;
        }

        if self.trail.value_var(orig.variable()).is_unassigned() {
            let limit = self.trail.level_limit(0);
            for c in ((limit + 1)..self.trail.len()).rev() {
                let x = self.trail.lit_at(c);
                if self.prober.one_hop[x.index()] {
                    wrong.push(x);
                    self.prober.one_hop[x.index()] = false;
                }
            }
        }
        self.trail.cancel_until(0);
        true
    }
}
