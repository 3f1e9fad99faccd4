#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! The solver context: the shared mutable state every simplification pass
//! operates on, and the root-level operations over it.
//!
//! This is not a search engine. The CDCL loop lives outside; what it gets
//! from here is [`Solver::add_clause`] for ingestion and [`Solver::simplify`]
//! for one round of inprocessing at decision level zero, which may add
//! forced assignments, binary clauses and variable equivalences.
//!
//! Unsatisfiability is latched in the `ok` flag: once false, every operation
//! short-circuits and no partial state other than the flag is observable.

use crate::sat::assignment::{ElimState, Reason};
use crate::sat::clause::{ClauseAllocator, ClauseRef};
use crate::sat::configs::SolverConfig;
use crate::sat::literal::{Literal, PackedLiteral, Variable};
use crate::sat::prober::Prober;
use crate::sat::propagation::{Conflict, Propagator};
use crate::sat::stats::Stats;
use crate::sat::trail::Trail;
use crate::sat::var_replacer::VarReplacer;
use crate::sat::watch::{Watched, WatchLists};
use crate::sat::xor_index::XorClause;
use itertools::Itertools;
use log::{debug, trace};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one [`Solver::simplify`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplifyStatus {
    Ok,
    Unsat,
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct Solver<L: Literal = PackedLiteral> {
    pub config: SolverConfig,
    pub(crate) trail: Trail<L>,
    pub(crate) watches: WatchLists<L>,
    pub(crate) db: ClauseAllocator<L>,
    pub(crate) replacer: VarReplacer<L>,
    pub(crate) xors: Vec<XorClause>,
    pub(crate) propagator: Propagator,
    pub(crate) prober: Prober,
    pub stats: Stats,
    pub(crate) ok: bool,
    must_interrupt: Arc<AtomicBool>,
}

impl<L: Literal> Solver<L> {
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        let seed = config.seed;
        Self {
            config,
            trail: Trail::new(0),
            watches: WatchLists::new(0),
            db: ClauseAllocator::new(),
            replacer: VarReplacer::new(0),
            xors: Vec::new(),
            propagator: Propagator::new(),
            prober: Prober::new(seed),
            stats: Stats::new(),
            ok: true,
            must_interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Grows the variable tables so variables `0..num_vars` exist.
    pub fn new_vars(&mut self, num_vars: usize) {
        self.trail.grow_to(num_vars);
        self.watches.grow_to(num_vars);
        self.replacer.grow_to(num_vars);
    }

    #[must_use]
    pub fn n_vars(&self) -> usize {
        self.trail.num_vars()
    }

    #[must_use]
    pub fn n_assigns(&self) -> usize {
        self.trail.len()
    }

    #[must_use]
    pub fn n_free_vars(&self) -> usize {
        self.trail.num_free_vars()
    }

    #[must_use]
    pub fn n_clauses(&self) -> usize {
        #[allow(clippy::cast_possible_truncation)]
        let implicit = (self.stats.irred_bins
            + self.stats.red_bins
            + self.stats.irred_tris
            + self.stats.red_tris) as usize;
        implicit + self.db.num_live()
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.ok
    }

    #[must_use]
    pub const fn num_propagations(&self) -> u64 {
        self.propagator.propagations
    }

    #[must_use]
    pub fn value(&self, lit: L) -> Option<bool> {
        self.trail.value_lit(lit)
    }

    #[must_use]
    pub fn decision_level(&self) -> usize {
        self.trail.decision_level()
    }

    #[must_use]
    pub fn trail(&self) -> &Trail<L> {
        &self.trail
    }

    #[must_use]
    pub fn xor_clauses(&self) -> &[XorClause] {
        &self.xors
    }

    pub fn set_decision_var(&mut self, var: Variable, decision: bool) {
        self.trail.set_decision_var(var, decision);
    }

    /// Every clause currently in the database: implicit binaries and
    /// ternaries once each, then the long clauses. Used by the DIMACS
    /// writer.
    #[must_use]
    pub fn all_clauses(&self) -> Vec<Vec<L>> {
        let mut out = Vec::new();
        for (index, list) in self.watches.iter() {
            let lit = L::from_index(index);
            for entry in list {
                match *entry {
                    Watched::Binary { other, .. } if lit.index() < other.index() => {
                        out.push(vec![lit, other]);
                    }
                    Watched::Ternary { a, b, .. } if lit.index() < a.index() => {
                        out.push(vec![lit, a, b]);
                    }
                    _ => {}
                }
            }
        }
        for offset in self.db.iter_refs() {
            out.push(self.db[offset].iter().copied().collect());
        }
        out
    }

    /// Handle for requesting an interrupt; polled at phase boundaries.
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.must_interrupt)
    }

    pub(crate) fn interrupted(&self) -> bool {
        self.must_interrupt.load(Ordering::Relaxed)
    }

    pub(crate) fn propagate(&mut self) -> Option<Conflict<L>> {
        self.propagator
            .propagate(&mut self.trail, &mut self.watches, &mut self.db)
    }

    /// Enqueues a root-level fact; latches `ok` on clash.
    pub(crate) fn enqueue_root(&mut self, lit: L) -> bool {
        debug_assert_eq!(self.trail.decision_level(), 0);
        if self.trail.enqueue(lit, Reason::Decision) {
            true
        } else {
            self.ok = false;
            false
        }
    }

    // ------------------------------------------------------------------
    // Attach / detach, with the statistics counters moving in lockstep.
    // ------------------------------------------------------------------

    pub(crate) fn attach_bin_clause(&mut self, a: L, b: L, learnt: bool) {
        self.watches.attach_bin(a, b, learnt);
        if learnt {
            self.stats.red_bins += 1;
            self.stats.red_lits += 2;
        } else {
            self.stats.irred_bins += 1;
            self.stats.irred_lits += 2;
        }
    }

    pub(crate) fn detach_bin_clause(&mut self, a: L, b: L, learnt: bool) {
        self.watches.detach_bin(a, b, learnt);
        if learnt {
            self.stats.red_bins -= 1;
            self.stats.red_lits -= 2;
        } else {
            self.stats.irred_bins -= 1;
            self.stats.irred_lits -= 2;
        }
    }

    pub(crate) fn attach_tri_clause(&mut self, a: L, b: L, c: L, learnt: bool) {
        self.watches.attach_tri(a, b, c, learnt);
        if learnt {
            self.stats.red_tris += 1;
            self.stats.red_lits += 3;
        } else {
            self.stats.irred_tris += 1;
            self.stats.irred_lits += 3;
        }
    }

    pub(crate) fn detach_tri_clause(&mut self, a: L, b: L, c: L, learnt: bool) {
        self.watches.detach_tri(a, b, c, learnt);
        if learnt {
            self.stats.red_tris -= 1;
            self.stats.red_lits -= 3;
        } else {
            self.stats.irred_tris -= 1;
            self.stats.irred_lits -= 3;
        }
    }

    pub(crate) fn attach_long_clause(&mut self, offset: ClauseRef) {
        let (first, second, learnt, len) = {
            let clause = &self.db[offset];
            (clause[0], clause[1], clause.learnt, clause.len() as u64)
        };
        self.watches.attach_long(first, second, offset);
        if learnt {
            self.stats.red_longs += 1;
            self.stats.red_lits += len;
        } else {
            self.stats.irred_longs += 1;
            self.stats.irred_lits += len;
        }
    }

    pub(crate) fn detach_long_clause(&mut self, offset: ClauseRef) {
        let (first, second, learnt, len) = {
            let clause = &self.db[offset];
            (clause[0], clause[1], clause.learnt, clause.len() as u64)
        };
        self.watches.find_and_remove_long(first, offset);
        self.watches.find_and_remove_long(second, offset);
        if learnt {
            self.stats.red_longs -= 1;
            self.stats.red_lits -= len;
        } else {
            self.stats.irred_longs -= 1;
            self.stats.irred_lits -= len;
        }
    }

    // ------------------------------------------------------------------
    // Clause ingestion
    // ------------------------------------------------------------------

    /// Internal clause addition: literals must already be representative
    /// literals of non-eliminated variables. Sorts, drops duplicates and
    /// satisfied clauses, removes root-false literals, detects tautologies,
    /// and dispatches on the surviving length. Returns the `ok` flag.
    pub(crate) fn add_clause_int(&mut self, lits: &[L], learnt: bool) -> bool {
        debug_assert!(self.ok);
        debug_assert_eq!(self.trail.decision_level(), 0);

        let mut ps = lits.iter().copied().sorted_by_key(|l| l.index());
        let mut out: SmallVec<[L; 8]> = SmallVec::new();
        let mut prev: Option<L> = None;
        for lit in &mut ps {
            debug_assert_ne!(self.trail.elim(lit.variable()), ElimState::Replaced);
            debug_assert_ne!(self.trail.elim(lit.variable()), ElimState::Eliminated);
            if self.trail.value_lit(lit) == Some(true) || prev == Some(lit.negated()) {
                return true;
            }
            if self.trail.value_lit(lit).is_none() && prev != Some(lit) {
                out.push(lit);
                prev = Some(lit);
            }
        }

        match out.len() {
            0 => {
                self.ok = false;
                false
            }
            1 => {
                if self.enqueue_root(out[0]) && self.propagate().is_some() {
                    self.ok = false;
                }
                self.ok
            }
            2 => {
                self.attach_bin_clause(out[0], out[1], learnt);
                true
            }
            3 => {
                self.attach_tri_clause(out[0], out[1], out[2], learnt);
                true
            }
            _ => {
                let offset = self.db.alloc(&out, learnt);
                self.attach_long_clause(offset);
                true
            }
        }
    }

    /// External clause ingestion: rewrites literals to their equivalence
    /// representatives first. Returns `false` once the instance is
    /// unsatisfiable.
    pub fn add_clause(&mut self, lits: &[L]) -> bool {
        if !self.ok {
            return false;
        }
        let ps = lits.iter().map(|&l| self.replacer.rep_lit(l)).collect_vec();
        self.add_clause_int(&ps, false)
    }

    /// Adds the learnt binary `{a, b}`. The prober's hyper-binary resolution
    /// feeds through here.
    pub(crate) fn add_learnt_bin(&mut self, a: L, b: L) -> bool {
        self.add_clause_int(&[a, b], true)
    }

    /// XOR constraint ingestion: `vars[0] ⊕ ... = rhs`. Representative
    /// rewriting, duplicate cancellation and root-value folding happen
    /// here; results of length two go straight into the equivalence
    /// registry, length one becomes a unit.
    pub fn add_xor_clause(&mut self, vars: &[Variable], rhs: bool) -> bool {
        if !self.ok {
            return false;
        }
        debug_assert_eq!(self.trail.decision_level(), 0);

        let mut rhs = rhs;
        let mut vs: Vec<Variable> = Vec::with_capacity(vars.len());
        for &var in vars {
            let rep = self.replacer.rep_of(var);
            // v = rep_var xor !polarity, so a negative representative flips
            // the parity.
            rhs ^= !rep.polarity();
            vs.push(rep.variable());
        }
        vs.sort_unstable();

        let mut out: SmallVec<[Variable; 4]> = SmallVec::new();
        for var in vs {
            if out.last() == Some(&var) {
                // x ⊕ x cancels.
                out.pop();
                continue;
            }
            if let Some(value) = self.trail.root_value(var) {
                rhs ^= value;
            } else {
                out.push(var);
            }
        }

        match out.len() {
            0 => {
                if rhs {
                    self.ok = false;
                }
                self.ok
            }
            1 => {
                if self.enqueue_root(L::new(out[0], rhs)) && self.propagate().is_some() {
                    self.ok = false;
                }
                self.ok
            }
            2 => {
                if !self.replacer.replace(out[0], out[1], rhs, &mut self.trail) {
                    self.ok = false;
                }
                self.ok
            }
            _ => {
                self.xors.push(XorClause { vars: out, rhs });
                true
            }
        }
    }

    // ------------------------------------------------------------------
    // Equivalence flushing
    // ------------------------------------------------------------------

    /// Applies all pending equivalences: substitutes representatives into
    /// every clause kind, re-attaches shrunken results, applies implied
    /// units, and propagates. Returns the `ok` flag.
    pub fn perform_replace(&mut self) -> bool {
        if !self.ok {
            return false;
        }
        debug_assert_eq!(self.trail.decision_level(), 0);
        if !self.replacer.has_work() {
            return true;
        }
        let start = Instant::now();

        for lit in self.replacer.drain_pending_units() {
            let rep = self.replacer.rep_lit(lit);
            if !self.enqueue_root(rep) {
                return false;
            }
        }
        if self.propagate().is_some() {
            self.ok = false;
            return false;
        }

        // Long clauses.
        let offsets = self.db.iter_refs().collect_vec();
        for offset in offsets {
            let needs = self.db[offset]
                .iter()
                .any(|l| self.replacer.is_replaced(l.variable()));
            if !needs {
                continue;
            }
            let learnt = self.db[offset].learnt;
            let lits = self.db[offset]
                .iter()
                .map(|&l| self.replacer.rep_lit(l))
                .collect_vec();
            self.detach_long_clause(offset);
            self.db.free(offset);
            if !self.add_clause_int(&lits, learnt) {
                return false;
            }
        }

        // Implicit binaries and ternaries, each handled once via its
        // smallest literal.
        let mut bins: Vec<(L, L, bool)> = Vec::new();
        let mut tris: Vec<(L, L, L, bool)> = Vec::new();
        for (index, list) in self.watches.iter() {
            let lit = L::from_index(index);
            for entry in list {
                match *entry {
                    Watched::Binary { other, learnt } if lit.index() < other.index() => {
                        if self.replacer.is_replaced(lit.variable())
                            || self.replacer.is_replaced(other.variable())
                        {
                            bins.push((lit, other, learnt));
                        }
                    }
                    Watched::Ternary { a, b, learnt } if lit.index() < a.index() => {
                        if self.replacer.is_replaced(lit.variable())
                            || self.replacer.is_replaced(a.variable())
                            || self.replacer.is_replaced(b.variable())
                        {
                            tris.push((lit, a, b, learnt));
                        }
                    }
                    _ => {}
                }
            }
        }
        for (a, b, learnt) in bins {
            self.detach_bin_clause(a, b, learnt);
            let lits = [self.replacer.rep_lit(a), self.replacer.rep_lit(b)];
            if !self.add_clause_int(&lits, learnt) {
                return false;
            }
        }
        for (a, b, c, learnt) in tris {
            self.detach_tri_clause(a, b, c, learnt);
            let lits = [
                self.replacer.rep_lit(a),
                self.replacer.rep_lit(b),
                self.replacer.rep_lit(c),
            ];
            if !self.add_clause_int(&lits, learnt) {
                return false;
            }
        }

        // XOR constraints.
        let xors = std::mem::take(&mut self.xors);
        for xor in xors {
            if xor.vars.iter().any(|&v| self.replacer.is_replaced(v)) {
                if !self.add_xor_clause(&xor.vars, xor.rhs) {
                    return false;
                }
            } else {
                self.xors.push(xor);
            }
        }

        // Replaced variables leave the decision pool for good.
        let queued = self
            .replacer
            .replaced_iter()
            .filter(|&v| self.trail.elim(v) == ElimState::QueuedForReplace)
            .collect_vec();
        for var in queued {
            self.trail.set_elim(var, ElimState::Replaced);
            self.trail.set_decision_var(var, false);
            self.replacer.replaced_vars += 1;
            self.stats.replaced_vars += 1;
        }
        self.replacer.clear_new_pending();

        if self.propagate().is_some() {
            self.ok = false;
        }
        self.stats.replace_time += start.elapsed().as_secs_f64();
        trace!("perform_replace done, {} vars replaced total", self.stats.replaced_vars);
        self.ok
    }

    // ------------------------------------------------------------------
    // Clause cleaning
    // ------------------------------------------------------------------

    /// Incremental cleanup: every clause touched by a root-level assignment
    /// is dropped (satisfied) or shrunk (falsified literals). The trail must
    /// be fully propagated on entry.
    pub fn remove_and_clean_all(&mut self) -> bool {
        if !self.ok {
            return false;
        }
        debug_assert_eq!(self.trail.decision_level(), 0);
        debug_assert_eq!(self.trail.head, self.trail.len());

        let offsets = self.db.iter_refs().collect_vec();
        for offset in offsets {
            let touched = self.db[offset]
                .iter()
                .any(|&l| self.trail.value_lit(l).is_some());
            if !touched {
                continue;
            }
            let learnt = self.db[offset].learnt;
            let lits = self.db[offset].iter().copied().collect_vec();
            self.detach_long_clause(offset);
            self.db.free(offset);
            if lits.iter().any(|&l| self.trail.value_lit(l) == Some(true)) {
                continue;
            }
            let kept = lits
                .iter()
                .copied()
                .filter(|&l| self.trail.value_lit(l).is_none())
                .collect_vec();
            if kept.len() == 2 {
                self.stats.became_binary += 1;
            }
            if !self.add_clause_int(&kept, learnt) {
                return false;
            }
        }

        // After propagation to fixpoint a touched binary is always
        // satisfied, and a touched ternary is satisfied or down to two free
        // literals.
        let mut sat_bins: Vec<(L, L, bool)> = Vec::new();
        let mut touched_tris: Vec<(L, L, L, bool)> = Vec::new();
        for (index, list) in self.watches.iter() {
            let lit = L::from_index(index);
            for entry in list {
                match *entry {
                    Watched::Binary { other, learnt } if lit.index() < other.index() => {
                        if self.trail.value_lit(lit).is_some()
                            || self.trail.value_lit(other).is_some()
                        {
                            sat_bins.push((lit, other, learnt));
                        }
                    }
                    Watched::Ternary { a, b, learnt } if lit.index() < a.index() => {
                        if self.trail.value_lit(lit).is_some()
                            || self.trail.value_lit(a).is_some()
                            || self.trail.value_lit(b).is_some()
                        {
                            touched_tris.push((lit, a, b, learnt));
                        }
                    }
                    _ => {}
                }
            }
        }
        for (a, b, learnt) in sat_bins {
            debug_assert!(
                self.trail.value_lit(a) == Some(true) || self.trail.value_lit(b) == Some(true)
            );
            self.detach_bin_clause(a, b, learnt);
        }
        for (a, b, c, learnt) in touched_tris {
            self.detach_tri_clause(a, b, c, learnt);
            let lits = [a, b, c];
            if lits.iter().any(|&l| self.trail.value_lit(l) == Some(true)) {
                continue;
            }
            let kept = lits
                .iter()
                .copied()
                .filter(|&l| self.trail.value_lit(l).is_none())
                .collect_vec();
            debug_assert_eq!(kept.len(), 2);
            self.attach_bin_clause(kept[0], kept[1], learnt);
        }

        if !self.clean_xor_clauses() {
            return false;
        }
        if self.propagate().is_some() {
            self.ok = false;
        }
        self.ok
    }

    /// Folds root assignments into every XOR constraint; length-two results
    /// enter the equivalence registry, length-one become units.
    pub(crate) fn clean_xor_clauses(&mut self) -> bool {
        let xors = std::mem::take(&mut self.xors);
        for xor in xors {
            if xor
                .vars
                .iter()
                .all(|&v| self.trail.root_value(v).is_none() && !self.replacer.is_replaced(v))
            {
                self.xors.push(xor);
                continue;
            }
            if !self.add_xor_clause(&xor.vars, xor.rhs) {
                return false;
            }
        }
        true
    }

    /// The fallback for large changes: clears every watch list, cleans every
    /// clause, and re-attaches the survivors with the watched-literal
    /// invariants restored. Counters are rebuilt from scratch.
    pub fn detach_and_reattach(&mut self) -> bool {
        if !self.ok {
            return false;
        }
        debug_assert_eq!(self.trail.decision_level(), 0);

        let mut bins: Vec<(L, L, bool)> = Vec::new();
        let mut tris: Vec<(L, L, L, bool)> = Vec::new();
        for (index, list) in self.watches.iter() {
            let lit = L::from_index(index);
            for entry in list {
                match *entry {
                    Watched::Binary { other, learnt } if lit.index() < other.index() => {
                        bins.push((lit, other, learnt));
                    }
                    Watched::Ternary { a, b, learnt } if lit.index() < a.index() => {
                        tris.push((lit, a, b, learnt));
                    }
                    _ => {}
                }
            }
        }

        self.watches.clear_all();
        self.stats.irred_bins = 0;
        self.stats.red_bins = 0;
        self.stats.irred_tris = 0;
        self.stats.red_tris = 0;
        self.stats.irred_longs = 0;
        self.stats.red_longs = 0;
        self.stats.irred_lits = 0;
        self.stats.red_lits = 0;

        for (a, b, learnt) in bins {
            if !self.add_clause_int(&[a, b], learnt) {
                return false;
            }
        }
        for (a, b, c, learnt) in tris {
            if !self.add_clause_int(&[a, b, c], learnt) {
                return false;
            }
        }

        let offsets = self.db.iter_refs().collect_vec();
        for offset in offsets {
            let learnt = self.db[offset].learnt;
            let lits = self.db[offset].iter().copied().collect_vec();
            if lits.iter().any(|&l| self.trail.value_lit(l) == Some(true)) {
                self.db.free(offset);
                continue;
            }
            let kept = lits
                .iter()
                .copied()
                .filter(|&l| self.trail.value_lit(l).is_none())
                .collect_vec();
            if kept.len() >= 4 {
                if kept.len() < lits.len() {
                    let clause = &mut self.db[offset];
                    clause.literals.clear();
                    clause.literals.extend(kept);
                }
                self.attach_long_clause(offset);
            } else {
                if kept.len() == 2 {
                    self.stats.became_binary += 1;
                }
                self.db.free(offset);
                if !self.add_clause_int(&kept, learnt) {
                    return false;
                }
            }
        }

        if !self.clean_xor_clauses() {
            return false;
        }
        if self.propagate().is_some() {
            self.ok = false;
        }
        self.ok
    }

    // ------------------------------------------------------------------
    // The inprocessing driver
    // ------------------------------------------------------------------

    /// Runs the inprocessing engine once: propagate, flush equivalences,
    /// implicit subsumption, failed-literal probing (with its harvests),
    /// and optionally useless-binary elimination. The interrupt flag is
    /// polled at every phase boundary; interruption keeps all invariants
    /// intact and reports partial progress as success.
    pub fn simplify(&mut self) -> SimplifyStatus {
        if !self.ok {
            return SimplifyStatus::Unsat;
        }
        debug_assert_eq!(self.trail.decision_level(), 0);
        let trail_before = self.trail.len();

        if self.propagate().is_some() {
            self.ok = false;
            return SimplifyStatus::Unsat;
        }

        macro_rules! phase {
            ($call:expr) => {
                if self.interrupted() {
                    debug!("simplify interrupted");
                    return SimplifyStatus::Interrupted;
                }
                if !$call {
                    return SimplifyStatus::Unsat;
                }
            };
        }

        phase!(self.perform_replace());
        phase!(self.subsume_and_strengthen_implicit());
        phase!(self.probe());
        phase!(self.perform_replace());
        if self.config.remove_useless_bins && !self.config.add_extra_bins {
            phase!(self.remove_useless_bins_all());
        }
        phase!(self.subsume_and_strengthen_implicit());

        self.stats.zero_level_assigns += (self.trail.len() - trail_before) as u64;
        self.stats.log_totals();
        SimplifyStatus::Ok
    }

    // ------------------------------------------------------------------
    // Invariant checking
    // ------------------------------------------------------------------

    /// Walks every watch list and clause, asserting the watched-literal
    /// invariants and that the statistics counters agree with a recount.
    /// A violation is a program bug, so this panics.
    #[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
    pub fn check_clause_attach(&self) {
        let mut bin_halves = 0u64;
        let mut red_bin_halves = 0u64;
        let mut tri_thirds = 0u64;
        let mut red_tri_thirds = 0u64;
        let mut long_watches: rustc_hash::FxHashMap<ClauseRef, usize> =
            rustc_hash::FxHashMap::default();

        for (index, list) in self.watches.iter() {
            let lit = L::from_index(index);
            for entry in list {
                match *entry {
                    Watched::Binary { other, learnt } => {
                        bin_halves += 1;
                        if learnt {
                            red_bin_halves += 1;
                        }
                        let partner = self.watches[other]
                            .iter()
                            .filter(|w| {
                                matches!(w, Watched::Binary { other: o, learnt: l }
                                    if *o == lit && *l == learnt)
                            })
                            .count();
                        assert!(
                            partner >= 1,
                            "binary {lit:?} {other:?} missing partner entry"
                        );
                    }
                    Watched::Ternary { a, b, learnt } => {
                        tri_thirds += 1;
                        if learnt {
                            red_tri_thirds += 1;
                        }
                        assert!(a.index() < b.index(), "ternary partners unsorted");
                        for (x, y) in [(a, b), (b, a)] {
                            let found = self.watches[x].iter().any(|w| {
                                matches!(w, Watched::Ternary { a: p, b: q, learnt: l }
                                    if *l == learnt
                                        && ((*p == lit && *q == y) || (*p == y && *q == lit)))
                            });
                            assert!(found, "ternary {lit:?} {a:?} {b:?} missing in {x:?}");
                        }
                    }
                    Watched::Long { offset } => {
                        let clause = &self.db[offset];
                        assert!(
                            clause[0] == lit || clause[1] == lit,
                            "long clause watched on a non-watch literal"
                        );
                        *long_watches.entry(offset).or_insert(0) += 1;
                    }
                }
            }
        }

        assert_eq!(bin_halves % 2, 0);
        assert_eq!(tri_thirds % 3, 0);
        assert_eq!(
            bin_halves / 2,
            self.stats.irred_bins + self.stats.red_bins,
            "binary counter out of sync"
        );
        assert_eq!(red_bin_halves / 2, self.stats.red_bins);
        assert_eq!(
            tri_thirds / 3,
            self.stats.irred_tris + self.stats.red_tris,
            "ternary counter out of sync"
        );
        assert_eq!(red_tri_thirds / 3, self.stats.red_tris);

        let mut irred_lits = self.stats.irred_bins * 2 + self.stats.irred_tris * 3;
        let mut red_lits = self.stats.red_bins * 2 + self.stats.red_tris * 3;
        let mut irred_longs = 0u64;
        let mut red_longs = 0u64;
        for offset in self.db.iter_refs() {
            assert_eq!(
                long_watches.get(&offset).copied().unwrap_or(0),
                2,
                "long clause not watched exactly twice"
            );
            let clause = &self.db[offset];
            assert!(clause.len() >= 4);
            if clause.learnt {
                red_longs += 1;
                red_lits += clause.len() as u64;
            } else {
                irred_longs += 1;
                irred_lits += clause.len() as u64;
            }
        }
        assert_eq!(long_watches.len(), self.db.num_live());
        assert_eq!(irred_longs, self.stats.irred_longs);
        assert_eq!(red_longs, self.stats.red_longs);
        assert_eq!(irred_lits, self.stats.irred_lits, "irred literal counter");
        assert_eq!(red_lits, self.stats.red_lits, "red literal counter");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::literal::PackedLiteral;

    type TestSolver = Solver<PackedLiteral>;

    fn lit(value: i32) -> PackedLiteral {
        PackedLiteral::from_i32(value)
    }

    fn solver_with(num_vars: usize, clauses: &[&[i32]]) -> TestSolver {
        let mut solver = TestSolver::new(SolverConfig::default());
        solver.new_vars(num_vars + 1);
        for clause in clauses {
            let lits = clause.iter().map(|&v| lit(v)).collect::<Vec<_>>();
            assert!(solver.add_clause(&lits));
        }
        solver
    }

    #[test]
    fn test_add_clause_dedup_and_tautology() {
        let mut solver = solver_with(4, &[]);
        assert!(solver.add_clause(&[lit(1), lit(1), lit(2)]));
        assert_eq!(solver.stats.irred_bins, 1);

        // Tautologies vanish without touching the database.
        assert!(solver.add_clause(&[lit(3), lit(-3), lit(4)]));
        assert_eq!(solver.n_clauses(), 1);
        solver.check_clause_attach();
    }

    #[test]
    fn test_add_clause_sizes() {
        let mut solver = solver_with(6, &[]);
        assert!(solver.add_clause(&[lit(1)]));
        assert_eq!(solver.value(lit(1)), Some(true));

        assert!(solver.add_clause(&[lit(2), lit(3)]));
        assert!(solver.add_clause(&[lit(2), lit(3), lit(4)]));
        assert!(solver.add_clause(&[lit(2), lit(3), lit(4), lit(5)]));
        assert_eq!(solver.stats.irred_bins, 1);
        assert_eq!(solver.stats.irred_tris, 1);
        assert_eq!(solver.stats.irred_longs, 1);
        assert_eq!(solver.stats.irred_lits, 2 + 3 + 4);

        // A satisfied clause is dropped, a falsified literal shrinks.
        assert!(solver.add_clause(&[lit(1), lit(6)]));
        assert_eq!(solver.stats.irred_bins, 1);
        assert!(solver.add_clause(&[lit(-1), lit(5), lit(6)]));
        assert_eq!(solver.stats.irred_bins, 2);
        solver.check_clause_attach();
    }

    #[test]
    fn test_add_clause_empty_is_unsat() {
        let mut solver = solver_with(2, &[]);
        assert!(solver.add_clause(&[lit(1)]));
        assert!(!solver.add_clause(&[lit(-1)]));
        assert!(!solver.is_ok());
        // Everything short-circuits afterwards.
        assert!(!solver.add_clause(&[lit(2)]));
        assert_eq!(solver.simplify(), SimplifyStatus::Unsat);
    }

    #[test]
    fn test_add_clause_rewrites_representatives() {
        let mut solver = solver_with(4, &[]);
        assert!(solver
            .replacer
            .replace(1, 2, true, &mut solver.trail));
        // {2, 3} becomes {¬1, 3} under 2 = ¬1.
        assert!(solver.add_clause(&[lit(2), lit(3)]));
        let list = &solver.watches[lit(-1)];
        assert_eq!(list.len(), 1);
        solver.check_clause_attach();
    }

    #[test]
    fn test_add_xor_clause_sizes() {
        let mut solver = solver_with(6, &[]);

        // Two equal vars cancel: 1 ⊕ 1 ⊕ 2 = true collapses to 2 = true.
        assert!(solver.add_xor_clause(&[1, 1, 2], true));
        assert_eq!(solver.value(lit(2)), Some(true));

        // 3 ⊕ 4 = false is an equivalence.
        assert!(solver.add_xor_clause(&[3, 4], false));
        assert!(solver.replacer.is_replaced(4));

        // Longer xors are indexed for probing.
        assert!(solver.add_xor_clause(&[1, 5, 6], false));
        assert_eq!(solver.xor_clauses().len(), 1);
        assert_eq!(solver.xor_clauses()[0].vars.as_slice(), &[1, 5, 6]);
        assert!(!solver.xor_clauses()[0].rhs);
    }

    #[test]
    fn test_perform_replace_rewrites_everything() {
        let mut solver = solver_with(6, &[
            &[1, 2, 3, 4],
            &[2, 5],
            &[2, 5, 6],
        ]);
        assert!(solver.add_xor_clause(&[2, 5, 6], true));

        // 2 = ¬1 everywhere.
        assert!(solver.replacer.replace(1, 2, true, &mut solver.trail));
        assert!(solver.perform_replace());
        solver.check_clause_attach();

        assert_eq!(solver.trail.elim(2), ElimState::Replaced);
        assert!(!solver.trail.is_decision_var(2));
        // No clause mentions variable 2 anymore.
        for (index, list) in solver.watches.iter() {
            if PackedLiteral::from_index(index).variable() == 2 {
                assert!(list.is_empty());
            }
        }
        for offset in solver.db.iter_refs() {
            assert!(solver.db[offset].iter().all(|l| l.variable() != 2));
        }
        assert!(solver.xors.iter().all(|x| !x.vars.contains(&2)));
    }

    #[test]
    fn test_perform_replace_applies_pending_units() {
        let mut solver = solver_with(3, &[&[1]]);
        // 1 = ¬2 with 1 already true forces ¬2.
        assert!(solver.replacer.replace(1, 2, true, &mut solver.trail));
        assert!(solver.perform_replace());
        assert_eq!(solver.value(lit(2)), Some(false));
    }

    #[test]
    fn test_remove_and_clean_all() {
        let mut solver = solver_with(6, &[
            &[1, 2, 3, 4, 5],
            &[-1, 2, 3],
            &[-1, 4],
            &[5, 6],
        ]);
        assert!(solver.add_clause(&[lit(1)]));
        assert!(solver.remove_and_clean_all());
        solver.check_clause_attach();

        // {1,...} satisfied and gone; {-1,2,3} became {2,3}; {-1,4} forced 4.
        assert_eq!(solver.db.num_live(), 0);
        assert_eq!(solver.value(lit(4)), Some(true));
        assert_eq!(solver.stats.irred_tris, 0);
        assert_eq!(solver.stats.irred_bins, 2);
    }

    #[test]
    fn test_detach_and_reattach_round_trip() {
        let mut solver = solver_with(6, &[
            &[1, 2, 3, 4],
            &[-2, 3],
            &[3, 4, 5],
            &[-5, -6],
        ]);
        let stats_before = (
            solver.stats.irred_bins,
            solver.stats.irred_tris,
            solver.stats.irred_longs,
            solver.stats.irred_lits,
        );
        assert!(solver.detach_and_reattach());
        solver.check_clause_attach();
        let stats_after = (
            solver.stats.irred_bins,
            solver.stats.irred_tris,
            solver.stats.irred_longs,
            solver.stats.irred_lits,
        );
        assert_eq!(stats_before, stats_after);

        // The trail is reproduced identically by propagation.
        let trail_before = solver.trail.len();
        assert!(solver.propagate().is_none());
        assert_eq!(solver.trail.len(), trail_before);
    }

    #[test]
    fn test_interrupt_returns_partial_progress() {
        let mut solver = solver_with(3, &[&[1, 2], &[-2, 3]]);
        solver.interrupt_handle().store(true, Ordering::Relaxed);
        assert_eq!(solver.simplify(), SimplifyStatus::Interrupted);
        assert!(solver.is_ok());
        solver.check_clause_attach();
    }
}
