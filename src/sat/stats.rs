#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Counters exposed to the statistics reporter.
//!
//! The clause counters (`irred_bins`, `red_bins`, ...) are maintained in
//! lockstep with every watch-list mutation; `check_stats` in the solver
//! recomputes them from scratch and asserts agreement.

use log::info;

#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Irredundant (non-learnt) binary clauses.
    pub irred_bins: u64,
    /// Learnt binary clauses.
    pub red_bins: u64,
    pub irred_tris: u64,
    pub red_tris: u64,
    pub irred_longs: u64,
    pub red_longs: u64,
    /// Literal totals over all irredundant / learnt clauses.
    pub irred_lits: u64,
    pub red_lits: u64,

    /// Failed literals found by probing.
    pub num_failed: u64,
    /// Necessary assignments: variables forced identically by both
    /// polarities of a probe.
    pub good_both_same: u64,
    /// Equivalences discovered through the XOR index.
    pub new_bin_xor: u64,
    /// Equivalences discovered from opposing probe propagations.
    pub both_invert: u64,
    /// Hyper-binary clauses added.
    pub hyperbin_added: u64,
    /// Useless binary clauses removed.
    pub useless_bin_removed: u64,
    /// Variables substituted by their equivalence representative.
    pub replaced_vars: u64,
    /// Root-level assignments produced by simplification.
    pub zero_level_assigns: u64,
    /// Long clauses that shrank to binaries during cleaning.
    pub became_binary: u64,

    /// CPU seconds per phase.
    pub probe_time: f64,
    pub subsume_time: f64,
    pub useless_bin_time: f64,
    pub replace_time: f64,
}

impl Stats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_probe_round(&self, propagations: u64, time: f64) {
        #[allow(clippy::cast_precision_loss)]
        let mega_props = propagations as f64 / 1_000_000.0;
        info!(
            "probe: flit {} bsame {} bin-xor {} b-invert {} hyper-bins {} props {mega_props:.1}M time {time:.2}s",
            self.num_failed,
            self.good_both_same,
            self.new_bin_xor,
            self.both_invert,
            self.hyperbin_added,
        );
    }

    pub fn log_totals(&self) {
        info!(
            "clauses: irred-bin {} red-bin {} irred-tri {} red-tri {} irred-long {} red-long {}",
            self.irred_bins,
            self.red_bins,
            self.irred_tris,
            self.red_tris,
            self.irred_longs,
            self.red_longs,
        );
        info!(
            "times: probe {:.2}s subsume {:.2}s useless-bin {:.2}s replace {:.2}s",
            self.probe_time, self.subsume_time, self.useless_bin_time, self.replace_time,
        );
    }
}
