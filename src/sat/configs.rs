#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Tunables for the simplification engine.
//!
//! All budgets are measured in propagation steps, the one currency every
//! long-running pass checks between iterations.

#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Base propagation budget handed to each failed-literal probe round.
    pub probe_budget: u64,
    /// Grow the probe budget by this factor after a productive round.
    pub budget_growth: f64,
    /// Ceiling on the accumulated budget multiplier.
    pub max_budget_multiplier: f64,
    /// A round is productive when it fixed more than this many variables...
    pub found_threshold: usize,
    /// ...or more than this fraction of the free variables.
    pub found_fraction: f64,

    /// Perform hyper-binary resolution during probing.
    pub add_extra_bins: bool,
    /// Fraction of the probe budget granted to hyper-binary resolution.
    pub hyperbin_budget_fraction: f64,
    /// Propagation cap for the degree-sampling precomputation.
    pub degree_sample_budget: u64,
    /// Maximum number of random samples the degree precomputation draws.
    pub max_degree_samples: u64,

    /// Run useless-binary elimination. Mutually exclusive with
    /// `add_extra_bins` within a single simplification pass.
    pub remove_useless_bins: bool,
    /// Propagation cap for a full useless-binary sweep.
    pub useless_bin_budget: u64,

    /// Track XOR constraints for 2-long XOR discovery.
    pub bin_xor_find: bool,
    /// XOR tracking only pays off inside these instance-size limits.
    pub min_xor_clauses: usize,
    pub max_xor_clauses: usize,
    pub max_xor_vars: usize,
    pub max_clauses_for_xor: usize,

    /// Full detach-and-reattach instead of incremental cleanup when a probe
    /// round fixed more than `1 / reattach_fraction` of the free variables...
    pub reattach_fraction: usize,
    /// ...and the database holds at least this many clauses.
    pub reattach_min_clauses: usize,

    /// Seed for the degree-sampling random walk.
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            probe_budget: 30_000_000,
            budget_growth: 1.7,
            max_budget_multiplier: 5.0,
            found_threshold: 500,
            found_fraction: 0.03,

            add_extra_bins: true,
            hyperbin_budget_fraction: 0.2,
            degree_sample_budget: 500_000,
            max_degree_samples: 1_000_000,

            remove_useless_bins: false,
            useless_bin_budget: 3_000_000,

            bin_xor_find: true,
            min_xor_clauses: 5,
            max_xor_clauses: 30_000,
            max_xor_vars: 30_000,
            max_clauses_for_xor: 100_000,

            reattach_fraction: 15,
            reattach_min_clauses: 500_000,

            seed: 0,
        }
    }
}

impl SolverConfig {
    /// Budget granted to hyper-binary resolution in one probe round.
    #[must_use]
    pub fn hyperbin_budget(&self, probe_budget: u64) -> u64 {
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let budget = (probe_budget as f64 * self.hyperbin_budget_fraction) as u64;
        budget
    }
}
