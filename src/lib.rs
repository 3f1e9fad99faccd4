#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Root-level inprocessing for CNF formulas: failed-literal probing with
//! by-product harvesting (equivalent literals, hyper-binary resolution,
//! necessary assignments) and implicit-clause subsumption, all at decision
//! level zero.

/// The `sat` module implements the simplification engine: trail and watch
/// lists, unit propagation, the equivalence registry, the failed-literal
/// prober and the implicit subsumer.
pub mod sat;

/// The `command_line` module implements the standalone preprocessor binary.
pub mod command_line;
