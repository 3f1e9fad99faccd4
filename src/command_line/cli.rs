#![allow(clippy::cast_precision_loss)]

use crate::sat::configs::SolverConfig;
use crate::sat::dimacs::{load_problem, parse_file, write_dimacs};
use crate::sat::literal::PackedLiteral;
use crate::sat::solver::{SimplifyStatus, Solver};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

/// Defines the command-line interface for the simplifier.
///
/// Uses `clap` for parsing arguments.
#[derive(Parser, Debug)]
#[command(
    name = "rootsat",
    version,
    about = "Root-level CNF simplifier: failed-literal probing, hyper-binary \
             resolution, equivalent-literal substitution"
)]
pub struct Cli {
    /// Path to the DIMACS .cnf file to simplify.
    pub path: PathBuf,

    /// Number of simplification rounds to run.
    #[arg(short, long, default_value_t = 3)]
    pub rounds: usize,

    /// Propagation budget per probing round.
    #[arg(long, default_value_t = 30_000_000)]
    pub probe_budget: u64,

    /// Disable hyper-binary resolution.
    #[arg(long, default_value_t = false)]
    pub no_hyper_bins: bool,

    /// Enable useless-binary elimination (mutually exclusive with
    /// hyper-binary resolution; implies --no-hyper-bins).
    #[arg(long, default_value_t = false)]
    pub useless_bins: bool,

    /// Disable 2-long XOR discovery.
    #[arg(long, default_value_t = false)]
    pub no_bin_xor: bool,

    /// Seed for the probing heuristics.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Write the simplified formula to this path as DIMACS.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print statistics after simplification.
    #[arg(short, long, default_value_t = true)]
    pub stats: bool,
}

impl Cli {
    fn config(&self) -> SolverConfig {
        SolverConfig {
            probe_budget: self.probe_budget,
            add_extra_bins: !self.no_hyper_bins && !self.useless_bins,
            remove_useless_bins: self.useless_bins,
            bin_xor_find: !self.no_bin_xor,
            seed: self.seed,
            ..SolverConfig::default()
        }
    }
}

/// Parses the input file, runs the requested simplification rounds, reports
/// statistics and optionally writes the simplified formula back out.
///
/// # Errors
///
/// IO failures, malformed DIMACS input and write failures are reported.
pub fn run(cli: &Cli) -> Result<()> {
    let parse_start = Instant::now();
    let problem = parse_file(&cli.path)
        .with_context(|| format!("cannot read {}", cli.path.display()))?;
    let parse_time = parse_start.elapsed();

    let mut solver: Solver<PackedLiteral> = Solver::new(cli.config());
    let loaded = load_problem(&mut solver, &problem);

    let simplify_start = Instant::now();
    let mut status = if loaded {
        SimplifyStatus::Ok
    } else {
        SimplifyStatus::Unsat
    };
    for round in 0..cli.rounds {
        if status != SimplifyStatus::Ok {
            break;
        }
        let assigns_before = solver.n_assigns();
        status = solver.simplify();
        if solver.n_assigns() == assigns_before && round > 0 {
            // Probing fixpoint reached, further rounds cannot add facts.
            break;
        }
    }
    let simplify_time = simplify_start.elapsed();

    if cli.stats {
        print_stats(&solver, parse_time.as_secs_f64(), simplify_time.as_secs_f64());
    }

    match status {
        SimplifyStatus::Unsat => {
            println!("s UNSATISFIABLE");
            return Ok(());
        }
        SimplifyStatus::Interrupted => println!("c interrupted"),
        SimplifyStatus::Ok => {}
    }

    if let Some(output) = &cli.output {
        let file = std::fs::File::create(output)
            .with_context(|| format!("cannot create {}", output.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        write_dimacs(&solver, &mut writer)?;
        println!("c simplified formula written to {}", output.display());
    }
    println!("s UNKNOWN");
    Ok(())
}

/// Helper function to print a single statistic line in a formatted table row.
fn stat_line(label: &str, value: impl std::fmt::Display) {
    println!("|  {label:<28} {value:>18}  |");
}

fn print_stats(solver: &Solver<PackedLiteral>, parse_time: f64, simplify_time: f64) {
    let stats = &solver.stats;

    println!("\n=====================[ Problem Statistics ]=====================");
    stat_line("Parse time (s)", format!("{parse_time:.3}"));
    stat_line("Variables", solver.n_vars().saturating_sub(1));
    stat_line("Free variables", solver.n_free_vars());
    stat_line("Clauses", solver.n_clauses());

    println!("====================[ Simplify Statistics ]=====================");
    stat_line("Failed literals", stats.num_failed);
    stat_line("Necessary assignments", stats.good_both_same);
    stat_line("Equivalences (probing)", stats.both_invert);
    stat_line("Equivalences (bin XOR)", stats.new_bin_xor);
    stat_line("Replaced variables", stats.replaced_vars);
    stat_line("Hyper-binaries added", stats.hyperbin_added);
    stat_line("Useless binaries removed", stats.useless_bin_removed);
    stat_line("Root assignments", solver.n_assigns());
    stat_line("Propagations", solver.num_propagations());
    stat_line("Probe time (s)", format!("{:.3}", stats.probe_time));
    stat_line("Subsume time (s)", format!("{:.3}", stats.subsume_time));
    stat_line("Replace time (s)", format!("{:.3}", stats.replace_time));
    stat_line("CPU time (s)", format!("{simplify_time:.3}"));
    println!("================================================================");
}

/// Entry point shared by the binary.
///
/// # Errors
///
/// See [`run`].
pub fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.rounds == 0 {
        bail!("--rounds must be at least 1");
    }
    run(&cli)
}
