#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! A parser and writer for the DIMACS CNF format.
//!
//! The format:
//! - Comment lines starting with 'c'.
//! - A problem line 'p cnf <`num_variables`> <`num_clauses`>'.
//! - Clause lines of whitespace-separated literals terminated by '0'.
//! - XOR clause lines prefixed with 'x' ("x1 -2 3 0" constrains
//!   `1 ⊕ ¬2 ⊕ 3 = true`), as understood by XOR-aware solvers.
//! - An optional '%' end-of-data marker (used in competition data).
//!
//! Literals may appear in any order within a clause; duplicate and
//! tautological clauses are handled by the solver's ingestion path. A clause
//! empty after rewriting means the instance is unsatisfiable, a unit is
//! enqueued directly.

use crate::sat::literal::Literal;
use crate::sat::solver::Solver;
use itertools::Itertools;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// A parsed DIMACS problem, before solver ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Problem {
    pub num_vars: usize,
    pub clauses: Vec<Vec<i32>>,
    /// XOR constraints as signed literals; the constraint is that the xor of
    /// the literal values is true.
    pub xor_clauses: Vec<Vec<i32>>,
}

/// Parses DIMACS formatted data from a `BufRead` source.
///
/// # Errors
///
/// Malformed literal tokens and clause lines without a terminating '0'
/// report an error message.
pub fn parse_dimacs<R: BufRead>(reader: R) -> Result<Problem, String> {
    let mut problem = Problem::default();

    for line in reader.lines() {
        let line = line.map_err(|e| format!("read error: {e}"))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') || line.starts_with('p') {
            continue;
        }
        if line.starts_with('%') {
            break;
        }

        let (is_xor, body) = line
            .strip_prefix('x')
            .map_or((false, line), |rest| (true, rest));

        let mut literals = Vec::new();
        let mut terminated = false;
        for token in body.split_whitespace() {
            let value: i32 = token
                .parse()
                .map_err(|e| format!("failed to parse literal '{token}': {e}"))?;
            if value == 0 {
                terminated = true;
                break;
            }
            problem.num_vars = problem.num_vars.max(value.unsigned_abs() as usize);
            literals.push(value);
        }
        if !terminated {
            return Err(format!("clause line without terminating 0: '{line}'"));
        }
        if literals.is_empty() && !is_xor {
            // An explicitly empty clause: unsatisfiable input.
            problem.clauses.push(literals);
            continue;
        }
        if is_xor {
            problem.xor_clauses.push(literals);
        } else {
            problem.clauses.push(literals);
        }
    }
    Ok(problem)
}

/// Parses a DIMACS CNF file by path.
///
/// # Errors
///
/// IO failures and malformed content are reported as `io::Error`.
pub fn parse_file(path: &Path) -> io::Result<Problem> {
    let file = std::fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    parse_dimacs(reader).map_err(|message| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: {message}", path.display()),
        )
    })
}

/// Loads a parsed problem into a solver. Variables are 1-indexed in DIMACS,
/// so slot 0 exists but never takes part in anything.
pub fn load_problem<L: Literal>(solver: &mut Solver<L>, problem: &Problem) -> bool {
    solver.new_vars(problem.num_vars + 1);
    solver.set_decision_var(0, false);

    for clause in &problem.clauses {
        let lits = clause.iter().map(|&v| L::from_i32(v)).collect_vec();
        if !solver.add_clause(&lits) {
            return false;
        }
    }
    for xor in &problem.xor_clauses {
        // Fold literal signs into the parity: ¬a ⊕ b = !(a ⊕ b).
        let rhs = xor.iter().filter(|&&v| v < 0).count() % 2 == 0;
        let vars = xor.iter().map(|&v| v.unsigned_abs()).collect_vec();
        if !solver.add_xor_clause(&vars, rhs) {
            return false;
        }
    }
    true
}

/// Writes the solver's current formula back out as DIMACS, including the
/// root-level units, so the output is usable standalone.
///
/// # Errors
///
/// Propagates IO failures from the writer.
pub fn write_dimacs<L: Literal, W: Write>(solver: &Solver<L>, writer: &mut W) -> io::Result<()> {
    let num_vars = solver.n_vars().saturating_sub(1);
    let clauses = solver.n_clauses() + solver.trail().len();
    writeln!(writer, "p cnf {num_vars} {clauses}")?;

    for lit in solver.trail().iter() {
        writeln!(writer, "{} 0", lit.to_i32())?;
    }
    for clause in solver.all_clauses() {
        let line = clause.iter().map(Literal::to_i32).join(" ");
        writeln!(writer, "{line} 0")?;
    }
    for xor in solver.xor_clauses() {
        #[allow(clippy::cast_possible_wrap)]
        let mut parts = xor.vars.iter().map(|&v| v as i32);
        let first = parts.next().unwrap_or(0);
        let first = if xor.rhs { first } else { -first };
        let rest = parts.map(|v| v.to_string()).join(" ");
        if rest.is_empty() {
            writeln!(writer, "x{first} 0")?;
        } else {
            writeln!(writer, "x{first} {rest} 0")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::configs::SolverConfig;
    use crate::sat::literal::PackedLiteral;
    use std::io::Cursor;

    #[test]
    fn test_parse_simple_dimacs() {
        let content = "c This is a comment\n\
                       p cnf 3 2\n\
                       1 -2 0\n\
                       2 3 0\n";
        let problem = parse_dimacs(Cursor::new(content)).unwrap();

        assert_eq!(problem.num_vars, 3);
        assert_eq!(problem.clauses, vec![vec![1, -2], vec![2, 3]]);
        assert!(problem.xor_clauses.is_empty());
    }

    #[test]
    fn test_parse_xor_lines_and_end_marker() {
        let content = "p cnf 4 2\n\
                       x1 -2 3 0\n\
                       1 4 0\n\
                       %\n\
                       c ignored";
        let problem = parse_dimacs(Cursor::new(content)).unwrap();

        assert_eq!(problem.clauses, vec![vec![1, 4]]);
        assert_eq!(problem.xor_clauses, vec![vec![1, -2, 3]]);
    }

    #[test]
    fn test_parse_malformed_literal() {
        let result = parse_dimacs(Cursor::new("1 abc 0\n"));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_missing_terminator() {
        let result = parse_dimacs(Cursor::new("1 2\n"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_problem_and_write_round_trip() {
        let content = "p cnf 5 4\n\
                       1 0\n\
                       -1 2 3 0\n\
                       2 3 4 5 0\n\
                       x2 3 4 0\n";
        let problem = parse_dimacs(Cursor::new(content)).unwrap();
        let mut solver: Solver<PackedLiteral> = Solver::new(SolverConfig::default());
        assert!(load_problem(&mut solver, &problem));

        // The unit propagated, {-1,2,3} shrank to a binary.
        assert_eq!(solver.value(PackedLiteral::from_i32(1)), Some(true));
        assert_eq!(solver.stats.irred_bins, 1);

        let mut out = Vec::new();
        write_dimacs(&solver, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1 0"));
        assert!(text.contains("2 3 0"));
        assert!(text.contains("x2 3 4 0"));

        // The emitted formula parses back to the same clause counts.
        let again = parse_dimacs(Cursor::new(text.as_str())).unwrap();
        assert_eq!(again.clauses.len(), 3);
        assert_eq!(again.xor_clauses.len(), 1);
    }

    #[test]
    fn test_load_problem_unsat_empty_clause() {
        let problem = parse_dimacs(Cursor::new("1 0\n-1 0\n")).unwrap();
        let mut solver: Solver<PackedLiteral> = Solver::new(SolverConfig::default());
        assert!(!load_problem(&mut solver, &problem));
        assert!(!solver.is_ok());
    }
}
