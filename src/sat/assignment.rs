#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Per-variable state for the root-level simplification engine.
//!
//! Each variable carries a three-valued assignment plus the bookkeeping the
//! inprocessing passes need: the decision level it was assigned at, the
//! clause that forced it, whether it has been eliminated or replaced by an
//! equivalent literal, and whether it is still eligible as a decision.

use crate::sat::clause::ClauseRef;
use crate::sat::literal::Literal;

/// Represents the assignment state of a propositional variable.
///
/// A variable can be unassigned, or assigned to true or false.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Default, Hash, PartialOrd, Ord)]
pub enum VarState {
    /// The variable has not been assigned a truth value.
    #[default]
    Unassigned,
    /// The variable has been assigned a specific truth value.
    Assigned(bool),
}

impl VarState {
    /// Checks if the variable state is `Assigned`.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    /// Checks if the variable state is `Unassigned`.
    #[must_use]
    pub const fn is_unassigned(self) -> bool {
        !self.is_assigned()
    }

    /// Checks if the variable state is `Assigned(true)`.
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::Assigned(true))
    }

    /// Checks if the variable state is `Assigned(false)`.
    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::Assigned(false))
    }
}

impl From<VarState> for Option<bool> {
    fn from(s: VarState) -> Self {
        match s {
            VarState::Assigned(b) => Some(b),
            VarState::Unassigned => None,
        }
    }
}

impl From<Option<bool>> for VarState {
    fn from(b: Option<bool>) -> Self {
        b.map_or(Self::Unassigned, VarState::Assigned)
    }
}

/// Why a variable left the pool of free variables.
///
/// `Replaced` variables have been substituted by their equivalence-class
/// representative everywhere; `QueuedForReplace` variables are awaiting that
/// substitution. `Eliminated` is reserved for the external variable
/// eliminator, whose clauses must never reach this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum ElimState {
    #[default]
    None,
    Eliminated,
    Replaced,
    QueuedForReplace,
}

/// The clause that forced an assignment, or `Decision` for decisions and
/// root-level facts. Binary and ternary clauses are inlined in watch lists,
/// so their reasons carry the remaining literals by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reason<L: Literal> {
    #[default]
    Decision,
    Binary(L),
    Ternary(L, L),
    Long(ClauseRef),
}

/// Bookkeeping attached to every variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarData<L: Literal> {
    /// Decision level the variable was assigned at. Meaningless while the
    /// variable is unassigned.
    pub level: u32,
    /// Reason clause for the assignment.
    pub reason: Reason<L>,
    pub elim: ElimState,
    /// Whether the variable may be picked as a decision or probe target.
    pub decision: bool,
}

impl<L: Literal> Default for VarData<L> {
    fn default() -> Self {
        Self {
            level: 0,
            reason: Reason::Decision,
            elim: ElimState::None,
            decision: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_state() {
        assert!(VarState::Unassigned.is_unassigned());
        assert!(!VarState::Unassigned.is_assigned());
        assert!(!VarState::Unassigned.is_true());
        assert!(!VarState::Unassigned.is_false());

        assert!(!VarState::Assigned(true).is_unassigned());
        assert!(VarState::Assigned(true).is_assigned());
        assert!(VarState::Assigned(true).is_true());
        assert!(!VarState::Assigned(true).is_false());

        assert!(!VarState::Assigned(false).is_unassigned());
        assert!(VarState::Assigned(false).is_assigned());
        assert!(!VarState::Assigned(false).is_true());
        assert!(VarState::Assigned(false).is_false());
    }

    #[test]
    fn test_var_state_option_round_trip() {
        for state in [
            VarState::Unassigned,
            VarState::Assigned(true),
            VarState::Assigned(false),
        ] {
            let opt: Option<bool> = state.into();
            assert_eq!(VarState::from(opt), state);
        }
    }
}
