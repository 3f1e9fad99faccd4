#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

use crate::sat::assignment::{ElimState, Reason, VarData, VarState};
use crate::sat::literal::{Literal, Variable};

/// The trail and assignment store: a three-valued assignment per variable,
/// the ordered record of assignments in propagation order, and the stack of
/// trail indices at which each decision level began.
///
/// Cancelling to level `k` truncates the trail to `level_limits[k]` and
/// restores each popped variable to unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trail<L: Literal> {
    assigns: Vec<VarState>,
    var_data: Vec<VarData<L>>,
    trail: Vec<L>,
    level_limits: Vec<usize>,
    /// Propagation queue head: trail entries below this have been propagated.
    pub head: usize,
}

impl<L: Literal> Trail<L> {
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self {
            assigns: vec![VarState::Unassigned; num_vars],
            var_data: (0..num_vars).map(|_| VarData::default()).collect(),
            trail: Vec::with_capacity(num_vars),
            level_limits: Vec::new(),
            head: 0,
        }
    }

    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.assigns.len()
    }

    pub fn grow_to(&mut self, num_vars: usize) {
        while self.assigns.len() < num_vars {
            self.assigns.push(VarState::Unassigned);
            self.var_data.push(VarData::default());
        }
    }

    #[must_use]
    pub fn value_var(&self, var: Variable) -> VarState {
        self.assigns[var as usize]
    }

    /// Truth value of a literal under the current assignment, `None` if its
    /// variable is unassigned.
    #[must_use]
    pub fn value_lit(&self, lit: L) -> Option<bool> {
        Option::<bool>::from(self.assigns[lit.variable() as usize]).map(|b| b == lit.polarity())
    }

    /// Value of a variable only if it was fixed at the root level.
    #[must_use]
    pub fn root_value(&self, var: Variable) -> Option<bool> {
        match self.assigns[var as usize] {
            VarState::Assigned(b) if self.var_data[var as usize].level == 0 => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn decision_level(&self) -> usize {
        self.level_limits.len()
    }

    pub fn new_decision_level(&mut self) {
        self.level_limits.push(self.trail.len());
    }

    /// Trail index at which `level` began.
    #[must_use]
    pub fn level_limit(&self, level: usize) -> usize {
        self.level_limits[level]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trail.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }

    #[must_use]
    pub fn lit_at(&self, index: usize) -> L {
        self.trail[index]
    }

    #[must_use]
    pub fn level(&self, var: Variable) -> u32 {
        self.var_data[var as usize].level
    }

    #[must_use]
    pub fn reason(&self, var: Variable) -> Reason<L> {
        self.var_data[var as usize].reason
    }

    #[must_use]
    pub fn elim(&self, var: Variable) -> ElimState {
        self.var_data[var as usize].elim
    }

    pub fn set_elim(&mut self, var: Variable, elim: ElimState) {
        self.var_data[var as usize].elim = elim;
    }

    #[must_use]
    pub fn is_decision_var(&self, var: Variable) -> bool {
        self.var_data[var as usize].decision
    }

    pub fn set_decision_var(&mut self, var: Variable, decision: bool) {
        self.var_data[var as usize].decision = decision;
    }

    /// Number of unassigned decision variables.
    #[must_use]
    pub fn num_free_vars(&self) -> usize {
        (0..self.assigns.len())
            .filter(|&v| self.assigns[v].is_unassigned() && self.var_data[v].decision)
            .count()
    }

    /// Asserts `lit` at the current decision level.
    ///
    /// # Panics
    ///
    /// The variable must be unassigned.
    pub fn unchecked_enqueue(&mut self, lit: L, reason: Reason<L>) {
        let var = lit.variable() as usize;
        debug_assert!(
            self.assigns[var].is_unassigned(),
            "enqueue of already-assigned variable {var}"
        );
        self.assigns[var] = VarState::Assigned(lit.polarity());
        #[allow(clippy::cast_possible_truncation)]
        let level = self.decision_level() as u32;
        self.var_data[var].level = level;
        self.var_data[var].reason = reason;
        self.trail.push(lit);
    }

    /// Like [`Self::unchecked_enqueue`], but a literal that is already true
    /// is a no-op and a literal that is already false reports the conflict
    /// by returning `false`.
    #[must_use]
    pub fn enqueue(&mut self, lit: L, reason: Reason<L>) -> bool {
        match self.value_lit(lit) {
            Some(true) => true,
            Some(false) => false,
            None => {
                self.unchecked_enqueue(lit, reason);
                true
            }
        }
    }

    /// Pops the trail back to the start of level `level`, clearing each
    /// popped variable's value, level and reason.
    pub fn cancel_until(&mut self, level: usize) {
        if self.decision_level() <= level {
            return;
        }
        let limit = self.level_limits[level];
        for index in (limit..self.trail.len()).rev() {
            let var = self.trail[index].variable() as usize;
            self.assigns[var] = VarState::Unassigned;
            self.var_data[var].level = 0;
            self.var_data[var].reason = Reason::Decision;
        }
        self.trail.truncate(limit);
        self.level_limits.truncate(level);
        self.head = self.head.min(self.trail.len());
    }

    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.trail.iter()
    }
}
