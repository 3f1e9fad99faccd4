#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Incremental tracking of unassigned-literal counts per XOR constraint.
//!
//! The prober uses this to spot XOR constraints that shrink to exactly two
//! unassigned variables during a probe: a 2-long XOR is an equivalence (or
//! anti-equivalence) between those variables. Decrements performed while a
//! probe's propagation runs are reversed on cancellation, so the counters
//! always reflect root-level assignments between probes. A touched bitset
//! plus an investigation list give O(1) dedup per probe.

use crate::sat::literal::{Literal, Variable};
use crate::sat::trail::Trail;
use bit_vec::BitVec;
use smallvec::SmallVec;

/// An XOR constraint: `vars[0] ⊕ vars[1] ⊕ ... = rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XorClause {
    pub vars: SmallVec<[Variable; 4]>,
    pub rhs: bool,
}

impl XorClause {
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// An XOR constraint reduced to two unassigned variables, with the parity of
/// the assigned remainder folded into `rhs`: `vars[0] ⊕ vars[1] = rhs`.
/// Variables are stored sorted so candidates from different probe passes
/// compare equal exactly when they denote the same equivalence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TwoLongXor {
    pub vars: [Variable; 2],
    pub rhs: bool,
}

#[derive(Debug, Clone, Default)]
pub struct XorIndex {
    /// Per variable, the indices of XOR constraints containing it.
    occur: Vec<Vec<u32>>,
    /// Live size of each XOR: its still-unassigned variable count.
    sizes: Vec<u32>,
    touched: BitVec,
    investigate: Vec<u32>,
    pub enabled: bool,
}

impl XorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the index. The XOR set must already be clean: no assigned
    /// variables inside any constraint, so every live size starts at the
    /// constraint's full length.
    pub fn build(&mut self, xors: &[XorClause], num_vars: usize) {
        self.occur.clear();
        self.occur.resize(num_vars, Vec::new());
        self.sizes.clear();
        self.investigate.clear();

        for (i, xor) in xors.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            self.sizes.push(xor.len() as u32);
            for &var in &xor.vars {
                #[allow(clippy::cast_possible_truncation)]
                self.occur[var as usize].push(i as u32);
            }
        }
        self.touched = BitVec::from_elem(xors.len(), false);
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.occur.clear();
        self.sizes.clear();
        self.investigate.clear();
    }

    #[must_use]
    pub fn size(&self, xor_index: u32) -> u32 {
        self.sizes[xor_index as usize]
    }

    /// A variable became assigned: decrement the live size of every XOR
    /// containing it and mark those XORs for investigation.
    pub fn remove_var(&mut self, var: Variable) {
        let occ = &self.occur[var as usize];
        if occ.is_empty() {
            return;
        }
        for &i in occ {
            self.sizes[i as usize] -= 1;
            if !self.touched.get(i as usize).unwrap_or(false) {
                self.touched.set(i as usize, true);
                self.investigate.push(i);
            }
        }
    }

    /// Reverses [`Self::remove_var`] when the assignment is undone.
    pub fn add_var(&mut self, var: Variable) {
        for &i in &self.occur[var as usize] {
            self.sizes[i as usize] += 1;
        }
    }

    /// XORs touched since the last reset, in touch order.
    #[must_use]
    pub fn investigate(&self) -> &[u32] {
        &self.investigate
    }

    pub fn reset_touched(&mut self) {
        for &i in &self.investigate {
            self.touched.set(i as usize, false);
        }
        self.investigate.clear();
    }

    /// Reads a live-size-2 XOR into its canonical two-variable form under
    /// the current assignment.
    ///
    /// # Panics
    ///
    /// The constraint must have exactly two unassigned variables.
    #[must_use]
    pub fn two_long<L: Literal>(xor: &XorClause, trail: &Trail<L>) -> TwoLongXor {
        let mut vars = [0; 2];
        let mut num = 0;
        let mut rhs = xor.rhs;
        for &var in &xor.vars {
            match Option::<bool>::from(trail.value_var(var)) {
                None => {
                    assert!(num < 2, "xor is not 2-long");
                    vars[num] = var;
                    num += 1;
                }
                Some(value) => rhs ^= value,
            }
        }
        assert_eq!(num, 2, "xor is not 2-long");
        vars.sort_unstable();
        TwoLongXor { vars, rhs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::assignment::Reason;
    use crate::sat::literal::PackedLiteral;

    fn xor(vars: &[Variable], rhs: bool) -> XorClause {
        XorClause {
            vars: SmallVec::from_slice(vars),
            rhs,
        }
    }

    fn lit(value: i32) -> PackedLiteral {
        PackedLiteral::from_i32(value)
    }

    #[test]
    fn test_remove_add_round_trip() {
        let xors = vec![xor(&[1, 2, 3], false), xor(&[2, 4], true)];
        let mut index = XorIndex::new();
        index.build(&xors, 5);

        assert_eq!(index.size(0), 3);
        assert_eq!(index.size(1), 2);

        index.remove_var(2);
        assert_eq!(index.size(0), 2);
        assert_eq!(index.size(1), 1);
        assert_eq!(index.investigate(), &[0, 1]);

        index.remove_var(2);
        // Touch dedup: the list does not grow again.
        index.reset_touched();
        index.add_var(2);
        index.add_var(2);

        assert_eq!(index.size(0), 3);
        assert_eq!(index.size(1), 2);
        assert!(index.investigate().is_empty());
    }

    #[test]
    fn test_two_long_folds_assigned_parity() {
        let constraint = xor(&[1, 2, 3], false);
        let mut trail: Trail<PackedLiteral> = Trail::new(4);
        trail.unchecked_enqueue(lit(1), Reason::Decision);

        let two = XorIndex::two_long(&constraint, &trail);
        assert_eq!(two.vars, [2, 3]);
        // 1 is true, so 2 ⊕ 3 = false ⊕ true.
        assert!(two.rhs);

        // With 1 false instead, the parity is unchanged from the constraint.
        let mut trail: Trail<PackedLiteral> = Trail::new(4);
        trail.unchecked_enqueue(lit(-1), Reason::Decision);
        let two = XorIndex::two_long(&constraint, &trail);
        assert_eq!(two.vars, [2, 3]);
        assert!(!two.rhs);
    }
}
