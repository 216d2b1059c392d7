//! Nested-loop executor.
//!
//! The correctness oracle: for every `l`, scan all of `R` and keep the
//! indices that satisfy the atomic condition directly.

use crate::condition::AtomicCondition;
use crate::relation::Relation;

pub struct NestedLoopIndex<'r, L, R, Rel: Relation<Item = R>> {
    right: &'r Rel,
    cond: &'r AtomicCondition<L, R>,
}

impl<'r, L, R, Rel: Relation<Item = R>> NestedLoopIndex<'r, L, R, Rel> {
    pub fn prepare(right: &'r Rel, cond: &'r AtomicCondition<L, R>) -> Self {
        NestedLoopIndex { right, cond }
    }

    pub fn probe(&self, i_l: usize, l: &L) -> Vec<usize> {
        (0..self.right.len())
            .filter(|&i_r| self.cond.is_match(l, self.right.get(i_r), i_l, i_r))
            .collect()
    }
}
