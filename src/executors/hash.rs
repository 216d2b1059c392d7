//! Hash executor.
//!
//! Builds an inverse-CSR over the right side: a `key → [indices]` map
//! represented as two flat arrays (`starts`, `rperm`) so a probe returns a
//! contiguous slice with no per-probe allocation for the lookup itself.
//! (This crate always builds the full `multi = all` shape and leaves the
//! `first`/`last`/`closest` reduction to `engine.rs` — see the module doc
//! in `executors/mod.rs`.)

use std::collections::HashMap;

use crate::condition::KeyAccessor;
use crate::relation::Relation;
use crate::value::Value;

pub struct HashIndex<'r, L, R, Rel: Relation<Item = R>> {
    right: &'r Rel,
    key_to_id: HashMap<Value, usize>,
    starts: Vec<usize>,
    rperm: Vec<usize>,
    left: KeyAccessor<L>,
    right_accessor: KeyAccessor<R>,
}

impl<'r, L, R, Rel: Relation<Item = R>> HashIndex<'r, L, R, Rel> {
    pub fn prepare(right: &'r Rel, left: KeyAccessor<L>, right_accessor: KeyAccessor<R>) -> Self {
        let n = right.len();
        let mut key_to_id: HashMap<Value, usize> = HashMap::new();
        let mut group_of = Vec::with_capacity(n);
        for i in 0..n {
            let key = right_accessor(right.get(i));
            let next_id = key_to_id.len();
            let id = *key_to_id.entry(key).or_insert(next_id);
            group_of.push(id);
        }
        let groups = key_to_id.len();
        let mut counts = vec![0usize; groups + 1];
        for &id in &group_of {
            counts[id + 1] += 1;
        }
        for i in 0..groups {
            counts[i + 1] += counts[i];
        }
        let starts = counts.clone();
        let mut cursor = counts;
        let mut rperm = vec![0usize; n];
        for (i, &id) in group_of.iter().enumerate() {
            rperm[cursor[id]] = i;
            cursor[id] += 1;
        }
        HashIndex {
            right,
            key_to_id,
            starts,
            rperm,
            left,
            right_accessor,
        }
    }

    pub fn probe(&self, l: &L) -> &[usize] {
        let key = (self.left)(l);
        match self.key_to_id.get(&key) {
            Some(&id) => &self.rperm[self.starts[id]..self.starts[id + 1]],
            None => &[],
        }
    }

    #[cfg(test)]
    fn right_len(&self) -> usize {
        self.right.len()
    }
}
