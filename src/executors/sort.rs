//! Sort-based executor.
//!
//! Sorts the right side once by its scalar projection and answers each
//! probe with a binary-searched slice of the permutation. `SortChain`
//! reuses the same probe logic but skips building the
//! permutation, trusting the caller's assertion that `R` is already sorted
//! by its key.

use crate::condition::{Operator, PredAccessor};
use crate::error::ExecutorError;
use crate::options::Side;
use crate::relation::Relation;
use crate::value::{Projected, Value};

pub struct SortIndex<'r, L, R, Rel: Relation<Item = R>> {
    right: &'r Rel,
    /// `perm[k]` is the original right-hand index at sorted position `k`.
    perm: Vec<usize>,
    /// `sorted_keys[k] = key_of(right.get(perm[k]))`, aligned with `perm`.
    sorted_keys: Vec<Value>,
    left: PredAccessor<L>,
    op: Operator,
    right_accessor: PredAccessor<R>,
}

impl<'r, L, R, Rel: Relation<Item = R>> SortIndex<'r, L, R, Rel> {
    /// Build a fresh permutation sorting `right` ascending by `right_accessor`,
    /// ties broken by original index (a stable sort already guarantees this).
    pub fn prepare(
        right: &'r Rel,
        left: PredAccessor<L>,
        op: Operator,
        right_accessor: PredAccessor<R>,
    ) -> Result<Self, ExecutorError> {
        let n = right.len();
        let keys = scalar_keys(right, &right_accessor)?;
        let mut perm: Vec<usize> = (0..n).collect();
        perm.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
        let sorted_keys = perm.iter().map(|&i| keys[i].clone()).collect();
        Ok(SortIndex {
            right,
            perm,
            sorted_keys,
            left,
            op,
            right_accessor,
        })
    }

    /// Same as `prepare`, but trusts that `right` is already sorted
    /// ascending by `right_accessor` and skips materializing a permutation.
    pub fn prepare_chained(
        right: &'r Rel,
        left: PredAccessor<L>,
        op: Operator,
        right_accessor: PredAccessor<R>,
    ) -> Result<Self, ExecutorError> {
        let n = right.len();
        let perm: Vec<usize> = (0..n).collect();
        let sorted_keys = scalar_keys(right, &right_accessor)?;
        Ok(SortIndex {
            right,
            perm,
            sorted_keys,
            left,
            op,
            right_accessor,
        })
    }

    fn range_for_scalar(&self, key: &Value) -> (usize, usize) {
        match self.op {
            Operator::Eq => {
                let lo = self.sorted_keys.partition_point(|k| k < key);
                let hi = self.sorted_keys.partition_point(|k| k <= key);
                (lo, hi)
            }
            Operator::Lt => {
                // all r with k_L < k_R(r)
                let lo = self.sorted_keys.partition_point(|k| k <= key);
                (lo, self.sorted_keys.len())
            }
            Operator::Le => {
                // all r with k_L <= k_R(r)
                let lo = self.sorted_keys.partition_point(|k| k < key);
                (lo, self.sorted_keys.len())
            }
            Operator::Gt => {
                // all r with k_R(r) < k_L
                let hi = self.sorted_keys.partition_point(|k| k < key);
                (0, hi)
            }
            Operator::Ge => {
                // all r with k_R(r) <= k_L
                let hi = self.sorted_keys.partition_point(|k| k <= key);
                (0, hi)
            }
            _ => (0, 0),
        }
    }

    fn range_for_interval(&self, interval: &crate::value::Interval) -> (usize, usize) {
        let lo = if interval.lo_closed {
            self.sorted_keys.partition_point(|k| k < &interval.lo)
        } else {
            self.sorted_keys.partition_point(|k| k <= &interval.lo)
        };
        let hi = if interval.hi_closed {
            self.sorted_keys.partition_point(|k| k <= &interval.hi)
        } else {
            self.sorted_keys.partition_point(|k| k < &interval.hi)
        };
        (lo, hi.max(lo))
    }

    /// The matching slice of `perm` for one left element, borrowed directly
    /// from the permutation — no allocation per probe.
    pub fn probe(&self, l: &L) -> &[usize] {
        let projected = (self.left)(l);
        let (lo, hi) = match (&projected, self.op) {
            (Projected::Interval(i), Operator::Contains) => self.range_for_interval(i),
            (Projected::Scalar(v), _) => self.range_for_scalar(v),
            _ => return &[],
        };
        &self.perm[lo..hi]
    }

    /// The `multi = closest` reduction for this op: first element for
    /// `</≤`, last for `>/≥`, nearest-by-value for `∋`.
    /// `Eq` has no directional meaning; we fall back to the smallest
    /// original index, matching the universal tie-break rule.
    pub fn closest(&self, l: &L) -> Option<usize> {
        let projected = (self.left)(l);
        let (lo, hi) = match (&projected, self.op) {
            (Projected::Interval(i), Operator::Contains) => self.range_for_interval(i),
            (Projected::Scalar(v), _) => self.range_for_scalar(v),
            _ => return None,
        };
        if lo >= hi {
            return None;
        }
        let slice = &self.perm[lo..hi];
        match self.op {
            Operator::Lt | Operator::Le => Some(slice[0]),
            Operator::Gt | Operator::Ge => Some(slice[slice.len() - 1]),
            Operator::Contains => {
                let Projected::Scalar(target) = &projected else {
                    return None;
                };
                let target = midpoint_of(target);
                slice
                    .iter()
                    .copied()
                    .min_by(|&a, &b| {
                        let da = distance_to(&self.right_accessor, self.right, a, target);
                        let db = distance_to(&self.right_accessor, self.right, b, target);
                        da.partial_cmp(&db)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then(a.cmp(&b))
                    })
            }
            _ => slice.iter().copied().min(),
        }
    }
}

fn scalar_of(p: &Projected) -> Option<Value> {
    p.as_scalar().cloned()
}

/// Every right-hand element's scalar projection, in original order. Errors
/// out (rather than panicking) the first time `right_accessor` yields a
/// non-scalar projection, since `Sort` can only order by a scalar key.
fn scalar_keys<R>(
    right: &impl Relation<Item = R>,
    right_accessor: &PredAccessor<R>,
) -> Result<Vec<Value>, ExecutorError> {
    (0..right.len())
        .map(|i| {
            scalar_of(&right_accessor(right.get(i))).ok_or_else(|| {
                ExecutorError::new(
                    Side::Right,
                    Some(i),
                    "sort executor requires a scalar right-hand projection",
                )
            })
        })
        .collect()
}

fn midpoint_of(v: &Value) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Float(f) => f.0,
        _ => f64::NAN,
    }
}

fn distance_to<R, Rel: Relation<Item = R>>(
    accessor: &PredAccessor<R>,
    right: &Rel,
    i_r: usize,
    target: f64,
) -> f64 {
    match accessor(right.get(i_r)) {
        Projected::Scalar(Value::Int(i)) => (i as f64 - target).abs(),
        Projected::Scalar(Value::Float(f)) => (f.0 - target).abs(),
        _ => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::scalar_accessor;

    #[derive(Debug)]
    struct T {
        t: i64,
    }

    #[test]
    fn lt_range_excludes_equal_and_below() {
        let right = vec![T { t: 1 }, T { t: 4 }, T { t: 6 }, T { t: 9 }];
        let left: PredAccessor<T> = scalar_accessor(|t: &T| t.t);
        let right_acc: PredAccessor<T> = scalar_accessor(|t: &T| t.t);
        let idx = SortIndex::prepare(&right, left, Operator::Lt, right_acc).unwrap();
        let query = T { t: 5 };
        let candidates = idx.probe(&query);
        // r.t in {6, 9} satisfy 5 < r.t
        let mut vals: Vec<i64> = candidates.iter().map(|&i| right[i].t).collect();
        vals.sort();
        assert_eq!(vals, vec![6, 9]);
        assert_eq!(right[idx.closest(&query).unwrap()].t, 6);
    }

    #[test]
    fn eq_range_is_exact() {
        let right = vec![T { t: 1 }, T { t: 2 }, T { t: 2 }, T { t: 3 }];
        let left: PredAccessor<T> = scalar_accessor(|t: &T| t.t);
        let right_acc: PredAccessor<T> = scalar_accessor(|t: &T| t.t);
        let idx = SortIndex::prepare(&right, left, Operator::Eq, right_acc).unwrap();
        let mut candidates = idx.probe(&T { t: 2 }).to_vec();
        candidates.sort();
        assert_eq!(candidates, vec![1, 2]);
    }
}
