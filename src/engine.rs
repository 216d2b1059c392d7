//! Join orchestration: ties condition, capability, options, and mode
//! selection to the executors and the result assembler.
//!
//! `join_indices` is the core entry point; `join` wraps it to hand back
//! record references instead of bare indices, and `materialize` deep-copies
//! a view-typed result into owned storage.
//!
//! The left-side probe loop (`probe_all`) is embarrassingly parallel over
//! `i_L`: with `JoinOptions::parallel` set and `|L|` at or
//! above `EngineConfig::parallel_probe_threshold`, it runs under `rayon`
//! instead of a plain sequential `map`, collecting back into `i_L` order so
//! output ordering is unaffected either way.

use std::cmp::Ordering;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::assembler::{assemble, AssembledIndices};
use crate::capability::Mode;
use crate::condition::{AtomicCondition, Condition, KeyAccessor, Operator, PredAccessor};
use crate::config::EngineConfig;
use crate::error::JoinError;
use crate::executors::{
    tree::{prepare_coords, prepare_index_coords},
    HashIndex, NestedLoopIndex, SortIndex, TreeIndex,
};
use crate::options::{GroupBy, JoinOptions, Multi};
use crate::planner::{select_anchor, select_atomic_mode};
use crate::relation::Relation;
use crate::value::{Projected, Value};

/// The index-only result of a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinIndexResult {
    Flat(Vec<(Option<usize>, Option<usize>)>),
    GroupedByLeft {
        groups: Vec<(usize, Vec<usize>)>,
        right_orphans: Vec<usize>,
    },
    GroupedByRight {
        groups: Vec<(usize, Vec<usize>)>,
        left_orphans: Vec<usize>,
    },
}

/// Left-side probe loop: sequential below `threshold`, or split across
/// `rayon`'s thread pool when `parallel` is set and `n_l` clears it.
/// Results are collected back via an indexed `collect`, so output order
/// matches the sequential path exactly regardless of thread scheduling.
fn probe_all<F>(n_l: usize, parallel: bool, threshold: usize, f: F) -> Vec<Vec<usize>>
where
    F: Fn(usize) -> Vec<usize> + Sync,
{
    if parallel && n_l >= threshold {
        (0..n_l).into_par_iter().map(f).collect()
    } else {
        (0..n_l).map(f).collect()
    }
}

/// Plan and execute a join, returning only index pairs/groups.
pub fn join_indices<L, RL, R, RR>(
    left: &RL,
    right: &RR,
    condition: &Condition<L, R>,
    options: &JoinOptions,
    config: &EngineConfig,
) -> Result<JoinIndexResult, JoinError>
where
    L: Sync,
    R: Sync,
    RL: Relation<Item = L> + Sync,
    RR: Relation<Item = R> + Sync,
{
    options.validate()?;

    if options.groupby == GroupBy::Right {
        let swapped_condition = condition.swapped();
        let swapped_options = swapped_sides(options);
        debug!(n_left = left.len(), n_right = right.len(), "join_groupby_right_swap");
        let assembled = core_join(right, left, &swapped_condition, &swapped_options, config)?;
        return Ok(to_public(assembled, GroupBy::Right));
    }

    let assembled = core_join(left, right, condition, options, config)?;
    Ok(to_public(assembled, options.groupby))
}

fn swapped_sides(options: &JoinOptions) -> JoinOptions {
    let mut o = options.clone();
    std::mem::swap(&mut o.left, &mut o.right);
    o.groupby = match options.groupby {
        GroupBy::Left => GroupBy::Right,
        GroupBy::Right => GroupBy::Left,
        GroupBy::None => GroupBy::None,
    };
    o
}

fn to_public(assembled: AssembledIndices, groupby: GroupBy) -> JoinIndexResult {
    match (assembled, groupby) {
        (AssembledIndices::Flat(pairs), _) => JoinIndexResult::Flat(pairs),
        (AssembledIndices::Grouped { groups, right_orphans }, GroupBy::Right) => {
            JoinIndexResult::GroupedByRight { groups, left_orphans: right_orphans }
        }
        (AssembledIndices::Grouped { groups, right_orphans }, _) => {
            JoinIndexResult::GroupedByLeft { groups, right_orphans }
        }
    }
}

fn core_join<L, RL, R, RR>(
    left: &RL,
    right: &RR,
    condition: &Condition<L, R>,
    options: &JoinOptions,
    config: &EngineConfig,
) -> Result<AssembledIndices, JoinError>
where
    L: Sync,
    R: Sync,
    RL: Relation<Item = L> + Sync,
    RR: Relation<Item = R> + Sync,
{
    let candidates = match condition {
        Condition::Atomic(atomic) => {
            let kind = atomic.kind();
            let mode = select_atomic_mode(kind, options.mode)?;
            debug!(?mode, "atomic_mode_selected");
            atomic_candidates(
                left,
                right,
                atomic,
                mode,
                options.left.multi,
                options.parallel,
                config,
            )?
        }
        Condition::Composite(children) => {
            composite_candidates(left, right, children, options, config)?
        }
    };
    let grouped = options.groupby != GroupBy::None;
    assemble(left.len(), right.len(), &candidates, options.left, options.right, grouped)
        .map_err(JoinError::from)
}

/// Execute one atomic condition under the chosen mode, returning each left
/// element's final (already `multi`-reduced) candidate right indices.
fn atomic_candidates<L, RL, R, RR>(
    left: &RL,
    right: &RR,
    atomic: &AtomicCondition<L, R>,
    mode: Mode,
    multi: Multi,
    parallel: bool,
    config: &EngineConfig,
) -> Result<Vec<Vec<usize>>, JoinError>
where
    L: Sync,
    R: Sync,
    RL: Relation<Item = L> + Sync,
    RR: Relation<Item = R> + Sync,
{
    let n_l = left.len();
    let threshold = config.parallel_probe_threshold;
    debug!(n_left = n_l, n_right = right.len(), ?mode, parallel, "executor_prepare");
    let candidates = match (atomic, mode) {
        (AtomicCondition::ByKey { left: lf, right: rf }, Mode::Hash) => {
            let idx = HashIndex::prepare(right, lf.clone(), rf.clone());
            probe_all(n_l, parallel, threshold, |i| {
                let l = left.get(i);
                reduce(atomic, l, right, idx.probe(l), multi, None)
            })
        }
        (AtomicCondition::ByKey { left: lf, right: rf }, Mode::Sort) => {
            let l_acc = key_as_pred(lf.clone());
            let r_acc = key_as_pred(rf.clone());
            let idx = SortIndex::prepare(right, l_acc, Operator::Eq, r_acc)?;
            probe_all(n_l, parallel, threshold, |i| {
                let l = left.get(i);
                let executor_closest = (multi == Multi::Closest).then(|| idx.closest(l)).flatten();
                reduce(atomic, l, right, idx.probe(l), multi, executor_closest)
            })
        }
        (AtomicCondition::ByKey { left: lf, right: rf }, Mode::SortChain) => {
            let l_acc = key_as_pred(lf.clone());
            let r_acc = key_as_pred(rf.clone());
            let idx = SortIndex::prepare_chained(right, l_acc, Operator::Eq, r_acc)?;
            probe_all(n_l, parallel, threshold, |i| {
                let l = left.get(i);
                let executor_closest = (multi == Multi::Closest).then(|| idx.closest(l)).flatten();
                reduce(atomic, l, right, idx.probe(l), multi, executor_closest)
            })
        }
        (AtomicCondition::ByPred { left: lf, op, right: rf }, Mode::Sort) => {
            let idx = SortIndex::prepare(right, lf.clone(), *op, rf.clone())?;
            probe_all(n_l, parallel, threshold, |i| {
                let l = left.get(i);
                let executor_closest = (multi == Multi::Closest).then(|| idx.closest(l)).flatten();
                reduce(atomic, l, right, idx.probe(l), multi, executor_closest)
            })
        }
        (
            AtomicCondition::ByDistance { left: lf, right: rf, metric, radius },
            Mode::Tree,
        ) => {
            let coords = prepare_coords(right, rf);
            let index_coords = prepare_index_coords(&coords, metric);
            let idx = TreeIndex::prepare(
                right,
                &coords,
                &index_coords,
                lf.clone(),
                metric.clone(),
                *radius,
                config,
            );
            probe_all(n_l, parallel, threshold, |i| {
                let l = left.get(i);
                let executor_closest = (multi == Multi::Closest).then(|| idx.closest(l)).flatten();
                let probed = idx.probe(l);
                reduce(atomic, l, right, &probed, multi, executor_closest)
            })
        }
        (_, Mode::NestedLoop) => {
            let idx = NestedLoopIndex::prepare(right, atomic);
            probe_all(n_l, parallel, threshold, |i| {
                let l = left.get(i);
                let probed = idx.probe(i, l);
                reduce(atomic, l, right, &probed, multi, None)
            })
        }
        _ => unreachable!(
            "select_atomic_mode only returns a mode the capability table lists for this condition's kind"
        ),
    };
    Ok(candidates)
}

/// Execute a `Composite`: anchor-probe (full candidate set), post-filter
/// with the remaining children, then apply `multi`. When `multi = closest`
/// meets a post-filter, the closest candidate is picked among those that
/// also pass every post-filter child.
fn composite_candidates<L, RL, R, RR>(
    left: &RL,
    right: &RR,
    children: &[AtomicCondition<L, R>],
    options: &JoinOptions,
    config: &EngineConfig,
) -> Result<Vec<Vec<usize>>, JoinError>
where
    L: Sync,
    R: Sync,
    RL: Relation<Item = L> + Sync,
    RR: Relation<Item = R> + Sync,
{
    let anchor = select_anchor(children, options.mode)?;
    let n_l = left.len();
    let multi = options.left.multi;
    let parallel = options.parallel;
    let threshold = config.parallel_probe_threshold;

    let candidates = match anchor {
        None => {
            debug!("composite_no_anchor_full_scan");
            probe_all(n_l, parallel, threshold, |i| {
                let l = left.get(i);
                let raw: Vec<usize> = (0..right.len())
                    .filter(|&j| children.iter().all(|c| c.is_match(l, right.get(j), i, j)))
                    .collect();
                reduce_with_first_of(children, l, right, &raw, multi)
            })
        }
        Some((anchor_idx, mode)) => {
            debug!(anchor_idx, ?mode, "composite_anchor_selected");
            let anchor_cond = &children[anchor_idx];
            let raw_all =
                atomic_candidates(left, right, anchor_cond, mode, Multi::All, parallel, config)?;
            probe_all(n_l, parallel, threshold, |i| {
                let l = left.get(i);
                let filtered: Vec<usize> = raw_all[i]
                    .iter()
                    .copied()
                    .filter(|&j| {
                        children
                            .iter()
                            .enumerate()
                            .all(|(k, c)| k == anchor_idx || c.is_match(l, right.get(j), i, j))
                    })
                    .collect();
                reduce(anchor_cond, l, right, &filtered, multi, None)
            })
        }
    };
    Ok(candidates)
}

/// `first`/`last` reduction for the no-anchor (full nested-loop) composite
/// path, falling back to `closest_among` of the first child for `closest`
/// (there is no single anchor in this path to consult).
fn reduce_with_first_of<L, R, RR: Relation<Item = R>>(
    children: &[AtomicCondition<L, R>],
    l: &L,
    right: &RR,
    raw: &[usize],
    multi: Multi,
) -> Vec<usize> {
    let anchor = children.first().expect("Composite always has at least one child");
    reduce(anchor, l, right, raw, multi, None)
}

/// Apply the `multi` policy to one left element's raw candidate set
///. `executor_closest`, when present, is a cheaper
/// executor-computed closest match (Sort/Tree) already verified against the
/// radius/op; it is only valid when `raw` was not already post-filtered
/// past what the executor itself checked (i.e. bare atomic conditions, not
/// composite post-filter, which must recompute via `closest_among`). `raw`
/// is taken by reference since `Hash`/`Sort` hand back a slice borrowed
/// from their prepared index rather than an owned `Vec`; only `multi =
/// all` needs to copy it, to produce this left element's entry in the
/// final owned `Vec<Vec<usize>>` candidate table.
fn reduce<L, R, RR: Relation<Item = R>>(
    atomic: &AtomicCondition<L, R>,
    l: &L,
    right: &RR,
    raw: &[usize],
    multi: Multi,
    executor_closest: Option<usize>,
) -> Vec<usize> {
    match multi {
        Multi::All => raw.to_vec(),
        Multi::First => raw.iter().copied().min().into_iter().collect(),
        Multi::Last => raw.iter().copied().max().into_iter().collect(),
        Multi::Closest => executor_closest
            .or_else(|| closest_among(atomic, l, right, raw))
            .into_iter()
            .collect(),
    }
}

/// Generic `multi = closest` tie-break, used whenever no executor-specific
/// closest applies (Hash, NestedLoop, and every composite post-filter):
/// `<`/`≤` → the smallest matching *value* (nearest from above), `>`/`≥` →
/// the largest matching value (nearest from below), `∋` → nearest to the
/// interval midpoint, `ByDistance` → nearest under its metric. Ties (and
/// the fallback for operators with no directional meaning) break on
/// smallest original index.
fn closest_among<L, R, RR: Relation<Item = R>>(
    atomic: &AtomicCondition<L, R>,
    l: &L,
    right: &RR,
    candidates: &[usize],
) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    match atomic {
        AtomicCondition::ByPred { left, op, right: rf } => match op {
            Operator::Lt | Operator::Le => candidates.iter().copied().min_by(|&a, &b| {
                scalar_value(rf, right, a).cmp(&scalar_value(rf, right, b)).then(a.cmp(&b))
            }),
            Operator::Gt | Operator::Ge => candidates.iter().copied().min_by(|&a, &b| {
                scalar_value(rf, right, b).cmp(&scalar_value(rf, right, a)).then(a.cmp(&b))
            }),
            Operator::Contains => {
                let projected = left(l);
                let mid = projected.as_interval().map(midpoint_of_interval)?;
                candidates
                    .iter()
                    .copied()
                    .min_by(|&a, &b| {
                        let da = scalar_distance(rf, right, a, mid);
                        let db = scalar_distance(rf, right, b, mid);
                        da.partial_cmp(&db).unwrap_or(Ordering::Equal).then(a.cmp(&b))
                    })
            }
            _ => candidates.iter().copied().min(),
        },
        AtomicCondition::ByDistance { left, right: rf, metric, .. } => {
            let query = left(l);
            candidates
                .iter()
                .copied()
                .min_by(|&a, &b| {
                    let da = metric.eval(&query, &rf(right.get(a)));
                    let db = metric.eval(&query, &rf(right.get(b)));
                    da.partial_cmp(&db).unwrap_or(Ordering::Equal).then(a.cmp(&b))
                })
        }
        _ => candidates.iter().copied().min(),
    }
}

fn midpoint_of_interval(interval: &crate::value::Interval) -> f64 {
    (scalar_as_f64(&interval.lo) + scalar_as_f64(&interval.hi)) / 2.0
}

fn scalar_as_f64(v: &Value) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Float(f) => f.0,
        _ => f64::NAN,
    }
}

fn scalar_distance<R, RR: Relation<Item = R>>(
    accessor: &PredAccessor<R>,
    right: &RR,
    i_r: usize,
    target: f64,
) -> f64 {
    match accessor(right.get(i_r)) {
        Projected::Scalar(v) => (scalar_as_f64(&v) - target).abs(),
        Projected::Interval(_) => f64::INFINITY,
    }
}

/// The projected scalar value at a right-hand candidate, for value-based
/// (not index-based) `closest` ordering under `Lt`/`Le`/`Gt`/`Ge`.
fn scalar_value<R, RR: Relation<Item = R>>(
    accessor: &PredAccessor<R>,
    right: &RR,
    i_r: usize,
) -> Option<Value> {
    accessor(right.get(i_r)).as_scalar().cloned()
}

fn key_as_pred<T>(f: KeyAccessor<T>) -> PredAccessor<T> {
    Arc::new(move |t: &T| Projected::Scalar(f(t)))
}

// ---- Record-view and owned results (`join`/`materialize`) ----

/// `join`'s result: like `JoinIndexResult` but holding references into `L`
/// and `R` instead of bare indices.
#[derive(Debug)]
pub enum JoinResult<'a, L, R> {
    Flat(Vec<(Option<&'a L>, Option<&'a R>)>),
    GroupedByLeft {
        groups: Vec<(&'a L, Vec<&'a R>)>,
        right_orphans: Vec<&'a R>,
    },
    GroupedByRight {
        groups: Vec<(&'a R, Vec<&'a L>)>,
        left_orphans: Vec<&'a L>,
    },
}

/// Plan, execute, and resolve index pairs into record references.
pub fn join<'a, L, RL, R, RR>(
    left: &'a RL,
    right: &'a RR,
    condition: &Condition<L, R>,
    options: &JoinOptions,
    config: &EngineConfig,
) -> Result<JoinResult<'a, L, R>, JoinError>
where
    L: Sync,
    R: Sync,
    RL: Relation<Item = L> + Sync,
    RR: Relation<Item = R> + Sync,
{
    let indices = join_indices(left, right, condition, options, config)?;
    Ok(match indices {
        JoinIndexResult::Flat(pairs) => JoinResult::Flat(
            pairs
                .into_iter()
                .map(|(l, r)| (l.map(|i| left.get(i)), r.map(|j| right.get(j))))
                .collect(),
        ),
        JoinIndexResult::GroupedByLeft { groups, right_orphans } => JoinResult::GroupedByLeft {
            groups: groups
                .into_iter()
                .map(|(i, js)| (left.get(i), js.into_iter().map(|j| right.get(j)).collect()))
                .collect(),
            right_orphans: right_orphans.into_iter().map(|j| right.get(j)).collect(),
        },
        JoinIndexResult::GroupedByRight { groups, left_orphans } => JoinResult::GroupedByRight {
            groups: groups
                .into_iter()
                .map(|(j, is)| (right.get(j), is.into_iter().map(|i| left.get(i)).collect()))
                .collect(),
            left_orphans: left_orphans.into_iter().map(|i| left.get(i)).collect(),
        },
    })
}

/// Owned counterpart of `JoinResult`, produced by `materialize`.
#[derive(Debug, Clone)]
pub enum OwnedJoinResult<L, R> {
    Flat(Vec<(Option<L>, Option<R>)>),
    GroupedByLeft {
        groups: Vec<(L, Vec<R>)>,
        right_orphans: Vec<R>,
    },
    GroupedByRight {
        groups: Vec<(R, Vec<L>)>,
        left_orphans: Vec<L>,
    },
}

/// Deep-copy a view-typed result into owned storage; no other semantic
/// change.
pub fn materialize<L: Clone, R: Clone>(result: JoinResult<'_, L, R>) -> OwnedJoinResult<L, R> {
    match result {
        JoinResult::Flat(pairs) => OwnedJoinResult::Flat(
            pairs
                .into_iter()
                .map(|(l, r)| (l.cloned(), r.cloned()))
                .collect(),
        ),
        JoinResult::GroupedByLeft { groups, right_orphans } => OwnedJoinResult::GroupedByLeft {
            groups: groups
                .into_iter()
                .map(|(l, rs)| (l.clone(), rs.into_iter().cloned().collect()))
                .collect(),
            right_orphans: right_orphans.into_iter().cloned().collect(),
        },
        JoinResult::GroupedByRight { groups, left_orphans } => OwnedJoinResult::GroupedByRight {
            groups: groups
                .into_iter()
                .map(|(r, ls)| (r.clone(), ls.into_iter().cloned().collect()))
                .collect(),
            left_orphans: left_orphans.into_iter().cloned().collect(),
        },
    }
}
