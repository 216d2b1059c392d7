//! Condition model.
//!
//! A closed sum type dispatches each join condition by shape rather than by
//! double dispatch: each atomic variant carries its own accessor pair (or,
//! for `ByDistance`, a pair of
//! coordinate accessors sharing one metric) and knows how to `swap` itself.
//! `Composite` is non-nesting by construction — there is no variant that
//! holds a `Condition`, only `Vec<AtomicCondition<L, R>>`.

use std::fmt;
use std::sync::Arc;

use crate::value::{Projected, Value};

/// A pure accessor from a record to a scalar `Value` (for `ByKey`).
pub type KeyAccessor<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;

/// A pure accessor from a record to a scalar-or-interval projection (for
/// `ByPred`).
pub type PredAccessor<T> = Arc<dyn Fn(&T) -> Projected + Send + Sync>;

/// A pure accessor from a record to a coordinate vector (for `ByDistance`).
pub type CoordAccessor<T> = Arc<dyn Fn(&T) -> Vec<f32> + Send + Sync>;

/// Ordered/set-relation operators carried inside `ByPred`.
///
/// `Contains` (∋) takes an interval on the left and a point on the right;
/// its swap, `In` (∈), is the mirror with a point on the left and an
/// interval on the right. The engine's sort executor only indexes the
/// point-holding side, so `In` is `NestedLoop`-only (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Contains,
    In,
    SubsetEq,
    ProperSubset,
    SupersetEq,
    ProperSuperset,
    NotDisjoint,
}

impl Operator {
    /// Invert for a side swap.
    pub fn swap(self) -> Operator {
        use Operator::*;
        match self {
            Lt => Gt,
            Gt => Lt,
            Le => Ge,
            Ge => Le,
            Eq => Eq,
            Contains => In,
            In => Contains,
            SubsetEq => SupersetEq,
            SupersetEq => SubsetEq,
            ProperSubset => ProperSuperset,
            ProperSuperset => ProperSubset,
            NotDisjoint => NotDisjoint,
        }
    }

    pub fn is_set_relation(self) -> bool {
        matches!(
            self,
            Operator::SubsetEq
                | Operator::ProperSubset
                | Operator::SupersetEq
                | Operator::ProperSuperset
                | Operator::NotDisjoint
        )
    }
}

/// Distance metrics for `ByDistance`. `Custom` disables the `Tree`
/// mode since an arbitrary metric is not known to respect the index's
/// internal ordering.
#[derive(Clone)]
pub enum DistanceMetric {
    Euclidean,
    Cosine,
    DotProduct,
    Manhattan,
    Custom(Arc<dyn Fn(&[f32], &[f32]) -> f64 + Send + Sync>),
}

impl DistanceMetric {
    pub fn is_custom(&self) -> bool {
        matches!(self, DistanceMetric::Custom(_))
    }

    pub fn eval(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| ((*x - *y) as f64).powi(2))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a
                .iter()
                .zip(b)
                .map(|(x, y)| (*x as f64 - *y as f64).abs())
                .sum(),
            DistanceMetric::Cosine => {
                let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
                let na: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
                let nb: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
                if na <= 1e-12 || nb <= 1e-12 {
                    1.0
                } else {
                    1.0 - dot / (na * nb)
                }
            }
            DistanceMetric::DotProduct => {
                -a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum::<f64>()
            }
            DistanceMetric::Custom(f) => f(a, b),
        }
    }
}

impl fmt::Debug for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Euclidean => write!(f, "Euclidean"),
            DistanceMetric::Cosine => write!(f, "Cosine"),
            DistanceMetric::DotProduct => write!(f, "DotProduct"),
            DistanceMetric::Manhattan => write!(f, "Manhattan"),
            DistanceMetric::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Strict/non-strict radius predicate for `ByDistance`.
#[derive(Debug, Clone, Copy)]
pub enum RadiusPred {
    Le(f64),
    Lt(f64),
}

impl RadiusPred {
    pub fn radius(self) -> f64 {
        match self {
            RadiusPred::Le(r) | RadiusPred::Lt(r) => r,
        }
    }

    pub fn admits(self, dist: f64) -> bool {
        match self {
            RadiusPred::Le(r) => dist <= r,
            RadiusPred::Lt(r) => dist < r,
        }
    }
}

/// One atomic join condition, normalized so its accessors are paired
/// positionally with `(L, R)`.
#[derive(Clone)]
pub enum AtomicCondition<L, R> {
    ByKey {
        left: KeyAccessor<L>,
        right: KeyAccessor<R>,
    },
    ByPred {
        left: PredAccessor<L>,
        op: Operator,
        right: PredAccessor<R>,
    },
    ByDistance {
        left: CoordAccessor<L>,
        right: CoordAccessor<R>,
        metric: DistanceMetric,
        radius: RadiusPred,
    },
    /// Matches iff the left-side key (its opaque index) differs from the
    /// right-side key; meaningful only in self-joins.
    NotSame,
}

impl<L, R> AtomicCondition<L, R> {
    /// Exchange `f_L ↔ f_R` and invert ordered operators.
    /// `L` and `R` must coincide for this to type-check in the generic case,
    /// so `swap` is primarily used internally by the planner for self-joins
    /// and by the `groupby = R` execution path, both of which operate on
    /// `AtomicCondition<T, T>`.
    pub fn swap(self) -> AtomicCondition<R, L> {
        match self {
            AtomicCondition::ByKey { left, right } => AtomicCondition::ByKey {
                left: right,
                right: left,
            },
            AtomicCondition::ByPred { left, op, right } => AtomicCondition::ByPred {
                left: right,
                op: op.swap(),
                right: left,
            },
            AtomicCondition::ByDistance {
                left,
                right,
                metric,
                radius,
            } => AtomicCondition::ByDistance {
                left: right,
                right: left,
                metric,
                radius,
            },
            AtomicCondition::NotSame => AtomicCondition::NotSame,
        }
    }

    /// Direct (non-indexed) evaluation, the nested-loop/post-filter oracle.
    pub fn is_match(&self, l: &L, r: &R, i_l: usize, i_r: usize) -> bool {
        match self {
            AtomicCondition::ByKey { left, right } => left(l) == right(r),
            AtomicCondition::ByPred { left, op, right } => {
                eval_pred(&left(l), *op, &right(r))
            }
            AtomicCondition::ByDistance {
                left,
                right,
                metric,
                radius,
            } => radius.admits(metric.eval(&left(l), &right(r))),
            AtomicCondition::NotSame => i_l != i_r,
        }
    }
}

/// Evaluate `left op right` for the scalar/interval operators.
pub(crate) fn eval_pred(left: &Projected, op: Operator, right: &Projected) -> bool {
    use Operator::*;
    match op {
        Lt | Le | Eq | Ge | Gt => {
            let (Some(l), Some(r)) = (left.as_scalar(), right.as_scalar()) else {
                return false;
            };
            match op {
                Lt => l < r,
                Le => l <= r,
                Eq => l == r,
                Ge => l >= r,
                Gt => l > r,
                _ => unreachable!(),
            }
        }
        Contains => {
            let (Some(interval), Some(point)) = (left.as_interval(), right.as_scalar()) else {
                return false;
            };
            interval.contains(point)
        }
        In => {
            let (Some(point), Some(interval)) = (left.as_scalar(), right.as_interval()) else {
                return false;
            };
            interval.contains(point)
        }
        SubsetEq | ProperSubset | SupersetEq | ProperSuperset | NotDisjoint => {
            let (Some(l), Some(r)) = (left.as_interval(), right.as_interval()) else {
                return false;
            };
            match op {
                SubsetEq => l.subset_eq(r),
                ProperSubset => l.proper_subset(r),
                SupersetEq => l.superset_eq(r),
                ProperSuperset => l.proper_superset(r),
                NotDisjoint => l.not_disjoint(r),
                _ => unreachable!(),
            }
        }
    }
}

/// A condition tree: a single atomic condition, or a conjunction of them.
/// `Composite` never nests: flattening happens at
/// construction time via `Condition::and`.
pub enum Condition<L, R> {
    Atomic(AtomicCondition<L, R>),
    Composite(Vec<AtomicCondition<L, R>>),
}

impl<L, R> Condition<L, R> {
    pub fn children(&self) -> &[AtomicCondition<L, R>] {
        match self {
            Condition::Atomic(_) => &[],
            Condition::Composite(cs) => cs,
        }
    }

    /// Exchange `L ↔ R` without consuming `self` (cheap: accessors are
    /// `Arc`-backed). Used by the `groupby = R` execution path, which plans
    /// and probes with sides swapped, then swaps the assembled indices back.
    pub fn swapped(&self) -> Condition<R, L> {
        match self {
            Condition::Atomic(a) => Condition::Atomic(a.clone().swap()),
            Condition::Composite(cs) => {
                Condition::Composite(cs.iter().map(|c| c.clone().swap()).collect())
            }
        }
    }

    /// Conjoin two conditions, flattening nested composites.
    pub fn and(self, other: Condition<L, R>) -> Condition<L, R> {
        let mut children = Vec::new();
        match self {
            Condition::Atomic(a) => children.push(a),
            Condition::Composite(mut cs) => children.append(&mut cs),
        }
        match other {
            Condition::Atomic(a) => children.push(a),
            Condition::Composite(mut cs) => children.append(&mut cs),
        }
        Condition::Composite(children)
    }

    pub fn is_match(&self, l: &L, r: &R, i_l: usize, i_r: usize) -> bool {
        match self {
            Condition::Atomic(a) => a.is_match(l, r, i_l, i_r),
            Condition::Composite(cs) => cs.iter().all(|c| c.is_match(l, r, i_l, i_r)),
        }
    }
}

impl<L, R> std::ops::BitAnd for Condition<L, R> {
    type Output = Condition<L, R>;

    fn bitand(self, rhs: Condition<L, R>) -> Condition<L, R> {
        self.and(rhs)
    }
}

// ---- Convenience constructors ----------------------------

pub fn by_key<T, K>(f: impl Fn(&T) -> K + Send + Sync + 'static) -> Condition<T, T>
where
    K: Into<Value>,
{
    let f = Arc::new(f);
    let left: KeyAccessor<T> = {
        let f = Arc::clone(&f);
        Arc::new(move |t: &T| f(t).into())
    };
    let right: KeyAccessor<T> = Arc::new(move |t: &T| f(t).into());
    Condition::Atomic(AtomicCondition::ByKey { left, right })
}

pub fn by_key2<L, R, K>(
    left: impl Fn(&L) -> K + Send + Sync + 'static,
    right: impl Fn(&R) -> K + Send + Sync + 'static,
) -> Condition<L, R>
where
    K: Into<Value>,
{
    let left: KeyAccessor<L> = Arc::new(move |l: &L| left(l).into());
    let right: KeyAccessor<R> = Arc::new(move |r: &R| right(r).into());
    Condition::Atomic(AtomicCondition::ByKey { left, right })
}

pub fn by_pred<L, R>(
    left: PredAccessor<L>,
    op: Operator,
    right: PredAccessor<R>,
) -> Condition<L, R> {
    Condition::Atomic(AtomicCondition::ByPred { left, op, right })
}

pub fn scalar_accessor<T, K>(
    f: impl Fn(&T) -> K + Send + Sync + 'static,
) -> PredAccessor<T>
where
    K: Into<Value>,
{
    Arc::new(move |t: &T| Projected::Scalar(f(t).into()))
}

pub fn interval_accessor<T>(
    f: impl Fn(&T) -> crate::value::Interval + Send + Sync + 'static,
) -> PredAccessor<T> {
    Arc::new(move |t: &T| Projected::Interval(f(t)))
}

pub fn by_distance<T>(
    f: impl Fn(&T) -> Vec<f32> + Send + Sync + 'static,
    metric: DistanceMetric,
    radius: RadiusPred,
) -> Condition<T, T> {
    let f = Arc::new(f);
    let left: CoordAccessor<T> = {
        let f = Arc::clone(&f);
        Arc::new(move |t: &T| f(t))
    };
    let right: CoordAccessor<T> = Arc::new(move |t: &T| f(t));
    Condition::Atomic(AtomicCondition::ByDistance {
        left,
        right,
        metric,
        radius,
    })
}

pub fn by_distance2<L, R>(
    left: impl Fn(&L) -> Vec<f32> + Send + Sync + 'static,
    right: impl Fn(&R) -> Vec<f32> + Send + Sync + 'static,
    metric: DistanceMetric,
    radius: RadiusPred,
) -> Condition<L, R> {
    Condition::Atomic(AtomicCondition::ByDistance {
        left: Arc::new(left),
        right: Arc::new(right),
        metric,
        radius,
    })
}

pub fn not_same<T>() -> Condition<T, T> {
    Condition::Atomic(AtomicCondition::NotSame)
}
