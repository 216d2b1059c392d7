//! Mode catalog & capability table.
//!
//! Dispatch is a `match` over a condition's `AtomicKind`, a closed table
//! rather than open-ended multiple dispatch.

use crate::condition::{AtomicCondition, DistanceMetric, Operator};

/// An execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    NestedLoop,
    Sort,
    SortChain,
    Hash,
    Tree,
}

/// The shape of an atomic condition, independent of its captured closures —
/// what the capability table actually keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicKind {
    ByKey,
    ByPredOrdered(OrderedOp),
    ByPredSetRelation,
    ByDistance { indexable: bool },
    NotSame,
}

/// The ordered-operator group of `ByPred`.
/// `In`, the swap of `Contains`, is split out: the sort executor only
/// indexes the point-holding side, so `In` cannot reuse `Contains`'s Sort
/// support (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderedOp {
    LtLeGeGtEq,
    Contains,
    In,
}

impl<L, R> AtomicCondition<L, R> {
    pub fn kind(&self) -> AtomicKind {
        match self {
            AtomicCondition::ByKey { .. } => AtomicKind::ByKey,
            AtomicCondition::ByPred { op, .. } => {
                if op.is_set_relation() {
                    AtomicKind::ByPredSetRelation
                } else {
                    match op {
                        Operator::Contains => AtomicKind::ByPredOrdered(OrderedOp::Contains),
                        Operator::In => AtomicKind::ByPredOrdered(OrderedOp::In),
                        _ => AtomicKind::ByPredOrdered(OrderedOp::LtLeGeGtEq),
                    }
                }
            }
            AtomicCondition::ByDistance { metric, .. } => AtomicKind::ByDistance {
                indexable: !metric.is_custom(),
            },
            AtomicCondition::NotSame => AtomicKind::NotSame,
        }
    }
}

impl DistanceMetric {
    pub fn is_indexable(&self) -> bool {
        !self.is_custom()
    }
}

/// The static capability table. Order matters: it is the
/// preference order mode selection scans in.
pub fn capabilities(kind: AtomicKind) -> &'static [Mode] {
    use Mode::*;
    match kind {
        AtomicKind::ByKey => &[Hash, SortChain, Sort, NestedLoop],
        AtomicKind::ByPredOrdered(OrderedOp::LtLeGeGtEq)
        | AtomicKind::ByPredOrdered(OrderedOp::Contains) => &[Sort, NestedLoop],
        AtomicKind::ByPredOrdered(OrderedOp::In) => &[NestedLoop],
        AtomicKind::ByPredSetRelation => &[NestedLoop],
        AtomicKind::ByDistance { indexable: true } => &[Tree, NestedLoop],
        AtomicKind::ByDistance { indexable: false } => &[NestedLoop],
        AtomicKind::NotSame => &[NestedLoop],
    }
}

/// Indexed (non-`NestedLoop`) modes, in anchor-selection preference order:
/// `Hash` > `Tree` > `Sort`.
pub fn indexed_modes(kind: AtomicKind) -> impl Iterator<Item = Mode> {
    const PREFERENCE: [Mode; 3] = [Mode::Hash, Mode::Tree, Mode::Sort];
    let caps = capabilities(kind);
    PREFERENCE.into_iter().filter(move |m| caps.contains(m))
}
