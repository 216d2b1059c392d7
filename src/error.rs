//! Typed error surface for the join engine.
//!
//! One top-level enum per call site, `thiserror` messages, structured
//! fields on the variants callers are expected to match on.

use thiserror::Error;

use crate::options::Side;

/// Top-level error returned by `join`/`join_indices`.
#[derive(Debug, Error)]
pub enum JoinError {
    /// Raised synchronously before any data is scanned.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Raised after assembly, when a per-element match count falls outside
    /// the asserted bound.
    #[error(transparent)]
    Cardinality(#[from] CardinalityError),

    /// Raised mid-scan when a user-supplied accessor/metric misbehaves.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// A mistake in the caller's condition/options, detected before scanning.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "multi={multi:?} on side {multi_side:?} requires nonmatches=drop on side {other_side:?}, \
         but nonmatches={nonmatches:?} was requested"
    )]
    MultiNonmatchConflict {
        multi_side: Side,
        multi: &'static str,
        other_side: Side,
        nonmatches: &'static str,
    },

    #[error("mode {requested:?} is not supported by this condition (supported: {supported:?})")]
    UnsupportedMode {
        requested: crate::capability::Mode,
        supported: Vec<crate::capability::Mode>,
    },

    #[error(
        "condition has no automatically-selectable mode (only NestedLoop is supported); \
         pin `mode = NestedLoop` explicitly"
    )]
    NestedLoopRequiresPin,
}

/// A per-element match count outside the asserted cardinality bound.
#[derive(Debug, Error, Clone, Copy)]
#[error("cardinality violated on side {side:?} at index {index}: observed {observed}, expected {expected:?}")]
pub struct CardinalityError {
    pub side: Side,
    pub index: usize,
    pub observed: usize,
    pub expected: crate::options::Cardinality,
}

/// An executor-internal failure: a sort key or metric produced an
/// incomparable value for a specific record.
#[derive(Debug, Error)]
#[error("executor error on side {side:?}{}: {message}", index.map(|i| format!(" at index {i}")).unwrap_or_default())]
pub struct ExecutorError {
    pub side: Side,
    pub index: Option<usize>,
    pub message: String,
}

impl ExecutorError {
    pub fn new(side: Side, index: Option<usize>, message: impl Into<String>) -> Self {
        ExecutorError {
            side,
            index,
            message: message.into(),
        }
    }
}
