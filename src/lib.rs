//! # joinkit-engine
//!
//! A generalized relational join engine: pairs elements of two in-memory
//! collections under an extensible family of join conditions and shapes the
//! result as flat pairs or groups.
//!
//! Equi-joins (`by_key`), asof/range joins (`by_pred` with an ordered
//! operator), interval-overlap joins (`by_pred` with a set-relation
//! operator), and nearest-neighbor joins (`by_distance`) are all instances
//! of the same condition model; several conditions compose conjunctively via
//! `&` or [`Condition::and`].
//!
//! ## Pipeline
//!
//! ```text
//! (L, R) + Condition + JoinOptions
//!     |
//!     v
//! [condition]      normalize accessors, flatten composites   (condition.rs)
//!     |
//! [options]        validate multi/nonmatches/cardinality     (options.rs)
//!     |
//! [planner]        pick a mode per atomic / composite anchor (capability.rs, planner.rs)
//!     |
//! [executor]        NestedLoop | Sort | SortChain | Hash | Tree (executors/)
//!     |
//! [assembler]       shape flat/grouped output, enforce cardinality (assembler.rs)
//!     v
//! JoinResult<'_, L, R> (view) --materialize()--> OwnedJoinResult<L, R>
//! ```
//!
//! ## Example
//!
//! ```
//! use joinkit_engine::{by_key2, join_indices, EngineConfig, JoinIndexResult, JoinOptions};
//!
//! struct Person { name: &'static str }
//! struct Visit { name: &'static str, day: u32 }
//!
//! let people = vec![Person { name: "A" }, Person { name: "B" }];
//! let visits = vec![Visit { name: "A", day: 2 }, Visit { name: "A", day: 3 }];
//!
//! let cond = by_key2(|p: &Person| p.name.to_string(), |v: &Visit| v.name.to_string());
//! let config = EngineConfig::default();
//! let result = join_indices(&people, &visits, &cond, &JoinOptions::inner(), &config).unwrap();
//!
//! match result {
//!     JoinIndexResult::Flat(pairs) => assert_eq!(pairs.len(), 2),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! See `tests/scenarios.rs` for the full set of end-to-end examples (S1–S6).
//!
//! ## Scope
//!
//! Out of scope, per design: accessor plumbing beyond plain closures,
//! dataframe-to-`Relation` adapters, distance/interval libraries, and
//! inner/left/right/outer convenience wrappers beyond the [`JoinOptions`]
//! constructors already provided. See `DESIGN.md` for the full grounding
//! ledger and open-question resolutions.

pub mod assembler;
pub mod capability;
pub mod condition;
pub mod config;
pub mod engine;
pub mod error;
pub mod executors;
pub mod options;
pub mod planner;
pub mod relation;
pub mod value;

pub use capability::Mode;
pub use condition::{
    by_distance, by_distance2, by_key, by_key2, by_pred, interval_accessor, not_same,
    scalar_accessor, AtomicCondition, Condition, CoordAccessor, DistanceMetric, KeyAccessor,
    Operator, PredAccessor, RadiusPred,
};
pub use config::EngineConfig;
pub use engine::{join, join_indices, materialize, JoinIndexResult, JoinResult, OwnedJoinResult};
pub use error::{CardinalityError, ConfigurationError, ExecutorError, JoinError};
pub use options::{Cardinality, GroupBy, JoinOptions, Multi, NonMatches, Side, SideOptions};
pub use relation::Relation;
pub use value::{Interval, Projected, Value};
