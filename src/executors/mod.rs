//! Executors.
//!
//! Each executor prepares a per-call auxiliary structure over the right
//! side and exposes a `probe` that returns the candidate right-index
//! sequence for one left element. `Hash` and `Sort` hold their candidates
//! in a permutation/CSR array built once in `prepare`, so their `probe`
//! returns a borrowed `&[usize]` slice into that array with no allocation
//! per call. `NestedLoop` and `Tree` have no such array to view — every
//! probe recomputes its candidate set from scratch (a linear scan, or an
//! HNSW query plus exact-metric filter) — so their `probe` returns an owned
//! `Vec<usize>` instead.
//!
//! `engine.rs` applies the `multi`/`Composite` post-filter uniformly across
//! all four executors, so none of them special-case `first`/`last`;
//! `closest` is executor-defined only where the index itself makes it
//! cheaper (Sort, Tree) and otherwise falls back to a linear scan over the
//! raw candidates in `engine.rs`'s `closest_among`.

pub mod hash;
pub mod nested_loop;
pub mod sort;
pub mod tree;

pub use hash::HashIndex;
pub use nested_loop::NestedLoopIndex;
pub use sort::SortIndex;
pub use tree::TreeIndex;
