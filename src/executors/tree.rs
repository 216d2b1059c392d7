//! Spatial-index executor.
//!
//! An `hnsw_rs::Hnsw` over `DistL2` gives a candidate set, and the engine
//! filters it post-hoc with the caller's actual metric and radius
//! predicate: if the tree returns an over-approximation, the exact
//! metric/op pair is the final word. Because this index lives for exactly
//! one `join` call rather than being long-lived and mutably updated, its
//! coordinate storage is an ordinary borrow (`&'r [Vec<f32>]`) the caller
//! keeps alive for the join's duration, and no `unsafe` `'static` transmute
//! is needed to satisfy `hnsw_rs`'s lifetime parameter.
//!
//! Below `EngineConfig::tree_brute_force_below` the executor skips
//! `hnsw_rs` and does an exact linear radius scan (what this crate's own
//! tests rely on for exactness). Above it, candidates are drawn from
//! `hnsw_rs` under `DistL2` and over-fetched by
//! `EngineConfig::tree_overfetch_k` before the exact-metric filter runs.
//! `DistL2` only orders candidates the same way the real metric would when
//! the vectors it sees are unit-normalized (`||a - b||² = 2 - 2·a·b` for
//! unit `a`, `b`, which is monotonic in both cosine similarity and dot
//! product), so `Cosine` and `DotProduct` insert and query unit-normalized
//! coordinates into the index while `exact_candidates`/the post-filter
//! still evaluate the real metric on the untouched raw coordinates.
//! `Manhattan` has no such transform into `DistL2`'s ordering, so it keeps
//! the raw coordinates and trades perfect recall on `multi = all` for
//! staying within one index type (see DESIGN.md). `multi = closest` always
//! returns an exact answer regardless of metric, because its single
//! candidate is re-verified against the true metric before being accepted.

use hnsw_rs::dist::DistL2;
use hnsw_rs::hnsw::Hnsw;

use crate::condition::{CoordAccessor, DistanceMetric, RadiusPred};
use crate::config::EngineConfig;
use crate::relation::Relation;

/// Unit-normalize `v` in place; leaves a (near-)zero vector untouched since
/// it has no meaningful direction to normalize to.
fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = (v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>()).sqrt();
    if norm <= 1e-12 {
        v.to_vec()
    } else {
        v.iter().map(|x| (*x as f64 / norm) as f32).collect()
    }
}

pub struct TreeIndex<'r, L, R, Rel: Relation<Item = R>> {
    right: &'r Rel,
    /// Raw (un-normalized) coordinates, the only ones ever passed to
    /// `metric.eval` so the exact-metric filter is always correct.
    coords: &'r [Vec<f32>],
    hnsw: Option<Hnsw<'r, f32, DistL2>>,
    left_acc: CoordAccessor<L>,
    metric: DistanceMetric,
    radius: RadiusPred,
    overfetch_k: usize,
}

/// Compute the raw coordinate storage the caller must keep alive for at
/// least as long as the `TreeIndex` built from it.
pub fn prepare_coords<R>(
    right: &impl Relation<Item = R>,
    right_acc: &CoordAccessor<R>,
) -> Vec<Vec<f32>> {
    (0..right.len()).map(|i| right_acc(right.get(i))).collect()
}

/// Coordinates as they should be fed to `DistL2` so its ordering agrees
/// with `metric`'s: unit-normalized for `Cosine`/`DotProduct` (for unit
/// `a`, `b`, `||a - b||² = 2 - 2·a·b`, monotonic in both), the raw
/// coordinates unchanged otherwise. The caller keeps the result alive
/// alongside `coords` and passes it to `TreeIndex::prepare`.
pub fn prepare_index_coords(coords: &[Vec<f32>], metric: &DistanceMetric) -> Vec<Vec<f32>> {
    match metric {
        DistanceMetric::Cosine | DistanceMetric::DotProduct => {
            coords.iter().map(|v| normalize(v)).collect()
        }
        _ => coords.to_vec(),
    }
}

impl<'r, L, R, Rel: Relation<Item = R>> TreeIndex<'r, L, R, Rel> {
    pub fn prepare(
        right: &'r Rel,
        coords: &'r [Vec<f32>],
        index_coords: &'r [Vec<f32>],
        left_acc: CoordAccessor<L>,
        metric: DistanceMetric,
        radius: RadiusPred,
        config: &EngineConfig,
    ) -> Self {
        let brute_force = right.len() <= config.tree_brute_force_below;
        let hnsw = if brute_force || index_coords.is_empty() {
            None
        } else {
            let m = config.hnsw_m;
            let max_layer = ((index_coords.len() as f64).ln() / (m as f64).max(2.0).ln())
                .ceil()
                .clamp(4.0, 16.0) as usize;
            let mut hnsw: Hnsw<'r, f32, DistL2> = Hnsw::new(
                m,
                index_coords.len(),
                max_layer,
                config.hnsw_ef_construction,
                DistL2,
            );
            hnsw.set_keeping_pruned(true);
            for (idx, vec) in index_coords.iter().enumerate() {
                hnsw.insert((vec, idx));
            }
            Some(hnsw)
        };
        TreeIndex {
            right,
            coords,
            hnsw,
            left_acc,
            metric,
            radius,
            overfetch_k: config.tree_overfetch_k,
        }
    }

    /// Transform a raw query vector into the space the index was built
    /// over: unit-normalized for `Cosine`/`DotProduct`, unchanged otherwise.
    fn index_query(&self, query: &[f32]) -> Vec<f32> {
        match self.metric {
            DistanceMetric::Cosine | DistanceMetric::DotProduct => normalize(query),
            _ => query.to_vec(),
        }
    }

    fn exact_candidates(&self, query: &[f32]) -> Vec<(usize, f64)> {
        (0..self.right.len())
            .filter_map(|i_r| {
                let dist = self.metric.eval(query, &self.coords[i_r]);
                self.radius.admits(dist).then_some((i_r, dist))
            })
            .collect()
    }

    /// All right-hand indices within the radius.
    pub fn probe(&self, l: &L) -> Vec<usize> {
        let query = (self.left_acc)(l);
        let Some(hnsw) = &self.hnsw else {
            return self.exact_candidates(&query).into_iter().map(|(i, _)| i).collect();
        };
        let indexed_query = self.index_query(&query);
        let k = self.overfetch_k.max(1).min(self.coords.len().max(1));
        let raw = hnsw.search(&indexed_query, k, (k * 2).max(16));
        raw.into_iter()
            .filter_map(|n| {
                let i_r = n.d_id;
                if i_r >= self.coords.len() {
                    return None;
                }
                let dist = self.metric.eval(&query, &self.coords[i_r]);
                self.radius.admits(dist).then_some(i_r)
            })
            .collect()
    }

    /// The `multi = closest` reduction: request a single nearest neighbor
    /// but still verify it satisfies the radius predicate.
    pub fn closest(&self, l: &L) -> Option<usize> {
        let query = (self.left_acc)(l);
        let Some(hnsw) = &self.hnsw else {
            return self
                .exact_candidates(&query)
                .into_iter()
                .min_by(|a, b| {
                    a.1.partial_cmp(&b.1)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.0.cmp(&b.0))
                })
                .map(|(i, _)| i);
        };
        let indexed_query = self.index_query(&query);
        let k = self.overfetch_k.max(1).min(self.coords.len().max(1));
        let raw = hnsw.search(&indexed_query, k, (k * 2).max(16));
        raw.into_iter()
            .filter_map(|n| {
                let i_r = n.d_id;
                if i_r >= self.coords.len() {
                    return None;
                }
                let dist = self.metric.eval(&query, &self.coords[i_r]);
                self.radius.admits(dist).then_some((i_r, dist))
            })
            .min_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            })
            .map(|(i, _)| i)
    }
}
