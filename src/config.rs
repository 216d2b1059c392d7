//! Engine configuration.
//!
//! Hierarchical loading from `config.toml`, a git-ignored
//! `config.local.toml`, then `JOINKIT_*` environment variables. The sections
//! here are the executors' own tunables: the `Tree` executor's brute-force
//! cutover and `hnsw_rs` parameters, and the engine's parallel-probe
//! threshold.
//!
//! ```toml
//! # config.toml
//! [tree]
//! brute_force_below = 64
//! hnsw_m = 16
//! hnsw_ef_construction = 200
//! overfetch_k = 32
//!
//! [engine]
//! parallel_probe_threshold = 10000
//! ```
//!
//! ```bash
//! JOINKIT_TREE__HNSW_M=32
//! JOINKIT_ENGINE__PARALLEL_PROBE_THRESHOLD=50000
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub engine: EnginePerformanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Flattened accessors so executors (which predate this nested shape)
    // can keep addressing fields directly as `config.tree_brute_force_below`
    // etc. without threading `config.tree.brute_force_below` everywhere.
    #[serde(skip)]
    pub tree_brute_force_below: usize,
    #[serde(skip)]
    pub hnsw_m: usize,
    #[serde(skip)]
    pub hnsw_ef_construction: usize,
    #[serde(skip)]
    pub tree_overfetch_k: usize,
    #[serde(skip)]
    pub parallel_probe_threshold: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Right-hand cardinality at or below which `Tree` does an exact linear
    /// scan instead of building an `hnsw_rs` graph.
    #[serde(default = "default_brute_force_below")]
    pub brute_force_below: usize,
    /// `hnsw_rs`'s `M`: max bidirectional links per node.
    #[serde(default = "default_hnsw_m")]
    pub hnsw_m: usize,
    #[serde(default = "default_hnsw_ef_construction")]
    pub hnsw_ef_construction: usize,
    /// How many extra candidates the tree executor over-fetches before
    /// applying the exact-metric post-filter.
    #[serde(default = "default_overfetch_k")]
    pub overfetch_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnginePerformanceConfig {
    /// Left-side cardinality at or above which the probe loop splits across
    /// `rayon`'s thread pool.
    #[serde(default = "default_parallel_probe_threshold")]
    pub parallel_probe_threshold: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_brute_force_below() -> usize {
    64
}
fn default_hnsw_m() -> usize {
    16
}
fn default_hnsw_ef_construction() -> usize {
    200
}
fn default_overfetch_k() -> usize {
    32
}
fn default_parallel_probe_threshold() -> usize {
    10_000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            brute_force_below: default_brute_force_below(),
            hnsw_m: default_hnsw_m(),
            hnsw_ef_construction: default_hnsw_ef_construction(),
            overfetch_k: default_overfetch_k(),
        }
    }
}

impl Default for EnginePerformanceConfig {
    fn default() -> Self {
        EnginePerformanceConfig {
            parallel_probe_threshold: default_parallel_probe_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl EngineConfig {
    /// Merge `config.toml`, then `config.local.toml`, then `JOINKIT_*` env
    /// vars (double-underscore nested, e.g. `JOINKIT_TREE__HNSW_M`).
    pub fn load() -> Result<Self, figment::Error> {
        let mut cfg: EngineConfig = Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("JOINKIT_").split("__"))
            .extract()?;
        cfg.flatten();
        Ok(cfg)
    }

    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        let mut cfg: EngineConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("JOINKIT_").split("__"))
            .extract()?;
        cfg.flatten();
        Ok(cfg)
    }

    fn flatten(&mut self) {
        self.tree_brute_force_below = self.tree.brute_force_below;
        self.hnsw_m = self.tree.hnsw_m;
        self.hnsw_ef_construction = self.tree.hnsw_ef_construction;
        self.tree_overfetch_k = self.tree.overfetch_k;
        self.parallel_probe_threshold = self.engine.parallel_probe_threshold;
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut cfg = EngineConfig {
            tree: TreeConfig::default(),
            engine: EnginePerformanceConfig::default(),
            logging: LoggingConfig::default(),
            tree_brute_force_below: 0,
            hnsw_m: 0,
            hnsw_ef_construction: 0,
            tree_overfetch_k: 0,
            parallel_probe_threshold: 0,
        };
        cfg.flatten();
        cfg
    }
}
