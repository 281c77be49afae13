//! Sub-configuration structures for the sphere graph components.

use serde::{Deserialize, Serialize};

/// Relation detection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectorConfig {
    /// Sliding-window width for co-occurrence mode.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Neighbors retained per element in similarity-graph mode.
    #[serde(default = "default_k")]
    pub k: usize,

    /// HNSW search beam width.
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,

    /// Initial rating assigned on a relation's first observation.
    #[serde(default = "default_initial_rating")]
    pub initial_rating: f64,

    /// Lower clamp for similarity-derived ratings.
    #[serde(default)]
    pub rating_floor: f64,

    /// Upper clamp for similarity-derived ratings.
    #[serde(default = "default_rating_ceiling")]
    pub rating_ceiling: f64,
}

fn default_window() -> usize {
    2
}

fn default_k() -> usize {
    10
}

fn default_ef_search() -> usize {
    64
}

fn default_initial_rating() -> f64 {
    1000.0
}

fn default_rating_ceiling() -> f64 {
    2000.0
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            k: default_k(),
            ef_search: default_ef_search(),
            initial_rating: default_initial_rating(),
            rating_floor: 0.0,
            rating_ceiling: default_rating_ceiling(),
        }
    }
}

/// Rating aggregation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RatingConfig {
    /// Weight used for evidence without an explicit signal strength.
    #[serde(default = "default_weight")]
    pub default_weight: f64,

    /// Damping multiplier applied to incoming evidence weight.
    #[serde(default = "default_damping")]
    pub damping: f64,
}

fn default_weight() -> f64 {
    1.0
}

fn default_damping() -> f64 {
    1.0
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            default_weight: default_weight(),
            damping: default_damping(),
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Backend: "memory" or "rocksdb".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Database directory for durable backends.
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_path() -> String {
    "./data/sphere-graph".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON-structured lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
