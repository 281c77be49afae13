//! Configuration management.

mod sub_configs;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::geometry::SpatialKeyConfig;
use sphere_graph_index::TreeConfig;

pub use sub_configs::{DetectorConfig, LoggingConfig, RatingConfig, StorageConfig};

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Spatial key discretization.
    #[serde(default)]
    pub spatial_key: SpatialKeyConfig,
    /// Relation detection.
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Rating aggregation.
    #[serde(default)]
    pub rating: RatingConfig,
    /// Spatial tree occupancy and split behavior.
    #[serde(default)]
    pub tree: TreeConfig,
    /// Storage backend.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spatial_key: SpatialKeyConfig::default(),
            detector: DetectorConfig::default(),
            rating: RatingConfig::default(),
            tree: TreeConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Sources are layered in order:
    /// 1. `config/default.toml` (base settings)
    /// 2. `config/{SPHERE_GRAPH_ENV}.toml` (environment-specific)
    /// 3. Environment variables with the `SPHERE_GRAPH__` prefix
    pub fn load() -> CoreResult<Self> {
        let env = std::env::var("SPHERE_GRAPH_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(config::Environment::with_prefix("SPHERE_GRAPH").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("Failed to parse config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> CoreResult<()> {
        self.spatial_key.validate()?;
        self.tree
            .validate()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        if self.detector.window < 2 {
            return Err(CoreError::Config(
                "detector.window must be at least 2".into(),
            ));
        }
        if self.detector.k == 0 {
            return Err(CoreError::Config("detector.k must be positive".into()));
        }
        if self.detector.rating_floor > self.detector.rating_ceiling {
            return Err(CoreError::Config(
                "detector.rating_floor must not exceed detector.rating_ceiling".into(),
            ));
        }
        if self.rating.default_weight <= 0.0 {
            return Err(CoreError::Config(
                "rating.default_weight must be positive".into(),
            ));
        }
        if self.rating.damping <= 0.0 {
            return Err(CoreError::Config("rating.damping must be positive".into()));
        }
        if self.storage.backend != "memory" && self.storage.backend != "rocksdb" {
            return Err(CoreError::Config(format!(
                "storage.backend must be \"memory\" or \"rocksdb\", got {:?}",
                self.storage.backend
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_window_of_one_rejected() {
        let mut config = Config::default();
        config.detector.window = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = Config::default();
        config.storage.backend = "postgres".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_rating_range_rejected() {
        let mut config = Config::default();
        config.detector.rating_floor = 3000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.detector.window, config.detector.window);
        assert_eq!(parsed.spatial_key, config.spatial_key);
    }
}
