//! Backend configuration.

use serde::{Deserialize, Serialize};

/// RocksDB tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Shared LRU block cache size in bytes.
    pub block_cache_size: usize,
    /// Maximum open SST files.
    pub max_open_files: i32,
    /// Write-ahead log for durability.
    pub enable_wal: bool,
    /// Create the database directory when missing.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            block_cache_size: 256 * 1024 * 1024,
            max_open_files: 1000,
            enable_wal: true,
            create_if_missing: true,
        }
    }
}
