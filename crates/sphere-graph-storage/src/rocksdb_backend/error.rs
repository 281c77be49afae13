//! Backend error types.

use thiserror::Error;

use sphere_graph_core::CoreError;

/// Errors raised by the RocksDB backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database could not be opened.
    #[error("Failed to open database at {path}: {message}")]
    OpenFailed {
        /// Attempted database path
        path: String,
        /// Underlying RocksDB message
        message: String,
    },

    /// A column family handle is missing.
    #[error("Column family not found: {name}")]
    ColumnFamilyNotFound {
        /// The missing column family name
        name: String,
    },

    /// A read or write failed inside RocksDB.
    #[error("RocksDB operation failed: {0}")]
    Rocks(#[from] rocksdb::Error),

    /// Value (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Stored bytes violate the expected layout.
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    /// A flush could not complete.
    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<StorageError> for CoreError {
    /// The core sees backend failures as opaque storage errors; typed
    /// misses and integrity failures are raised by the store impl itself
    /// as core variants, never through this path.
    fn from(err: StorageError) -> Self {
        CoreError::Storage(err.to_string())
    }
}
