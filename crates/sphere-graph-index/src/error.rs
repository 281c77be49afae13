//! Error types for the spatial access method.

use thiserror::Error;

/// Top-level error type for spatial index operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    /// A delete or update referenced an entry id that is not in the tree.
    ///
    /// # When This Occurs
    ///
    /// - Removing an entry that was never inserted
    /// - Removing an entry under a point that does not match its stored
    ///   position (the descent never reaches its leaf)
    #[error("Entry not found in spatial index")]
    EntryNotFound,

    /// A bounding region collapsed to zero volume in a way that breaks
    /// penalty computation.
    ///
    /// Callers inside the tree recover from this by falling back to a
    /// Euclidean center-distance tie-break; the variant is surfaced only
    /// when a caller constructs an invalid region directly.
    #[error("Degenerate region: {0}")]
    DegenerateRegion(String),

    /// Tree configuration violates the occupancy invariants.
    ///
    /// `Constraint: 2 <= min_entries <= max_entries / 2`
    #[error("Invalid tree configuration: {0}")]
    InvalidConfig(String),

    /// A coordinate was NaN or infinite.
    ///
    /// Entries must carry finite coordinates; NaN would poison region
    /// unions and ordering in the best-first queue.
    #[error("Non-finite coordinate at axis {axis}: {value}")]
    NonFiniteCoordinate {
        /// Axis index in 0..4
        axis: usize,
        /// The offending value
        value: f64,
    },
}

/// Result type alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
