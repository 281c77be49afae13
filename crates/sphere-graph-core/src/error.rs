//! Error types for sphere-graph-core.
//!
//! This module defines the central error type [`CoreError`] used throughout
//! the crate, the [`CoreResult<T>`] alias, and the boundary reporting
//! channel ([`ErrorDescriptor`], [`last_error`]) for callers that cannot
//! consume native `Result` values.
//!
//! # Taxonomy
//!
//! - **Validation** - malformed code point, empty sequence, out-of-domain
//!   coordinate; rejected before anything is persisted.
//! - **Integrity** - hash collision between distinct sequences; fatal,
//!   aborts the operation, never silently merged.
//! - **NotFound** - a typed miss for a missing atom/composition/relation/
//!   evidence/content id.
//! - **Reconstruction** - content stored without a replayable sequence;
//!   signaled distinctly from NotFound.
//!
//! Concurrency conflicts (losing a create race, rating contention) are
//! resolved inside the storage boundary and never surface here.

use std::cell::RefCell;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{ChildRef, ContentHash};
use sphere_graph_index::IndexError;

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A value is not a Unicode scalar value (surrogate or out of range).
    #[error("Malformed code point: U+{codepoint:X}")]
    MalformedCodePoint {
        /// The offending value
        codepoint: u32,
    },

    /// A zero-length child sequence was offered for composition.
    #[error("Empty sequence: compositions and relations need at least one child")]
    EmptySequence,

    /// A coordinate fell outside its legal domain before clamping was
    /// permitted (NaN or infinite input).
    #[error("Out-of-domain coordinate at axis {axis}: {value}")]
    OutOfDomainCoordinate {
        /// Axis index in 0..4
        axis: usize,
        /// The offending value
        value: f64,
    },

    /// A position failed the unit-norm invariant.
    ///
    /// `Constraint: | |position| - 1 | <= 1e-9`
    #[error("Position is not on the unit hypersphere: |p| = {norm}")]
    NotUnitNorm {
        /// Actual Euclidean norm of the position
        norm: f64,
    },

    /// A referenced child atom or composition does not exist.
    #[error("Child not found: {child:?}")]
    ChildNotFound {
        /// The dangling reference
        child: ChildRef,
    },

    /// No atom is seeded for the code point.
    ///
    /// The atom table is write-once; a miss here means the seed artifact
    /// did not cover this scalar value, never that an insert is wanted.
    #[error("Atom not found for code point U+{codepoint:X}")]
    AtomNotFound {
        /// The code point that missed
        codepoint: u32,
    },

    /// A composition id resolved to nothing.
    #[error("Composition not found: {hash}")]
    CompositionNotFound {
        /// Content hash of the missing composition
        hash: ContentHash,
    },

    /// A relation id resolved to nothing.
    #[error("Relation not found: {hash}")]
    RelationNotFound {
        /// Content hash of the missing relation
        hash: ContentHash,
    },

    /// An evidence id resolved to nothing.
    #[error("Evidence not found: {id}")]
    EvidenceNotFound {
        /// The missing evidence id
        id: Uuid,
    },

    /// A content id resolved to nothing.
    #[error("Content not found: {id}")]
    ContentNotFound {
        /// The missing content id
        id: Uuid,
    },

    /// A content id was ingested twice.
    #[error("Content already ingested: {id}")]
    DuplicateContent {
        /// The already-used content id
        id: Uuid,
    },

    /// Two distinct sequences produced the same content hash.
    ///
    /// Fatal: the insert is aborted and surfaced; rows are never merged.
    #[error("Hash collision on {hash}: distinct sequences, identical digest")]
    HashCollision {
        /// The colliding digest
        hash: ContentHash,
    },

    /// Centroid input cancelled to the zero vector (antipodal inputs).
    #[error("Degenerate centroid: positions cancel to the zero vector")]
    DegenerateCentroid,

    /// An embedding vector's dimension does not match the rest of its
    /// source.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the first vector in the source
        expected: usize,
        /// Dimension of the offending vector
        actual: usize,
    },

    /// Rolling back evidence would drive the observation count to zero or
    /// below; the relation has no remaining valid evidence and is eligible
    /// for removal.
    #[error("Rating underflow: observations would drop to {observations}")]
    RatingUnderflow {
        /// Observation count the rollback would have produced
        observations: f64,
    },

    /// The evidence row was already invalidated; rollback is not applied
    /// twice.
    #[error("Evidence already invalid: {id}")]
    EvidenceAlreadyInvalid {
        /// The evidence id
        id: Uuid,
    },

    /// The content was stored in Sparse mode (or predates sequence
    /// retention) and cannot be replayed.
    #[error("Reconstruction unavailable for content {id}")]
    ReconstructionUnavailable {
        /// The content id
        id: Uuid,
    },

    /// The process-wide atom table has not been installed yet.
    #[error("Atom store not installed; seed and install it before ingesting")]
    AtomStoreNotInstalled,

    /// The process-wide atom table was installed twice without a version
    /// rebuild.
    #[error("Atom store already installed (data version {data_version})")]
    AtomStoreAlreadyInstalled {
        /// Version of the store that is already in place
        data_version: u32,
    },

    /// An error bubbled out of the spatial access method.
    #[error("Spatial index error: {0}")]
    Index(#[from] IndexError),

    /// An error occurred at the storage boundary.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error during serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An unexpected internal error; indicates a bug.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl CoreError {
    /// Stable machine-readable code for boundary reporting.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::MalformedCodePoint { .. } => "malformed_code_point",
            CoreError::EmptySequence => "empty_sequence",
            CoreError::OutOfDomainCoordinate { .. } => "out_of_domain_coordinate",
            CoreError::NotUnitNorm { .. } => "not_unit_norm",
            CoreError::ChildNotFound { .. } => "child_not_found",
            CoreError::AtomNotFound { .. } => "atom_not_found",
            CoreError::CompositionNotFound { .. } => "composition_not_found",
            CoreError::RelationNotFound { .. } => "relation_not_found",
            CoreError::EvidenceNotFound { .. } => "evidence_not_found",
            CoreError::ContentNotFound { .. } => "content_not_found",
            CoreError::DuplicateContent { .. } => "duplicate_content",
            CoreError::HashCollision { .. } => "hash_collision",
            CoreError::DegenerateCentroid => "degenerate_centroid",
            CoreError::DimensionMismatch { .. } => "dimension_mismatch",
            CoreError::RatingUnderflow { .. } => "rating_underflow",
            CoreError::EvidenceAlreadyInvalid { .. } => "evidence_already_invalid",
            CoreError::ReconstructionUnavailable { .. } => "reconstruction_unavailable",
            CoreError::AtomStoreNotInstalled => "atom_store_not_installed",
            CoreError::AtomStoreAlreadyInstalled { .. } => "atom_store_already_installed",
            CoreError::Index(_) => "index",
            CoreError::Storage(_) => "storage",
            CoreError::Config(_) => "config",
            CoreError::Serialization(_) => "serialization",
            CoreError::Internal(_) => "internal",
        }
    }

    /// Snapshot this error into a boundary descriptor.
    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            code: self.code().to_string(),
            message: self.to_string(),
            at: Utc::now(),
        }
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Boundary error snapshot for callers without native result channels.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorDescriptor {
    /// Stable machine-readable code, e.g. `hash_collision`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// When the error was recorded.
    pub at: DateTime<Utc>,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<ErrorDescriptor>> = const { RefCell::new(None) };
}

/// Record an error for later retrieval through [`last_error`].
///
/// Called by the pipeline on every failing public operation; the slot is
/// per-thread so concurrent ingestion streams do not clobber each other.
pub fn remember(err: &CoreError) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(err.descriptor()));
}

/// Take the most recent error recorded on this thread, clearing the slot.
pub fn last_error() -> Option<ErrorDescriptor> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

/// Pass a result through, remembering any error for boundary callers.
pub(crate) fn noted<T>(result: CoreResult<T>) -> CoreResult<T> {
    if let Err(err) = &result {
        remember(err);
    }
    result
}
