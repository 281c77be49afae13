//! Content-addressed graph construction.

pub mod builder;

pub use builder::{BuildOutcome, ContentGraphBuilder};
