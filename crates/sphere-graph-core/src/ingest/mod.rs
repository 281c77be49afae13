//! The ingestion pipeline and query surface.

pub mod pipeline;

pub use pipeline::{IngestionStats, SphereGraph};
