//! Sphere Graph Core
//!
//! Converts arbitrary digital content into a deduplicated, spatially
//! indexed semantic graph. Code points map to immutable atoms bound to
//! permanent positions on the unit hypersphere S³; atom sequences become
//! content-addressed compositions; co-occurring compositions become
//! relations carrying evidence-weighted competence ratings; and every
//! positioned entity is queryable through a balanced spatial access
//! method.
//!
//! # Architecture
//!
//! This crate defines:
//! - Domain types (`Atom`, `Physicality`, `Composition`, `Relation`,
//!   `RelationRating`, `RelationEvidence`, `Content`)
//! - Deterministic geometry (`Projector`, distance kernels,
//!   `SpatialKeyEncoder`)
//! - The write-once `AtomStore` and its seeding pass
//! - The `ContentGraphBuilder` (run-length compression, canonical
//!   hashing, cascading dedup)
//! - Relation detection (windowed co-occurrence and approximate k-NN)
//! - The `RatingEngine` with reversible evidence provenance
//! - The `GraphStore` boundary trait with an in-memory implementation
//! - The `SphereGraph` ingestion pipeline and query surface
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use uuid::Uuid;
//! use sphere_graph_core::atoms::AtomSeeder;
//! use sphere_graph_core::config::Config;
//! use sphere_graph_core::ingest::SphereGraph;
//! use sphere_graph_core::store::MemoryGraphStore;
//! use sphere_graph_core::types::StorageMode;
//!
//! let atoms = Arc::new(
//!     AtomSeeder::default().seed_codepoint_range(' '..='~', 1).unwrap(),
//! );
//! let graph = SphereGraph::new(atoms, MemoryGraphStore::new(), Config::default()).unwrap();
//!
//! let id = Uuid::new_v4();
//! let stream: Vec<u32> = "hello world".chars().map(u32::from).collect();
//! let stats = graph.ingest(id, &stream, "text/plain", StorageMode::Dense).unwrap();
//! assert_eq!(stats.compositions_created, 2);
//! assert_eq!(graph.reconstruct(&id).unwrap(), b"hello world");
//! ```

pub mod atoms;
pub mod config;
pub mod detect;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod ingest;
pub mod rating;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{last_error, CoreError, CoreResult, ErrorDescriptor};
pub use ingest::{IngestionStats, SphereGraph};
