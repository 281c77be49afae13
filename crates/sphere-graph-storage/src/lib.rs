//! Sphere Graph Storage
//!
//! RocksDB persistence for the sphere graph tables. Wraps RocksDB with
//! tuned column families for compositions, relations, ratings, evidence,
//! contents, the atom snapshot, and the key-ordered spatial mirror, and
//! implements the core crate's `GraphStore` contract - including its two
//! concurrency guarantees (atomic create-or-append, serialized rating
//! read-modify-write) - behind per-hash lock striping.
//!
//! # Architecture
//!
//! ```text
//! SphereDb
//! ├── DB (RocksDB instance)
//! │   ├── CF: atoms                 - Seeded atom snapshot
//! │   ├── CF: compositions          - Composition headers
//! │   ├── CF: composition_sequences - Run-length sequences
//! │   ├── CF: relations             - Relation headers
//! │   ├── CF: relation_sequences    - Run-length sequences
//! │   ├── CF: relation_ratings      - (rating, observations) aggregates
//! │   ├── CF: relation_evidence     - Append-only provenance
//! │   ├── CF: evidence_by_content   - Provenance index
//! │   ├── CF: evidence_by_relation  - Provenance index
//! │   ├── CF: contents              - Ingestion events + root sequences
//! │   ├── CF: spatial_keys          - Key-ordered spatial mirror
//! │   └── CF: system                - Data version, metadata
//! └── Cache (shared LRU block cache, 256MB default)
//! ```

pub mod column_families;
pub mod rocksdb_backend;
pub mod serialization;

pub use column_families::cf_names;
pub use rocksdb_backend::{RocksDbConfig, SphereDb, StorageError};
