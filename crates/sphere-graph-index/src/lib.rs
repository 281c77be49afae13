//! Sphere Graph Index
//!
//! A height-balanced spatial access method over 4-dimensional geometric
//! entries. The tree is generic over the entry identifier, carries no
//! dependency on the domain crates, and can be embedded behind whichever
//! host storage engine is chosen.
//!
//! # Architecture
//!
//! This crate defines:
//! - [`Region`] - a 4D axis-aligned bounding box with the access-method
//!   kernel operations (`union`, `penalty`, `consistent`, `same`,
//!   `min_distance`)
//! - [`GeoEntry`] - a leaf entry `(id, point, spatial key)`
//! - [`SpatialTree`] - the balanced tree with insert/remove/range/k-NN
//! - Error types and the [`IndexResult<T>`] alias
//!
//! # Example
//!
//! ```
//! use sphere_graph_index::{SpatialTree, GeoEntry, Region, TreeConfig};
//!
//! let tree: SpatialTree<u32> = SpatialTree::new(TreeConfig::default());
//! tree.insert(GeoEntry::new(7, [0.0, 0.0, 0.0, 1.0], 0)).unwrap();
//!
//! let hits = tree.range(&Region::cube([-1.0; 4], [1.0; 4]));
//! assert_eq!(hits, vec![7]);
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod node;
pub mod region;
pub mod tree;

pub use config::{SplitTieBreak, TreeConfig};
pub use entry::GeoEntry;
pub use error::{IndexError, IndexResult};
pub use region::Region;
pub use tree::{QueryMetric, SpatialTree};
