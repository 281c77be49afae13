//! Deterministic high-dimensional geometry: projection onto S³, distance
//! functions, and the forward-only spatial key encoding.

pub mod distance;
pub mod projector;
pub mod spatial_key;

pub use distance::{centroid, centroid_unweighted, euclidean, geodesic, geodesic_fast, normalize};
pub use projector::{OrderingKey, Projector};
pub use spatial_key::{SpatialKeyConfig, SpatialKeyEncoder};
