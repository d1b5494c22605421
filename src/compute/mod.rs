//! Compute layer: the indexes and the geometry they rely on.
//!
//! Nothing here knows where records come from. The builder feeds records in,
//! and the query facade reads results out.

pub mod lexical;
pub mod spatial;
pub mod transform;
pub mod validation;

pub use lexical::{InvertedIndex, tokenize};
pub use spatial::{Neighbor, RStarIndex, RTree, SpatialIndex, TreeStats};
pub use transform::{CoordinateTransform, great_circle_distance_km};
