//! Name and proximity search over a borrowed store of geographic records.
//!
//! ```rust
//! use cityquery::{CityQueryBuilder, MemoryRecordStore, Record};
//!
//! let store = MemoryRecordStore::from_records([
//!     Record::new(1, "New York City", 40.71427, -74.00597).with_population(8_175_133),
//!     Record::new(2, "York", 53.95763, -1.08271).with_population(144_202),
//!     Record::new(3, "Newark", 40.73566, -74.17237).with_population(281_944),
//! ])?;
//!
//! let query = CityQueryBuilder::new().build(&store)?;
//!
//! let yorks = query.lexical_query("york")?;
//! assert_eq!(yorks.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
//!
//! let nearest = query.nearest_query(40.73, -74.17, 2)?;
//! assert_eq!(nearest.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 1]);
//! # Ok::<(), cityquery::CityQueryError>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod error;
pub mod persistence;
pub mod query;
pub mod store;

pub use builder::CityQueryBuilder;
pub use config::{Config, EARTH_RADIUS_KM};
pub use error::{CityQueryError, Result};
pub use query::CityQuery;
pub use store::{MemoryRecordStore, RecordStore};

pub use compute::lexical::InvertedIndex;
pub use compute::spatial::{Neighbor, RStarIndex, RTree, SpatialIndex, TreeStats};
pub use compute::transform::{CoordinateTransform, great_circle_distance_km};

pub use cityquery_types::bbox::BoundingBox3D;
pub use cityquery_types::point::Point3d;
pub use cityquery_types::record::{Record, RecordId};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{CityQuery, CityQueryBuilder, CityQueryError, Config, Result};

    pub use crate::{MemoryRecordStore, Record, RecordId, RecordStore};

    pub use crate::{Neighbor, RStarIndex, RTree, SpatialIndex};
}
