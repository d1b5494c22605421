//! # cityquery-types
//!
//! Core data types for the cityquery indexes.
//!
//! - **Records**: `Record`, `RecordId`
//! - **Cartesian points**: `Point3d`
//! - **Bounding boxes**: `BoundingBox3D`
//!
//! All types are serializable with Serde; geographic locations are exposed
//! as `geo` points.
//!
//! ## Examples
//!
//! ```rust
//! use cityquery_types::record::Record;
//!
//! let paris = Record::new(2988507, "Paris", 48.85341, 2.3488)
//!     .with_country_code("FR")
//!     .with_population(2_138_551);
//! assert_eq!(paris.location().y(), 48.85341);
//! ```

pub mod bbox;
pub mod point;
pub mod record;
