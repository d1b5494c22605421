//! Nearest-neighbor indexes over projected record locations.
//!
//! [`SpatialIndex`] is the capability the query layer relies on. Two
//! implementations ship with the crate:
//!
//! - [`RTree`]: a Guttman R-tree with quadratic split and best-first
//!   branch-and-bound k-nearest search. This is the default.
//! - [`RStarIndex`]: an adapter over the `rstar` crate's R*-tree.
//!
//! Both order results by Euclidean distance to the query point and break ties
//! by ascending record identifier.

pub mod rstar_index;
pub mod rtree;

pub use rstar_index::RStarIndex;
pub use rtree::{RTree, TreeStats};

use crate::config::Config;
use crate::error::Result;
use cityquery_types::point::Point3d;
use cityquery_types::record::RecordId;
use std::cmp::Ordering;

/// Small interned label attached to an indexed point, such as a country.
pub type GroupTag = u16;

/// A record found by a nearest-neighbor search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: RecordId,
    /// Euclidean distance between the query point and the record's point
    pub distance: f64,
}

impl Neighbor {
    pub fn new(id: RecordId, distance: f64) -> Self {
        Self { id, distance }
    }
}

/// Spatial index capability: bulk insertion at build time, then read-only
/// k-nearest-neighbor queries.
pub trait SpatialIndex: Send + Sync {
    /// Create an empty index honouring the node capacities in `config`.
    ///
    /// Fails with `InvalidInput` when `config` does not validate.
    fn with_config(config: &Config) -> Result<Self>
    where
        Self: Sized;

    /// Add a point labelled with `group`. Only called while the index is
    /// being built.
    fn insert_grouped(&mut self, id: RecordId, point: Point3d, group: Option<GroupTag>);

    /// Add a point without a group.
    fn insert(&mut self, id: RecordId, point: Point3d) {
        self.insert_grouped(id, point, None);
    }

    /// Number of stored points.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` stored points accepted by `filter`, nearest first.
    ///
    /// Distances are non-decreasing; equal distances are ordered by ascending
    /// identifier. An empty index returns an empty list for every `k`;
    /// otherwise `k == 0` is rejected with `InvalidInput`.
    fn k_nearest_where(
        &self,
        query: &Point3d,
        k: usize,
        filter: &dyn Fn(RecordId) -> bool,
    ) -> Result<Vec<Neighbor>>;

    /// Up to `k` stored points labelled with `group`, nearest first. Same
    /// ordering and `k` rules as [`k_nearest_where`](Self::k_nearest_where).
    fn k_nearest_in_group(&self, query: &Point3d, k: usize, group: GroupTag) -> Result<Vec<Neighbor>>;

    /// Up to `k` stored points nearest to `query`.
    fn k_nearest(&self, query: &Point3d, k: usize) -> Result<Vec<Neighbor>> {
        self.k_nearest_where(query, k, &|_| true)
    }
}

/// Total order used by every index: squared distance, then identifier.
#[inline]
pub(crate) fn cmp_candidates(a: (f64, RecordId), b: (f64, RecordId)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}
