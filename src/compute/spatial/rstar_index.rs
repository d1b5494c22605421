//! [`SpatialIndex`] backed by the `rstar` crate.
//!
//! `rstar` fixes its node capacities at the type level, so the capacities in
//! [`Config`] are ignored here. The nearest-neighbor iterator yields points in
//! distance order but leaves equal distances in tree order, so every point tied
//! with the k-th one is collected and the identifier tie break applied after.

use super::{GroupTag, Neighbor, SpatialIndex, cmp_candidates};
use crate::compute::validation::validate_k;
use crate::config::Config;
use crate::error::Result;
use cityquery_types::point::Point3d;
use cityquery_types::record::RecordId;
use rstar::{Point as RstarPoint, RTree};

/// 3D point carrying its record identifier and optional group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub id: RecordId,
    pub group: Option<GroupTag>,
}

impl IndexedPoint {
    pub fn new(id: RecordId, point: Point3d) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z: point.z,
            id,
            group: None,
        }
    }

    pub fn with_group(mut self, group: Option<GroupTag>) -> Self {
        self.group = group;
        self
    }

    fn query(point: &Point3d) -> Self {
        Self::new(0, *point)
    }
}

impl RstarPoint for IndexedPoint {
    type Scalar = f64;
    const DIMENSIONS: usize = 3;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Self {
            x: generator(0),
            y: generator(1),
            z: generator(2),
            id: 0,
            group: None,
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        match index {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => unreachable!(),
        }
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => unreachable!(),
        }
    }
}

/// R*-tree index from the `rstar` crate.
#[derive(Debug, Clone, Default)]
pub struct RStarIndex {
    tree: RTree<IndexedPoint>,
}

impl RStarIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load all points at once; usually faster than repeated inserts.
    pub fn bulk_load<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (RecordId, Point3d)>,
    {
        let points = entries
            .into_iter()
            .map(|(id, point)| IndexedPoint::new(id, point))
            .collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    /// Nearest points accepted by `accept`, with the identifier tie break.
    fn nearest_matching<F>(&self, query: &Point3d, k: usize, accept: F) -> Result<Vec<Neighbor>>
    where
        F: Fn(&IndexedPoint) -> bool,
    {
        if self.tree.size() == 0 {
            return Ok(Vec::new());
        }
        validate_k(k)?;

        let mut found: Vec<(f64, RecordId)> = Vec::new();
        for (point, dist_sq) in self
            .tree
            .nearest_neighbor_iter_with_distance_2(&IndexedPoint::query(query))
        {
            if !accept(point) {
                continue;
            }
            if found.len() >= k && found.last().is_some_and(|(kth, _)| dist_sq > *kth) {
                break;
            }
            found.push((dist_sq, point.id));
        }

        found.sort_by(|a, b| cmp_candidates(*a, *b));
        found.truncate(k);
        Ok(found
            .into_iter()
            .map(|(dist_sq, id)| Neighbor::new(id, dist_sq.sqrt()))
            .collect())
    }
}

impl SpatialIndex for RStarIndex {
    fn with_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new())
    }

    fn insert_grouped(&mut self, id: RecordId, point: Point3d, group: Option<GroupTag>) {
        self.tree.insert(IndexedPoint::new(id, point).with_group(group));
    }

    fn len(&self) -> usize {
        self.tree.size()
    }

    fn k_nearest_where(
        &self,
        query: &Point3d,
        k: usize,
        filter: &dyn Fn(RecordId) -> bool,
    ) -> Result<Vec<Neighbor>> {
        self.nearest_matching(query, k, |point| filter(point.id))
    }

    fn k_nearest_in_group(&self, query: &Point3d, k: usize, group: GroupTag) -> Result<Vec<Neighbor>> {
        self.nearest_matching(query, k, |point| point.group == Some(group))
    }
}
