use crate::point::Point3d;
use serde::{Deserialize, Serialize};

/// A 3D axis-aligned bounding box.
///
/// Used as the minimum bounding rectangle (MBR) of R-tree nodes: the
/// smallest box covering every point or child box beneath a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3D {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

impl BoundingBox3D {
    /// Create a new 3D bounding box from minimum and maximum coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use cityquery_types::bbox::BoundingBox3D;
    ///
    /// let bbox = BoundingBox3D::new(0.0, 0.0, 0.0, 2.0, 3.0, 4.0);
    /// assert_eq!(bbox.volume(), 24.0);
    /// ```
    pub fn new(min_x: f64, min_y: f64, min_z: f64, max_x: f64, max_y: f64, max_z: f64) -> Self {
        Self {
            min_x,
            min_y,
            min_z,
            max_x,
            max_y,
            max_z,
        }
    }

    /// Degenerate box covering exactly one point.
    pub fn from_point(point: &Point3d) -> Self {
        Self::new(point.x, point.y, point.z, point.x, point.y, point.z)
    }

    /// Smallest box covering every box yielded by `boxes`, or `None` when empty.
    pub fn union_all<'a, I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a BoundingBox3D>,
    {
        let mut iter = boxes.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, bbox| acc.union(bbox)))
    }

    /// Get the width (x dimension) of the bounding box.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Get the height (y dimension) of the bounding box.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Get the depth (z dimension) of the bounding box.
    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }

    pub fn volume(&self) -> f64 {
        self.width() * self.height() * self.depth()
    }

    /// Sum of the edge lengths along each axis.
    ///
    /// Stays informative for flat boxes whose volume collapses to zero.
    pub fn margin(&self) -> f64 {
        self.width() + self.height() + self.depth()
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BoundingBox3D) -> Self {
        Self::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.min_z.min(other.min_z),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
            self.max_z.max(other.max_z),
        )
    }

    pub fn contains_point(&self, point: &Point3d) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
            && point.z >= self.min_z
            && point.z <= self.max_z
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_box(&self, other: &BoundingBox3D) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
            && other.min_z >= self.min_z
            && other.max_z <= self.max_z
    }

    /// Check if this bounding box intersects with another 3D bounding box.
    pub fn intersects(&self, other: &BoundingBox3D) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_y < other.min_y
            || self.min_y > other.max_y
            || self.max_z < other.min_z
            || self.min_z > other.max_z)
    }

    /// Squared distance from `point` to the closest point of the box.
    ///
    /// Zero when the point is inside. No point stored under the box can be
    /// closer to `point` than this, which is what makes it a pruning bound.
    pub fn min_distance_squared(&self, point: &Point3d) -> f64 {
        let dx = axis_gap(point.x, self.min_x, self.max_x);
        let dy = axis_gap(point.y, self.min_y, self.max_y);
        let dz = axis_gap(point.z, self.min_z, self.max_z);
        dx * dx + dy * dy + dz * dz
    }
}

#[inline]
fn axis_gap(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min - value
    } else if value > max {
        value - max
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox3d_dimensions() {
        let bbox = BoundingBox3D::new(0.0, 0.0, 0.0, 10.0, 5.0, 2.0);
        assert_eq!(bbox.width(), 10.0);
        assert_eq!(bbox.height(), 5.0);
        assert_eq!(bbox.depth(), 2.0);
        assert_eq!(bbox.volume(), 100.0);
        assert_eq!(bbox.margin(), 17.0);
    }

    #[test]
    fn test_union_and_containment() {
        let a = BoundingBox3D::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = BoundingBox3D::new(2.0, -1.0, 0.5, 3.0, 0.5, 4.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox3D::new(0.0, -1.0, 0.0, 3.0, 1.0, 4.0));
        assert!(u.contains_box(&a));
        assert!(u.contains_box(&b));
        assert!(!a.contains_box(&u));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_union_all() {
        let boxes = [
            BoundingBox3D::from_point(&Point3d::new(1.0, 2.0, 3.0)),
            BoundingBox3D::from_point(&Point3d::new(-1.0, 5.0, 0.0)),
        ];
        let u = BoundingBox3D::union_all(&boxes).unwrap();
        assert_eq!(u, BoundingBox3D::new(-1.0, 2.0, 0.0, 1.0, 5.0, 3.0));
        let empty: [BoundingBox3D; 0] = [];
        assert!(BoundingBox3D::union_all(&empty).is_none());
    }

    #[test]
    fn test_min_distance_squared() {
        let bbox = BoundingBox3D::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        assert_eq!(bbox.min_distance_squared(&Point3d::new(0.5, 0.5, 0.5)), 0.0);
        assert_eq!(bbox.min_distance_squared(&Point3d::new(3.0, 0.5, 0.5)), 4.0);
        assert_eq!(bbox.min_distance_squared(&Point3d::new(-1.0, 2.0, 0.5)), 2.0);
        assert!(bbox.contains_point(&Point3d::new(1.0, 0.0, 0.5)));
    }
}
