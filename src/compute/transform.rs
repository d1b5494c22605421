//! Projection of geographic coordinates onto a sphere in 3D Cartesian space.
//!
//! For two points on a sphere of radius R separated by the central angle θ,
//! the straight-line (chord) distance is `2R·sin(θ/2)`. That function is
//! strictly increasing on θ ∈ [0, π], so ordering points by Euclidean distance
//! after the projection gives exactly the order by great-circle distance.
//! The R-tree therefore searches in Cartesian space and still returns the
//! geographically nearest records.

use crate::config::EARTH_RADIUS_KM;
use cityquery_types::point::Point3d;
use geo::{Distance, Haversine, Point};

/// Maps latitude/longitude in degrees to a point on a sphere of fixed radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    radius: f64,
}

impl CoordinateTransform {
    /// Transform onto a sphere of `radius`. The radius must be finite and
    /// positive; `Config::validate` checks that before the builder gets here.
    pub fn new(radius: f64) -> Self {
        debug_assert!(radius.is_finite() && radius > 0.0);
        Self { radius }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Project `(latitude, longitude)` in degrees.
    ///
    /// # Examples
    ///
    /// ```
    /// use cityquery::compute::transform::CoordinateTransform;
    ///
    /// let transform = CoordinateTransform::new(1.0);
    /// let north_pole = transform.to_cartesian(90.0, 0.0);
    /// assert!((north_pole.z - 1.0).abs() < 1e-12);
    /// ```
    pub fn to_cartesian(&self, latitude: f64, longitude: f64) -> Point3d {
        let lat = latitude.to_radians();
        let lon = longitude.to_radians();

        Point3d::new(
            self.radius * lat.cos() * lon.cos(),
            self.radius * lat.cos() * lon.sin(),
            self.radius * lat.sin(),
        )
    }

    /// Convert a chord length on this sphere to the arc length along its surface.
    pub fn chord_to_arc(&self, chord: f64) -> f64 {
        let half = (chord / (2.0 * self.radius)).clamp(0.0, 1.0);
        2.0 * self.radius * half.asin()
    }
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self::new(EARTH_RADIUS_KM)
    }
}

/// Great-circle distance in kilometres between two coordinates in degrees.
///
/// Computed with the haversine formula over the `geo` crate's mean Earth radius.
pub fn great_circle_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Haversine.distance(Point::new(lon1, lat1), Point::new(lon2, lat2)) / 1000.0
}
