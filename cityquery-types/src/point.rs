use serde::{Deserialize, Serialize};

/// A point in 3D Cartesian space.
///
/// The indexes only ever hold points produced by projecting a record's
/// latitude/longitude onto a sphere centred at the origin, so every indexed
/// point lies at the same distance from the origin.
///
/// # Examples
///
/// ```
/// use cityquery_types::point::Point3d;
///
/// let p1 = Point3d::new(0.0, 0.0, 0.0);
/// let p2 = Point3d::new(3.0, 4.0, 12.0);
/// assert_eq!(p1.distance_3d(&p2), 13.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3d {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    /// Coordinates as an array, in (x, y, z) order.
    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Orders candidates the same way as `distance_3d` without the square
    /// root, which is what the nearest-neighbor searches compare on.
    #[inline]
    pub fn distance_squared(&self, other: &Point3d) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Straight-line (chord) distance to another point.
    #[inline]
    pub fn distance_3d(&self, other: &Point3d) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Distance from the origin.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl From<[f64; 3]> for Point3d {
    fn from(coords: [f64; 3]) -> Self {
        Self::new(coords[0], coords[1], coords[2])
    }
}
