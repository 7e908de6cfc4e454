use nalgebra::{Rotation3, Unit};
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

use super::{Vector3, TOLERANCE};

/// A unit vector in 3-space used as a candidate mold-opening axis.
///
/// Always normalized; construction from a zero-length vector fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 3]", into = "[f64; 3]")]
pub struct Direction(Vector3);

impl Direction {
    /// Creates a direction by normalizing `v`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] if `v` has (near) zero length
    /// or non-finite components.
    pub fn new(v: Vector3) -> Result<Self, GeometryError> {
        let len = v.norm();
        if !len.is_finite() || len < TOLERANCE {
            return Err(GeometryError::ZeroVector);
        }
        Ok(Self(v / len))
    }

    /// The +X axis.
    #[must_use]
    pub fn x() -> Self {
        Self(Vector3::x())
    }

    /// The +Y axis.
    #[must_use]
    pub fn y() -> Self {
        Self(Vector3::y())
    }

    /// The +Z axis.
    #[must_use]
    pub fn z() -> Self {
        Self(Vector3::z())
    }

    /// Returns the underlying unit vector.
    #[must_use]
    pub fn as_vector(&self) -> &Vector3 {
        &self.0
    }

    /// Returns the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self(-self.0)
    }

    /// Dot product with an arbitrary vector.
    #[must_use]
    pub fn dot(&self, v: &Vector3) -> f64 {
        self.0.dot(v)
    }

    /// Angle in degrees between this direction and the unit vector `n`,
    /// in `[0, 180]`.
    #[must_use]
    pub fn angle_to_deg(&self, n: &Vector3) -> f64 {
        self.0.dot(n).clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Two unit vectors spanning the plane perpendicular to this direction.
    ///
    /// The basis is a deterministic function of the direction.
    #[must_use]
    pub fn tangent_basis(&self) -> (Vector3, Vector3) {
        let reference = if self.0.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let t1 = self.0.cross(&reference).normalize();
        let t2 = self.0.cross(&t1);
        (t1, t2)
    }

    /// Rotates this direction by `angle` radians about `axis`.
    ///
    /// Returns `self` unchanged if `axis` is degenerate.
    #[must_use]
    pub fn rotated(&self, axis: &Vector3, angle: f64) -> Self {
        if axis.norm() < TOLERANCE {
            return *self;
        }
        let rot = Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle);
        let v = rot * self.0;
        Self(v / v.norm())
    }

    /// Folds the direction onto the upper hemisphere (`z >= 0`, ties broken
    /// on `y` then `x`), identifying `d` with `-d`.
    #[must_use]
    pub fn canonical_axis(&self) -> Self {
        let v = self.0;
        let flip = if v.z.abs() > TOLERANCE {
            v.z < 0.0
        } else if v.y.abs() > TOLERANCE {
            v.y < 0.0
        } else {
            v.x < 0.0
        };
        if flip {
            self.reversed()
        } else {
            *self
        }
    }

    /// A deterministic, near-uniform set of `count` directions over the
    /// upper hemisphere (Fibonacci lattice).
    #[must_use]
    pub fn fibonacci_hemisphere(count: usize) -> Vec<Self> {
        let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        (0..count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let fi = i as f64;
                let z = 1.0 - (fi + 0.5) / n;
                let r = (1.0 - z * z).max(0.0).sqrt();
                let phi = fi * golden_angle;
                Self(Vector3::new(r * phi.cos(), r * phi.sin(), z))
            })
            .collect()
    }
}

impl TryFrom<[f64; 3]> for Direction {
    type Error = GeometryError;

    fn try_from(v: [f64; 3]) -> Result<Self, Self::Error> {
        Self::new(Vector3::new(v[0], v[1], v[2]))
    }
}

impl From<Direction> for [f64; 3] {
    fn from(d: Direction) -> Self {
        [d.0.x, d.0.y, d.0.z]
    }
}
