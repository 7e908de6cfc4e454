use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Curve, CurveDomain};

/// An infinite line defined by an origin point and a unit direction.
///
/// The parametric form is `P(t) = origin + t * direction`, so `t` is arc
/// length from the origin.
#[derive(Debug, Clone)]
pub struct Line {
    origin: Point3,
    direction: Vector3,
}

impl Line {
    /// Creates a new line from an origin and direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction vector is zero-length.
    pub fn new(origin: Point3, direction: Vector3) -> Result<Self> {
        let len = direction.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self {
            origin,
            direction: direction / len,
        })
    }

    /// Creates the line through `start` and `end` and returns it together
    /// with the parameter of `end` (the segment length).
    ///
    /// # Errors
    ///
    /// Returns an error if the two points coincide.
    pub fn through(start: Point3, end: Point3) -> Result<(Self, f64)> {
        let line = Self::new(start, end - start)?;
        Ok((line, (end - start).norm()))
    }

    /// Returns the origin point of the line.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the unit direction vector of the line.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }
}

impl Curve for Line {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        Ok(self.origin + self.direction * t)
    }

    fn tangent(&self, _t: f64) -> Result<Vector3> {
        Ok(self.direction)
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    fn is_closed(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn through_returns_segment_length() {
        let (line, len) = Line::through(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 3.0, 4.0)).unwrap();
        assert!((len - 5.0).abs() < 1e-12);
        let end = line.evaluate(len).unwrap();
        assert!((end - Point3::new(1.0, 3.0, 4.0)).norm() < 1e-12);
    }

    #[test]
    fn coincident_points_fail() {
        assert!(Line::through(Point3::origin(), Point3::origin()).is_err());
    }

    #[test]
    fn polyline_of_segment() {
        let (line, len) = Line::through(Point3::origin(), Point3::new(2.0, 0.0, 0.0)).unwrap();
        let pts = line.sample_polyline(0.0, len, 4).unwrap();
        assert_eq!(pts.len(), 5);
        assert!((pts[2].x - 1.0).abs() < 1e-12);
    }
}
