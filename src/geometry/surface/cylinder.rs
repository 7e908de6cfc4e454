use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::intersect::quadratic_hits;
use super::{Surface, SurfaceDomain, SurfaceHit};

/// A cylindrical surface in 3D space.
///
/// Defined by a center point on the axis, radius, axis direction, and
/// a reference direction for u=0.
///
/// `P(u, v) = center + radius * cos(u) * ref_dir + radius * sin(u) * binormal + v * axis`
/// where `binormal = axis x ref_dir`.
///
/// The surface normal is `cos(u) * ref_dir + sin(u) * binormal` (away from
/// the axis).
#[derive(Debug, Clone)]
pub struct Cylinder {
    center: Point3,
    radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
}

impl Cylinder {
    /// Creates a new cylinder.
    ///
    /// # Arguments
    ///
    /// * `center` - A point on the cylinder axis
    /// * `radius` - Radius (must be positive)
    /// * `axis` - Axis direction (will be normalized)
    /// * `ref_dir` - Reference direction for u=0 (must be perpendicular to axis)
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, axis is zero-length,
    /// or the reference direction is not perpendicular to the axis.
    pub fn new(center: Point3, radius: f64, axis: Vector3, ref_dir: Vector3) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("cylinder radius must be positive".into()).into(),
            );
        }

        let axis_len = axis.norm();
        if axis_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let axis = axis / axis_len;

        let ref_len = ref_dir.norm();
        if ref_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let ref_dir = ref_dir / ref_len;

        if axis.dot(&ref_dir).abs() > TOLERANCE {
            return Err(GeometryError::Degenerate(
                "reference direction must be perpendicular to axis".into(),
            )
            .into());
        }

        Ok(Self {
            center,
            radius,
            axis,
            ref_dir,
        })
    }

    /// Returns the center point on the axis.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the reference direction (u=0).
    #[must_use]
    pub fn ref_dir(&self) -> &Vector3 {
        &self.ref_dir
    }

    /// Computes the binormal direction (`axis x ref_dir`).
    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }
}

impl Surface for Cylinder {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let binormal = self.binormal();
        let x = self.radius * u.cos();
        let y = self.radius * u.sin();
        Ok(self.center + self.ref_dir * x + binormal * y + self.axis * v)
    }

    fn normal(&self, u: f64, _v: f64) -> Result<Vector3> {
        let binormal = self.binormal();
        let n = self.ref_dir * u.cos() + binormal * u.sin();
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, std::f64::consts::TAU, f64::NEG_INFINITY, f64::INFINITY)
    }

    /// `u` = angle in `(-pi, pi]`, `v` = signed distance along the axis.
    fn inverse(&self, point: &Point3) -> (f64, f64) {
        let dp = point - self.center;
        let v = dp.dot(&self.axis);
        let binormal = self.binormal();
        let u = dp.dot(&binormal).atan2(dp.dot(&self.ref_dir));
        (u, v)
    }

    fn area_element(&self, _u: f64, _v: f64) -> Result<f64> {
        Ok(self.radius)
    }

    /// Reduces to a 2D circle-line problem in the plane perpendicular to
    /// the axis.
    fn ray_intersect(
        &self,
        origin: &Point3,
        dir: &Vector3,
        t_min: f64,
        t_max: f64,
    ) -> Vec<SurfaceHit> {
        let dp = origin - self.center;
        let dp_perp = dp - self.axis * dp.dot(&self.axis);
        let dir_perp = dir - self.axis * dir.dot(&self.axis);

        let a = dir_perp.dot(&dir_perp);
        if a < TOLERANCE {
            // Ray parallel to the axis never crosses the wall.
            return Vec::new();
        }
        let b = 2.0 * dp_perp.dot(&dir_perp);
        let c = dp_perp.dot(&dp_perp) - self.radius * self.radius;

        quadratic_hits(origin, dir, t_min, t_max, (a, b, c), |p| self.inverse(p))
    }

    fn is_u_periodic(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn z_cylinder(radius: f64) -> Cylinder {
        Cylinder::new(Point3::origin(), radius, Vector3::z(), Vector3::x()).unwrap()
    }

    #[test]
    fn evaluate_at_pi_over_2() {
        let c = z_cylinder(2.0);
        let p = c.evaluate(FRAC_PI_2, 0.0).unwrap();
        assert!((p - Point3::new(0.0, 2.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn evaluate_with_height() {
        let c = z_cylinder(1.0);
        let p = c.evaluate(0.0, 5.0).unwrap();
        assert!((p - Point3::new(1.0, 0.0, 5.0)).norm() < TOLERANCE);
    }

    #[test]
    fn normal_points_away_from_axis() {
        let c = z_cylinder(1.0);
        let n = c.normal(FRAC_PI_2, 0.0).unwrap();
        assert!((n - Vector3::y()).norm() < 1e-9);
    }

    #[test]
    fn invalid_radius() {
        let r = Cylinder::new(Point3::origin(), 0.0, Vector3::z(), Vector3::x());
        assert!(r.is_err());
    }

    #[test]
    fn inverse_roundtrip() {
        let c = z_cylinder(2.0);
        for &(u, v) in &[(0.0, 0.0), (FRAC_PI_2, 3.0), (1.0, -2.5), (TAU * 0.75, 1.0)] {
            let p = c.evaluate(u, v).unwrap();
            let (u2, v2) = c.inverse(&p);
            let p2 = c.evaluate(u2, v2).unwrap();
            assert!((p - p2).norm() < 1e-9, "roundtrip failed for u={u}, v={v}");
        }
    }

    #[test]
    fn ray_through_cylinder_gives_2_hits() {
        let cyl = Cylinder::new(Point3::origin(), 3.0, Vector3::z(), Vector3::x()).unwrap();
        let hits = cyl.ray_intersect(&Point3::new(-10.0, 0.0, 2.0), &Vector3::x(), 0.0, 20.0);
        assert_eq!(hits.len(), 2);
        assert!((hits[0].point.x + 3.0).abs() < 1e-6);
        assert!((hits[1].point.x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn ray_along_axis_misses() {
        let cyl = z_cylinder(1.0);
        let hits = cyl.ray_intersect(&Point3::new(0.5, 0.0, -5.0), &Vector3::z(), 0.0, 20.0);
        assert!(hits.is_empty());
    }

    #[test]
    fn area_element_is_radius() {
        let c = z_cylinder(2.5);
        assert!((c.area_element(0.3, 1.0).unwrap() - 2.5).abs() < TOLERANCE);
    }
}
