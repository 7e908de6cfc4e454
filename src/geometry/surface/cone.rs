use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::intersect::{quadratic_roots, sort_and_dedup};
use super::{Surface, SurfaceDomain, SurfaceHit};

/// A conical surface in 3D space.
///
/// Defined by an apex point, an axis direction, a half-angle, and a
/// reference direction for u=0.
///
/// `P(u, v) = apex + v * (cos(alpha) * axis + sin(alpha) * (cos(u) * ref_dir + sin(u) * binormal))`
/// where `binormal = axis x ref_dir` and `alpha` is the half-angle.
///
/// The parameter `v >= 0` measures distance along the generator from the apex.
#[derive(Debug, Clone)]
pub struct Cone {
    apex: Point3,
    axis: Vector3,
    half_angle: f64,
    ref_dir: Vector3,
}

impl Cone {
    /// Creates a new cone.
    ///
    /// # Arguments
    ///
    /// * `apex` - The apex (tip) of the cone
    /// * `axis` - Axis direction from apex outward (will be normalized)
    /// * `half_angle` - Half-angle in radians (must be in `(0, pi/2)`)
    /// * `ref_dir` - Reference direction for u=0 (must be perpendicular to axis)
    ///
    /// # Errors
    ///
    /// Returns an error if the half-angle is out of range, axis is zero-length,
    /// or the reference direction is not perpendicular to the axis.
    pub fn new(apex: Point3, axis: Vector3, half_angle: f64, ref_dir: Vector3) -> Result<Self> {
        if half_angle <= TOLERANCE || half_angle >= std::f64::consts::FRAC_PI_2 - TOLERANCE {
            return Err(GeometryError::Degenerate(
                "cone half-angle must be in (0, pi/2)".into(),
            )
            .into());
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
            apex,
            axis,
            half_angle,
            ref_dir,
        })
    }

    /// Returns the apex point.
    #[must_use]
    pub fn apex(&self) -> &Point3 {
        &self.apex
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the half-angle in radians.
    #[must_use]
    pub fn half_angle(&self) -> f64 {
        self.half_angle
    }

    /// Computes the binormal direction (`axis x ref_dir`).
    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }
}

impl Surface for Cone {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let binormal = self.binormal();
        let ca = self.half_angle.cos();
        let sa = self.half_angle.sin();
        let radial = self.ref_dir * u.cos() + binormal * u.sin();
        let dir = self.axis * ca + radial * sa;
        Ok(self.apex + dir * v)
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        if v.abs() < TOLERANCE {
            return Err(GeometryError::Degenerate(
                "cone normal is degenerate at apex".into(),
            )
            .into());
        }
        let binormal = self.binormal();
        let ca = self.half_angle.cos();
        let sa = self.half_angle.sin();
        let radial = self.ref_dir * u.cos() + binormal * u.sin();
        // dP/du x dP/dv, pointing away from the axis.
        let du = (-self.ref_dir * u.sin() + binormal * u.cos()) * (v * sa);
        let dv = self.axis * ca + radial * sa;
        let n = du.cross(&dv);
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, std::f64::consts::TAU, 0.0, f64::INFINITY)
    }

    /// `u` = angle around axis in `(-pi, pi]`, `v` = distance along the
    /// generator from the apex.
    fn inverse(&self, point: &Point3) -> (f64, f64) {
        let dp = point - self.apex;
        let binormal = self.binormal();
        let v = dp.norm();
        let u = dp.dot(&binormal).atan2(dp.dot(&self.ref_dir));
        (u, v)
    }

    /// `v * sin(alpha)`: the circumference radius at distance `v`.
    fn area_element(&self, _u: f64, v: f64) -> Result<f64> {
        Ok(v.abs() * self.half_angle.sin())
    }

    /// Solves `((P - apex) . axis)^2 = |P - apex|^2 * cos^2(alpha)` and
    /// keeps the forward nappe only.
    fn ray_intersect(
        &self,
        origin: &Point3,
        dir: &Vector3,
        t_min: f64,
        t_max: f64,
    ) -> Vec<SurfaceHit> {
        let ca = self.half_angle.cos();
        let cos2 = ca * ca;
        let dp = origin - self.apex;
        let d_dot_a = dir.dot(&self.axis);
        let dp_dot_a = dp.dot(&self.axis);

        let a = d_dot_a * d_dot_a - dir.dot(dir) * cos2;
        let b = 2.0 * (d_dot_a * dp_dot_a - dp.dot(dir) * cos2);
        let c = dp_dot_a * dp_dot_a - dp.dot(&dp) * cos2;

        let mut hits = Vec::new();
        for t in quadratic_roots(a, b, c) {
            if t < t_min - TOLERANCE || t > t_max + TOLERANCE {
                continue;
            }
            let point = origin + dir * t;
            if (point - self.apex).dot(&self.axis) < -TOLERANCE {
                continue;
            }
            let (u, v) = self.inverse(&point);
            hits.push(SurfaceHit { t, u, v, point });
        }
        sort_and_dedup(&mut hits);
        hits
    }

    fn is_u_periodic(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

    fn z_cone_45() -> Cone {
        Cone::new(Point3::origin(), Vector3::z(), FRAC_PI_4, Vector3::x()).unwrap()
    }

    #[test]
    fn evaluate_along_generator() {
        let c = z_cone_45();
        let p = c.evaluate(0.0, 1.0).unwrap();
        let s = FRAC_PI_4.sin();
        let co = FRAC_PI_4.cos();
        assert!((p - Point3::new(s, 0.0, co)).norm() < 1e-9);
    }

    #[test]
    fn normal_degenerate_at_apex() {
        assert!(z_cone_45().normal(0.0, 0.0).is_err());
    }

    #[test]
    fn normal_outward_and_down() {
        let n = z_cone_45().normal(0.0, 1.0).unwrap();
        assert!(n.x > 0.0);
        assert!(n.z < 0.0);
    }

    #[test]
    fn invalid_half_angle_90() {
        let r = Cone::new(Point3::origin(), Vector3::z(), FRAC_PI_2, Vector3::x());
        assert!(r.is_err());
    }

    #[test]
    fn inverse_roundtrip() {
        let c = z_cone_45();
        for &(u, v) in &[(0.0, 1.0), (FRAC_PI_2, 2.0), (1.0, 3.0), (TAU * 0.75, 0.5)] {
            let p = c.evaluate(u, v).unwrap();
            let (u2, v2) = c.inverse(&p);
            let p2 = c.evaluate(u2, v2).unwrap();
            assert!((p - p2).norm() < 1e-9, "roundtrip failed for u={u}, v={v}");
        }
    }

    #[test]
    fn ray_through_cone_gives_2_hits() {
        let cone = z_cone_45();
        let hits = cone.ray_intersect(&Point3::new(-10.0, 0.0, 5.0), &Vector3::x(), 0.0, 20.0);
        // At z=5, cone radius = 5*tan(45°) = 5
        assert_eq!(hits.len(), 2);
        assert!((hits[0].point.x + 5.0).abs() < 1e-4);
        assert!((hits[1].point.x - 5.0).abs() < 1e-4);
    }

    #[test]
    fn backward_nappe_is_ignored() {
        let cone = z_cone_45();
        let hits = cone.ray_intersect(&Point3::new(-10.0, 0.0, -5.0), &Vector3::x(), 0.0, 20.0);
        assert!(hits.is_empty());
    }
}
