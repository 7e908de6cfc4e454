use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::intersect::quadratic_hits;
use super::{Surface, SurfaceDomain, SurfaceHit};

/// A spherical surface in 3D space.
///
/// Defined by a center, radius, axis (north pole direction), and a
/// reference direction for the equator at u=0.
///
/// `P(u, v) = center + r * cos(v) * cos(u) * ref_dir + r * cos(v) * sin(u) * binormal + r * sin(v) * axis`
/// where `binormal = axis x ref_dir`.
///
/// Parameters: `u` = longitude `[0, 2*pi)`, `v` = latitude `[-pi/2, pi/2]`.
/// The surface normal is `(P - center) / radius`.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
}

impl Sphere {
    /// Creates a new sphere.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, axis is zero-length,
    /// or the reference direction is not perpendicular to the axis.
    pub fn new(center: Point3, radius: f64, axis: Vector3, ref_dir: Vector3) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("sphere radius must be positive".into()).into(),
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

    /// Returns the center of the sphere.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Computes the binormal direction (`axis x ref_dir`).
    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }
}

impl Surface for Sphere {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let binormal = self.binormal();
        let cv = v.cos();
        let sv = v.sin();
        let cu = u.cos();
        let su = u.sin();
        Ok(self.center
            + self.ref_dir * (self.radius * cv * cu)
            + binormal * (self.radius * cv * su)
            + self.axis * (self.radius * sv))
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        let binormal = self.binormal();
        let cv = v.cos();
        let n = self.ref_dir * (cv * u.cos()) + binormal * (cv * u.sin()) + self.axis * v.sin();
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(
            0.0,
            std::f64::consts::TAU,
            -std::f64::consts::FRAC_PI_2,
            std::f64::consts::FRAC_PI_2,
        )
    }

    /// `u` = longitude in `(-pi, pi]`, `v` = latitude in `[-pi/2, pi/2]`.
    fn inverse(&self, point: &Point3) -> (f64, f64) {
        let dp = (point - self.center) / self.radius;
        let binormal = self.binormal();
        let v = dp.dot(&self.axis).clamp(-1.0, 1.0).asin();
        let u = dp.dot(&binormal).atan2(dp.dot(&self.ref_dir));
        (u, v)
    }

    /// `r^2 * cos(v)`; vanishes at the poles.
    fn area_element(&self, _u: f64, v: f64) -> Result<f64> {
        Ok(self.radius * self.radius * v.cos().abs())
    }

    fn ray_intersect(
        &self,
        origin: &Point3,
        dir: &Vector3,
        t_min: f64,
        t_max: f64,
    ) -> Vec<SurfaceHit> {
        let dp = origin - self.center;
        let a = dir.dot(dir);
        let b = 2.0 * dp.dot(dir);
        let c = dp.dot(&dp) - self.radius * self.radius;
        quadratic_hits(origin, dir, t_min, t_max, (a, b, c), |p| self.inverse(p))
    }

    fn is_u_periodic(&self) -> bool {
        true
    }
}
