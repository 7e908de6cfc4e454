use crate::error::{GeometryError, Result};
use crate::math::{perpendicular_dir, Point2, Point3, Vector3, TOLERANCE};

use super::{Surface, SurfaceDomain, SurfaceHit};

/// An infinite plane in 3D space.
///
/// Defined by an origin point, and two orthogonal direction vectors
/// (`u_dir`, `v_dir`). The normal is `u_dir x v_dir`.
///
/// Parametric form: `P(u, v) = origin + u * u_dir + v * v_dir`.
#[derive(Debug, Clone)]
pub struct Plane {
    origin: Point3,
    u_dir: Vector3,
    v_dir: Vector3,
    normal: Vector3,
}

impl Plane {
    /// Creates a plane from an origin, a normal and an in-plane U direction.
    ///
    /// `u_hint` is projected into the plane; `v_dir` completes a
    /// right-handed frame so that `u_dir x v_dir = normal`.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal is zero-length or `u_hint` is
    /// parallel to it.
    pub fn new(origin: Point3, normal: Vector3, u_hint: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / len;

        let u_proj = u_hint - normal * u_hint.dot(&normal);
        let u_len = u_proj.norm();
        if u_len < TOLERANCE {
            return Err(
                GeometryError::Degenerate("plane u direction is parallel to its normal".into())
                    .into(),
            );
        }
        let u_dir = u_proj / u_len;
        let v_dir = normal.cross(&u_dir);

        Ok(Self {
            origin,
            u_dir,
            v_dir,
            normal,
        })
    }

    /// Creates a plane from an origin and a normal vector.
    ///
    /// The U and V directions are computed automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal vector is zero-length.
    pub fn from_normal(origin: Point3, normal: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / len;
        Self::new(origin, normal, perpendicular_dir(&normal))
    }

    /// Returns the origin point of the plane.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the U direction vector.
    #[must_use]
    pub fn u_dir(&self) -> &Vector3 {
        &self.u_dir
    }

    /// Returns the V direction vector.
    #[must_use]
    pub fn v_dir(&self) -> &Vector3 {
        &self.v_dir
    }

    /// Returns the normal vector of the plane.
    #[must_use]
    pub fn plane_normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Projects a 3D point to the plane's `(u, v)` coordinates.
    #[must_use]
    pub fn project(&self, point: &Point3) -> Point2 {
        let dp = point - self.origin;
        Point2::new(dp.dot(&self.u_dir), dp.dot(&self.v_dir))
    }
}

impl Surface for Plane {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        Ok(self.origin + self.u_dir * u + self.v_dir * v)
    }

    fn normal(&self, _u: f64, _v: f64) -> Result<Vector3> {
        Ok(self.normal)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY)
    }

    fn inverse(&self, point: &Point3) -> (f64, f64) {
        let uv = self.project(point);
        (uv.x, uv.y)
    }

    fn area_element(&self, _u: f64, _v: f64) -> Result<f64> {
        Ok(1.0)
    }

    /// Solves `(O + t*D - P0) . N = 0`; a ray parallel to the plane never hits.
    fn ray_intersect(
        &self,
        origin: &Point3,
        dir: &Vector3,
        t_min: f64,
        t_max: f64,
    ) -> Vec<SurfaceHit> {
        let denom = dir.dot(&self.normal);
        if denom.abs() < TOLERANCE {
            return Vec::new();
        }
        let t = (self.origin - origin).dot(&self.normal) / denom;
        if t < t_min - TOLERANCE || t > t_max + TOLERANCE {
            return Vec::new();
        }
        let point = origin + dir * t;
        let (u, v) = self.inverse(&point);
        vec![SurfaceHit { t, u, v, point }]
    }
}
