mod cone;
mod cylinder;
mod intersect;
mod plane;
mod sphere;

pub use cone::Cone;
pub use cylinder::Cylinder;
pub use plane::Plane;
pub use sphere::Sphere;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::{Point2, Point3, Vector3, TOLERANCE};

/// Parameter domain for a surface or a face on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDomain {
    /// Start of the U parameter range.
    pub u_min: f64,
    /// End of the U parameter range.
    pub u_max: f64,
    /// Start of the V parameter range.
    pub v_min: f64,
    /// End of the V parameter range.
    pub v_max: f64,
}

impl SurfaceDomain {
    /// Creates a new surface domain.
    #[must_use]
    pub fn new(u_min: f64, u_max: f64, v_min: f64, v_max: f64) -> Self {
        Self {
            u_min,
            u_max,
            v_min,
            v_max,
        }
    }

    /// Returns `true` if every bound is finite.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.u_min.is_finite()
            && self.u_max.is_finite()
            && self.v_min.is_finite()
            && self.v_max.is_finite()
    }

    /// Width of the U range.
    #[must_use]
    pub fn u_span(&self) -> f64 {
        self.u_max - self.u_min
    }

    /// Width of the V range.
    #[must_use]
    pub fn v_span(&self) -> f64 {
        self.v_max - self.v_min
    }

    /// The parametric centre of the domain.
    #[must_use]
    pub fn center(&self) -> Point2 {
        Point2::new(
            0.5 * (self.u_min + self.u_max),
            0.5 * (self.v_min + self.v_max),
        )
    }

    /// Returns `true` if `(u, v)` lies inside the domain, within `tol`.
    #[must_use]
    pub fn contains(&self, u: f64, v: f64, tol: f64) -> bool {
        u >= self.u_min - tol && u <= self.u_max + tol && v >= self.v_min - tol && v <= self.v_max + tol
    }
}

/// Coarse surface family, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Plane,
    Cylinder,
    Cone,
    Sphere,
}

/// A single intersection between a ray and a surface.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    /// Distance along the (unit) ray direction.
    pub t: f64,
    /// U parameter on the surface.
    pub u: f64,
    /// V parameter on the surface.
    pub v: f64,
    /// 3D intersection point.
    pub point: Point3,
}

/// Trait for parametric surfaces in 3D space.
///
/// Every surface kind the analysis can handle must provide point and
/// normal evaluation, its parametric domain, inversion and ray
/// intersection.
pub trait Surface {
    /// Evaluates the surface at parameters `(u, v)`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range or evaluation fails.
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3>;

    /// Computes the surface normal at parameters `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range or the normal is degenerate.
    fn normal(&self, u: f64, v: f64) -> Result<Vector3>;

    /// Returns the parameter domain of the surface.
    fn domain(&self) -> SurfaceDomain;

    /// Computes the `(u, v)` parameters of a point lying on the surface.
    fn inverse(&self, point: &Point3) -> (f64, f64);

    /// Area of the surface patch per unit `du * dv` at `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range.
    fn area_element(&self, u: f64, v: f64) -> Result<f64>;

    /// Intersects the ray `origin + t * dir` (`dir` of unit length) with the
    /// untrimmed surface, returning hits with `t` in `[t_min, t_max]`
    /// sorted by `t`.
    fn ray_intersect(&self, origin: &Point3, dir: &Vector3, t_min: f64, t_max: f64)
        -> Vec<SurfaceHit>;

    /// Returns `true` if the U parameter is an angle that wraps at `2 * pi`.
    fn is_u_periodic(&self) -> bool {
        false
    }
}

/// Brings an angle into `[start, start + 2*pi)`.
#[must_use]
pub fn wrap_angle(angle: f64, start: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let mut a = (angle - start) % tau;
    if a < 0.0 {
        a += tau;
    }
    if (tau - a).abs() < TOLERANCE {
        a = 0.0;
    }
    start + a
}
