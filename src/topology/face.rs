use crate::error::Result;
use crate::geometry::surface::{
    Cone, Cylinder, Plane, Sphere, Surface, SurfaceDomain, SurfaceHit, SurfaceKind,
};
use crate::math::{Point3, Vector3};

use super::wire::WireId;

slotmap::new_key_type! {
    /// Unique identifier for a face in the topology store.
    pub struct FaceId;
}

/// The geometric surface associated with a face.
#[derive(Debug, Clone)]
pub enum FaceSurface {
    /// A planar surface.
    Plane(Plane),
    /// A cylindrical surface.
    Cylinder(Cylinder),
    /// A conical surface.
    Cone(Cone),
    /// A spherical surface.
    Sphere(Sphere),
}

impl FaceSurface {
    /// Returns the surface family.
    #[must_use]
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Self::Plane(_) => SurfaceKind::Plane,
            Self::Cylinder(_) => SurfaceKind::Cylinder,
            Self::Cone(_) => SurfaceKind::Cone,
            Self::Sphere(_) => SurfaceKind::Sphere,
        }
    }
}

impl Surface for FaceSurface {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        match self {
            Self::Plane(s) => s.evaluate(u, v),
            Self::Cylinder(s) => s.evaluate(u, v),
            Self::Cone(s) => s.evaluate(u, v),
            Self::Sphere(s) => s.evaluate(u, v),
        }
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        match self {
            Self::Plane(s) => s.normal(u, v),
            Self::Cylinder(s) => s.normal(u, v),
            Self::Cone(s) => s.normal(u, v),
            Self::Sphere(s) => s.normal(u, v),
        }
    }

    fn domain(&self) -> SurfaceDomain {
        match self {
            Self::Plane(s) => s.domain(),
            Self::Cylinder(s) => s.domain(),
            Self::Cone(s) => s.domain(),
            Self::Sphere(s) => s.domain(),
        }
    }

    fn inverse(&self, point: &Point3) -> (f64, f64) {
        match self {
            Self::Plane(s) => s.inverse(point),
            Self::Cylinder(s) => s.inverse(point),
            Self::Cone(s) => s.inverse(point),
            Self::Sphere(s) => s.inverse(point),
        }
    }

    fn area_element(&self, u: f64, v: f64) -> Result<f64> {
        match self {
            Self::Plane(s) => s.area_element(u, v),
            Self::Cylinder(s) => s.area_element(u, v),
            Self::Cone(s) => s.area_element(u, v),
            Self::Sphere(s) => s.area_element(u, v),
        }
    }

    fn ray_intersect(
        &self,
        origin: &Point3,
        dir: &Vector3,
        t_min: f64,
        t_max: f64,
    ) -> Vec<SurfaceHit> {
        match self {
            Self::Plane(s) => s.ray_intersect(origin, dir, t_min, t_max),
            Self::Cylinder(s) => s.ray_intersect(origin, dir, t_min, t_max),
            Self::Cone(s) => s.ray_intersect(origin, dir, t_min, t_max),
            Self::Sphere(s) => s.ray_intersect(origin, dir, t_min, t_max),
        }
    }

    fn is_u_periodic(&self) -> bool {
        match self {
            Self::Plane(s) => s.is_u_periodic(),
            Self::Cylinder(s) => s.is_u_periodic(),
            Self::Cone(s) => s.is_u_periodic(),
            Self::Sphere(s) => s.is_u_periodic(),
        }
    }
}

/// Data associated with a topological face.
///
/// A face is a bounded region on a surface. Planar faces are trimmed by
/// their wires (the first is the outer boundary, the rest are holes).
/// Curved faces are trimmed by a parametric rectangle, `bounds`, and list
/// their boundary wires for adjacency only; a closed surface may have none.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// The geometric surface on which this face lies.
    pub surface: FaceSurface,
    /// Boundary wires.
    pub wires: Vec<WireId>,
    /// Parametric trimming rectangle for curved faces.
    pub bounds: Option<SurfaceDomain>,
    /// If `true`, the face normal agrees with the surface normal.
    pub same_sense: bool,
}

impl FaceData {
    /// Creates a planar face trimmed by its wires.
    #[must_use]
    pub fn planar(plane: Plane, wires: Vec<WireId>) -> Self {
        Self {
            surface: FaceSurface::Plane(plane),
            wires,
            bounds: None,
            same_sense: true,
        }
    }

    /// Creates a curved face trimmed by a parametric rectangle.
    #[must_use]
    pub fn bounded(
        surface: FaceSurface,
        bounds: SurfaceDomain,
        wires: Vec<WireId>,
        same_sense: bool,
    ) -> Self {
        Self {
            surface,
            wires,
            bounds: Some(bounds),
            same_sense,
        }
    }

    /// Outward (material-leaving) normal at `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface normal is degenerate there.
    pub fn outward_normal(&self, u: f64, v: f64) -> Result<Vector3> {
        let n = self.surface.normal(u, v)?;
        Ok(if self.same_sense { n } else { -n })
    }
}
