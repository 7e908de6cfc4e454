use std::f64::consts::{FRAC_PI_2, TAU};

use crate::error::{InputError, Result};
use crate::geometry::surface::{Sphere, SurfaceDomain};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::topology::{FaceData, FaceId, FaceSurface, SolidId, TopologyStore};

use super::{add_circle, single_edge_wire, MakeSolid};

/// Creates a sphere solid, optionally hollow.
///
/// Each spherical skin is split at its equator (normal to +Z) into an
/// upper and a lower hemisphere sharing one full-circle edge.
pub struct MakeSphere {
    center: Point3,
    radius: f64,
    cavity_radius: Option<f64>,
}

impl MakeSphere {
    /// Creates a new `MakeSphere` operation.
    #[must_use]
    pub fn new(center: Point3, radius: f64) -> Self {
        Self {
            center,
            radius,
            cavity_radius: None,
        }
    }

    /// Hollows the sphere with a concentric spherical void.
    #[must_use]
    pub fn with_cavity(mut self, radius: f64) -> Self {
        self.cavity_radius = Some(radius);
        self
    }

    /// Executes the operation, creating the sphere in the topology store.
    ///
    /// Faces are ordered outer upper, outer lower, then (when hollow) inner
    /// upper and inner lower.
    ///
    /// # Errors
    ///
    /// Returns an error if a radius is near zero or the cavity does not fit.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        if self.radius < TOLERANCE {
            return Err(InputError::Invalid("sphere radius must be positive".into()).into());
        }
        let outer = self.hemispheres(store, self.radius, true)?;
        let mut op = MakeSolid::new(outer);
        if let Some(r) = self.cavity_radius {
            if r < TOLERANCE || r >= self.radius - TOLERANCE {
                return Err(InputError::Invalid(format!(
                    "cavity radius {r} must lie in (0, {})",
                    self.radius
                ))
                .into());
            }
            op = op.with_void(self.hemispheres(store, r, false)?);
        }
        op.execute(store)
    }

    fn hemispheres(
        &self,
        store: &mut TopologyStore,
        radius: f64,
        outward: bool,
    ) -> Result<Vec<FaceId>> {
        let sphere = Sphere::new(self.center, radius, Vector3::z(), Vector3::x())?;
        let equator = add_circle(store, self.center, radius, Vector3::z(), Vector3::x())?;
        let halves = [
            SurfaceDomain::new(0.0, TAU, 0.0, FRAC_PI_2),
            SurfaceDomain::new(0.0, TAU, -FRAC_PI_2, 0.0),
        ];
        let mut faces = Vec::with_capacity(2);
        for (i, bounds) in halves.into_iter().enumerate() {
            let wire = single_edge_wire(store, equator, i == 0);
            faces.push(store.add_face(FaceData::bounded(
                FaceSurface::Sphere(sphere.clone()),
                bounds,
                vec![wire],
                outward,
            )));
        }
        Ok(faces)
    }
}
