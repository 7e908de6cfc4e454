use std::f64::consts::TAU;

use crate::error::{InputError, Result};
use crate::geometry::surface::{Cone, Cylinder, Plane, SurfaceDomain};
use crate::math::{perpendicular_dir, Point3, Vector3, TOLERANCE};
use crate::topology::{FaceData, FaceSurface, SolidId, TopologyStore};

use super::{add_circle, single_edge_wire, MakeFace, MakeSolid};

/// Creates a cylinder (or drafted boss) solid from center, radius, axis,
/// and height.
///
/// The side wall is one face bounded by the bottom and top circle edges.
/// With a draft angle the wall becomes a cone that narrows towards the
/// top, as a boss drafted for release along the axis.
pub struct MakeCylinder {
    center: Point3,
    radius: f64,
    axis: Vector3,
    height: f64,
    draft_deg: f64,
}

impl MakeCylinder {
    /// Creates a new `MakeCylinder` operation.
    #[must_use]
    pub fn new(center: Point3, radius: f64, axis: Vector3, height: f64) -> Self {
        Self {
            center,
            radius,
            axis,
            height,
            draft_deg: 0.0,
        }
    }

    /// Tapers the wall inwards by `degrees` towards the top.
    #[must_use]
    pub fn with_draft(mut self, degrees: f64) -> Self {
        self.draft_deg = degrees;
        self
    }

    /// Executes the operation, creating the cylinder in the topology store.
    ///
    /// Faces are ordered bottom disc, top disc, side wall.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius or height is not positive, the axis is
    /// degenerate, or the draft closes the wall before the top.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        if self.radius < TOLERANCE {
            return Err(InputError::Invalid("cylinder radius must be positive".into()).into());
        }
        if self.height < TOLERANCE {
            return Err(InputError::Invalid("cylinder height must be positive".into()).into());
        }
        if self.draft_deg < 0.0 || self.draft_deg >= 90.0 {
            return Err(InputError::Invalid("draft angle must lie in [0, 90)".into()).into());
        }
        let axis_len = self.axis.norm();
        if axis_len < TOLERANCE {
            return Err(InputError::Invalid("cylinder axis must be non-zero".into()).into());
        }
        let axis = self.axis / axis_len;
        let ref_dir = perpendicular_dir(&axis);

        let alpha = self.draft_deg.to_radians();
        let top_radius = self.radius - self.height * alpha.tan();
        if top_radius < TOLERANCE {
            return Err(InputError::Invalid(format!(
                "draft of {} degrees closes the wall below height {}",
                self.draft_deg, self.height
            ))
            .into());
        }

        let bottom_center = self.center;
        let top_center = self.center + axis * self.height;
        let bottom = add_circle(store, bottom_center, self.radius, axis, ref_dir)?;
        let top = add_circle(store, top_center, top_radius, axis, ref_dir)?;

        let bottom_wire = single_edge_wire(store, bottom, false);
        let bottom_disc = MakeFace::new(bottom_wire, vec![])
            .with_plane(Plane::new(bottom_center, -axis, ref_dir)?)
            .execute(store)?;
        let top_wire = single_edge_wire(store, top, true);
        let top_disc = MakeFace::new(top_wire, vec![])
            .with_plane(Plane::new(top_center, axis, ref_dir)?)
            .execute(store)?;

        let wall_wires = vec![
            single_edge_wire(store, bottom, true),
            single_edge_wire(store, top, false),
        ];
        let wall = if self.draft_deg.abs() < TOLERANCE {
            let surface = Cylinder::new(bottom_center, self.radius, axis, ref_dir)?;
            FaceData::bounded(
                FaceSurface::Cylinder(surface),
                SurfaceDomain::new(0.0, TAU, 0.0, self.height),
                wall_wires,
                true,
            )
        } else {
            // Apex above the top, opening downwards; v runs along the generator.
            let apex = bottom_center + axis * (self.radius / alpha.tan());
            let surface = Cone::new(apex, -axis, alpha, ref_dir)?;
            FaceData::bounded(
                FaceSurface::Cone(surface),
                SurfaceDomain::new(0.0, TAU, top_radius / alpha.sin(), self.radius / alpha.sin()),
                wall_wires,
                true,
            )
        };
        let wall = store.add_face(wall);

        MakeSolid::new(vec![bottom_disc, top_disc, wall]).execute(store)
    }
}
