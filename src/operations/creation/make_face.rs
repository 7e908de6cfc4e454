use crate::error::{GeometryError, InputError, Result};
use crate::geometry::surface::Plane;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::topology::{FaceData, FaceId, TopologyStore, WireId};

/// Creates a planar face from an outer wire and optional hole wires.
///
/// Unless an explicit plane is supplied, the plane is fitted to the outer
/// wire: its normal follows the wire's winding (Newell's method) and its
/// U axis runs along the wire's first edge.
pub struct MakeFace {
    outer_wire: WireId,
    inner_wires: Vec<WireId>,
    plane: Option<Plane>,
}

impl MakeFace {
    /// Creates a new `MakeFace` operation.
    #[must_use]
    pub fn new(outer_wire: WireId, inner_wires: Vec<WireId>) -> Self {
        Self {
            outer_wire,
            inner_wires,
            plane: None,
        }
    }

    /// Uses `plane` instead of fitting one to the outer wire.
    #[must_use]
    pub fn with_plane(mut self, plane: Plane) -> Self {
        self.plane = Some(plane);
        self
    }

    /// Executes the operation, creating the face in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if the outer wire is degenerate (no area).
    pub fn execute(&self, store: &mut TopologyStore) -> Result<FaceId> {
        let plane = match &self.plane {
            Some(plane) => plane.clone(),
            None => {
                let points = store.wire_polyline(self.outer_wire)?;
                fit_plane(&points)?
            }
        };
        let mut wires = Vec::with_capacity(1 + self.inner_wires.len());
        wires.push(self.outer_wire);
        wires.extend_from_slice(&self.inner_wires);
        Ok(store.add_face(FaceData::planar(plane, wires)))
    }
}

fn fit_plane(points: &[Point3]) -> Result<Plane> {
    if points.len() < 3 {
        return Err(InputError::Invalid("face boundary has fewer than 3 points".into()).into());
    }
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    if normal.norm() < TOLERANCE {
        return Err(GeometryError::Degenerate("face boundary encloses no area".into()).into());
    }
    Plane::new(points[0], normal, points[1] - points[0])
}
