use std::f64::consts::TAU;

use crate::error::{InputError, Result};
use crate::geometry::surface::{Cylinder, Plane, SurfaceDomain};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::topology::{FaceData, FaceSurface, SolidId, TopologyStore, VertexData};

use super::make_box::{box_corners, check_extent, BOX_FACES};
use super::{add_circle, single_edge_wire, EdgeMap, MakeFace, MakeSolid, MakeWire};

/// Index of the +X wall in [`BOX_FACES`].
const HOLE_FACE: usize = 3;

/// Creates an axis-aligned box with a blind cylindrical hole drilled into
/// its +X wall along -X.
///
/// The hole is centred on the wall unless placed with [`MakeBoxWithHole::at`].
pub struct MakeBoxWithHole {
    min_corner: Point3,
    max_corner: Point3,
    radius: f64,
    depth: f64,
    center_yz: Option<(f64, f64)>,
}

impl MakeBoxWithHole {
    /// Creates a new `MakeBoxWithHole` operation.
    #[must_use]
    pub fn new(min_corner: Point3, max_corner: Point3, radius: f64, depth: f64) -> Self {
        Self {
            min_corner,
            max_corner,
            radius,
            depth,
            center_yz: None,
        }
    }

    /// Places the hole axis at `(y, z)` on the +X wall.
    #[must_use]
    pub fn at(mut self, y: f64, z: f64) -> Self {
        self.center_yz = Some((y, z));
        self
    }

    /// Executes the operation, creating the solid in the topology store.
    ///
    /// Faces are ordered as for [`super::MakeBox`] (the +X wall carries the
    /// hole rim as an inner loop), then the hole wall, then the hole floor.
    ///
    /// # Errors
    ///
    /// Returns an error if the box has no volume, or the hole does not fit
    /// inside the wall or is deeper than the box.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        let (min, max) = (self.min_corner, self.max_corner);
        check_extent(&min, &max)?;
        let (cy, cz) = self
            .center_yz
            .unwrap_or((0.5 * (min.y + max.y), 0.5 * (min.z + max.z)));
        let clearance = (cy - min.y).min(max.y - cy).min(cz - min.z).min(max.z - cz);
        if self.radius < TOLERANCE || self.radius >= clearance - TOLERANCE {
            return Err(InputError::Invalid(format!(
                "hole radius {} must be positive and fit inside the wall",
                self.radius
            ))
            .into());
        }
        if self.depth < TOLERANCE || self.depth >= max.x - min.x - TOLERANCE {
            return Err(InputError::Invalid(format!(
                "hole depth {} must be positive and less than the box length",
                self.depth
            ))
            .into());
        }

        let rim_center = Point3::new(max.x, cy, cz);
        let floor_center = Point3::new(max.x - self.depth, cy, cz);
        let rim = add_circle(store, rim_center, self.radius, Vector3::x(), Vector3::y())?;
        let floor_edge = add_circle(store, floor_center, self.radius, Vector3::x(), Vector3::y())?;

        let vertices: Vec<_> = box_corners(&min, &max)
            .into_iter()
            .map(|pt| store.add_vertex(VertexData::new(pt)))
            .collect();
        let mut edges = EdgeMap::new();
        let mut faces = Vec::with_capacity(BOX_FACES.len() + 2);
        for (i, loop_) in BOX_FACES.iter().enumerate() {
            let wire = MakeWire::new(loop_.iter().map(|&v| vertices[v]).collect())
                .execute(store, &mut edges)?;
            let holes = if i == HOLE_FACE {
                vec![single_edge_wire(store, rim, false)]
            } else {
                vec![]
            };
            faces.push(MakeFace::new(wire, holes).execute(store)?);
        }

        // Material lies outside the bore, so the wall faces the axis.
        let bore = Cylinder::new(floor_center, self.radius, Vector3::x(), Vector3::y())?;
        let wall_wires = vec![
            single_edge_wire(store, rim, true),
            single_edge_wire(store, floor_edge, false),
        ];
        let wall = store.add_face(FaceData::bounded(
            FaceSurface::Cylinder(bore),
            SurfaceDomain::new(0.0, TAU, 0.0, self.depth),
            wall_wires,
            false,
        ));
        faces.push(wall);

        let floor_wire = single_edge_wire(store, floor_edge, true);
        let floor = MakeFace::new(floor_wire, vec![])
            .with_plane(Plane::new(floor_center, Vector3::x(), Vector3::y())?)
            .execute(store)?;
        faces.push(floor);

        MakeSolid::new(faces).execute(store)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn holed_box_has_8_faces_and_is_closed() {
        let mut store = TopologyStore::new();
        let solid = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 2.0, 4.0)
            .execute(&mut store)
            .unwrap();
        let shell = store.shell(store.solid(solid).unwrap().outer_shell).unwrap();
        assert_eq!(shell.faces.len(), 8);
        assert!(shell.is_closed);
    }

    #[test]
    fn bore_wall_faces_the_axis() {
        let mut store = TopologyStore::new();
        let solid = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 2.0, 4.0)
            .execute(&mut store)
            .unwrap();
        let faces = store.solid_faces(solid).unwrap();
        let wall = store.face(faces[6]).unwrap();
        // u = pi/2 is the +Z side of the bore (binormal of x, y is z).
        let n = wall.outward_normal(std::f64::consts::FRAC_PI_2, 1.0).unwrap();
        assert!((n + Vector3::z()).norm() < 1e-9);
    }

    #[test]
    fn bore_wall_is_bounded_by_rim_and_floor_circles() {
        let mut store = TopologyStore::new();
        let solid = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 2.0, 4.0)
            .execute(&mut store)
            .unwrap();
        let faces = store.solid_faces(solid).unwrap();
        let wall = store.face(faces[6]).unwrap();
        assert_eq!(wall.wires.len(), 2);
        let (rim, r) = store.wire_circle(wall.wires[0]).unwrap().unwrap();
        let (floor, _) = store.wire_circle(wall.wires[1]).unwrap().unwrap();
        assert!((r - 2.0).abs() < 1e-12);
        assert!((rim.x - 10.0).abs() < 1e-12);
        assert!((floor.x - 6.0).abs() < 1e-12);
    }

    #[test]
    fn oversized_hole_fails() {
        let mut store = TopologyStore::new();
        let r = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 4.0, 4.0), 2.5, 4.0)
            .execute(&mut store);
        assert!(r.is_err());
    }

    #[test]
    fn through_depth_fails() {
        let mut store = TopologyStore::new();
        let r = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 2.0, 10.0)
            .execute(&mut store);
        assert!(r.is_err());
    }
}
