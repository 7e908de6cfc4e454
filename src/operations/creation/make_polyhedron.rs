use crate::error::{InputError, Result};
use crate::math::Point3;
use crate::topology::{SolidId, TopologyStore, VertexData};

use super::{EdgeMap, MakeFace, MakeSolid, MakeWire};

/// Creates a planar-faced solid from a vertex list and face loops.
///
/// Each face is a list of vertex indices ordered counter-clockwise when
/// seen from outside the solid. Edges shared by two faces are created once.
pub struct MakePolyhedron {
    points: Vec<Point3>,
    faces: Vec<Vec<usize>>,
}

impl MakePolyhedron {
    /// Creates a new `MakePolyhedron` operation.
    #[must_use]
    pub fn new(points: Vec<Point3>, faces: Vec<Vec<usize>>) -> Self {
        Self { points, faces }
    }

    /// Executes the operation, creating the solid in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if a face references a missing vertex or is
    /// degenerate.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        let vertices: Vec<_> = self
            .points
            .iter()
            .map(|&pt| store.add_vertex(VertexData::new(pt)))
            .collect();

        let mut edges = EdgeMap::new();
        let mut faces = Vec::with_capacity(self.faces.len());
        for (fi, indices) in self.faces.iter().enumerate() {
            let ids = indices
                .iter()
                .map(|&i| {
                    vertices.get(i).copied().ok_or_else(|| {
                        InputError::Invalid(format!("face {fi} references missing vertex {i}"))
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let wire = MakeWire::new(ids).execute(store, &mut edges)?;
            faces.push(MakeFace::new(wire, vec![]).execute(store)?);
        }
        MakeSolid::new(faces).execute(store)
    }
}
