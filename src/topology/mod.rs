pub mod edge;
pub mod face;
pub mod shell;
pub mod solid;
pub mod vertex;
pub mod wire;

pub use edge::{EdgeCurve, EdgeData, EdgeId};
pub use face::{FaceData, FaceId, FaceSurface};
pub use shell::{ShellData, ShellId};
pub use solid::{SolidData, SolidId};
pub use vertex::{VertexData, VertexId};
pub use wire::{OrientedEdge, WireData, WireId};

use crate::error::{Result as MoldResult, TopologyError};
use crate::math::Point3;
use slotmap::SlotMap;

/// Central arena that owns all topological entities.
///
/// Entities reference each other via typed IDs (generational indices),
/// so a solid can be shared read-only across analysis threads.
#[derive(Debug, Default)]
pub struct TopologyStore {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    wires: SlotMap<WireId, WireData>,
    faces: SlotMap<FaceId, FaceData>,
    shells: SlotMap<ShellId, ShellData>,
    solids: SlotMap<SolidId, SolidData>,
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a vertex and returns its ID.
    pub fn add_vertex(&mut self, data: VertexData) -> VertexId {
        self.vertices.insert(data)
    }

    /// Returns a reference to the vertex data.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData, TopologyError> {
        self.vertices
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()))
    }

    /// Inserts an edge and returns its ID.
    pub fn add_edge(&mut self, data: EdgeData) -> EdgeId {
        self.edges.insert(data)
    }

    /// Returns a reference to the edge data.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, TopologyError> {
        self.edges
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()))
    }

    /// Inserts a wire and returns its ID.
    pub fn add_wire(&mut self, data: WireData) -> WireId {
        self.wires.insert(data)
    }

    /// Returns a reference to the wire data.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn wire(&self, id: WireId) -> Result<&WireData, TopologyError> {
        self.wires
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("wire".into()))
    }

    /// Inserts a face and returns its ID.
    pub fn add_face(&mut self, data: FaceData) -> FaceId {
        self.faces.insert(data)
    }

    /// Returns a reference to the face data.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn face(&self, id: FaceId) -> Result<&FaceData, TopologyError> {
        self.faces
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()))
    }

    /// Inserts a shell and returns its ID.
    pub fn add_shell(&mut self, data: ShellData) -> ShellId {
        self.shells.insert(data)
    }

    /// Returns a reference to the shell data.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn shell(&self, id: ShellId) -> Result<&ShellData, TopologyError> {
        self.shells
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("shell".into()))
    }

    /// Inserts a solid and returns its ID.
    pub fn add_solid(&mut self, data: SolidData) -> SolidId {
        self.solids.insert(data)
    }

    /// Returns a reference to the solid data.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn solid(&self, id: SolidId) -> Result<&SolidData, TopologyError> {
        self.solids
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("solid".into()))
    }

    /// Faces of a solid in shell order, outer shell first.
    ///
    /// # Errors
    ///
    /// Returns an error if the solid or one of its shells is missing.
    pub fn solid_faces(&self, id: SolidId) -> Result<Vec<FaceId>, TopologyError> {
        let solid = self.solid(id)?;
        let mut faces = Vec::new();
        for shell in solid.shells() {
            faces.extend_from_slice(&self.shell(shell)?.faces);
        }
        Ok(faces)
    }

    /// Edges bounding a face, in wire order, each listed once.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or one of its wires is missing.
    pub fn face_edges(&self, id: FaceId) -> Result<Vec<EdgeId>, TopologyError> {
        let face = self.face(id)?;
        let mut edges: Vec<EdgeId> = Vec::new();
        for &wire in &face.wires {
            for oe in &self.wire(wire)?.edges {
                if !edges.contains(&oe.edge) {
                    edges.push(oe.edge);
                }
            }
        }
        Ok(edges)
    }

    /// Returns the centre and radius of a wire made of one full-circle
    /// arc edge, or `None` for any other wire.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire or its edge does not exist.
    pub fn wire_circle(&self, id: WireId) -> Result<Option<(Point3, f64)>, TopologyError> {
        let wire = self.wire(id)?;
        let [oe] = wire.edges.as_slice() else {
            return Ok(None);
        };
        let edge = self.edge(oe.edge)?;
        Ok(match &edge.curve {
            EdgeCurve::Arc(arc) if edge.is_self_loop() => Some((*arc.center(), arc.radius())),
            _ => None,
        })
    }

    /// Discretizes a wire into a closed point loop following edge
    /// orientation; the closing point is not repeated.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire or one of its edges is missing, or a
    /// curve cannot be evaluated.
    pub fn wire_polyline(&self, id: WireId) -> MoldResult<Vec<Point3>> {
        let mut points = Vec::new();
        for oe in &self.wire(id)?.edges {
            let mut pts = self.edge(oe.edge)?.polyline()?;
            if !oe.forward {
                pts.reverse();
            }
            pts.pop();
            points.extend(pts);
        }
        Ok(points)
    }
}
