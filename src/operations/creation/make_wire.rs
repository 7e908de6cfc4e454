use std::collections::HashMap;

use crate::error::{InputError, Result};
use crate::geometry::curve::Line;
use crate::topology::{
    EdgeCurve, EdgeData, EdgeId, OrientedEdge, TopologyStore, VertexId, WireData, WireId,
};

/// Line edges keyed by their unordered vertex pair, so faces that share a
/// boundary also share the edge.
#[derive(Debug, Default)]
pub struct EdgeMap {
    edges: HashMap<(VertexId, VertexId), EdgeId>,
}

impl EdgeMap {
    /// Creates an empty edge map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the edge between `a` and `b`, creating it if needed, and
    /// whether it runs `a -> b`.
    fn line(
        &mut self,
        store: &mut TopologyStore,
        a: VertexId,
        b: VertexId,
    ) -> Result<(EdgeId, bool)> {
        if let Some(&edge) = self.edges.get(&(a, b)) {
            return Ok((edge, true));
        }
        if let Some(&edge) = self.edges.get(&(b, a)) {
            return Ok((edge, false));
        }
        let (start, end) = (store.vertex(a)?, store.vertex(b)?);
        if start.coincides_with(end) {
            return Err(InputError::Invalid("consecutive wire vertices coincide".into()).into());
        }
        let (line, length) = Line::through(start.point, end.point)?;
        let edge = store.add_edge(EdgeData {
            start: a,
            end: b,
            curve: EdgeCurve::Line(line),
            t_start: 0.0,
            t_end: length,
        });
        self.edges.insert((a, b), edge);
        Ok((edge, true))
    }
}

/// Creates a closed polygonal wire through a loop of vertices.
pub struct MakeWire {
    vertices: Vec<VertexId>,
}

impl MakeWire {
    /// Creates a new `MakeWire` operation.
    #[must_use]
    pub fn new(vertices: Vec<VertexId>) -> Self {
        Self { vertices }
    }

    /// Executes the operation, reusing edges already present in `edges`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than three vertices are given or two
    /// consecutive vertices coincide.
    pub fn execute(&self, store: &mut TopologyStore, edges: &mut EdgeMap) -> Result<WireId> {
        let n = self.vertices.len();
        if n < 3 {
            return Err(InputError::Invalid("a wire loop needs at least 3 vertices".into()).into());
        }
        let mut oriented = Vec::with_capacity(n);
        for i in 0..n {
            let (edge, forward) = edges.line(store, self.vertices[i], self.vertices[(i + 1) % n])?;
            oriented.push(OrientedEdge::new(edge, forward));
        }
        Ok(store.add_wire(WireData::closed(oriented)))
    }
}
