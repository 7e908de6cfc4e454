use super::edge::EdgeId;

slotmap::new_key_type! {
    /// Handle of a boundary loop in the topology store.
    pub struct WireId;
}

/// An edge as traversed by one wire.
#[derive(Debug, Clone, Copy)]
pub struct OrientedEdge {
    pub edge: EdgeId,
    /// `true` when the wire runs from the edge's start vertex to its end.
    pub forward: bool,
}

impl OrientedEdge {
    #[must_use]
    pub fn new(edge: EdgeId, forward: bool) -> Self {
        Self { edge, forward }
    }
}

/// A closed face boundary: oriented edges, each ending where the next
/// begins and the last ending where the first begins.
#[derive(Debug, Clone)]
pub struct WireData {
    pub edges: Vec<OrientedEdge>,
}

impl WireData {
    /// Creates a wire from a closed chain of edges.
    #[must_use]
    pub fn closed(edges: Vec<OrientedEdge>) -> Self {
        Self { edges }
    }
}
