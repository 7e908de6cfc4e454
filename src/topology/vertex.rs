use crate::math::{Point3, TOLERANCE};

slotmap::new_key_type! {
    /// Handle of a corner point in the topology store.
    pub struct VertexId;
}

/// A corner shared by the edges that meet there.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub point: Point3,
}

impl VertexData {
    #[must_use]
    pub fn new(point: Point3) -> Self {
        Self { point }
    }

    /// Returns `true` if both vertices sit at the same position within
    /// [`TOLERANCE`].
    #[must_use]
    pub fn coincides_with(&self, other: &Self) -> bool {
        (self.point - other.point).norm() <= TOLERANCE
    }
}
