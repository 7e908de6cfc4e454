use std::collections::HashMap;

use crate::error::{InputError, Result};
use crate::topology::{FaceId, ShellData, ShellId, SolidData, SolidId, TopologyStore};

/// Creates a solid from an outer set of faces and optional void shells.
///
/// Shells are marked closed when every boundary edge is shared by exactly
/// two of their faces; open shells are stored as-is and rejected later by
/// the analysis.
pub struct MakeSolid {
    outer_faces: Vec<FaceId>,
    voids: Vec<Vec<FaceId>>,
}

impl MakeSolid {
    /// Creates a new `MakeSolid` operation.
    #[must_use]
    pub fn new(outer_faces: Vec<FaceId>) -> Self {
        Self {
            outer_faces,
            voids: Vec::new(),
        }
    }

    /// Adds an internal void bounded by `faces`.
    #[must_use]
    pub fn with_void(mut self, faces: Vec<FaceId>) -> Self {
        self.voids.push(faces);
        self
    }

    /// Executes the operation, creating the shells and the solid.
    ///
    /// # Errors
    ///
    /// Returns an error if the outer shell has no faces or a face is missing.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        if self.outer_faces.is_empty() {
            return Err(InputError::NoFaces.into());
        }
        let outer_shell = add_shell(store, &self.outer_faces)?;
        let mut inner_shells = Vec::with_capacity(self.voids.len());
        for faces in &self.voids {
            inner_shells.push(add_shell(store, faces)?);
        }
        Ok(store.add_solid(SolidData {
            outer_shell,
            inner_shells,
        }))
    }
}

fn add_shell(store: &mut TopologyStore, faces: &[FaceId]) -> Result<ShellId> {
    let mut uses = HashMap::new();
    for &face in faces {
        for edge in store.face_edges(face)? {
            *uses.entry(edge).or_insert(0usize) += 1;
        }
    }
    let is_closed = uses.values().all(|&n| n == 2);
    Ok(store.add_shell(ShellData {
        faces: faces.to_vec(),
        is_closed,
    }))
}
