use crate::error::{InputError, Result};
use crate::math::{Point3, TOLERANCE};
use crate::topology::{SolidId, TopologyStore};

use super::MakePolyhedron;

/// Vertex loops of an axis-aligned box over [`box_corners`], outward
/// winding, in the order: bottom, top, -Y, +X, +Y, -X.
pub(super) const BOX_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

/// The eight corners of the box spanned by `min` and `max`: the bottom
/// ring counter-clockwise from `min`, then the top ring.
pub(super) fn box_corners(min: &Point3, max: &Point3) -> [Point3; 8] {
    [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ]
}

pub(super) fn check_extent(min: &Point3, max: &Point3) -> Result<()> {
    let size = max - min;
    if size.x < TOLERANCE || size.y < TOLERANCE || size.z < TOLERANCE {
        return Err(InputError::Invalid("box extent must be positive on every axis".into()).into());
    }
    Ok(())
}

/// Creates an axis-aligned box solid from two corner points.
///
/// With [`MakeBox::with_split_sides_at`] each side wall is split into a
/// lower and an upper face at the given height, which puts a ring of
/// edges around the middle of the part.
pub struct MakeBox {
    min_corner: Point3,
    max_corner: Point3,
    split_z: Option<f64>,
}

impl MakeBox {
    /// Creates a new `MakeBox` operation.
    #[must_use]
    pub fn new(min_corner: Point3, max_corner: Point3) -> Self {
        Self {
            min_corner,
            max_corner,
            split_z: None,
        }
    }

    /// Splits the four side walls at height `z`.
    #[must_use]
    pub fn with_split_sides_at(mut self, z: f64) -> Self {
        self.split_z = Some(z);
        self
    }

    /// Executes the operation, creating the box in the topology store.
    ///
    /// Faces are ordered bottom, top, then the side walls (-Y, +X, +Y, -X;
    /// lower ring before upper ring when split).
    ///
    /// # Errors
    ///
    /// Returns an error if the box has no volume or the split height is not
    /// strictly between the bottom and the top.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        let (min, max) = (self.min_corner, self.max_corner);
        check_extent(&min, &max)?;
        let corners = box_corners(&min, &max);

        let Some(z) = self.split_z else {
            let faces = BOX_FACES.iter().map(|f| f.to_vec()).collect();
            return MakePolyhedron::new(corners.to_vec(), faces).execute(store);
        };
        if z <= min.z + TOLERANCE || z >= max.z - TOLERANCE {
            return Err(InputError::Invalid(format!(
                "split height {z} must lie strictly inside ({}, {})",
                min.z, max.z
            ))
            .into());
        }

        // Bottom ring 0..4, top ring 4..8, middle ring 8..12.
        let mut points = corners.to_vec();
        points.extend((0..4).map(|i| Point3::new(corners[i].x, corners[i].y, z)));
        let mut faces = vec![BOX_FACES[0].to_vec(), BOX_FACES[1].to_vec()];
        for i in 0..4 {
            let j = (i + 1) % 4;
            faces.push(vec![i, j, 8 + j, 8 + i]);
        }
        for i in 0..4 {
            let j = (i + 1) % 4;
            faces.push(vec![8 + i, 8 + j, 4 + j, 4 + i]);
        }
        MakePolyhedron::new(points, faces).execute(store)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::Surface;
    use crate::math::Vector3;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn box_has_6_faces_and_is_closed() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 2.0, 3.0))
            .execute(&mut store)
            .unwrap();
        let shell = store.shell(store.solid(solid).unwrap().outer_shell).unwrap();
        assert_eq!(shell.faces.len(), 6);
        assert!(shell.is_closed);
    }

    #[test]
    fn box_normals_point_outward() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let expected = [
            -Vector3::z(),
            Vector3::z(),
            -Vector3::y(),
            Vector3::x(),
            Vector3::y(),
            -Vector3::x(),
        ];
        let faces = store.solid_faces(solid).unwrap();
        for (face, want) in faces.iter().zip(expected) {
            let n = store.face(*face).unwrap().surface.normal(0.0, 0.0).unwrap();
            assert!((n - want).norm() < 1e-12, "got {n:?}, want {want:?}");
        }
    }

    #[test]
    fn split_box_has_10_faces() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0))
            .with_split_sides_at(1.0)
            .execute(&mut store)
            .unwrap();
        let shell = store.shell(store.solid(solid).unwrap().outer_shell).unwrap();
        assert_eq!(shell.faces.len(), 10);
        assert!(shell.is_closed);
    }

    #[test]
    fn split_outside_box_fails() {
        let mut store = TopologyStore::new();
        let r = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .with_split_sides_at(1.0)
            .execute(&mut store);
        assert!(r.is_err());
    }

    #[test]
    fn flat_box_fails() {
        let mut store = TopologyStore::new();
        let r = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 0.0)).execute(&mut store);
        assert!(r.is_err());
    }
}
