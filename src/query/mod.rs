mod index;
mod solid_view;

pub use index::{EdgeIndex, FaceIndex, VertexIndex};
pub use solid_view::SolidView;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::surface::{SurfaceDomain, SurfaceKind};
use crate::math::{Point2, Point3, Vector3};

/// The first intersection of a ray with the solid's boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin.
    pub distance: f64,
    /// The face that was hit.
    pub face: FaceIndex,
    /// The hit point.
    pub point: Point3,
    /// `true` if the hit lies on the face boundary within tolerance, so the
    /// hit face is not well defined.
    pub on_boundary: bool,
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// An empty box that any point will grow.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Grows the box to contain `p`.
    pub fn include(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Length of the box diagonal (zero for an empty box).
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        if self.min.x > self.max.x {
            return 0.0;
        }
        (self.max - self.min).norm()
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }
}

/// Geometric queries the analysis consumes from a B-rep kernel.
///
/// Faces, edges and vertices are addressed by their position in the
/// facade's flat, ordered lists. Implementations must be safe to query from
/// many threads at once.
pub trait GeometryQuery: Sync {
    /// All faces, in stable order.
    fn list_faces(&self) -> Vec<FaceIndex>;

    /// Number of edges.
    fn edge_count(&self) -> usize;

    /// Parametric rectangle enclosing the face.
    ///
    /// # Errors
    ///
    /// Returns an error if the face does not exist.
    fn face_domain(&self, face: FaceIndex) -> Result<SurfaceDomain>;

    /// Returns `true` if the face's U parameter wraps around at `2 * pi`
    /// over its full domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the face does not exist.
    fn is_u_periodic(&self, face: FaceIndex) -> Result<bool>;

    /// Surface family of the face.
    ///
    /// # Errors
    ///
    /// Returns an error if the face does not exist.
    fn surface_kind(&self, face: FaceIndex) -> Result<SurfaceKind>;

    /// Outward unit normal at `uv`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidParameter`](crate::error::QueryError) if
    /// `uv` lies outside the face domain, or a geometry error where the
    /// normal is singular.
    fn sample_normal(&self, face: FaceIndex, uv: Point2) -> Result<Vector3>;

    /// Surface point at `uv`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`GeometryQuery::sample_normal`].
    fn sample_point(&self, face: FaceIndex, uv: Point2) -> Result<Point3>;

    /// Returns `true` if `uv` lies on the trimmed face.
    ///
    /// # Errors
    ///
    /// Returns an error if the face does not exist.
    fn contains(&self, face: FaceIndex, uv: Point2) -> Result<bool>;

    /// Surface area per unit parameter area at `uv`.
    ///
    /// # Errors
    ///
    /// Returns an error if the face does not exist.
    fn area_element(&self, face: FaceIndex, uv: Point2) -> Result<f64>;

    /// First boundary hit along `origin + t * direction`, `t` in
    /// `[0, max_distance]`. `direction` must be a unit vector.
    fn cast_ray(&self, origin: &Point3, direction: &Vector3, max_distance: f64) -> Option<RayHit>;

    /// Edges bounding the face.
    ///
    /// # Errors
    ///
    /// Returns an error if the face does not exist.
    fn edges_of_face(&self, face: FaceIndex) -> Result<Vec<EdgeIndex>>;

    /// Faces using the edge (two for a watertight solid).
    ///
    /// # Errors
    ///
    /// Returns an error if the edge does not exist.
    fn faces_of_edge(&self, edge: EdgeIndex) -> Result<Vec<FaceIndex>>;

    /// Start and end vertex of the edge; equal for a closed edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge does not exist.
    fn edge_vertices(&self, edge: EdgeIndex) -> Result<(VertexIndex, VertexIndex)>;

    /// Returns `true` if the two edges have an end vertex in common.
    ///
    /// # Errors
    ///
    /// Returns an error if either edge does not exist.
    fn shared_vertex(&self, a: EdgeIndex, b: EdgeIndex) -> Result<bool> {
        let (a0, a1) = self.edge_vertices(a)?;
        let (b0, b1) = self.edge_vertices(b)?;
        Ok(a0 == b0 || a0 == b1 || a1 == b0 || a1 == b1)
    }

    /// Discretization of the edge from its start to its end vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge does not exist.
    fn edge_polyline(&self, edge: EdgeIndex) -> Result<Vec<Point3>>;

    /// Bounding box of the whole solid.
    fn bounding_box(&self) -> Aabb;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn aabb_grows_and_measures() {
        let mut bb = Aabb::empty();
        assert!(bb.diagonal().abs() < f64::EPSILON);
        bb.include(&Point3::new(0.0, 0.0, 0.0));
        bb.include(&Point3::new(3.0, 4.0, 0.0));
        assert!((bb.diagonal() - 5.0).abs() < 1e-12);
        assert_eq!(bb.center(), Point3::new(1.5, 2.0, 0.0));
    }
}
