use std::collections::HashMap;
use std::f64::consts::TAU;

use crate::error::{InputError, QueryError, Result};
use crate::geometry::surface::{wrap_angle, Plane, Surface, SurfaceDomain, SurfaceKind};
use crate::math::polygon::{classify_in_loops, Containment, TrimLoop};
use crate::math::{Point2, Point3, Vector3};
use crate::topology::{EdgeId, FaceSurface, SolidId, TopologyStore, VertexId};

use super::{Aabb, EdgeIndex, FaceIndex, GeometryQuery, RayHit, VertexIndex};

/// Distance (model units, or parameter units on curved faces) within which
/// a point counts as lying on a face boundary.
const BOUNDARY_TOLERANCE: f64 = 1e-7;

/// Parameter slack accepted by the sampling queries.
const PARAM_TOLERANCE: f64 = 1e-9;

/// Area element below which a parametric boundary is a singular point
/// (sphere pole, cone apex) rather than a real edge.
const SINGULAR_AREA: f64 = 1e-12;

/// Samples per side used to bound curved faces.
const BOX_SAMPLES: u32 = 8;

#[derive(Debug, Clone)]
enum Trim {
    /// Parametric rectangle equal to the face domain.
    Rect {
        periodic_u: bool,
        singular_v_min: bool,
        singular_v_max: bool,
    },
    /// Loops in the plane's `(u, v)` frame; the first is the outer one.
    Loops {
        plane: Plane,
        outer: TrimLoop,
        holes: Vec<TrimLoop>,
    },
}

#[derive(Debug, Clone)]
struct FaceRecord {
    surface: FaceSurface,
    same_sense: bool,
    domain: SurfaceDomain,
    trim: Trim,
    edges: Vec<EdgeIndex>,
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    vertices: (VertexIndex, VertexIndex),
    faces: Vec<FaceIndex>,
    polyline: Vec<Point3>,
}

/// A validated, flattened, read-only view of one solid in a
/// [`TopologyStore`].
///
/// Construction checks that the solid has faces and is watertight (every
/// edge shared by exactly two faces), then copies the geometry into flat
/// arrays so the view can be shared across threads without borrowing the
/// store.
#[derive(Debug, Clone)]
pub struct SolidView {
    faces: Vec<FaceRecord>,
    edges: Vec<EdgeRecord>,
    bbox: Aabb,
}

impl SolidView {
    /// Builds the view of `solid`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::NoFaces`] for an empty solid,
    /// [`InputError::NotWatertight`] if any edge is not shared by exactly two
    /// faces, and [`InputError::Invalid`] for a curved face without
    /// parametric bounds.
    pub fn new(store: &TopologyStore, solid: SolidId) -> Result<Self> {
        let face_ids = store.solid_faces(solid)?;
        if face_ids.is_empty() {
            return Err(InputError::NoFaces.into());
        }

        let mut edge_ids: Vec<EdgeId> = Vec::new();
        let mut edge_lookup: HashMap<EdgeId, EdgeIndex> = HashMap::new();
        let mut faces = Vec::with_capacity(face_ids.len());

        for (fi, &face_id) in face_ids.iter().enumerate() {
            let data = store.face(face_id)?;
            let edges = store
                .face_edges(face_id)?
                .into_iter()
                .map(|e| {
                    *edge_lookup.entry(e).or_insert_with(|| {
                        edge_ids.push(e);
                        EdgeIndex(edge_ids.len() - 1)
                    })
                })
                .collect();

            let (domain, trim) = match (&data.bounds, &data.surface) {
                (Some(bounds), surface) => (*bounds, rect_trim(surface, bounds)),
                (None, FaceSurface::Plane(plane)) => {
                    let mut loops = Vec::with_capacity(data.wires.len());
                    for &wire in &data.wires {
                        let trim = match store.wire_circle(wire)? {
                            Some((center, radius)) => TrimLoop::Circle {
                                center: plane.project(&center),
                                radius,
                            },
                            None => TrimLoop::Polygon(
                                store
                                    .wire_polyline(wire)?
                                    .iter()
                                    .map(|p| plane.project(p))
                                    .collect(),
                            ),
                        };
                        loops.push(trim);
                    }
                    if loops.is_empty() {
                        return Err(InputError::Invalid(format!(
                            "planar face {fi} has no boundary"
                        ))
                        .into());
                    }
                    let outer = loops.remove(0);
                    let domain = loop_bounds(&outer);
                    (
                        domain,
                        Trim::Loops {
                            plane: plane.clone(),
                            outer,
                            holes: loops,
                        },
                    )
                }
                (None, _) => {
                    return Err(InputError::Invalid(format!(
                        "curved face {fi} has no parametric bounds"
                    ))
                    .into());
                }
            };

            faces.push(FaceRecord {
                surface: data.surface.clone(),
                same_sense: data.same_sense,
                domain,
                trim,
                edges,
            });
        }

        let mut vertex_lookup: HashMap<VertexId, VertexIndex> = HashMap::new();
        let mut vertex_index = |v: VertexId| {
            let next = VertexIndex(vertex_lookup.len());
            *vertex_lookup.entry(v).or_insert(next)
        };
        let mut edges = Vec::with_capacity(edge_ids.len());
        for &edge_id in &edge_ids {
            let data = store.edge(edge_id)?;
            edges.push(EdgeRecord {
                vertices: (vertex_index(data.start), vertex_index(data.end)),
                faces: Vec::new(),
                polyline: data.polyline()?,
            });
        }
        for (fi, face) in faces.iter().enumerate() {
            for e in &face.edges {
                edges[e.0].faces.push(FaceIndex(fi));
            }
        }
        if let Some((ei, edge)) = edges.iter().enumerate().find(|(_, e)| e.faces.len() != 2) {
            return Err(InputError::NotWatertight {
                edge: EdgeIndex(ei),
                uses: edge.faces.len(),
            }
            .into());
        }

        let mut view = Self {
            faces,
            edges,
            bbox: Aabb::empty(),
        };
        view.bbox = view.compute_bounding_box();
        Ok(view)
    }

    fn record(&self, face: FaceIndex) -> Result<&FaceRecord> {
        self.faces
            .get(face.0)
            .ok_or_else(|| QueryError::UnknownFace(face).into())
    }

    fn edge_record(&self, edge: EdgeIndex) -> Result<&EdgeRecord> {
        self.edges
            .get(edge.0)
            .ok_or_else(|| QueryError::UnknownEdge(edge).into())
    }

    fn checked_uv(&self, face: FaceIndex, uv: Point2) -> Result<&FaceRecord> {
        let rec = self.record(face)?;
        if !uv.x.is_finite()
            || !uv.y.is_finite()
            || !rec.domain.contains(uv.x, uv.y, PARAM_TOLERANCE)
        {
            return Err(QueryError::InvalidParameter {
                face,
                u: uv.x,
                v: uv.y,
            }
            .into());
        }
        Ok(rec)
    }

    fn compute_bounding_box(&self) -> Aabb {
        let mut bbox = Aabb::empty();
        for edge in &self.edges {
            for p in &edge.polyline {
                bbox.include(p);
            }
        }
        for rec in &self.faces {
            if matches!(rec.trim, Trim::Loops { .. }) {
                continue;
            }
            let d = rec.domain;
            for i in 0..=BOX_SAMPLES {
                for j in 0..=BOX_SAMPLES {
                    let u = d.u_min + d.u_span() * f64::from(i) / f64::from(BOX_SAMPLES);
                    let v = d.v_min + d.v_span() * f64::from(j) / f64::from(BOX_SAMPLES);
                    if let Ok(p) = rec.surface.evaluate(u, v) {
                        bbox.include(&p);
                    }
                }
            }
        }
        bbox
    }
}

fn rect_trim(surface: &FaceSurface, bounds: &SurfaceDomain) -> Trim {
    let periodic_u = surface.is_u_periodic() && (bounds.u_span() - TAU).abs() < PARAM_TOLERANCE;
    let mid_u = bounds.center().x;
    let singular = |v: f64| {
        surface
            .area_element(mid_u, v)
            .map_or(true, |a| a.abs() < SINGULAR_AREA)
    };
    Trim::Rect {
        periodic_u,
        singular_v_min: singular(bounds.v_min),
        singular_v_max: singular(bounds.v_max),
    }
}

fn loop_bounds(outer: &TrimLoop) -> SurfaceDomain {
    let (lo, hi) = outer.bounds();
    SurfaceDomain::new(lo.x, hi.x, lo.y, hi.y)
}

impl FaceRecord {
    /// Classifies a point of the underlying surface against the trim.
    fn classify(&self, uv: Point2, point: &Point3) -> Containment {
        match &self.trim {
            Trim::Loops {
                plane,
                outer,
                holes,
            } => classify_in_loops(&plane.project(point), outer, holes, BOUNDARY_TOLERANCE),
            Trim::Rect {
                periodic_u,
                singular_v_min,
                singular_v_max,
            } => {
                let d = &self.domain;
                let u = if *periodic_u {
                    wrap_angle(uv.x, d.u_min)
                } else {
                    uv.x
                };
                let v = uv.y;
                let tol = BOUNDARY_TOLERANCE;
                if !d.contains(u, v, tol) {
                    return Containment::Outside;
                }
                let near_v_min = !singular_v_min && (v - d.v_min).abs() <= tol;
                let near_v_max = !singular_v_max && (v - d.v_max).abs() <= tol;
                let near_u =
                    !periodic_u && ((u - d.u_min).abs() <= tol || (u - d.u_max).abs() <= tol);
                if near_v_min || near_v_max || near_u {
                    Containment::Boundary
                } else {
                    Containment::Inside
                }
            }
        }
    }

    fn outward_normal(&self, uv: Point2) -> Result<Vector3> {
        let n = self.surface.normal(uv.x, uv.y)?;
        Ok(if self.same_sense { n } else { -n })
    }
}

impl GeometryQuery for SolidView {
    fn list_faces(&self) -> Vec<FaceIndex> {
        (0..self.faces.len()).map(FaceIndex).collect()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn face_domain(&self, face: FaceIndex) -> Result<SurfaceDomain> {
        Ok(self.record(face)?.domain)
    }

    fn is_u_periodic(&self, face: FaceIndex) -> Result<bool> {
        Ok(matches!(
            self.record(face)?.trim,
            Trim::Rect {
                periodic_u: true,
                ..
            }
        ))
    }

    fn surface_kind(&self, face: FaceIndex) -> Result<SurfaceKind> {
        Ok(self.record(face)?.surface.kind())
    }

    fn sample_normal(&self, face: FaceIndex, uv: Point2) -> Result<Vector3> {
        self.checked_uv(face, uv)?.outward_normal(uv)
    }

    fn sample_point(&self, face: FaceIndex, uv: Point2) -> Result<Point3> {
        self.checked_uv(face, uv)?.surface.evaluate(uv.x, uv.y)
    }

    fn contains(&self, face: FaceIndex, uv: Point2) -> Result<bool> {
        let rec = self.record(face)?;
        if !rec.domain.contains(uv.x, uv.y, PARAM_TOLERANCE) {
            return Ok(false);
        }
        let point = rec.surface.evaluate(uv.x, uv.y)?;
        Ok(rec.classify(uv, &point) != Containment::Outside)
    }

    fn area_element(&self, face: FaceIndex, uv: Point2) -> Result<f64> {
        self.record(face)?.surface.area_element(uv.x, uv.y)
    }

    fn cast_ray(&self, origin: &Point3, direction: &Vector3, max_distance: f64) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for (fi, rec) in self.faces.iter().enumerate() {
            for hit in rec
                .surface
                .ray_intersect(origin, direction, 0.0, max_distance)
            {
                let containment = rec.classify(Point2::new(hit.u, hit.v), &hit.point);
                if containment == Containment::Outside {
                    continue;
                }
                let candidate = RayHit {
                    distance: hit.t,
                    face: FaceIndex(fi),
                    point: hit.point,
                    on_boundary: containment == Containment::Boundary,
                };
                best = match best {
                    None => Some(candidate),
                    Some(b) if candidate.distance < b.distance - BOUNDARY_TOLERANCE => {
                        Some(candidate)
                    }
                    Some(mut b) if (candidate.distance - b.distance).abs() <= BOUNDARY_TOLERANCE => {
                        // Two faces meet at the hit: an edge or vertex.
                        b.on_boundary |= b.face != candidate.face || candidate.on_boundary;
                        Some(b)
                    }
                    keep => keep,
                };
            }
        }
        best
    }

    fn edges_of_face(&self, face: FaceIndex) -> Result<Vec<EdgeIndex>> {
        Ok(self.record(face)?.edges.clone())
    }

    fn faces_of_edge(&self, edge: EdgeIndex) -> Result<Vec<FaceIndex>> {
        Ok(self.edge_record(edge)?.faces.clone())
    }

    fn edge_vertices(&self, edge: EdgeIndex) -> Result<(VertexIndex, VertexIndex)> {
        Ok(self.edge_record(edge)?.vertices)
    }

    fn edge_polyline(&self, edge: EdgeIndex) -> Result<Vec<Point3>> {
        Ok(self.edge_record(edge)?.polyline.clone())
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::MoldError;
    use crate::operations::creation::{MakeBox, MakeBoxWithHole, MakePolyhedron, MakeSphere};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn unit_box() -> SolidView {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        SolidView::new(&store, solid).unwrap()
    }

    #[test]
    fn box_view_has_flat_indices() {
        let view = unit_box();
        assert_eq!(view.list_faces().len(), 6);
        assert_eq!(view.edge_count(), 12);
        for e in 0..12 {
            assert_eq!(view.faces_of_edge(EdgeIndex(e)).unwrap().len(), 2);
        }
        assert!((view.bounding_box().diagonal() - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn ray_hits_top_face_from_inside() {
        let view = unit_box();
        let hit = view
            .cast_ray(&p(0.5, 0.5, 0.5), &Vector3::z(), 10.0)
            .unwrap();
        assert_eq!(hit.face, FaceIndex(1));
        assert!((hit.distance - 0.5).abs() < 1e-12);
        assert!(!hit.on_boundary);
    }

    #[test]
    fn ray_beside_box_misses() {
        let view = unit_box();
        assert!(view.cast_ray(&p(-0.01, 0.5, -1.0), &Vector3::z(), 10.0).is_none());
    }

    #[test]
    fn ray_through_edge_is_on_boundary() {
        let view = unit_box();
        let hit = view
            .cast_ray(&p(1.0, 0.5, -1.0), &Vector3::z(), 10.0)
            .unwrap();
        assert!(hit.on_boundary);
    }

    #[test]
    fn out_of_domain_normal_fails() {
        let view = unit_box();
        let r = view.sample_normal(FaceIndex(0), Point2::new(100.0, 0.0));
        assert!(matches!(
            r,
            Err(MoldError::Query(QueryError::InvalidParameter { .. }))
        ));
    }

    #[test]
    fn shared_vertex_between_box_edges() {
        let view = unit_box();
        let edges = view.edges_of_face(FaceIndex(0)).unwrap();
        assert!(view.shared_vertex(edges[0], edges[1]).unwrap());
        assert!(!view.shared_vertex(edges[0], edges[2]).unwrap());
    }

    #[test]
    fn open_shell_is_rejected() {
        let mut store = TopologyStore::new();
        let solid = MakePolyhedron::new(
            vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0)],
            vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3]],
        )
        .execute(&mut store)
        .unwrap();
        let r = SolidView::new(&store, solid);
        assert!(matches!(
            r,
            Err(MoldError::Input(InputError::NotWatertight { uses: 1, .. }))
        ));
    }

    #[test]
    fn hole_interior_is_not_on_wall_face() {
        let mut store = TopologyStore::new();
        let solid = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 2.0, 4.0)
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        // Straight down the bore: the first hit is the floor, not the +X wall.
        let hit = view
            .cast_ray(&p(12.0, 5.0, 5.0), &(-Vector3::x()), 20.0)
            .unwrap();
        assert_eq!(hit.face, FaceIndex(7));
        assert!((hit.distance - 6.0).abs() < 1e-9);
        // Beside the bore the +X wall is hit.
        let hit = view
            .cast_ray(&p(12.0, 1.0, 1.0), &(-Vector3::x()), 20.0)
            .unwrap();
        assert_eq!(hit.face, FaceIndex(3));
    }

    #[test]
    fn ray_near_the_hole_rim_enters_the_bore() {
        let mut store = TopologyStore::new();
        let solid = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 2.0, 4.0)
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        // Off every polygon vertex and inside the sag of a 64-gon chord.
        let a = std::f64::consts::PI / 64.0;
        let r = 2.0 - 1e-4;
        let origin = p(12.0, 5.0 + r * a.cos(), 5.0 + r * a.sin());
        let hit = view.cast_ray(&origin, &(-Vector3::x()), 20.0).unwrap();
        assert_eq!(hit.face, FaceIndex(7));
    }

    #[test]
    fn sphere_bounding_box_covers_the_skin() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(0.0, 0.0, 0.0), 2.0)
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let bb = view.bounding_box();
        assert!((bb.max.z - 2.0).abs() < 1e-9);
        assert!((bb.min.z + 2.0).abs() < 1e-9);
        assert!(view.is_u_periodic(FaceIndex(0)).unwrap());
    }
}
