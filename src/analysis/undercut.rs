use std::collections::{BTreeSet, VecDeque};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::config::SampleDensity;
use crate::error::{MoldError, Result};
use crate::math::{Direction, Point2, Point3, Vector3};
use crate::query::{FaceIndex, GeometryQuery};

use super::sampling::{FaceSample, FaceSamples, SampledSolid};

/// A connected patch of occluded samples on one face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndercutRegion {
    pub face: FaceIndex,
    /// Number of occluded samples in the region.
    pub sample_count: usize,
    /// Sum of the member cells' areas.
    pub area: f64,
    /// Area-weighted centroid of the member samples.
    pub centroid: Point3,
    /// Area-weighted mean outward normal (not normalized).
    pub mean_normal: Vector3,
    /// Faces hit by the blocked rays.
    pub blocking_faces: Vec<FaceIndex>,
    /// Surface points of the member samples.
    pub points: Vec<Point3>,
}

/// A sample whose ray kept landing on a face boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousRay {
    pub face: FaceIndex,
    /// Linear grid position of the sample.
    pub sample: usize,
    /// Distance to the boundary hit.
    pub distance: f64,
}

impl From<AmbiguousRay> for MoldError {
    fn from(ray: AmbiguousRay) -> Self {
        MoldError::RaycastAmbiguous {
            face: ray.face,
            sample: ray.sample,
            distance: ray.distance,
        }
    }
}

/// Undercut regions of a solid for one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndercutResult {
    pub direction: Direction,
    /// Regions in face order, then by first member sample.
    pub regions: Vec<UndercutRegion>,
    /// Samples skipped as not occluded after an ambiguous retry.
    pub ambiguous: Vec<AmbiguousRay>,
}

impl UndercutResult {
    /// Total undercut area.
    #[must_use]
    pub fn total_area(&self) -> f64 {
        self.regions.iter().map(|r| r.area).sum()
    }
}

/// Outcome of casting one ray.
enum Cast {
    Clear,
    Blocked(FaceIndex),
    Ambiguous(f64),
}

/// Outcome of testing one sample.
enum Occlusion {
    Free,
    Occluded(Vec<FaceIndex>),
    Ambiguous(f64),
}

/// Detects regions that cannot be released along a pull direction.
///
/// A sample is undercut when the solid blocks the path it travels to leave
/// the half that releases it.
pub struct DetectUndercuts {
    direction: Direction,
    vertical_tolerance_deg: f64,
    density: SampleDensity,
    max_distance: Option<f64>,
    cancel: CancelToken,
}

impl DetectUndercuts {
    /// Creates a new `DetectUndercuts` operation.
    ///
    /// Samples within `vertical_tolerance_deg` of the vertical are tested in
    /// both directions.
    #[must_use]
    pub fn new(direction: Direction, vertical_tolerance_deg: f64) -> Self {
        Self {
            direction,
            vertical_tolerance_deg,
            density: SampleDensity::default(),
            max_distance: None,
            cancel: CancelToken::new(),
        }
    }

    /// Sets the sampling grid and ray-origin offset.
    #[must_use]
    pub fn with_density(mut self, density: SampleDensity) -> Self {
        self.density = density;
        self
    }

    /// Limits ray length (default: the bounding-box diagonal).
    #[must_use]
    pub fn with_max_distance(mut self, distance: f64) -> Self {
        self.max_distance = Some(distance);
        self
    }

    /// Polls `cancel` between faces.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Samples the solid and detects undercut regions.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or the run is cancelled.
    pub fn execute<Q: GeometryQuery>(&self, query: &Q) -> Result<UndercutResult> {
        let sampled = SampledSolid::new(query, self.density.grid, &self.cancel)?;
        self.evaluate(query, &sampled)
    }

    /// Detects undercut regions from samples taken earlier.
    ///
    /// # Errors
    ///
    /// Returns [`MoldError::Cancelled`] if the run is cancelled, or any
    /// query error raised while nudging a sample.
    pub fn evaluate<Q: GeometryQuery>(
        &self,
        query: &Q,
        sampled: &SampledSolid,
    ) -> Result<UndercutResult> {
        let max_distance = self
            .max_distance
            .unwrap_or_else(|| query.bounding_box().diagonal());
        let per_face = sampled
            .faces
            .par_iter()
            .map(|f| {
                self.cancel.check()?;
                self.face_regions(query, f, max_distance)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut regions = Vec::new();
        let mut ambiguous = Vec::new();
        for (r, a) in per_face {
            regions.extend(r);
            ambiguous.extend(a);
        }
        for ray in &ambiguous {
            tracing::warn!(
                face = %ray.face,
                sample = ray.sample,
                distance = ray.distance,
                "ambiguous ray hit, sample treated as released"
            );
        }
        Ok(UndercutResult {
            direction: self.direction,
            regions,
            ambiguous,
        })
    }

    fn face_regions<Q: GeometryQuery>(
        &self,
        query: &Q,
        face: &FaceSamples,
        max_distance: f64,
    ) -> Result<(Vec<UndercutRegion>, Vec<AmbiguousRay>)> {
        let grid = face.grid;
        let mut cells: Vec<Option<(usize, Vec<FaceIndex>)>> = vec![None; grid * grid];
        let mut ambiguous = Vec::new();

        for (k, sample) in face.samples.iter().enumerate() {
            let index = sample.index(grid);
            let mut outcome = self.test_sample(query, sample, max_distance);
            if let Occlusion::Ambiguous(_) = outcome {
                if let Some(nudged) = nudge(query, face, sample)? {
                    outcome = self.test_sample(query, &nudged, max_distance);
                }
            }
            match outcome {
                Occlusion::Free => {}
                Occlusion::Occluded(blockers) => cells[index] = Some((k, blockers)),
                Occlusion::Ambiguous(distance) => ambiguous.push(AmbiguousRay {
                    face: face.face,
                    sample: index,
                    distance,
                }),
            }
        }

        let mut seen = vec![false; grid * grid];
        let mut regions = Vec::new();
        for start in 0..cells.len() {
            if seen[start] || cells[start].is_none() {
                continue;
            }
            let members = flood(&cells, &mut seen, start, grid, face.periodic_u);
            regions.push(build_region(face, &cells, &members));
        }
        Ok((regions, ambiguous))
    }

    fn test_sample<Q: GeometryQuery>(
        &self,
        query: &Q,
        sample: &FaceSample,
        max_distance: f64,
    ) -> Occlusion {
        let d = self.direction.as_vector();
        let s = sample.normal.dot(d);
        let sin_eps = self.vertical_tolerance_deg.to_radians().sin();
        let origin = sample.point + sample.normal * self.density.ray_offset;

        let dirs = if s > sin_eps {
            vec![*d]
        } else if s < -sin_eps {
            vec![-*d]
        } else {
            vec![*d, -*d]
        };

        let mut blockers = Vec::with_capacity(dirs.len());
        for dir in &dirs {
            match cast(query, &origin, dir, max_distance) {
                Cast::Clear => return Occlusion::Free,
                Cast::Ambiguous(distance) => return Occlusion::Ambiguous(distance),
                Cast::Blocked(face) => blockers.push(face),
            }
        }
        Occlusion::Occluded(blockers)
    }
}

fn cast<Q: GeometryQuery>(query: &Q, origin: &Point3, dir: &Vector3, max_distance: f64) -> Cast {
    match query.cast_ray(origin, dir, max_distance) {
        None => Cast::Clear,
        Some(hit) if hit.on_boundary => Cast::Ambiguous(hit.distance),
        Some(hit) => Cast::Blocked(hit.face),
    }
}

/// Moves a sample a quarter cell off its centre, staying on the face.
fn nudge<Q: GeometryQuery>(
    query: &Q,
    face: &FaceSamples,
    sample: &FaceSample,
) -> Result<Option<FaceSample>> {
    let offsets = [(0.25, 0.25), (-0.25, -0.25), (0.25, -0.25), (-0.25, 0.25)];
    for (fu, fv) in offsets {
        let uv = Point2::new(sample.uv.x + fu * face.du, sample.uv.y + fv * face.dv);
        if !query.contains(face.face, uv)? {
            continue;
        }
        if let (Ok(normal), Ok(point)) = (
            query.sample_normal(face.face, uv),
            query.sample_point(face.face, uv),
        ) {
            return Ok(Some(FaceSample {
                uv,
                point,
                normal,
                ..*sample
            }));
        }
    }
    Ok(None)
}

/// Collects the 4-connected component of occluded cells containing `start`.
fn flood<T>(
    cells: &[Option<T>],
    seen: &mut [bool],
    start: usize,
    grid: usize,
    periodic_u: bool,
) -> Vec<usize> {
    let mut members = Vec::new();
    let mut queue = VecDeque::from([start]);
    seen[start] = true;
    while let Some(cell) = queue.pop_front() {
        members.push(cell);
        let (i, j) = (cell % grid, cell / grid);
        let mut neighbours = Vec::with_capacity(4);
        if i > 0 {
            neighbours.push(cell - 1);
        } else if periodic_u && grid > 1 {
            neighbours.push(cell + grid - 1);
        }
        if i + 1 < grid {
            neighbours.push(cell + 1);
        } else if periodic_u && grid > 1 {
            neighbours.push(cell + 1 - grid);
        }
        if j > 0 {
            neighbours.push(cell - grid);
        }
        if j + 1 < grid {
            neighbours.push(cell + grid);
        }
        for n in neighbours {
            if !seen[n] && cells[n].is_some() {
                seen[n] = true;
                queue.push_back(n);
            }
        }
    }
    members.sort_unstable();
    members
}

fn build_region(
    face: &FaceSamples,
    cells: &[Option<(usize, Vec<FaceIndex>)>],
    members: &[usize],
) -> UndercutRegion {
    let mut area = 0.0;
    let mut weighted = Vector3::zeros();
    let mut mean_normal = Vector3::zeros();
    let mut blocking = BTreeSet::new();
    let mut points = Vec::with_capacity(members.len());
    for (k, blockers) in members.iter().filter_map(|&c| cells[c].as_ref()) {
        let s = &face.samples[*k];
        area += s.cell_area;
        weighted += s.point.coords * s.cell_area;
        mean_normal += s.normal * s.cell_area;
        blocking.extend(blockers.iter().copied());
        points.push(s.point);
    }
    let centroid = if area > 0.0 {
        Point3::from(weighted / area)
    } else {
        #[allow(clippy::cast_precision_loss)]
        let n = points.len().max(1) as f64;
        Point3::from(points.iter().map(|p| p.coords).sum::<Vector3>() / n)
    };
    UndercutRegion {
        face: face.face,
        sample_count: members.len(),
        area,
        centroid,
        mean_normal: if area > 0.0 { mean_normal / area } else { mean_normal },
        blocking_faces: blocking.into_iter().collect(),
        points,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::{SurfaceDomain, SurfaceKind};
    use crate::operations::creation::{MakeBox, MakeBoxWithHole, MakeSphere};
    use crate::query::{Aabb, EdgeIndex, RayHit, SolidView, VertexIndex};
    use crate::topology::TopologyStore;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn holed_box() -> SolidView {
        let mut store = TopologyStore::new();
        let solid = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 2.0, 4.0)
            .execute(&mut store)
            .unwrap();
        SolidView::new(&store, solid).unwrap()
    }

    /// Puts hits on a face boundary when the ray starts at one of
    /// `origins`, or always when `origins` is `None`.
    struct Grazing {
        view: SolidView,
        origins: Option<Vec<Point3>>,
    }

    impl GeometryQuery for Grazing {
        fn list_faces(&self) -> Vec<FaceIndex> {
            self.view.list_faces()
        }
        fn edge_count(&self) -> usize {
            self.view.edge_count()
        }
        fn face_domain(&self, face: FaceIndex) -> Result<SurfaceDomain> {
            self.view.face_domain(face)
        }
        fn is_u_periodic(&self, face: FaceIndex) -> Result<bool> {
            self.view.is_u_periodic(face)
        }
        fn surface_kind(&self, face: FaceIndex) -> Result<SurfaceKind> {
            self.view.surface_kind(face)
        }
        fn sample_normal(&self, face: FaceIndex, uv: Point2) -> Result<Vector3> {
            self.view.sample_normal(face, uv)
        }
        fn sample_point(&self, face: FaceIndex, uv: Point2) -> Result<Point3> {
            self.view.sample_point(face, uv)
        }
        fn contains(&self, face: FaceIndex, uv: Point2) -> Result<bool> {
            self.view.contains(face, uv)
        }
        fn area_element(&self, face: FaceIndex, uv: Point2) -> Result<f64> {
            self.view.area_element(face, uv)
        }
        fn cast_ray(&self, origin: &Point3, direction: &Vector3, max_distance: f64) -> Option<RayHit> {
            let mut hit = self.view.cast_ray(origin, direction, max_distance)?;
            hit.on_boundary |= self
                .origins
                .as_ref()
                .map_or(true, |o| o.iter().any(|q| (q - origin).norm() < 1e-9));
            Some(hit)
        }
        fn edges_of_face(&self, face: FaceIndex) -> Result<Vec<EdgeIndex>> {
            self.view.edges_of_face(face)
        }
        fn faces_of_edge(&self, edge: EdgeIndex) -> Result<Vec<FaceIndex>> {
            self.view.faces_of_edge(edge)
        }
        fn edge_vertices(&self, edge: EdgeIndex) -> Result<(VertexIndex, VertexIndex)> {
            self.view.edge_vertices(edge)
        }
        fn edge_polyline(&self, edge: EdgeIndex) -> Result<Vec<Point3>> {
            self.view.edge_polyline(edge)
        }
        fn bounding_box(&self) -> Aabb {
            self.view.bounding_box()
        }
    }

    fn coarse() -> SampleDensity {
        SampleDensity {
            grid: 4,
            ..SampleDensity::default()
        }
    }

    fn occluded_samples(result: &UndercutResult) -> usize {
        result.regions.iter().map(|r| r.sample_count).sum()
    }

    #[test]
    fn clean_retry_after_a_grazing_hit_keeps_the_undercut() {
        let view = holed_box();
        let sampled = SampledSolid::new(&view, 4, &CancelToken::new()).unwrap();
        let offset = coarse().ray_offset;
        let origins = sampled
            .faces
            .iter()
            .flat_map(|f| f.samples.iter())
            .map(|s| s.point + s.normal * offset)
            .collect();
        let op = DetectUndercuts::new(Direction::z(), 0.01).with_density(coarse());
        let plain = op.evaluate(&view, &sampled).unwrap();

        let grazing = Grazing {
            view,
            origins: Some(origins),
        };
        let retried = op.evaluate(&grazing, &sampled).unwrap();
        assert!(retried.ambiguous.is_empty());
        let faces = |r: &UndercutResult| r.regions.iter().map(|g| g.face).collect::<BTreeSet<_>>();
        assert_eq!(faces(&retried), faces(&plain));
        assert_eq!(occluded_samples(&retried), occluded_samples(&plain));
    }

    #[test]
    fn persistent_grazing_hit_releases_the_sample() {
        let view = holed_box();
        let sampled = SampledSolid::new(&view, 4, &CancelToken::new()).unwrap();
        let op = DetectUndercuts::new(Direction::z(), 0.01).with_density(coarse());
        let plain = op.evaluate(&view, &sampled).unwrap();

        let grazing = Grazing { view, origins: None };
        let result = op.evaluate(&grazing, &sampled).unwrap();
        assert!(result.regions.is_empty());
        assert_eq!(result.ambiguous.len(), occluded_samples(&plain));
        let err = MoldError::from(result.ambiguous[0]);
        assert!(matches!(err, MoldError::RaycastAmbiguous { .. }));
    }

    #[test]
    fn short_reach_misses_the_far_bore_wall() {
        let view = holed_box();
        let result = DetectUndercuts::new(Direction::z(), 0.01)
            .with_density(coarse())
            .with_max_distance(1e-3)
            .execute(&view)
            .unwrap();
        assert!(result.regions.is_empty());
    }

    #[test]
    fn flood_wraps_across_the_seam() {
        // 4x2 grid, cells 0 and 3 occluded on the first row.
        let cells = vec![Some(()), None, None, Some(()), None, None, None, None];
        let mut seen = vec![false; 8];
        assert_eq!(flood(&cells, &mut seen, 0, 4, true), vec![0, 3]);
        let mut seen = vec![false; 8];
        assert_eq!(flood(&cells, &mut seen, 0, 4, false), vec![0]);
    }

    #[test]
    fn convex_parts_have_no_undercuts() {
        let mut store = TopologyStore::new();
        let cube = MakeBox::new(p(0.0, 0.0, 0.0), p(4.0, 5.0, 6.0))
            .execute(&mut store)
            .unwrap();
        let ball = MakeSphere::new(p(20.0, 0.0, 0.0), 3.0).execute(&mut store).unwrap();
        let dirs = [
            Direction::z(),
            Direction::x(),
            Direction::new(Vector3::new(1.0, 1.0, 1.0)).unwrap(),
            Direction::new(Vector3::new(-0.3, 0.7, 0.2)).unwrap(),
        ];
        for solid in [cube, ball] {
            let view = SolidView::new(&store, solid).unwrap();
            for d in dirs {
                let result = DetectUndercuts::new(d, 0.01)
                    .with_density(SampleDensity { grid: 4, ..SampleDensity::default() })
                    .execute(&view)
                    .unwrap();
                assert!(result.regions.is_empty(), "direction {d:?}");
            }
        }
    }

    #[test]
    fn blind_hole_across_the_pull_is_undercut() {
        let view = holed_box();
        let result = DetectUndercuts::new(Direction::z(), 0.01).execute(&view).unwrap();
        let faces: BTreeSet<_> = result.regions.iter().map(|r| r.face).collect();
        assert!(faces.contains(&FaceIndex(6)), "bore wall");
        assert!(faces.contains(&FaceIndex(7)), "hole floor");
        assert!(result.total_area() > 0.0);
        let floor = result.regions.iter().find(|r| r.face == FaceIndex(7)).unwrap();
        assert!(floor.blocking_faces.contains(&FaceIndex(6)));
    }

    #[test]
    fn blind_hole_along_its_axis_is_clear() {
        let view = holed_box();
        let result = DetectUndercuts::new(Direction::x(), 0.01).execute(&view).unwrap();
        assert!(result.regions.is_empty());
    }

    #[test]
    fn bore_wall_region_wraps_into_one() {
        let view = holed_box();
        let result = DetectUndercuts::new(Direction::z(), 0.01).execute(&view).unwrap();
        let wall: Vec<_> = result.regions.iter().filter(|r| r.face == FaceIndex(6)).collect();
        assert_eq!(wall.len(), 1);
        assert_eq!(wall[0].sample_count, 64);
    }
}
