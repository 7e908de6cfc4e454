use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::error::{MoldError, Result};
use crate::geometry::surface::SurfaceKind;
use crate::math::{Point2, Point3, Vector3};
use crate::query::{FaceIndex, GeometryQuery};

/// One grid sample on a trimmed face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceSample {
    /// Column of the cell in the face grid.
    pub i: usize,
    /// Row of the cell in the face grid.
    pub j: usize,
    /// Parameters of the cell centre.
    pub uv: Point2,
    /// Surface point at `uv`.
    pub point: Point3,
    /// Outward unit normal at `uv`.
    pub normal: Vector3,
    /// Surface area represented by the sample.
    pub cell_area: f64,
}

impl FaceSample {
    /// Linear position in the face grid (`j * grid + i`).
    #[must_use]
    pub fn index(&self, grid: usize) -> usize {
        self.j * grid + self.i
    }
}

/// The samples of one face.
#[derive(Debug, Clone)]
pub struct FaceSamples {
    pub face: FaceIndex,
    pub kind: SurfaceKind,
    /// Cells per parametric axis.
    pub grid: usize,
    /// `true` if column 0 and column `grid - 1` are neighbours.
    pub periodic_u: bool,
    /// Parameter width of a cell.
    pub du: f64,
    /// Parameter height of a cell.
    pub dv: f64,
    /// Parametric centre of the face domain.
    pub center: Point2,
    /// Grid samples on the trimmed face, in `(j, i)` order.
    pub samples: Vec<FaceSample>,
    /// Normal at the parametric centre, if it lies on the face.
    pub center_normal: Option<Vector3>,
    /// Approximate face area (sum of the cell areas).
    pub area: f64,
}

impl FaceSamples {
    /// Area-weighted mean of `n . d` over the samples.
    #[must_use]
    pub fn mean_alignment(&self, d: &Vector3) -> f64 {
        if self.area <= 0.0 {
            #[allow(clippy::cast_precision_loss)]
            let n = self.samples.len().max(1) as f64;
            return self.samples.iter().map(|s| s.normal.dot(d)).sum::<f64>() / n;
        }
        self.samples
            .iter()
            .map(|s| s.normal.dot(d) * s.cell_area)
            .sum::<f64>()
            / self.area
    }
}

/// A face left out of the analysis because no normal could be sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegenerateFace {
    pub face: FaceIndex,
    pub reason: String,
}

/// Samples of every face of a solid, taken once per run and reused for
/// each evaluated direction.
#[derive(Debug, Clone)]
pub struct SampledSolid {
    /// Number of faces in the solid, degenerate ones included.
    pub face_count: usize,
    /// Faces with at least one valid sample, in face order.
    pub faces: Vec<FaceSamples>,
    /// Faces excluded from the analysis.
    pub degenerate: Vec<DegenerateFace>,
}

impl SampledSolid {
    /// Samples every face of `query` on a `grid x grid` cell-centred grid.
    ///
    /// # Errors
    ///
    /// Returns [`MoldError::Cancelled`] if `cancel` fires, or any query
    /// error other than a degenerate face.
    pub fn new<Q: GeometryQuery>(query: &Q, grid: usize, cancel: &CancelToken) -> Result<Self> {
        let face_list = query.list_faces();
        let results: Vec<Result<FaceSamples>> = face_list
            .par_iter()
            .map(|&face| {
                cancel.check()?;
                sample_face(query, face, grid)
            })
            .collect();

        let mut faces = Vec::with_capacity(results.len());
        let mut degenerate = Vec::new();
        for result in results {
            match result {
                Ok(samples) => faces.push(samples),
                Err(MoldError::DegenerateFace { face, reason }) => {
                    tracing::warn!(%face, %reason, "face excluded from analysis");
                    degenerate.push(DegenerateFace { face, reason });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Self {
            face_count: face_list.len(),
            faces,
            degenerate,
        })
    }

    /// Total sampled area.
    #[must_use]
    pub fn total_area(&self) -> f64 {
        self.faces.iter().map(|f| f.area).sum()
    }

    /// Samples of `face`, if it was not excluded.
    #[must_use]
    pub fn face(&self, face: FaceIndex) -> Option<&FaceSamples> {
        self.faces
            .binary_search_by_key(&face, |f| f.face)
            .ok()
            .map(|i| &self.faces[i])
    }
}

/// Samples one face on a cell-centred grid restricted to its trim.
///
/// # Errors
///
/// Returns [`MoldError::DegenerateFace`] if no sample yields a normal.
pub fn sample_face<Q: GeometryQuery>(query: &Q, face: FaceIndex, grid: usize) -> Result<FaceSamples> {
    let grid = grid.max(1);
    let domain = query.face_domain(face)?;
    let kind = query.surface_kind(face)?;
    if !domain.is_bounded() || domain.u_span() <= 0.0 || domain.v_span() <= 0.0 {
        return Err(MoldError::DegenerateFace {
            face,
            reason: "empty parameter domain".into(),
        });
    }
    #[allow(clippy::cast_precision_loss)]
    let cells = grid as f64;
    let du = domain.u_span() / cells;
    let dv = domain.v_span() / cells;

    let mut samples = Vec::with_capacity(grid * grid);
    let mut area = 0.0;
    for j in 0..grid {
        for i in 0..grid {
            #[allow(clippy::cast_precision_loss)]
            let uv = Point2::new(
                domain.u_min + (i as f64 + 0.5) * du,
                domain.v_min + (j as f64 + 0.5) * dv,
            );
            if !query.contains(face, uv)? {
                continue;
            }
            // A singular normal (pole, apex) just drops the sample.
            let (Ok(normal), Ok(point)) =
                (query.sample_normal(face, uv), query.sample_point(face, uv))
            else {
                continue;
            };
            let cell_area = query.area_element(face, uv)?.abs() * du * dv;
            area += cell_area;
            samples.push(FaceSample {
                i,
                j,
                uv,
                point,
                normal,
                cell_area,
            });
        }
    }

    let center = domain.center();
    let center_normal = if query.contains(face, center)? {
        query.sample_normal(face, center).ok()
    } else {
        None
    };

    if samples.is_empty() && center_normal.is_none() {
        return Err(MoldError::DegenerateFace {
            face,
            reason: format!("no valid normal on a {grid}x{grid} grid"),
        });
    }

    Ok(FaceSamples {
        face,
        kind,
        grid,
        periodic_u: query.is_u_periodic(face)?,
        du,
        dv,
        center,
        samples,
        center_normal,
        area,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::{MakeBox, MakeBoxWithHole, MakeSphere};
    use crate::query::SolidView;
    use crate::topology::TopologyStore;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn box_faces_are_fully_sampled() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(10.0, 20.0, 30.0))
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let sampled = SampledSolid::new(&view, 4, &CancelToken::new()).unwrap();
        assert_eq!(sampled.faces.len(), 6);
        assert!(sampled.degenerate.is_empty());
        for f in &sampled.faces {
            assert_eq!(f.samples.len(), 16);
            assert!(f.center_normal.is_some());
        }
        let expected = 2.0 * (10.0 * 20.0 + 10.0 * 30.0 + 20.0 * 30.0);
        assert!((sampled.total_area() - expected).abs() < 1e-6);
    }

    #[test]
    fn hole_cells_are_skipped() {
        let mut store = TopologyStore::new();
        let solid = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 3.0, 4.0)
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let rim_face = sample_face(&view, FaceIndex(3), 8).unwrap();
        assert!(rim_face.samples.len() < 64);
        assert!(rim_face.center_normal.is_none());
    }

    #[test]
    fn sphere_area_is_close() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(0.0, 0.0, 0.0), 2.0).execute(&mut store).unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let sampled = SampledSolid::new(&view, 16, &CancelToken::new()).unwrap();
        let exact = 4.0 * std::f64::consts::PI * 4.0;
        assert!((sampled.total_area() - exact).abs() / exact < 0.01);
        assert!(sampled.faces.iter().all(|f| f.periodic_u));
    }

    #[test]
    fn mean_alignment_of_top_face() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let top = sample_face(&view, FaceIndex(1), 3).unwrap();
        assert!((top.mean_alignment(&Vector3::z()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cancelled_sampling_fails() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            SampledSolid::new(&view, 2, &cancel),
            Err(MoldError::Cancelled)
        ));
    }
}
