use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::config::DraftThresholds;
use crate::error::Result;
use crate::geometry::surface::SurfaceKind;
use crate::math::{Direction, Point2, Vector3};
use crate::query::{FaceIndex, GeometryQuery};

use super::sampling::{DegenerateFace, FaceSamples, SampledSolid};

/// Samples whose `|draft|` differ by less than this are treated as equal.
const DRAFT_TIE: f64 = 1e-9;

/// Draft category of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftClass {
    Adequate,
    Marginal,
    Vertical,
    Reverse,
}

/// Draft of one face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDraft {
    pub face: FaceIndex,
    pub kind: SurfaceKind,
    /// Angle between the governing outward normal and the pull direction,
    /// in `[0, 180]`. Exactly 90 for a reverse face.
    pub angle_deg: f64,
    /// Draft of the governing sample: positive when it faces `+d`.
    pub signed_draft_deg: f64,
    /// Draft towards the releasing half; negative for a reverse face.
    pub draft_deg: f64,
    pub class: DraftClass,
    /// Area-weighted mean of `n . d`.
    pub mean_alignment: f64,
    /// Approximate face area.
    pub area: f64,
}

/// Draft classification of every face for one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftResult {
    pub direction: Direction,
    /// Classified faces, in face order.
    pub faces: Vec<FaceDraft>,
    /// Faces without a valid normal sample.
    pub degenerate: Vec<DegenerateFace>,
}

impl DraftResult {
    /// The draft of `face`, if it was classified.
    #[must_use]
    pub fn face(&self, face: FaceIndex) -> Option<&FaceDraft> {
        self.faces
            .binary_search_by_key(&face, |f| f.face)
            .ok()
            .map(|i| &self.faces[i])
    }

    /// Faces of the given class.
    pub fn of_class(&self, class: DraftClass) -> impl Iterator<Item = &FaceDraft> {
        self.faces.iter().filter(move |f| f.class == class)
    }

    /// Total area of reverse faces.
    #[must_use]
    pub fn reverse_area(&self) -> f64 {
        self.of_class(DraftClass::Reverse).map(|f| f.area).sum()
    }

    /// Number of vertical faces.
    #[must_use]
    pub fn vertical_count(&self) -> usize {
        self.of_class(DraftClass::Vertical).count()
    }
}

/// Classifies the draft of every face of a solid against a pull direction.
///
/// A face is released by the half it faces, so its draft is the smallest
/// angle any of its samples makes with that half's wall plane. A face whose
/// normal field crosses the vertical is reverse.
pub struct ClassifyDraft {
    direction: Direction,
    thresholds: DraftThresholds,
    grid: usize,
    cancel: CancelToken,
}

impl ClassifyDraft {
    /// Creates a new `ClassifyDraft` operation.
    #[must_use]
    pub fn new(direction: Direction, thresholds: DraftThresholds) -> Self {
        Self {
            direction,
            thresholds,
            grid: crate::config::SampleDensity::default().grid,
            cancel: CancelToken::new(),
        }
    }

    /// Sets the per-face sampling grid used by [`ClassifyDraft::execute`].
    #[must_use]
    pub fn with_grid(mut self, grid: usize) -> Self {
        self.grid = grid;
        self
    }

    /// Polls `cancel` between faces.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Samples the solid and classifies every face.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or the run is cancelled.
    /// Degenerate faces are listed in the result, not returned as errors.
    pub fn execute<Q: GeometryQuery>(&self, query: &Q) -> Result<DraftResult> {
        let sampled = SampledSolid::new(query, self.grid, &self.cancel)?;
        self.evaluate(&sampled)
    }

    /// Classifies every face from samples taken earlier.
    ///
    /// # Errors
    ///
    /// Returns [`MoldError::Cancelled`](crate::error::MoldError::Cancelled)
    /// if the run is cancelled.
    pub fn evaluate(&self, sampled: &SampledSolid) -> Result<DraftResult> {
        let faces = sampled
            .faces
            .par_iter()
            .map(|f| {
                self.cancel.check()?;
                Ok(self.classify_face(f))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(DraftResult {
            direction: self.direction,
            faces,
            degenerate: sampled.degenerate.clone(),
        })
    }

    fn classify_face(&self, samples: &FaceSamples) -> FaceDraft {
        let d = self.direction.as_vector();
        let eps = self.thresholds.vertical_tolerance;

        let normals = samples
            .samples
            .iter()
            .map(|s| (s.uv, s.normal))
            .chain(samples.center_normal.map(|n| (samples.center, n)));

        let mut max_delta = f64::NEG_INFINITY;
        let mut min_delta = f64::INFINITY;
        // (|delta|, distance to centre, delta)
        let mut governing: Option<(f64, f64, f64)> = None;
        for (uv, n) in normals {
            let delta = sample_draft_deg(&n, d);
            max_delta = max_delta.max(delta);
            min_delta = min_delta.min(delta);
            let key = (delta.abs(), centre_distance(uv, samples.center), delta);
            let better = governing.map_or(true, |g| {
                key.0 < g.0 - DRAFT_TIE || (key.0 <= g.0 + DRAFT_TIE && key.1 < g.1)
            });
            if better {
                governing = Some(key);
            }
        }
        let (_, _, signed) = governing.unwrap_or((0.0, 0.0, 0.0));

        let straddles = max_delta > eps && min_delta < -eps;
        let (angle_deg, draft_deg) = if straddles {
            (90.0, -max_delta.min(-min_delta))
        } else {
            (90.0 - signed, signed.abs())
        };

        FaceDraft {
            face: samples.face,
            kind: samples.kind,
            angle_deg,
            signed_draft_deg: signed,
            draft_deg,
            class: classify(draft_deg, &self.thresholds),
            mean_alignment: samples.mean_alignment(d),
            area: samples.area,
        }
    }
}

/// Signed draft in degrees of a sample with outward normal `n`:
/// `90 - angle(n, d)`, positive when the sample faces `+d`.
#[must_use]
pub fn sample_draft_deg(n: &Vector3, d: &Vector3) -> f64 {
    n.dot(d).clamp(-1.0, 1.0).asin().to_degrees()
}

/// Classifies a face draft (negative for faces crossing the vertical).
#[must_use]
pub fn classify(draft_deg: f64, thresholds: &DraftThresholds) -> DraftClass {
    let eps = thresholds.vertical_tolerance;
    if draft_deg < -eps {
        DraftClass::Reverse
    } else if draft_deg >= thresholds.adequate {
        DraftClass::Adequate
    } else if draft_deg >= thresholds.marginal && draft_deg > eps {
        DraftClass::Marginal
    } else {
        DraftClass::Vertical
    }
}

fn centre_distance(uv: Point2, center: Point2) -> f64 {
    (uv - center).norm()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeBox, MakeCylinder, MakeSphere};
    use crate::query::SolidView;
    use crate::topology::TopologyStore;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn box_view() -> SolidView {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0))
            .execute(&mut store)
            .unwrap();
        SolidView::new(&store, solid).unwrap()
    }

    #[test]
    fn classify_boundaries() {
        let t = DraftThresholds::default();
        assert_eq!(classify(3.0, &t), DraftClass::Adequate);
        assert_eq!(classify(1.0, &t), DraftClass::Adequate);
        assert_eq!(classify(0.5, &t), DraftClass::Marginal);
        assert_eq!(classify(0.005, &t), DraftClass::Vertical);
        assert_eq!(classify(0.0, &t), DraftClass::Vertical);
        assert_eq!(classify(-0.005, &t), DraftClass::Vertical);
        assert_eq!(classify(-0.5, &t), DraftClass::Reverse);
    }

    #[test]
    fn zero_draft_thresholds_accept_vertical_walls() {
        assert_eq!(classify(0.0, &DraftThresholds::zero_draft()), DraftClass::Adequate);
    }

    #[test]
    fn box_along_z() {
        let view = box_view();
        let result = ClassifyDraft::new(Direction::z(), DraftThresholds::default())
            .with_grid(3)
            .execute(&view)
            .unwrap();
        assert_eq!(result.faces.len(), 6);
        let bottom = &result.faces[0];
        let top = &result.faces[1];
        assert_relative_eq!(bottom.angle_deg, 180.0, epsilon = 1e-9);
        assert_relative_eq!(top.angle_deg, 0.0, epsilon = 1e-9);
        assert_eq!(bottom.class, DraftClass::Adequate);
        assert_eq!(top.class, DraftClass::Adequate);
        for side in &result.faces[2..] {
            assert_relative_eq!(side.angle_deg, 90.0, epsilon = 1e-9);
            assert_eq!(side.class, DraftClass::Vertical);
        }
        assert_eq!(result.vertical_count(), 4);
        assert!(result.reverse_area().abs() < f64::EPSILON);
    }

    #[test]
    fn box_with_zero_draft_thresholds() {
        let view = box_view();
        let result = ClassifyDraft::new(Direction::z(), DraftThresholds::zero_draft())
            .with_grid(2)
            .execute(&view)
            .unwrap();
        assert!(result.faces.iter().all(|f| f.class == DraftClass::Adequate));
    }

    #[test]
    fn sphere_hemispheres_straddle_a_sideways_pull() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(0.0, 0.0, 0.0), 5.0).execute(&mut store).unwrap();
        let view = SolidView::new(&store, solid).unwrap();

        let along = ClassifyDraft::new(Direction::z(), DraftThresholds::default())
            .execute(&view)
            .unwrap();
        assert!(along.faces.iter().all(|f| f.class != DraftClass::Reverse));

        let across = ClassifyDraft::new(Direction::x(), DraftThresholds::default())
            .execute(&view)
            .unwrap();
        for f in &across.faces {
            assert_eq!(f.class, DraftClass::Reverse);
            assert_relative_eq!(f.angle_deg, 90.0);
            assert!(f.draft_deg < 0.0);
        }
    }

    #[test]
    fn drafted_boss_wall_is_adequate() {
        let mut store = TopologyStore::new();
        let solid = MakeCylinder::new(p(0.0, 0.0, 0.0), 5.0, Vector3::z(), 10.0)
            .with_draft(2.0)
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let result = ClassifyDraft::new(Direction::z(), DraftThresholds::default())
            .execute(&view)
            .unwrap();
        let wall = &result.faces[2];
        assert_eq!(wall.kind, SurfaceKind::Cone);
        assert_relative_eq!(wall.draft_deg, 2.0, epsilon = 1e-6);
        assert_eq!(wall.class, DraftClass::Adequate);
    }

    #[test]
    fn classification_is_repeatable() {
        let view = box_view();
        let d = Direction::new(Vector3::new(0.2, -0.1, 1.0)).unwrap();
        let op = ClassifyDraft::new(d, DraftThresholds::default());
        assert_eq!(op.execute(&view).unwrap(), op.execute(&view).unwrap());
    }
}
