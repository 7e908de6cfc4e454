use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{MoldError, Result};
use crate::math::{Direction, Point3};
use crate::query::{EdgeIndex, FaceIndex, GeometryQuery};

use super::draft::{DraftClass, DraftResult};

/// Mold half a face is formed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoldSide {
    /// Faces the pull direction.
    Core,
    /// Faces away from the pull direction.
    Cavity,
}

/// A parting edge as traversed by its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopEdge {
    pub edge: EdgeIndex,
    /// `true` if traversed from its end vertex to its start vertex.
    pub reversed: bool,
}

/// One closed parting loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartingLoop {
    pub edges: Vec<LoopEdge>,
    /// Polyline through the loop, first point repeated at the end.
    pub points: Vec<Point3>,
    pub length: f64,
    /// Lowest position of the loop along the pull direction.
    pub axial_min: f64,
    /// Highest position of the loop along the pull direction.
    pub axial_max: f64,
}

impl PartingLoop {
    /// Mean position of the loop along the pull direction.
    #[must_use]
    pub fn axial_center(&self) -> f64 {
        0.5 * (self.axial_min + self.axial_max)
    }

    /// Returns `true` if the loop lies in a plane perpendicular to the pull.
    #[must_use]
    pub fn is_flat(&self, tol: f64) -> bool {
        self.axial_max - self.axial_min <= tol
    }
}

/// Parting edges that could not be closed into a loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenChain {
    pub edges: Vec<EdgeIndex>,
    pub reason: String,
}

impl From<&OpenChain> for MoldError {
    fn from(chain: &OpenChain) -> Self {
        MoldError::OpenPartingLine {
            edges: chain.edges.clone(),
            reason: chain.reason.clone(),
        }
    }
}

/// The parting line of a solid for one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartingCurve {
    pub direction: Direction,
    pub loops: Vec<PartingLoop>,
    /// Chains that failed to close; empty for a valid parting line.
    pub open: Vec<OpenChain>,
    /// Faces formed by the core half, in face order.
    pub core_faces: Vec<FaceIndex>,
    /// Faces formed by the cavity half, in face order.
    pub cavity_faces: Vec<FaceIndex>,
}

impl PartingCurve {
    /// Returns `true` if every parting edge lies on a closed loop.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.open.is_empty()
    }

    /// Fails with [`MoldError::OpenPartingLine`] for the first open chain.
    ///
    /// # Errors
    ///
    /// Returns [`MoldError::OpenPartingLine`] if any chain is open.
    pub fn check_closed(&self) -> Result<()> {
        match self.open.first() {
            Some(chain) => Err(chain.into()),
            None => Ok(()),
        }
    }

    /// Total length of the closed loops.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.loops.iter().map(|l| l.length).sum()
    }

    /// Side of `face`, if it was assigned one.
    #[must_use]
    pub fn side_of(&self, face: FaceIndex) -> Option<MoldSide> {
        if self.core_faces.binary_search(&face).is_ok() {
            Some(MoldSide::Core)
        } else if self.cavity_faces.binary_search(&face).is_ok() {
            Some(MoldSide::Cavity)
        } else {
            None
        }
    }
}

/// Extracts the parting line from a draft classification.
///
/// Undecided faces (vertical, or balanced on the vertical) take the side of
/// the majority of their neighbours before the edges between the two sides
/// are chained into loops.
pub struct ExtractPartingLine<'a> {
    draft: &'a DraftResult,
    vertical_tolerance_deg: f64,
}

impl<'a> ExtractPartingLine<'a> {
    /// Creates a new `ExtractPartingLine` operation.
    ///
    /// Faces with `|mean n . d|` below the sine of `vertical_tolerance_deg`
    /// are treated like vertical faces.
    #[must_use]
    pub fn new(draft: &'a DraftResult, vertical_tolerance_deg: f64) -> Self {
        Self {
            draft,
            vertical_tolerance_deg,
        }
    }

    /// Executes the operation.
    ///
    /// An unclosable chain is reported in [`PartingCurve::open`], not as an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if an adjacency query fails.
    pub fn execute<Q: GeometryQuery>(&self, query: &Q) -> Result<PartingCurve> {
        let faces = query.list_faces();
        let sides = self.assign_sides(query, faces.len())?;

        let mut core_faces = Vec::new();
        let mut cavity_faces = Vec::new();
        for (face, side) in faces.iter().zip(&sides) {
            match side {
                MoldSide::Core => core_faces.push(*face),
                MoldSide::Cavity => cavity_faces.push(*face),
            }
        }

        let mut parting_edges = BTreeSet::new();
        for e in (0..query.edge_count()).map(EdgeIndex) {
            let users = query.faces_of_edge(e)?;
            let mut touching = users.iter().filter_map(|f| sides.get(f.0));
            if let Some(first) = touching.next() {
                if touching.any(|s| s != first) {
                    parting_edges.insert(e);
                }
            }
        }

        let (loops, open) = if parting_edges.is_empty() {
            let open = vec![OpenChain {
                edges: Vec::new(),
                reason: "no edge separates core faces from cavity faces".into(),
            }];
            (Vec::new(), open)
        } else {
            chain_loops(query, parting_edges, self.draft.direction)?
        };

        for chain in &open {
            tracing::warn!(edges = ?chain.edges, reason = %chain.reason, "open parting line");
        }
        tracing::debug!(
            loops = loops.len(),
            core = core_faces.len(),
            cavity = cavity_faces.len(),
            "parting line extracted"
        );

        Ok(PartingCurve {
            direction: self.draft.direction,
            loops,
            open,
            core_faces,
            cavity_faces,
        })
    }

    fn assign_sides<Q: GeometryQuery>(&self, query: &Q, face_count: usize) -> Result<Vec<MoldSide>> {
        let sin_eps = self.vertical_tolerance_deg.to_radians().sin();
        let mut sides: Vec<Option<MoldSide>> = vec![None; face_count];
        for f in &self.draft.faces {
            let undecided =
                f.class == DraftClass::Vertical || f.mean_alignment.abs() <= sin_eps;
            if !undecided && f.face.0 < face_count {
                sides[f.face.0] = Some(if f.mean_alignment > 0.0 {
                    MoldSide::Core
                } else {
                    MoldSide::Cavity
                });
            }
        }

        let neighbours = (0..face_count)
            .map(|f| face_neighbours(query, FaceIndex(f)))
            .collect::<Result<Vec<_>>>()?;

        // Each pass reads the previous pass's sides only.
        loop {
            let snapshot = sides.clone();
            let mut changed = false;
            for f in 0..face_count {
                if snapshot[f].is_some() {
                    continue;
                }
                let decided: Vec<(usize, MoldSide)> = neighbours[f]
                    .iter()
                    .filter_map(|&n| snapshot[n].map(|s| (n, s)))
                    .collect();
                let core = decided.iter().filter(|(_, s)| *s == MoldSide::Core).count();
                let cavity = decided.len() - core;
                let side = match core.cmp(&cavity) {
                    std::cmp::Ordering::Greater => Some(MoldSide::Core),
                    std::cmp::Ordering::Less => Some(MoldSide::Cavity),
                    std::cmp::Ordering::Equal => decided.first().map(|(_, s)| *s),
                };
                if side.is_some() {
                    sides[f] = side;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        Ok(sides
            .into_iter()
            .map(|s| s.unwrap_or(MoldSide::Core))
            .collect())
    }
}

/// Edge-adjacent faces of `face`, ascending.
fn face_neighbours<Q: GeometryQuery>(query: &Q, face: FaceIndex) -> Result<Vec<usize>> {
    let mut out = BTreeSet::new();
    for e in query.edges_of_face(face)? {
        for f in query.faces_of_edge(e)? {
            if f != face {
                out.insert(f.0);
            }
        }
    }
    Ok(out.into_iter().collect())
}

/// Chains parting edges into loops by shared vertices, lowest edge first.
fn chain_loops<Q: GeometryQuery>(
    query: &Q,
    mut remaining: BTreeSet<EdgeIndex>,
    direction: Direction,
) -> Result<(Vec<PartingLoop>, Vec<OpenChain>)> {
    let mut loops = Vec::new();
    let mut open = Vec::new();

    while let Some(first) = remaining.pop_first() {
        let (start, mut at) = query.edge_vertices(first)?;
        let mut chain = vec![LoopEdge {
            edge: first,
            reversed: false,
        }];

        let mut closed = start == at;
        while !closed {
            let mut next = None;
            for &e in &remaining {
                let (a, b) = query.edge_vertices(e)?;
                if a == at {
                    next = Some((e, false, b));
                    break;
                }
                if b == at {
                    next = Some((e, true, a));
                    break;
                }
            }
            let Some((e, reversed, far)) = next else {
                break;
            };
            remaining.remove(&e);
            chain.push(LoopEdge { edge: e, reversed });
            at = far;
            closed = at == start;
        }

        if closed {
            loops.push(build_loop(query, chain, direction)?);
        } else {
            open.push(OpenChain {
                edges: chain.iter().map(|l| l.edge).collect(),
                reason: "chain ends at a vertex with no further parting edge".into(),
            });
        }
    }
    Ok((loops, open))
}

fn build_loop<Q: GeometryQuery>(
    query: &Q,
    edges: Vec<LoopEdge>,
    direction: Direction,
) -> Result<PartingLoop> {
    let mut points: Vec<Point3> = Vec::new();
    for le in &edges {
        let mut poly = query.edge_polyline(le.edge)?;
        if le.reversed {
            poly.reverse();
        }
        let skip = usize::from(!points.is_empty());
        points.extend(poly.into_iter().skip(skip));
    }
    let length = points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    let (axial_min, axial_max) = points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), p| {
            let h = direction.dot(&p.coords);
            (lo.min(h), hi.max(h))
        },
    );
    Ok(PartingLoop {
        edges,
        points,
        length,
        axial_min,
        axial_max,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analysis::draft::ClassifyDraft;
    use crate::config::DraftThresholds;
    use crate::math::Vector3;
    use crate::operations::creation::{MakeBox, MakeCylinder, MakeSphere};
    use crate::query::SolidView;
    use crate::topology::TopologyStore;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn parting(view: &SolidView, d: Direction, thresholds: DraftThresholds) -> PartingCurve {
        let draft = ClassifyDraft::new(d, thresholds).with_grid(4).execute(view).unwrap();
        ExtractPartingLine::new(&draft, thresholds.vertical_tolerance)
            .execute(view)
            .unwrap()
    }

    #[test]
    fn box_parts_at_one_flat_loop() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0))
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let curve = parting(&view, Direction::z(), DraftThresholds::default());
        assert!(curve.is_closed());
        assert_eq!(curve.loops.len(), 1);
        let l = &curve.loops[0];
        assert_eq!(l.edges.len(), 4);
        assert!(l.is_flat(1e-9));
        assert_relative_eq!(l.length, 40.0, epsilon = 1e-9);
        assert_eq!(curve.core_faces, vec![FaceIndex(1)]);
    }

    #[test]
    fn split_box_parts_at_mid_height() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0))
            .with_split_sides_at(5.0)
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        for thresholds in [DraftThresholds::default(), DraftThresholds::zero_draft()] {
            let curve = parting(&view, Direction::z(), thresholds);
            assert_eq!(curve.loops.len(), 1);
            assert_relative_eq!(curve.loops[0].axial_min, 5.0, epsilon = 1e-9);
            assert_relative_eq!(curve.loops[0].axial_max, 5.0, epsilon = 1e-9);
            assert_eq!(curve.core_faces.len(), 5);
            assert_eq!(curve.cavity_faces.len(), 5);
        }
    }

    #[test]
    fn sphere_parts_at_the_equator() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(0.0, 0.0, 0.0), 3.0).execute(&mut store).unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let curve = parting(&view, Direction::z(), DraftThresholds::default());
        assert_eq!(curve.loops.len(), 1);
        let l = &curve.loops[0];
        assert_eq!(l.edges.len(), 1);
        assert_relative_eq!(l.length, 2.0 * std::f64::consts::PI * 3.0, max_relative = 1e-3);
        assert_relative_eq!(l.axial_center(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn sideways_pull_on_a_sphere_has_no_parting_line() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(0.0, 0.0, 0.0), 3.0).execute(&mut store).unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let curve = parting(&view, Direction::x(), DraftThresholds::default());
        assert!(!curve.is_closed());
        assert!(matches!(
            curve.check_closed(),
            Err(MoldError::OpenPartingLine { .. })
        ));
    }

    #[test]
    fn cylinder_wall_follows_its_neighbours() {
        let mut store = TopologyStore::new();
        let solid = MakeCylinder::new(p(0.0, 0.0, 0.0), 2.0, Vector3::z(), 5.0)
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let curve = parting(&view, Direction::z(), DraftThresholds::default());
        // Bottom (cavity, index 0) and top (core) tie; the lower index wins.
        assert_eq!(curve.side_of(FaceIndex(2)), Some(MoldSide::Cavity));
        assert_eq!(curve.loops.len(), 1);
        assert_relative_eq!(curve.loops[0].axial_center(), 5.0, epsilon = 1e-9);
    }
}
