use std::f64::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use crate::config::SideActionConfig;
use crate::math::{Direction, Point3, Vector3, TOLERANCE};
use crate::query::{Aabb, FaceIndex, GeometryQuery};

use super::parting::PartingCurve;
use super::undercut::UndercutRegion;

/// Allowance added on each side of an action body.
const BODY_MARGIN: f64 = 10.0;
/// Length of an action body beyond its stroke.
const BODY_LENGTH: f64 = 15.0;
/// Lever length used to size the angular pin.
const PIN_LEVER: f64 = 40.0;
const PIN_MIN_DEG: f64 = 15.0;
const PIN_MAX_DEG: f64 = 25.0;
/// Mold frame allowance around the part and its strokes.
const FRAME_MARGIN: f64 = 60.0;
const FRAME_HEIGHT_MARGIN: f64 = 40.0;

/// Mechanism releasing a group of undercuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Angled core moving with the ejector plate.
    Lifter,
    /// Near the parting line but too large to be sure a lifter suffices.
    LifterOrSlide,
    /// Cam-driven side core.
    Slide,
}

/// Overall tooling complexity implied by the side actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoldComplexity {
    /// Core and cavity only.
    SimpleTwoPlate,
    /// One or two side actions.
    Moderate,
    /// Three or four side actions.
    Complex,
    /// More than four side actions.
    VeryComplex,
}

impl MoldComplexity {
    /// Rating for a tool with `actions` side actions.
    #[must_use]
    pub fn from_action_count(actions: usize) -> Self {
        match actions {
            0 => Self::SimpleTwoPlate,
            1..=2 => Self::Moderate,
            3..=4 => Self::Complex,
            _ => Self::VeryComplex,
        }
    }
}

/// Approximate envelope of an action body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionSize {
    /// Across the release direction, perpendicular to the pull.
    pub width: f64,
    /// Along the pull.
    pub height: f64,
    /// Along the release direction.
    pub length: f64,
}

/// One slide or lifter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideAction {
    /// 1-based, in order of decreasing area.
    pub id: usize,
    pub kind: ActionKind,
    /// Unit release direction, snapped to one of eight directions around
    /// the pull axis.
    pub release: Vector3,
    /// Index of the snapped direction, counter-clockwise in 45 degree steps
    /// from the first tangent axis.
    pub sector: u8,
    /// Release direction before snapping.
    pub raw_release: Vector3,
    /// Faces carrying the released regions, ascending.
    pub faces: Vec<FaceIndex>,
    pub region_count: usize,
    pub area: f64,
    pub centroid: Point3,
    /// Extent of the undercut along the release direction.
    pub depth: f64,
    /// Travel needed to clear the undercut.
    pub stroke: f64,
    pub size: ActionSize,
    pub angular_pin_deg: f64,
    pub near_parting: bool,
}

/// Summary of the tool implied by the side actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoldLayout {
    pub complexity: MoldComplexity,
    pub lifters: usize,
    pub lifter_or_slides: usize,
    pub slides: usize,
    pub max_stroke: f64,
    /// Estimated mold envelope: two tangent extents, then along the pull.
    pub mold_size: [f64; 3],
    /// Parting-line position along the pull used for the lifter rule.
    pub parting_position: f64,
}

/// Side actions of a part and the resulting tool layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideActionPlan {
    pub actions: Vec<SideAction>,
    pub layout: MoldLayout,
}

/// Groups undercut regions into slides and lifters retracting perpendicular
/// to the pull.
pub struct PlanSideActions<'a> {
    regions: &'a [UndercutRegion],
    direction: Direction,
    parting: Option<&'a PartingCurve>,
    config: SideActionConfig,
    min_area: f64,
}

impl<'a> PlanSideActions<'a> {
    /// Creates a new `PlanSideActions` operation.
    #[must_use]
    pub fn new(regions: &'a [UndercutRegion], direction: Direction, config: SideActionConfig) -> Self {
        Self {
            regions,
            direction,
            parting: None,
            config,
            min_area: 0.0,
        }
    }

    /// Uses the loops of `parting` to decide which actions are near the
    /// parting line (default: the middle of the part).
    #[must_use]
    pub fn with_parting(mut self, parting: &'a PartingCurve) -> Self {
        self.parting = Some(parting);
        self
    }

    /// Ignores regions smaller than `area`.
    #[must_use]
    pub fn with_min_area(mut self, area: f64) -> Self {
        self.min_area = area;
        self
    }

    /// Executes the operation.
    #[must_use]
    pub fn execute<Q: GeometryQuery>(&self, query: &Q) -> SideActionPlan {
        let d = *self.direction.as_vector();
        let (t1, t2) = self.direction.tangent_basis();
        let bbox = query.bounding_box();
        let part_center = bbox.center();
        let (ax_lo, ax_hi) = extent_along(&bbox, &d);
        let parting_position = self
            .parting
            .filter(|p| !p.loops.is_empty())
            .map_or(0.5 * (ax_lo + ax_hi), |p| {
                #[allow(clippy::cast_precision_loss)]
                let n = p.loops.len() as f64;
                p.loops.iter().map(super::parting::PartingLoop::axial_center).sum::<f64>() / n
            });
        let near_band = self.config.near_parting_fraction * (ax_hi - ax_lo);

        let regions: Vec<&UndercutRegion> = self
            .regions
            .iter()
            .filter(|r| r.area >= self.min_area)
            .collect();
        let releases: Vec<Vector3> = regions
            .iter()
            .map(|r| release_of(&(r.mean_normal * r.area), &r.centroid, &part_center, &d))
            .collect();

        // Seed-based clustering: each group is formed around its first region.
        let cos_limit = self.config.group_angle_deg.to_radians().cos();
        let mut used = vec![false; regions.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..regions.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            let mut group = vec![i];
            for j in i + 1..regions.len() {
                if used[j] {
                    continue;
                }
                let close = (regions[j].centroid - regions[i].centroid).norm()
                    <= self.config.group_distance;
                let aligned = releases[i].dot(&releases[j]) >= cos_limit - TOLERANCE;
                if close && aligned {
                    used[j] = true;
                    group.push(j);
                }
            }
            groups.push(group);
        }

        let mut actions: Vec<SideAction> = groups
            .iter()
            .map(|g| {
                let members: Vec<&UndercutRegion> = g.iter().map(|&k| regions[k]).collect();
                self.build_action(&members, &part_center, parting_position, near_band, (&t1, &t2))
            })
            .collect();
        actions.sort_by(|a, b| b.area.total_cmp(&a.area));
        for (i, a) in actions.iter_mut().enumerate() {
            a.id = i + 1;
        }

        let count = |k: ActionKind| actions.iter().filter(|a| a.kind == k).count();
        let max_stroke = actions.iter().map(|a| a.stroke).fold(0.0, f64::max);
        let (lo1, hi1) = extent_along(&bbox, &t1);
        let (lo2, hi2) = extent_along(&bbox, &t2);
        let layout = MoldLayout {
            complexity: MoldComplexity::from_action_count(actions.len()),
            lifters: count(ActionKind::Lifter),
            lifter_or_slides: count(ActionKind::LifterOrSlide),
            slides: count(ActionKind::Slide),
            max_stroke,
            mold_size: [
                hi1 - lo1 + 2.0 * max_stroke + FRAME_MARGIN,
                hi2 - lo2 + 2.0 * max_stroke + FRAME_MARGIN,
                ax_hi - ax_lo + FRAME_HEIGHT_MARGIN,
            ],
            parting_position,
        };
        tracing::debug!(
            actions = actions.len(),
            complexity = ?layout.complexity,
            "side actions planned"
        );
        SideActionPlan { actions, layout }
    }

    fn build_action(
        &self,
        members: &[&UndercutRegion],
        part_center: &Point3,
        parting_position: f64,
        near_band: f64,
        (t1, t2): (&Vector3, &Vector3),
    ) -> SideAction {
        let d = *self.direction.as_vector();
        let area: f64 = members.iter().map(|r| r.area).sum();
        let centroid = if area > 0.0 {
            Point3::from(members.iter().map(|r| r.centroid.coords * r.area).sum::<Vector3>() / area)
        } else {
            members[0].centroid
        };
        let weighted_normal: Vector3 = members.iter().map(|r| r.mean_normal * r.area).sum();
        let raw_release = release_of(&weighted_normal, &centroid, part_center, &d);
        let (sector, release) = snap(&raw_release, t1, t2);
        let lateral = d.cross(&release);

        let points = || members.iter().flat_map(|r| r.points.iter());
        let span = |axis: &Vector3| {
            let (lo, hi) = points().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                let h = axis.dot(&p.coords);
                (lo.min(h), hi.max(h))
            });
            if hi >= lo {
                hi - lo
            } else {
                0.0
            }
        };
        let depth = span(&release).max(self.config.min_depth);
        let stroke = depth + self.config.clearance;

        let near_parting = (d.dot(&centroid.coords) - parting_position).abs() < near_band;
        let kind = match (near_parting, area < self.config.lifter_max_area) {
            (true, true) => ActionKind::Lifter,
            (true, false) => ActionKind::LifterOrSlide,
            (false, _) => ActionKind::Slide,
        };

        let mut faces: Vec<FaceIndex> = members.iter().map(|r| r.face).collect();
        faces.sort_unstable();
        faces.dedup();

        SideAction {
            id: 0,
            kind,
            release,
            sector,
            raw_release,
            faces,
            region_count: members.len(),
            area,
            centroid,
            depth,
            stroke,
            size: ActionSize {
                width: span(&lateral) + BODY_MARGIN,
                height: span(&d) + BODY_MARGIN,
                length: stroke + BODY_LENGTH,
            },
            angular_pin_deg: stroke.atan2(PIN_LEVER).to_degrees().clamp(PIN_MIN_DEG, PIN_MAX_DEG),
            near_parting,
        }
    }
}

/// Unit release direction perpendicular to `d`: the projected normal, or
/// the direction away from the part centre when the normals cancel out.
fn release_of(normal: &Vector3, centroid: &Point3, part_center: &Point3, d: &Vector3) -> Vector3 {
    let flat = |v: Vector3| v - d * d.dot(&v);
    let n = flat(*normal);
    if n.norm() > 1e-6 {
        return n.normalize();
    }
    let outward = flat(centroid - part_center);
    if outward.norm() > 1e-6 {
        return outward.normalize();
    }
    crate::math::perpendicular_dir(d)
}

/// Snaps `v` to the nearest of eight directions spaced 45 degrees apart in
/// the plane spanned by `t1` and `t2`.
fn snap(v: &Vector3, t1: &Vector3, t2: &Vector3) -> (u8, Vector3) {
    let phi = v.dot(t2).atan2(v.dot(t1));
    #[allow(clippy::cast_possible_truncation)]
    let k = ((phi / FRAC_PI_4).round() as i64).rem_euclid(8);
    #[allow(clippy::cast_precision_loss)]
    let angle = k as f64 * FRAC_PI_4;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    (k as u8, t1 * angle.cos() + t2 * angle.sin())
}

/// Range of the box's corners projected onto `axis`.
fn extent_along(bbox: &Aabb, axis: &Vector3) -> (f64, f64) {
    if bbox.min.x > bbox.max.x {
        return (0.0, 0.0);
    }
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for i in 0..8 {
        let corner = Vector3::new(
            if i & 1 == 0 { bbox.min.x } else { bbox.max.x },
            if i & 2 == 0 { bbox.min.y } else { bbox.max.y },
            if i & 4 == 0 { bbox.min.z } else { bbox.max.z },
        );
        let h = axis.dot(&corner);
        lo = lo.min(h);
        hi = hi.max(h);
    }
    (lo, hi)
}
