use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{AnalysisConfig, Severity};
use crate::error::{MoldError, Result};
use crate::geometry::surface::SurfaceKind;
use crate::math::Direction;
use crate::query::{EdgeIndex, FaceIndex};

use super::draft::{DraftClass, DraftResult};
use super::optimize::OptimizationResult;
use super::parting::PartingCurve;
use super::side_action::SideActionPlan;
use super::thickness::ThicknessDistribution;
use super::undercut::{UndercutRegion, UndercutResult};

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

/// A reason the part fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    ReverseDraft { face: FaceIndex, draft_deg: f64 },
    MarginalDraft { face: FaceIndex, draft_deg: f64 },
    Undercut { face: FaceIndex, area: f64 },
    OpenPartingLine { edges: Vec<EdgeIndex>, reason: String },
    ThicknessOutliers { thin: usize, thick: usize, allowed: usize },
}

/// A non-fatal condition met during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    DegenerateFace { face: FaceIndex, reason: String },
    RaycastAmbiguous { face: FaceIndex, sample: usize, distance: f64 },
    Convergence { iterations: usize },
    MarginalDraft { face: FaceIndex, draft_deg: f64 },
    /// Undercut regions below the configured minimum area.
    SmallUndercut { face: FaceIndex, area: f64 },
    /// Samples whose thickness ray found no opposing wall.
    ThicknessExcluded { samples: usize },
}

impl Warning {
    /// The warning as the error it was downgraded from, where there is one.
    #[must_use]
    pub fn as_error(&self) -> Option<MoldError> {
        match self {
            Self::DegenerateFace { face, reason } => Some(MoldError::DegenerateFace {
                face: *face,
                reason: reason.clone(),
            }),
            Self::RaycastAmbiguous {
                face,
                sample,
                distance,
            } => Some(MoldError::RaycastAmbiguous {
                face: *face,
                sample: *sample,
                distance: *distance,
            }),
            Self::Convergence { iterations } => Some(MoldError::Convergence {
                iterations: *iterations,
            }),
            _ => None,
        }
    }
}

/// Counts of faces per draft class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftCounts {
    pub adequate: usize,
    pub marginal: usize,
    pub vertical: usize,
    pub reverse: usize,
}

/// Headline numbers of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub face_count: usize,
    pub surface_kinds: BTreeMap<SurfaceKind, usize>,
    pub draft_counts: DraftCounts,
    pub total_area: f64,
    pub min_draft_deg: f64,
    pub max_draft_deg: f64,
    /// Area-weighted mean draft.
    pub mean_draft_deg: f64,
    pub undercut_area: f64,
    pub parting_length: f64,
}

/// Everything a run produced, ready to be judged.
#[derive(Debug, Clone)]
pub struct ReportParts {
    pub optimization: Option<OptimizationResult>,
    pub draft: DraftResult,
    pub undercuts: UndercutResult,
    pub parting: PartingCurve,
    pub thickness: ThicknessDistribution,
    pub side_actions: SideActionPlan,
}

/// Result of one moldability analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub direction: Direction,
    /// Present unless the direction was fixed by the caller.
    pub optimization: Option<OptimizationResult>,
    pub draft: DraftResult,
    pub undercuts: Vec<UndercutRegion>,
    pub parting: PartingCurve,
    pub thickness: ThicknessDistribution,
    pub side_actions: SideActionPlan,
    pub verdict: Verdict,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
    pub summary: Summary,
}

impl AnalysisReport {
    /// Judges the results of a run against `config`.
    #[must_use]
    pub fn assemble(parts: ReportParts, config: &AnalysisConfig) -> Self {
        let ReportParts {
            optimization,
            draft,
            undercuts,
            parting,
            thickness,
            side_actions,
        } = parts;

        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        warnings.extend(draft.degenerate.iter().map(|d| Warning::DegenerateFace {
            face: d.face,
            reason: d.reason.clone(),
        }));
        if let Some(opt) = &optimization {
            if !opt.converged {
                warnings.push(Warning::Convergence {
                    iterations: opt.iterations,
                });
            }
        }

        for f in &draft.faces {
            match f.class {
                DraftClass::Reverse => violations.push(Violation::ReverseDraft {
                    face: f.face,
                    draft_deg: f.draft_deg,
                }),
                DraftClass::Marginal => match config.marginal_severity {
                    Severity::Ignore => {}
                    Severity::Warn => warnings.push(Warning::MarginalDraft {
                        face: f.face,
                        draft_deg: f.draft_deg,
                    }),
                    Severity::Fail => violations.push(Violation::MarginalDraft {
                        face: f.face,
                        draft_deg: f.draft_deg,
                    }),
                },
                DraftClass::Adequate | DraftClass::Vertical => {}
            }
        }

        for r in &undercuts.regions {
            if r.area >= config.undercut_min_area {
                violations.push(Violation::Undercut {
                    face: r.face,
                    area: r.area,
                });
            } else {
                warnings.push(Warning::SmallUndercut {
                    face: r.face,
                    area: r.area,
                });
            }
        }
        warnings.extend(undercuts.ambiguous.iter().map(|a| Warning::RaycastAmbiguous {
            face: a.face,
            sample: a.sample,
            distance: a.distance,
        }));

        violations.extend(parting.open.iter().map(|c| Violation::OpenPartingLine {
            edges: c.edges.clone(),
            reason: c.reason.clone(),
        }));

        let allowed = config.thickness.max_outliers;
        if thickness.outlier_count() > allowed {
            violations.push(Violation::ThicknessOutliers {
                thin: thickness.thin.len(),
                thick: thickness.thick.len(),
                allowed,
            });
        }
        if thickness.excluded > 0 {
            warnings.push(Warning::ThicknessExcluded {
                samples: thickness.excluded,
            });
        }

        let verdict = if violations.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        let summary = summarize(&draft, &undercuts, &parting);

        Self {
            direction: draft.direction,
            optimization,
            draft,
            undercuts: undercuts.regions,
            parting,
            thickness,
            side_actions,
            verdict,
            violations,
            warnings,
            summary,
        }
    }

    /// Returns `true` if the part passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MoldError::Serialization`] if a value cannot be encoded.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn summarize(draft: &DraftResult, undercuts: &UndercutResult, parting: &PartingCurve) -> Summary {
    let mut surface_kinds = BTreeMap::new();
    let mut counts = DraftCounts::default();
    let mut total_area = 0.0;
    let mut weighted = 0.0;
    let mut min_draft = f64::INFINITY;
    let mut max_draft = f64::NEG_INFINITY;
    for f in &draft.faces {
        *surface_kinds.entry(f.kind).or_insert(0) += 1;
        match f.class {
            DraftClass::Adequate => counts.adequate += 1,
            DraftClass::Marginal => counts.marginal += 1,
            DraftClass::Vertical => counts.vertical += 1,
            DraftClass::Reverse => counts.reverse += 1,
        }
        total_area += f.area;
        weighted += f.draft_deg * f.area;
        min_draft = min_draft.min(f.draft_deg);
        max_draft = max_draft.max(f.draft_deg);
    }
    if draft.faces.is_empty() {
        min_draft = 0.0;
        max_draft = 0.0;
    }
    Summary {
        face_count: draft.faces.len() + draft.degenerate.len(),
        surface_kinds,
        draft_counts: counts,
        total_area,
        min_draft_deg: min_draft,
        max_draft_deg: max_draft,
        mean_draft_deg: if total_area > 0.0 { weighted / total_area } else { 0.0 },
        undercut_area: undercuts.total_area(),
        parting_length: parting.length(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analysis::draft::FaceDraft;
    use crate::analysis::parting::OpenChain;
    use crate::analysis::side_action::{MoldComplexity, MoldLayout};
    use crate::analysis::undercut::AmbiguousRay;
    use crate::math::{Point3, Vector3};

    fn face(i: usize, class: DraftClass, draft_deg: f64) -> FaceDraft {
        FaceDraft {
            face: FaceIndex(i),
            kind: SurfaceKind::Plane,
            angle_deg: 90.0 - draft_deg,
            signed_draft_deg: draft_deg,
            draft_deg,
            class,
            mean_alignment: 0.5,
            area: 2.0,
        }
    }

    fn parts(faces: Vec<FaceDraft>) -> ReportParts {
        let d = Direction::z();
        ReportParts {
            optimization: None,
            draft: DraftResult {
                direction: d,
                faces,
                degenerate: vec![],
            },
            undercuts: UndercutResult {
                direction: d,
                regions: vec![],
                ambiguous: vec![],
            },
            parting: PartingCurve {
                direction: d,
                loops: vec![],
                open: vec![],
                core_faces: vec![],
                cavity_faces: vec![],
            },
            thickness: ThicknessDistribution {
                samples: vec![],
                excluded: 0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                std_dev: 0.0,
                thin: vec![],
                thick: vec![],
                per_face: vec![],
            },
            side_actions: SideActionPlan {
                actions: vec![],
                layout: MoldLayout {
                    complexity: MoldComplexity::SimpleTwoPlate,
                    lifters: 0,
                    lifter_or_slides: 0,
                    slides: 0,
                    max_stroke: 0.0,
                    mold_size: [0.0; 3],
                    parting_position: 0.0,
                },
            },
        }
    }

    #[test]
    fn clean_parts_pass() {
        let report = AnalysisReport::assemble(
            parts(vec![face(0, DraftClass::Adequate, 3.0)]),
            &AnalysisConfig::default(),
        );
        assert!(report.passed());
        assert!(report.violations.is_empty());
        assert_eq!(report.summary.draft_counts.adequate, 1);
    }

    #[test]
    fn marginal_severity_is_configurable() {
        let faces = || vec![face(0, DraftClass::Marginal, 0.5)];
        let mut config = AnalysisConfig::default();

        let warned = AnalysisReport::assemble(parts(faces()), &config);
        assert!(warned.passed());
        assert!(matches!(warned.warnings[0], Warning::MarginalDraft { .. }));

        config.marginal_severity = Severity::Fail;
        let failed = AnalysisReport::assemble(parts(faces()), &config);
        assert_eq!(failed.verdict, Verdict::Fail);

        config.marginal_severity = Severity::Ignore;
        let ignored = AnalysisReport::assemble(parts(faces()), &config);
        assert!(ignored.passed() && ignored.warnings.is_empty());
    }

    #[test]
    fn each_violation_fails_the_part() {
        let config = AnalysisConfig::default();

        let reverse = AnalysisReport::assemble(
            parts(vec![face(0, DraftClass::Reverse, -4.0)]),
            &config,
        );
        assert_eq!(reverse.verdict, Verdict::Fail);

        let mut p = parts(vec![]);
        p.parting.open.push(OpenChain {
            edges: vec![EdgeIndex(3)],
            reason: "dangling".into(),
        });
        let open = AnalysisReport::assemble(p, &config);
        assert!(matches!(open.violations[0], Violation::OpenPartingLine { .. }));

        let mut p = parts(vec![]);
        p.undercuts.regions.push(UndercutRegion {
            face: FaceIndex(2),
            sample_count: 1,
            area: 1.0,
            centroid: Point3::origin(),
            mean_normal: Vector3::x(),
            blocking_faces: vec![],
            points: vec![],
        });
        let undercut = AnalysisReport::assemble(p, &config);
        assert_eq!(undercut.verdict, Verdict::Fail);
    }

    #[test]
    fn small_undercuts_and_ambiguous_rays_only_warn() {
        let mut config = AnalysisConfig::default();
        config.undercut_min_area = 5.0;
        let mut p = parts(vec![]);
        p.undercuts.regions.push(UndercutRegion {
            face: FaceIndex(2),
            sample_count: 1,
            area: 1.0,
            centroid: Point3::origin(),
            mean_normal: Vector3::x(),
            blocking_faces: vec![],
            points: vec![],
        });
        p.undercuts.ambiguous.push(AmbiguousRay {
            face: FaceIndex(1),
            sample: 7,
            distance: 2.5,
        });
        let report = AnalysisReport::assemble(p, &config);
        assert!(report.passed());
        assert_eq!(report.warnings.len(), 2);
        assert!(matches!(
            report.warnings[1].as_error(),
            Some(MoldError::RaycastAmbiguous { sample: 7, .. })
        ));
    }

    #[test]
    fn json_carries_verdict_and_tags() {
        let report = AnalysisReport::assemble(
            parts(vec![face(0, DraftClass::Reverse, -4.0)]),
            &AnalysisConfig::default(),
        );
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["verdict"], "fail");
        assert_eq!(value["violations"][0]["kind"], "reverse_draft");
        assert_eq!(value["direction"], serde_json::json!([0.0, 0.0, 1.0]));
        assert_eq!(value["summary"]["surface_kinds"]["plane"], 1);
    }
}
