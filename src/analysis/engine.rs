use std::time::Instant;

use crate::cancel::CancelToken;
use crate::config::AnalysisConfig;
use crate::error::{InputError, Result};
use crate::query::{EdgeIndex, GeometryQuery};

use super::draft::ClassifyDraft;
use super::optimize::OptimizePullDirection;
use super::parting::ExtractPartingLine;
use super::report::{AnalysisReport, ReportParts};
use super::sampling::SampledSolid;
use super::side_action::PlanSideActions;
use super::thickness::EstimateThickness;
use super::undercut::DetectUndercuts;

/// Analyzes the moldability of `solid`.
///
/// Searches for the best pull direction unless `config.fixed_direction` is
/// set, then classifies draft, detects undercuts, extracts the parting line,
/// measures wall thickness and plans side actions along it.
///
/// # Errors
///
/// Returns [`MoldError::Config`](crate::error::MoldError::Config) for an
/// invalid configuration, [`InputError`] for an empty or open solid, or a
/// query error from the kernel. Analysis findings (reverse draft, undercuts,
/// an open parting line) are reported in the verdict, not as errors.
pub fn analyze<Q: GeometryQuery>(solid: &Q, config: &AnalysisConfig) -> Result<AnalysisReport> {
    analyze_with_cancel(solid, config, &CancelToken::new())
}

/// [`analyze`] with a cancellation token polled throughout the run.
///
/// # Errors
///
/// As [`analyze`], plus [`MoldError::Cancelled`](crate::error::MoldError::Cancelled)
/// once `cancel` fires; partial results are discarded.
pub fn analyze_with_cancel<Q: GeometryQuery>(
    solid: &Q,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<AnalysisReport> {
    config.validate()?;
    check_input(solid)?;
    let started = Instant::now();
    tracing::info!(faces = solid.list_faces().len(), "moldability analysis started");

    let density = config.sample_density;
    let thresholds = config.draft_thresholds;
    let sampled = SampledSolid::new(solid, density.grid, cancel)?;
    tracing::debug!(
        faces = sampled.faces.len(),
        degenerate = sampled.degenerate.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "faces sampled"
    );

    let (direction, optimization) = match config.fixed_direction {
        Some(d) => (d, None),
        None => {
            let opt = OptimizePullDirection::new(thresholds, config.search)
                .with_density(density)
                .with_cancel(cancel.clone())
                .evaluate(solid, &sampled)?;
            (opt.direction, Some(opt))
        }
    };

    let draft = ClassifyDraft::new(direction, thresholds)
        .with_cancel(cancel.clone())
        .evaluate(&sampled)?;
    let undercuts = DetectUndercuts::new(direction, thresholds.vertical_tolerance)
        .with_density(density)
        .with_cancel(cancel.clone())
        .evaluate(solid, &sampled)?;
    cancel.check()?;
    let parting = ExtractPartingLine::new(&draft, thresholds.vertical_tolerance).execute(solid)?;
    let thickness = EstimateThickness::new(config.thickness)
        .with_density(density)
        .with_cancel(cancel.clone())
        .evaluate(solid, &sampled)?;
    cancel.check()?;
    let side_actions = PlanSideActions::new(&undercuts.regions, direction, config.side_action)
        .with_parting(&parting)
        .with_min_area(config.undercut_min_area)
        .execute(solid);

    let report = AnalysisReport::assemble(
        ReportParts {
            optimization,
            draft,
            undercuts,
            parting,
            thickness,
            side_actions,
        },
        config,
    );
    tracing::info!(
        verdict = ?report.verdict,
        violations = report.violations.len(),
        warnings = report.warnings.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "moldability analysis finished"
    );
    Ok(report)
}

/// Rejects solids the analysis cannot run on.
fn check_input<Q: GeometryQuery>(solid: &Q) -> Result<()> {
    if solid.list_faces().is_empty() {
        return Err(InputError::NoFaces.into());
    }
    for edge in (0..solid.edge_count()).map(EdgeIndex) {
        let uses = solid.faces_of_edge(edge)?.len();
        if uses != 2 {
            return Err(InputError::NotWatertight { edge, uses }.into());
        }
    }
    Ok(())
}
