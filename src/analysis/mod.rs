pub mod draft;
pub mod engine;
pub mod optimize;
pub mod parting;
pub mod report;
pub mod sampling;
pub mod side_action;
pub mod thickness;
pub mod undercut;

pub use draft::{ClassifyDraft, DraftClass, DraftResult, FaceDraft};
pub use engine::{analyze, analyze_with_cancel};
pub use optimize::{DirectionCost, OptimizationResult, OptimizePullDirection};
pub use parting::{ExtractPartingLine, MoldSide, PartingCurve, PartingLoop};
pub use report::{AnalysisReport, ReportParts, Summary, Verdict, Violation, Warning};
pub use sampling::SampledSolid;
pub use side_action::{ActionKind, MoldComplexity, PlanSideActions, SideAction, SideActionPlan};
pub use thickness::{EstimateThickness, ThicknessDistribution, ThicknessSample};
pub use undercut::{DetectUndercuts, UndercutRegion, UndercutResult};
