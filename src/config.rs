use serde::{Deserialize, Serialize};

use crate::error::{MoldError, Result};
use crate::math::Direction;

/// Draft classification boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DraftThresholds {
    /// Minimum draft for a face to be adequate.
    pub adequate: f64,
    /// Minimum draft for a face to be marginal rather than vertical.
    pub marginal: f64,
    /// Band around zero draft treated as exactly vertical.
    pub vertical_tolerance: f64,
}

impl Default for DraftThresholds {
    fn default() -> Self {
        Self {
            adequate: 1.0,
            marginal: 0.0,
            vertical_tolerance: 0.01,
        }
    }
}

impl DraftThresholds {
    /// Thresholds under which zero draft is acceptable.
    #[must_use]
    pub fn zero_draft() -> Self {
        Self {
            adequate: 0.0,
            marginal: 0.0,
            ..Self::default()
        }
    }
}

/// Face sampling resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleDensity {
    /// Cells per parametric axis of each face.
    pub grid: usize,
    /// Distance a ray origin is lifted off its surface along the normal.
    pub ray_offset: f64,
}

impl Default for SampleDensity {
    fn default() -> Self {
        Self {
            grid: 8,
            ray_offset: 1e-4,
        }
    }
}

/// Wall-thickness bounds and search limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThicknessBounds {
    /// Samples thinner than this are thin outliers.
    pub min: f64,
    /// Samples thicker than this are thick outliers.
    pub max: f64,
    /// Rays travelling further than this without a hit are excluded.
    /// `None` uses twice the bounding-box diagonal.
    pub max_search_distance: Option<f64>,
    /// Outlier count tolerated before the verdict fails.
    pub max_outliers: usize,
}

impl Default for ThicknessBounds {
    fn default() -> Self {
        Self {
            min: 0.8,
            max: 4.0,
            max_search_distance: None,
            max_outliers: 0,
        }
    }
}

/// Weights of the pull-direction cost terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostWeights {
    /// Per unit of reverse-draft face area.
    pub reverse_area: f64,
    /// Per unit of undercut area.
    pub undercut_area: f64,
    /// Per vertical face.
    pub vertical_count: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            reverse_area: 1.0,
            undercut_area: 1.0,
            vertical_count: 1.0,
        }
    }
}

/// Pull-direction search settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Lattice points of the coarse hemisphere sweep (the three principal
    /// axes are always added).
    pub coarse_resolution: usize,
    /// Smallest cost decrease accepted as an improvement.
    pub refinement_epsilon: f64,
    /// Maximum refinement iterations.
    pub iteration_cap: usize,
    /// First refinement step.
    pub initial_step_deg: f64,
    /// Refinement stops once the step falls below this.
    pub min_step_deg: f64,
    /// Cost weights.
    pub weights: CostWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            coarse_resolution: 64,
            refinement_epsilon: 1e-6,
            iteration_cap: 200,
            initial_step_deg: 5.0,
            min_step_deg: 0.1,
            weights: CostWeights::default(),
        }
    }
}

/// Side-action (slide / lifter) planning settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SideActionConfig {
    /// Regions whose centroids are closer than this may share an action.
    pub group_distance: f64,
    /// Regions whose release directions differ by more than this never share an action.
    pub group_angle_deg: f64,
    /// Safety travel added to the undercut depth.
    pub clearance: f64,
    /// Floor for the measured undercut depth.
    pub min_depth: f64,
    /// Largest area a lifter may release.
    pub lifter_max_area: f64,
    /// Fraction of the part height, along the pull axis, that counts as
    /// near the parting line.
    pub near_parting_fraction: f64,
}

impl Default for SideActionConfig {
    fn default() -> Self {
        Self {
            group_distance: 20.0,
            group_angle_deg: 45.0,
            clearance: 3.0,
            min_depth: 2.0,
            lifter_max_area: 100.0,
            near_parting_fraction: 0.15,
        }
    }
}

/// How marginal draft affects the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Not reported.
    Ignore,
    /// Reported as a warning.
    #[default]
    Warn,
    /// Reported as a violation.
    Fail,
}

/// Complete configuration of one analysis run.
///
/// Angles are in degrees, lengths and areas in model units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Evaluate this direction instead of searching for one.
    pub fixed_direction: Option<Direction>,
    /// Draft classification boundaries.
    pub draft_thresholds: DraftThresholds,
    /// Undercut regions smaller than this do not fail the verdict.
    pub undercut_min_area: f64,
    /// Face sampling resolution.
    pub sample_density: SampleDensity,
    /// Wall-thickness bounds.
    pub thickness: ThicknessBounds,
    /// Pull-direction search.
    pub search: SearchConfig,
    /// Side-action planning.
    pub side_action: SideActionConfig,
    /// Effect of marginal draft on the verdict.
    pub marginal_severity: Severity,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fixed_direction: None,
            draft_thresholds: DraftThresholds::default(),
            undercut_min_area: 0.0,
            sample_density: SampleDensity::default(),
            thickness: ThicknessBounds::default(),
            search: SearchConfig::default(),
            side_action: SideActionConfig::default(),
            marginal_severity: Severity::Warn,
        }
    }
}

impl AnalysisConfig {
    /// Coarse sampling and a short search, for interactive use.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            sample_density: SampleDensity {
                grid: 4,
                ..SampleDensity::default()
            },
            search: SearchConfig {
                coarse_resolution: 16,
                iteration_cap: 50,
                min_step_deg: 0.5,
                ..SearchConfig::default()
            },
            ..Self::default()
        }
    }

    /// Dense sampling and a fine search.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            sample_density: SampleDensity {
                grid: 16,
                ..SampleDensity::default()
            },
            search: SearchConfig {
                coarse_resolution: 256,
                iteration_cap: 1000,
                min_step_deg: 0.01,
                ..SearchConfig::default()
            },
            ..Self::default()
        }
    }

    /// Evaluates `direction` only, skipping the search.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.fixed_direction = Some(direction);
        self
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`MoldError::Config`] if the document is malformed or the
    /// values are inconsistent.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| MoldError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`MoldError::Config`] if the document is malformed or the
    /// values are inconsistent.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| MoldError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`MoldError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let t = &self.draft_thresholds;
        check(t.marginal.is_finite() && t.marginal >= 0.0, "draft_thresholds.marginal must be >= 0")?;
        check(
            t.adequate.is_finite() && t.adequate >= t.marginal,
            "draft_thresholds.adequate must be >= marginal",
        )?;
        check(
            t.vertical_tolerance.is_finite() && t.vertical_tolerance >= 0.0 && t.vertical_tolerance < 90.0,
            "draft_thresholds.vertical_tolerance must lie in [0, 90)",
        )?;
        check(
            self.undercut_min_area.is_finite() && self.undercut_min_area >= 0.0,
            "undercut_min_area must be >= 0",
        )?;

        let s = &self.sample_density;
        check(s.grid >= 1, "sample_density.grid must be >= 1")?;
        check(
            s.ray_offset.is_finite() && s.ray_offset > 0.0,
            "sample_density.ray_offset must be > 0",
        )?;

        let th = &self.thickness;
        check(
            th.min.is_finite() && th.max.is_finite() && 0.0 <= th.min && th.min <= th.max,
            "thickness bounds must satisfy 0 <= min <= max",
        )?;
        if let Some(d) = th.max_search_distance {
            check(d.is_finite() && d > 0.0, "thickness.max_search_distance must be > 0")?;
        }

        let sc = &self.search;
        check(sc.coarse_resolution >= 1, "search.coarse_resolution must be >= 1")?;
        check(sc.iteration_cap >= 1, "search.iteration_cap must be >= 1")?;
        check(
            sc.refinement_epsilon.is_finite() && sc.refinement_epsilon >= 0.0,
            "search.refinement_epsilon must be >= 0",
        )?;
        check(
            sc.min_step_deg.is_finite() && sc.min_step_deg > 0.0,
            "search.min_step_deg must be > 0",
        )?;
        check(
            sc.initial_step_deg.is_finite() && sc.initial_step_deg >= sc.min_step_deg,
            "search.initial_step_deg must be >= min_step_deg",
        )?;
        let w = &sc.weights;
        check(
            [w.reverse_area, w.undercut_area, w.vertical_count]
                .iter()
                .all(|x| x.is_finite() && *x >= 0.0),
            "search.weights must be finite and >= 0",
        )?;

        let sa = &self.side_action;
        check(
            [sa.group_distance, sa.group_angle_deg, sa.clearance, sa.min_depth, sa.lifter_max_area]
                .iter()
                .all(|x| x.is_finite() && *x >= 0.0),
            "side_action values must be finite and >= 0",
        )?;
        check(
            (0.0..=1.0).contains(&sa.near_parting_fraction),
            "side_action.near_parting_fraction must lie in [0, 1]",
        )?;
        Ok(())
    }
}

fn check(ok: bool, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(MoldError::Config(message.into()))
    }
}
