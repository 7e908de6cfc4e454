use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::config::{CostWeights, DraftThresholds, SampleDensity, SearchConfig};
use crate::error::Result;
use crate::math::Direction;
use crate::query::GeometryQuery;

use super::draft::ClassifyDraft;
use super::sampling::SampledSolid;
use super::undercut::DetectUndercuts;

/// Cost of one candidate direction, with its terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionCost {
    /// Area of reverse-draft faces.
    pub reverse_area: f64,
    /// Area of undercut regions.
    pub undercut_area: f64,
    /// Number of vertical faces.
    pub vertical_count: usize,
    /// Weighted sum of the terms.
    pub total: f64,
}

impl DirectionCost {
    fn new(reverse_area: f64, undercut_area: f64, vertical_count: usize, w: &CostWeights) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let total = w.reverse_area * reverse_area
            + w.undercut_area * undercut_area
            + w.vertical_count * vertical_count as f64;
        Self {
            reverse_area,
            undercut_area,
            vertical_count,
            total,
        }
    }
}

/// Outcome of the direction search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub direction: Direction,
    pub cost: DirectionCost,
    /// Best direction of the coarse sweep.
    pub coarse_direction: Direction,
    pub coarse_cost: DirectionCost,
    /// `false` if refinement stopped at the iteration cap.
    pub converged: bool,
    /// Refinement iterations performed.
    pub iterations: usize,
    /// Directions evaluated in total.
    pub evaluations: usize,
}

/// Searches for the pull direction of lowest cost.
///
/// Cost is the same for `d` and `-d`, so the coarse sweep covers the upper
/// hemisphere only; a compass search in the tangent plane refines the best
/// candidate.
pub struct OptimizePullDirection {
    thresholds: DraftThresholds,
    search: SearchConfig,
    density: SampleDensity,
    cancel: CancelToken,
}

impl OptimizePullDirection {
    /// Creates a new `OptimizePullDirection` operation.
    #[must_use]
    pub fn new(thresholds: DraftThresholds, search: SearchConfig) -> Self {
        Self {
            thresholds,
            search,
            density: SampleDensity::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Sets the sampling grid and ray-origin offset.
    #[must_use]
    pub fn with_density(mut self, density: SampleDensity) -> Self {
        self.density = density;
        self
    }

    /// Polls `cancel` between candidates and refinement steps.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Samples the solid and searches for the best direction.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or the run is cancelled.
    pub fn execute<Q: GeometryQuery>(&self, query: &Q) -> Result<OptimizationResult> {
        let sampled = SampledSolid::new(query, self.density.grid, &self.cancel)?;
        self.evaluate(query, &sampled)
    }

    /// Searches for the best direction using samples taken earlier.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or the run is cancelled.
    pub fn evaluate<Q: GeometryQuery>(
        &self,
        query: &Q,
        sampled: &SampledSolid,
    ) -> Result<OptimizationResult> {
        let mut candidates = vec![Direction::x(), Direction::y(), Direction::z()];
        candidates.extend(Direction::fibonacci_hemisphere(self.search.coarse_resolution));

        let costs = candidates
            .par_iter()
            .map(|d| {
                self.cancel.check()?;
                self.cost(query, sampled, *d)
            })
            .collect::<Result<Vec<_>>>()?;

        // First minimum wins, so ties go to the lowest candidate index.
        let mut best = 0;
        for (i, c) in costs.iter().enumerate() {
            if c.total < costs[best].total {
                best = i;
            }
        }
        let coarse_direction = candidates[best];
        let coarse_cost = costs[best];
        tracing::debug!(
            candidates = candidates.len(),
            best = ?coarse_direction,
            cost = coarse_cost.total,
            "coarse direction sweep done"
        );

        let mut direction = coarse_direction;
        let mut cost = coarse_cost;
        let mut step = self.search.initial_step_deg;
        let mut iterations = 0;
        let mut evaluations = candidates.len();
        while step >= self.search.min_step_deg && iterations < self.search.iteration_cap {
            self.cancel.check()?;
            iterations += 1;
            let (t1, t2) = direction.tangent_basis();
            let angle = step.to_radians();
            let mut best_move: Option<(Direction, DirectionCost)> = None;
            for (axis, sign) in [(t1, 1.0), (t1, -1.0), (t2, 1.0), (t2, -1.0)] {
                let moved = direction.rotated(&axis, sign * angle);
                let c = self.cost(query, sampled, moved)?;
                evaluations += 1;
                if best_move.map_or(true, |(_, b)| c.total < b.total) {
                    best_move = Some((moved, c));
                }
            }
            match best_move {
                Some((moved, c)) if c.total < cost.total - self.search.refinement_epsilon => {
                    direction = moved;
                    cost = c;
                }
                _ => step *= 0.5,
            }
        }

        let converged = step < self.search.min_step_deg;
        if !converged {
            tracing::warn!(iterations, step, "direction search hit the iteration cap");
        }
        tracing::info!(
            direction = ?direction,
            cost = cost.total,
            iterations,
            converged,
            "pull direction selected"
        );
        Ok(OptimizationResult {
            direction,
            cost,
            coarse_direction,
            coarse_cost,
            converged,
            iterations,
            evaluations,
        })
    }

    /// Cost of a single direction.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or the run is cancelled.
    pub fn cost<Q: GeometryQuery>(
        &self,
        query: &Q,
        sampled: &SampledSolid,
        direction: Direction,
    ) -> Result<DirectionCost> {
        let draft = ClassifyDraft::new(direction, self.thresholds)
            .with_cancel(self.cancel.clone())
            .evaluate(sampled)?;
        let undercuts = DetectUndercuts::new(direction, self.thresholds.vertical_tolerance)
            .with_density(self.density)
            .with_cancel(self.cancel.clone())
            .evaluate(query, sampled)?;
        Ok(DirectionCost::new(
            draft.reverse_area(),
            undercuts.total_area(),
            draft.vertical_count(),
            &self.search.weights,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::MoldError;
    use crate::math::{Point3, Vector3};
    use crate::operations::creation::{MakeBox, MakeBoxWithHole};
    use crate::query::SolidView;
    use crate::topology::TopologyStore;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn quick_search() -> SearchConfig {
        SearchConfig {
            coarse_resolution: 12,
            iteration_cap: 40,
            min_step_deg: 0.5,
            ..SearchConfig::default()
        }
    }

    fn quick_density() -> SampleDensity {
        SampleDensity {
            grid: 4,
            ..SampleDensity::default()
        }
    }

    #[test]
    fn cost_weights_combine_terms() {
        let w = CostWeights {
            reverse_area: 2.0,
            undercut_area: 3.0,
            vertical_count: 0.5,
        };
        let c = DirectionCost::new(1.0, 2.0, 4, &w);
        assert!((c.total - 10.0).abs() < 1e-12);
    }

    #[test]
    fn blind_hole_prefers_its_axis() {
        let mut store = TopologyStore::new();
        let solid = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 2.0, 4.0)
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let result = OptimizePullDirection::new(DraftThresholds::default(), quick_search())
            .with_density(quick_density())
            .execute(&view)
            .unwrap();
        assert!(result.direction.as_vector().x.abs() > 0.999, "{result:?}");
        assert!(result.converged);
        assert!(result.cost.undercut_area.abs() < f64::EPSILON);
    }

    #[test]
    fn refinement_never_loses_to_the_sweep() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(3.0, 5.0, 7.0))
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let result = OptimizePullDirection::new(DraftThresholds::default(), quick_search())
            .with_density(quick_density())
            .execute(&view)
            .unwrap();
        assert!(result.cost.total <= result.coarse_cost.total);
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let search = SearchConfig {
            iteration_cap: 1,
            ..quick_search()
        };
        let result = OptimizePullDirection::new(DraftThresholds::default(), search)
            .with_density(quick_density())
            .execute(&view)
            .unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn cost_is_symmetric_under_reversal() {
        let mut store = TopologyStore::new();
        let solid = MakeBoxWithHole::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0), 2.0, 4.0)
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let op = OptimizePullDirection::new(DraftThresholds::default(), quick_search())
            .with_density(quick_density());
        let sampled = SampledSolid::new(&view, 4, &CancelToken::new()).unwrap();
        let d = Direction::new(Vector3::new(0.3, 0.2, 1.0)).unwrap();
        let a = op.cost(&view, &sampled, d).unwrap();
        let b = op.cost(&view, &sampled, d.reversed()).unwrap();
        assert!((a.total - b.total).abs() < 1e-9);
    }

    #[test]
    fn cancelled_search_stops() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let r = OptimizePullDirection::new(DraftThresholds::default(), quick_search())
            .with_cancel(cancel)
            .execute(&view);
        assert!(matches!(r, Err(MoldError::Cancelled)));
    }
}
