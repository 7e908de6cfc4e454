use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::config::{SampleDensity, ThicknessBounds};
use crate::error::Result;
use crate::math::Point3;
use crate::query::{FaceIndex, GeometryQuery};

use super::sampling::{FaceSamples, SampledSolid};

/// Wall thickness measured at one surface point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThicknessSample {
    pub face: FaceIndex,
    pub point: Point3,
    pub thickness: f64,
}

/// Thickness statistics of one face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceThickness {
    pub face: FaceIndex,
    pub samples: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Thickness distribution over the whole solid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThicknessDistribution {
    pub samples: Vec<ThicknessSample>,
    /// Samples whose inward ray found no opposing wall.
    pub excluded: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Samples thinner than the lower bound.
    pub thin: Vec<ThicknessSample>,
    /// Samples thicker than the upper bound.
    pub thick: Vec<ThicknessSample>,
    pub per_face: Vec<FaceThickness>,
}

impl ThicknessDistribution {
    fn from_samples(samples: Vec<ThicknessSample>, excluded: usize, bounds: &ThicknessBounds) -> Self {
        let (min, max, mean, std_dev) = stats(samples.iter().map(|s| s.thickness));
        let thin = samples
            .iter()
            .filter(|s| s.thickness < bounds.min)
            .copied()
            .collect();
        let thick = samples
            .iter()
            .filter(|s| s.thickness > bounds.max)
            .copied()
            .collect();

        let mut per_face: Vec<FaceThickness> = Vec::new();
        for chunk in samples.chunk_by(|a, b| a.face == b.face) {
            let (min, max, mean, _) = stats(chunk.iter().map(|s| s.thickness));
            per_face.push(FaceThickness {
                face: chunk[0].face,
                samples: chunk.len(),
                min,
                max,
                mean,
            });
        }

        Self {
            samples,
            excluded,
            min,
            max,
            mean,
            std_dev,
            thin,
            thick,
            per_face,
        }
    }

    /// Number of thin and thick outliers.
    #[must_use]
    pub fn outlier_count(&self) -> usize {
        self.thin.len() + self.thick.len()
    }

    /// Returns `true` if no sample was measured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// `(min, max, mean, population std-dev)`; all zero for no values.
fn stats(values: impl Iterator<Item = f64> + Clone) -> (f64, f64, f64, f64) {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.clone() {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    if count == 0 {
        return (0.0, 0.0, 0.0, 0.0);
    }
    #[allow(clippy::cast_precision_loss)]
    let n = count as f64;
    let mean = sum / n;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (min, max, mean, var.sqrt())
}

/// Estimates wall thickness by casting rays inward from the surface.
pub struct EstimateThickness {
    bounds: ThicknessBounds,
    density: SampleDensity,
    cancel: CancelToken,
}

impl EstimateThickness {
    /// Creates a new `EstimateThickness` operation.
    #[must_use]
    pub fn new(bounds: ThicknessBounds) -> Self {
        Self {
            bounds,
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

    /// Polls `cancel` between faces.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Samples the solid and measures its walls.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or the run is cancelled.
    pub fn execute<Q: GeometryQuery>(&self, query: &Q) -> Result<ThicknessDistribution> {
        let sampled = SampledSolid::new(query, self.density.grid, &self.cancel)?;
        self.evaluate(query, &sampled)
    }

    /// Measures the walls at samples taken earlier.
    ///
    /// # Errors
    ///
    /// Returns [`MoldError::Cancelled`](crate::error::MoldError::Cancelled)
    /// if the run is cancelled.
    pub fn evaluate<Q: GeometryQuery>(
        &self,
        query: &Q,
        sampled: &SampledSolid,
    ) -> Result<ThicknessDistribution> {
        let reach = self
            .bounds
            .max_search_distance
            .unwrap_or_else(|| 2.0 * query.bounding_box().diagonal());
        let per_face = sampled
            .faces
            .par_iter()
            .map(|f| {
                self.cancel.check()?;
                Ok(self.measure_face(query, f, reach))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut samples = Vec::new();
        let mut excluded = 0;
        for (s, missed) in per_face {
            samples.extend(s);
            excluded += missed;
        }
        let dist = ThicknessDistribution::from_samples(samples, excluded, &self.bounds);
        tracing::debug!(
            samples = dist.samples.len(),
            excluded,
            min = dist.min,
            max = dist.max,
            "wall thickness measured"
        );
        Ok(dist)
    }

    fn measure_face<Q: GeometryQuery>(
        &self,
        query: &Q,
        face: &FaceSamples,
        reach: f64,
    ) -> (Vec<ThicknessSample>, usize) {
        let offset = self.density.ray_offset;
        let mut out = Vec::with_capacity(face.samples.len());
        let mut missed = 0;
        for s in &face.samples {
            let origin = s.point - s.normal * offset;
            match query.cast_ray(&origin, &-s.normal, reach) {
                Some(hit) => out.push(ThicknessSample {
                    face: face.face,
                    point: s.point,
                    thickness: hit.distance + offset,
                }),
                None => missed += 1,
            }
        }
        (out, missed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::{MakeBox, MakeSphere};
    use crate::query::SolidView;
    use crate::topology::TopologyStore;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn stats_of_known_values() {
        let (min, max, mean, sd) = stats([1.0, 3.0].into_iter());
        assert_relative_eq!(min, 1.0);
        assert_relative_eq!(max, 3.0);
        assert_relative_eq!(mean, 2.0);
        assert_relative_eq!(sd, 1.0);
        assert_eq!(stats(std::iter::empty()), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn hollow_sphere_wall_is_uniform() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(0.0, 0.0, 0.0), 10.0)
            .with_cavity(8.0)
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let dist = EstimateThickness::new(ThicknessBounds::default())
            .with_density(SampleDensity {
                grid: 6,
                ..SampleDensity::default()
            })
            .execute(&view)
            .unwrap();
        assert_eq!(dist.excluded, 0);
        assert_relative_eq!(dist.min, 2.0, epsilon = 1e-6);
        assert_relative_eq!(dist.max, 2.0, epsilon = 1e-6);
        assert!(dist.std_dev < 1e-6);
        assert_eq!(dist.outlier_count(), 0);
        assert_eq!(dist.per_face.len(), 4);
    }

    #[test]
    fn box_walls_are_thick_outliers() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 2.0))
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let dist = EstimateThickness::new(ThicknessBounds::default())
            .with_density(SampleDensity {
                grid: 2,
                ..SampleDensity::default()
            })
            .execute(&view)
            .unwrap();
        assert_relative_eq!(dist.min, 2.0, epsilon = 1e-6);
        assert_relative_eq!(dist.max, 10.0, epsilon = 1e-6);
        // Four side faces measure 10 across.
        assert_eq!(dist.thick.len(), 16);
        assert!(dist.thin.is_empty());
    }

    #[test]
    fn short_reach_excludes_samples() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 2.0))
            .execute(&mut store)
            .unwrap();
        let view = SolidView::new(&store, solid).unwrap();
        let bounds = ThicknessBounds {
            max_search_distance: Some(5.0),
            ..ThicknessBounds::default()
        };
        let dist = EstimateThickness::new(bounds)
            .with_density(SampleDensity {
                grid: 2,
                ..SampleDensity::default()
            })
            .execute(&view)
            .unwrap();
        assert_eq!(dist.excluded, 16);
        assert_eq!(dist.samples.len(), 8);
    }
}
