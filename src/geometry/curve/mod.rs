mod arc;
mod line;

pub use arc::Arc;
pub use line::Line;

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3};

/// Parameter domain for a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveDomain {
    /// Start of the parameter range.
    pub t_min: f64,
    /// End of the parameter range.
    pub t_max: f64,
}

impl CurveDomain {
    /// Creates a new curve domain.
    #[must_use]
    pub fn new(t_min: f64, t_max: f64) -> Self {
        Self { t_min, t_max }
    }
}

/// Trait for parametric curves in 3D space.
pub trait Curve {
    /// Evaluates the curve at parameter `t`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or evaluation fails.
    fn evaluate(&self, t: f64) -> Result<Point3>;

    /// Computes the tangent vector at parameter `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or the tangent is degenerate.
    fn tangent(&self, t: f64) -> Result<Vector3>;

    /// Returns the parameter domain of the curve.
    fn domain(&self) -> CurveDomain;

    /// Returns whether the curve is closed.
    fn is_closed(&self) -> bool;

    /// Samples `segments + 1` points evenly in parameter between `t0` and `t1`.
    ///
    /// # Errors
    ///
    /// Returns an error if `segments` is zero or evaluation fails.
    fn sample_polyline(&self, t0: f64, t1: f64, segments: usize) -> Result<Vec<Point3>> {
        if segments == 0 {
            return Err(
                GeometryError::Degenerate("polyline needs at least one segment".into()).into(),
            );
        }
        #[allow(clippy::cast_precision_loss)]
        let step = (t1 - t0) / segments as f64;
        (0..=segments)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = t0 + step * i as f64;
                self.evaluate(t)
            })
            .collect()
    }
}
