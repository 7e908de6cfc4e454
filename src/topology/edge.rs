use crate::error::Result;
use crate::geometry::curve::{Arc, Curve, CurveDomain, Line};
use crate::math::{Point3, Vector3};

use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for an edge in the topology store.
    pub struct EdgeId;
}

/// Segments used to discretize a full turn of an arc edge.
const ARC_SEGMENTS_PER_TURN: f64 = 64.0;

/// The geometric curve associated with an edge.
#[derive(Debug, Clone)]
pub enum EdgeCurve {
    /// A line segment.
    Line(Line),
    /// A circular arc.
    Arc(Arc),
}

impl Curve for EdgeCurve {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        match self {
            Self::Line(c) => c.evaluate(t),
            Self::Arc(c) => c.evaluate(t),
        }
    }

    fn tangent(&self, t: f64) -> Result<Vector3> {
        match self {
            Self::Line(c) => c.tangent(t),
            Self::Arc(c) => c.tangent(t),
        }
    }

    fn domain(&self) -> CurveDomain {
        match self {
            Self::Line(c) => c.domain(),
            Self::Arc(c) => c.domain(),
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Line(c) => c.is_closed(),
            Self::Arc(c) => c.is_closed(),
        }
    }
}

/// Data associated with a topological edge.
///
/// An edge connects two vertices and carries a geometric curve
/// that defines the shape of the edge between them. A full-circle edge
/// starts and ends on the same vertex.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Start vertex of the edge.
    pub start: VertexId,
    /// End vertex of the edge.
    pub end: VertexId,
    /// The geometric curve defining this edge's shape.
    pub curve: EdgeCurve,
    /// Parameter on the curve corresponding to the start vertex.
    pub t_start: f64,
    /// Parameter on the curve corresponding to the end vertex.
    pub t_end: f64,
}

impl EdgeData {
    /// Returns `true` if the edge closes on itself.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.start == self.end
    }

    /// Discretizes the edge from its start vertex to its end vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve cannot be evaluated.
    pub fn polyline(&self) -> Result<Vec<Point3>> {
        let segments = match &self.curve {
            EdgeCurve::Line(_) => 1,
            EdgeCurve::Arc(_) => {
                let turns = (self.t_end - self.t_start).abs() / std::f64::consts::TAU;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let n = (turns * ARC_SEGMENTS_PER_TURN).ceil() as usize;
                n.max(4)
            }
        };
        self.curve.sample_polyline(self.t_start, self.t_end, segments)
    }

    /// Length of the edge, measured along its polyline.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve cannot be evaluated.
    pub fn length(&self) -> Result<f64> {
        match &self.curve {
            EdgeCurve::Line(_) => Ok((self.t_end - self.t_start).abs()),
            EdgeCurve::Arc(arc) => Ok(arc.radius() * (self.t_end - self.t_start).abs()),
        }
    }
}
