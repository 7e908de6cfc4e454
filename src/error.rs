use thiserror::Error;

use crate::query::{EdgeIndex, FaceIndex};

/// Top-level error type for moldability analysis.
#[derive(Debug, Error)]
pub enum MoldError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Input(#[from] InputError),

    /// A face produced no valid normal sample.
    #[error("face {face} has no valid normal sample: {reason}")]
    DegenerateFace { face: FaceIndex, reason: String },

    /// A ray hit landed on a face boundary and could not be disambiguated.
    #[error("ray from face {face} sample {sample} hit a face boundary at distance {distance}")]
    RaycastAmbiguous {
        face: FaceIndex,
        sample: usize,
        distance: f64,
    },

    /// Parting edges could not be assembled into closed loops.
    #[error("parting line does not close: {reason} (edges {edges:?})")]
    OpenPartingLine { edges: Vec<EdgeIndex>, reason: String },

    /// The pull-direction search hit its iteration cap.
    #[error("direction search stopped after {iterations} iterations without converging")]
    Convergence { iterations: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("analysis cancelled")]
    Cancelled,
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors related to topological operations.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),
}

/// Errors raised by geometry queries against a solid.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("parameter ({u}, {v}) lies outside the domain of face {face}")]
    InvalidParameter { face: FaceIndex, u: f64, v: f64 },

    #[error("face {0} does not exist")]
    UnknownFace(FaceIndex),

    #[error("edge {0} does not exist")]
    UnknownEdge(EdgeIndex),
}

/// Fatal input-validity errors; analysis never starts when one is raised.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("solid has no faces")]
    NoFaces,

    #[error("edge {edge} is used by {uses} face boundaries (expected 2): shell is open or non-manifold")]
    NotWatertight { edge: EdgeIndex, uses: usize },

    #[error("invalid solid: {0}")]
    Invalid(String),
}

/// Convenience type alias for results using [`MoldError`].
pub type Result<T> = std::result::Result<T, MoldError>;
