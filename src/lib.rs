pub mod analysis;
pub mod cancel;
pub mod config;
pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;
pub mod query;
pub mod topology;

pub use analysis::{analyze, analyze_with_cancel, AnalysisReport};
pub use cancel::CancelToken;
pub use config::AnalysisConfig;
pub use error::{MoldError, Result};
