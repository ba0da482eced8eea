//! Analysis results and pipeline orchestration

pub mod pipeline;
pub mod result;

pub use pipeline::Pipeline;
pub use result::AnalysisResult;
