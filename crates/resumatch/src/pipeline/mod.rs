pub mod context;
pub mod error;
pub mod runner;
pub mod status;

pub use context::PipelineContext;
pub use error::{FailureKind, PipelineError};
pub use runner::DocumentPipeline;
pub use status::{Stage, StageStatus, StageTracker};
