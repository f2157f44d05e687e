use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{ProcessError, StorageError};
use crate::pipeline::status::Stage;

/// Why a document ended in `failed/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Moving the upload or creating its file record failed.
    Intake,
    Ocr,
    Extraction,
    /// A database write failed after extraction succeeded.
    Persistence,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Intake => "intake",
            FailureKind::Ocr => "ocr",
            FailureKind::Extraction => "extraction",
            FailureKind::Persistence => "persistence",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Intake failed: {0}")]
    Intake(#[from] StorageError),

    #[error("File record could not be created: {0}")]
    Record(#[source] DatabaseError),

    #[error("{0}")]
    Ocr(#[from] ProcessError),

    #[error("{0}")]
    Extraction(String),

    #[error("persistence failure: {0}")]
    Persistence(#[source] DatabaseError),

    #[error("Stage status could not be recorded: {0}")]
    Tracking(#[source] DatabaseError),

    #[error("{stage} stage: {message}")]
    Transition { stage: Stage, message: String },
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Intake(_) | PipelineError::Record(_) => FailureKind::Intake,
            PipelineError::Ocr(_) => FailureKind::Ocr,
            PipelineError::Extraction(_) => FailureKind::Extraction,
            PipelineError::Persistence(_) | PipelineError::Tracking(_) => FailureKind::Persistence,
            PipelineError::Transition { stage, .. } => match stage {
                Stage::Ocr => FailureKind::Ocr,
                Stage::Extraction => FailureKind::Extraction,
            },
        }
    }
}
