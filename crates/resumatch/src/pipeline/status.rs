//! Per-stage status machine: `pending → processing → {completed | failed}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Processing => "processing",
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Failed)
    }

    /// Whether `next` is a legal forward step from `self`.
    ///
    /// `pending → failed` is allowed so a stage can be failed before its
    /// collaborator is ever invoked.
    pub fn can_transition_to(&self, next: StageStatus) -> bool {
        matches!(
            (self, next),
            (StageStatus::Pending, StageStatus::Processing)
                | (StageStatus::Pending, StageStatus::Failed)
                | (StageStatus::Processing, StageStatus::Completed)
                | (StageStatus::Processing, StageStatus::Failed)
        )
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StageStatus::Pending),
            "processing" => Ok(StageStatus::Processing),
            "completed" => Ok(StageStatus::Completed),
            "failed" => Ok(StageStatus::Failed),
            other => Err(format!("unknown stage status '{}'", other)),
        }
    }
}

/// The two independently tracked stages of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ocr,
    Extraction,
}

impl Stage {
    /// Column prefix in the `files` table.
    pub fn column_prefix(&self) -> &'static str {
        match self {
            Stage::Ocr => "ocr",
            Stage::Extraction => "llm",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ocr => f.write_str("ocr"),
            Stage::Extraction => f.write_str("extraction"),
        }
    }
}

/// In-memory mirror of a file's two stage statuses.
///
/// The pipeline advances this first and only then writes the transition,
/// so an illegal step is caught before it reaches the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTracker {
    ocr: StageStatus,
    extraction: StageStatus,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self {
            ocr: StageStatus::Pending,
            extraction: StageStatus::Pending,
        }
    }
}

impl StageTracker {
    pub fn status(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Ocr => self.ocr,
            Stage::Extraction => self.extraction,
        }
    }

    /// Applies one transition or reports why it is not allowed.
    pub fn advance(&mut self, stage: Stage, next: StageStatus) -> Result<(), String> {
        let current = self.status(stage);
        if !current.can_transition_to(next) {
            return Err(format!(
                "illegal {} transition {} -> {}",
                stage, current, next
            ));
        }
        if stage == Stage::Extraction
            && next == StageStatus::Processing
            && self.ocr != StageStatus::Completed
        {
            return Err(format!(
                "extraction cannot start while ocr is {}",
                self.ocr
            ));
        }
        match stage {
            Stage::Ocr => self.ocr = next,
            Stage::Extraction => self.extraction = next,
        }
        Ok(())
    }
}
