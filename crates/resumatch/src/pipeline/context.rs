use std::path::PathBuf;

use crate::extraction::ResumeDocument;
use crate::tags::CandidateTags;
use crate::worker::job::Job;

use super::status::StageTracker;

pub struct PipelineContext {
    // Input
    pub job: Job,

    // Intake result: the upload's location under processing/
    pub working_path: Option<PathBuf>,

    // Intake result: id of the files row
    pub file_id: Option<String>,

    pub tracker: StageTracker,

    // OCR result
    pub text: Option<String>,

    // Extraction results
    pub document: Option<ResumeDocument>,
    pub tags: Option<CandidateTags>,

    // Persistence result
    pub resume_id: Option<String>,

    // Where the file was relocated at the end of the run
    pub final_path: Option<PathBuf>,
}

impl PipelineContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            working_path: None,
            file_id: None,
            tracker: StageTracker::default(),
            text: None,
            document: None,
            tags: None,
            resume_id: None,
            final_path: None,
        }
    }

    /// The file as it currently sits on disk.
    pub fn current_path(&self) -> &PathBuf {
        self.working_path.as_ref().unwrap_or(&self.job.source_path)
    }
}
