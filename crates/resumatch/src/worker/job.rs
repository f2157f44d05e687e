use std::path::PathBuf;

use crate::pipeline::FailureKind;

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    /// Where the upload was discovered, normally under `pending/`.
    pub source_path: PathBuf,
}

impl Job {
    pub fn new(source_path: PathBuf) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_path,
        }
    }
}

#[derive(Debug)]
pub struct JobResult {
    pub job_id: String,
    pub source_path: PathBuf,
    /// Set once the file record exists.
    pub file_id: Option<String>,
    pub success: bool,
    /// Where the file ended up (`completed/` or `failed/`), if it was moved.
    pub final_path: Option<PathBuf>,
    pub resume_id: Option<String>,
    pub failure: Option<FailureKind>,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(
        job: &Job,
        file_id: String,
        resume_id: String,
        final_path: Option<PathBuf>,
    ) -> Self {
        Self {
            job_id: job.id.clone(),
            source_path: job.source_path.clone(),
            file_id: Some(file_id),
            success: true,
            final_path,
            resume_id: Some(resume_id),
            failure: None,
            error: None,
        }
    }

    pub fn failure(
        job: &Job,
        file_id: Option<String>,
        kind: FailureKind,
        error: String,
        final_path: Option<PathBuf>,
    ) -> Self {
        Self {
            job_id: job.id.clone(),
            source_path: job.source_path.clone(),
            file_id,
            success: false,
            final_path,
            resume_id: None,
            failure: Some(kind),
            error: Some(error),
        }
    }
}
