use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, info_span, warn};

use crate::db::file_repo::FileRow;
use crate::db::PersistenceGateway;
use crate::extraction::{check_input_length, Inference, ResumeDocument, TagExtractionService};
use crate::processor::OcrEngine;
use crate::sanitize;
use crate::storage::UploadDirs;
use crate::worker::job::{Job, JobResult};

use super::context::PipelineContext;
use super::error::PipelineError;
use super::status::{Stage, StageStatus};

/// Runs one upload through OCR, extraction, tagging and persistence.
///
/// Every run ends in a terminal status: the file lands in `completed/` or
/// `failed/`, and the OCR scratch output is removed either way.
pub struct DocumentPipeline {
    gateway: PersistenceGateway,
    ocr: Arc<dyn OcrEngine>,
    inference: Arc<dyn Inference>,
    tags: TagExtractionService,
    uploads: UploadDirs,
}

fn extraction_failure(context: &str, e: impl Display) -> PipelineError {
    PipelineError::Extraction(format!("{}: {}", context, e))
}

impl DocumentPipeline {
    pub fn new(
        gateway: PersistenceGateway,
        ocr: Arc<dyn OcrEngine>,
        inference: Arc<dyn Inference>,
        tags: TagExtractionService,
        uploads: UploadDirs,
    ) -> Self {
        Self {
            gateway,
            ocr,
            inference,
            tags,
            uploads,
        }
    }

    pub fn run(&self, job: Job) -> JobResult {
        let filename = sanitize::redact_path(&job.source_path);
        let _pipeline_span = info_span!("pipeline",
            job_id = %job.id,
            filename = %filename,
        )
        .entered();
        let started = Instant::now();

        let mut ctx = PipelineContext::new(job);
        let outcome = self.run_steps(&mut ctx);

        {
            let _step = info_span!("cleanup").entered();
            self.ocr.cleanup(ctx.current_path());
        }

        match outcome {
            Ok(()) => self.finish_success(ctx, started),
            Err(e) => self.finish_failure(ctx, e, started),
        }
    }

    fn run_steps(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        {
            let _step = info_span!("intake").entered();
            self.step_intake(ctx)?;
        }
        {
            let _step = info_span!("ocr").entered();
            self.step_ocr(ctx)?;
        }
        {
            let _step = info_span!("extract_profile").entered();
            self.step_extract_profile(ctx)?;
        }
        {
            let _step = info_span!("tag_candidate").entered();
            self.step_tag_candidate(ctx)?;
        }
        {
            let _step = info_span!("persist").entered();
            self.step_persist(ctx)?;
        }
        Ok(())
    }

    /// Moves the upload into `processing/` and creates its file record.
    fn step_intake(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let source = ctx.job.source_path.clone();
        let working = if source.parent() == Some(self.uploads.processing().as_path()) {
            source.clone()
        } else {
            self.uploads.move_to_processing(&source)?
        };
        ctx.working_path = Some(working.clone());

        let original_name = sanitize::redact_path(&source);
        let size = std::fs::metadata(&working)
            .map(|m| m.len() as i64)
            .unwrap_or(0);
        let file_id = uuid::Uuid::new_v4().to_string();
        let row = FileRow::new(&file_id, &original_name, &working.to_string_lossy(), size);
        self.gateway
            .create_file_record(&row)
            .map_err(PipelineError::Record)?;

        debug!("Created file record {} ({} bytes)", file_id, size);
        ctx.file_id = Some(file_id);
        Ok(())
    }

    fn step_ocr(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        self.transition(ctx, Stage::Ocr, StageStatus::Processing, None)?;

        let output = self.ocr.extract(ctx.current_path())?;
        debug!(
            "{} produced {} characters from {} part(s)",
            self.ocr.name(),
            output.text.chars().count(),
            output.parts
        );
        ctx.text = Some(output.text);

        self.transition(ctx, Stage::Ocr, StageStatus::Completed, None)
    }

    fn step_extract_profile(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        self.transition(ctx, Stage::Extraction, StageStatus::Processing, None)?;

        let text = ctx.text.as_deref().unwrap_or_default();
        check_input_length(text).map_err(|e| extraction_failure("input rejected", e))?;

        let payload = self
            .inference
            .extract_profile(text)
            .map_err(|e| extraction_failure("profile extraction failed", e))?;
        let document = ResumeDocument::from_value(payload)
            .map_err(|e| extraction_failure("profile validation failed", e))?;

        debug!(
            "Profile extracted: {} education, {} work entries",
            document.education.len(),
            document.work_experience.len()
        );
        ctx.document = Some(document);
        Ok(())
    }

    fn step_tag_candidate(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let document = ctx
            .document
            .as_ref()
            .ok_or_else(|| missing(Stage::Extraction, "profile"))?;

        let tags = self
            .tags
            .candidate_tags(document)
            .map_err(|e| extraction_failure("tag analysis failed", e))?;

        info!(
            "Tagged as {}/{}: {} field, {} skill, {} education tag(s)",
            tags.category,
            if tags.market.is_empty() { "-" } else { tags.market.as_str() },
            tags.market_field.len(),
            tags.category_skills.len(),
            tags.education.len()
        );
        ctx.tags = Some(tags);
        Ok(())
    }

    fn step_persist(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let file_id = ctx
            .file_id
            .clone()
            .ok_or_else(|| missing(Stage::Extraction, "file record"))?;
        let (Some(document), Some(tags)) = (ctx.document.as_ref(), ctx.tags.as_ref()) else {
            return Err(missing(Stage::Extraction, "profile or tags"));
        };

        let resume_id = self
            .gateway
            .create_profile(&file_id, document, tags)
            .map_err(PipelineError::Persistence)?;
        ctx.resume_id = Some(resume_id);

        self.transition(ctx, Stage::Extraction, StageStatus::Completed, None)
    }

    /// Advances the in-memory tracker, then records the transition.
    fn transition(
        &self,
        ctx: &mut PipelineContext,
        stage: Stage,
        next: StageStatus,
        error: Option<&str>,
    ) -> Result<(), PipelineError> {
        ctx.tracker
            .advance(stage, next)
            .map_err(|message| PipelineError::Transition { stage, message })?;
        let file_id = ctx
            .file_id
            .as_deref()
            .ok_or_else(|| missing(stage, "file record"))?;
        self.gateway
            .update_stage(file_id, stage, next, error)
            .map_err(PipelineError::Tracking)
    }

    fn finish_success(&self, mut ctx: PipelineContext, started: Instant) -> JobResult {
        {
            let _step = info_span!("relocate").entered();
            match self.uploads.move_to_completed(ctx.current_path()) {
                Ok(path) => {
                    self.record_location(&ctx, &path);
                    ctx.final_path = Some(path);
                }
                Err(e) => warn!("Moving to completed failed: {}", e),
            }
        }

        let file_id = ctx.file_id.clone().unwrap_or_default();
        let resume_id = ctx.resume_id.clone().unwrap_or_default();
        info!(
            "Processed in {:.2}s, profile {}",
            started.elapsed().as_secs_f64(),
            resume_id
        );
        JobResult::success(&ctx.job, file_id, resume_id, ctx.final_path.clone())
    }

    fn finish_failure(
        &self,
        mut ctx: PipelineContext,
        err: PipelineError,
        started: Instant,
    ) -> JobResult {
        let kind = err.kind();
        let message = err.to_string();
        error!(
            "Processing failed after {:.2}s ({}): {}",
            started.elapsed().as_secs_f64(),
            kind,
            message
        );

        self.fail_open_stage(&mut ctx, &message);

        {
            let _step = info_span!("relocate").entered();
            let current = ctx.current_path().clone();
            if current.exists() {
                match self.uploads.move_to_failed(&current, &message) {
                    Ok(path) => {
                        self.record_location(&ctx, &path);
                        ctx.final_path = Some(path);
                    }
                    Err(e) => error!("Moving to failed failed: {}", e),
                }
            } else {
                warn!("Source file is gone, nothing to relocate");
            }
        }

        JobResult::failure(&ctx.job, ctx.file_id.clone(), kind, message, ctx.final_path.clone())
    }

    /// Marks whichever stage is still `processing` as failed.
    fn fail_open_stage(&self, ctx: &mut PipelineContext, message: &str) {
        let open = [Stage::Ocr, Stage::Extraction]
            .into_iter()
            .find(|stage| ctx.tracker.status(*stage) == StageStatus::Processing);
        let Some(stage) = open else {
            return;
        };
        if let Err(e) = self.transition(ctx, stage, StageStatus::Failed, Some(message)) {
            error!("Could not record {} failure: {}", stage, e);
        }
    }

    fn record_location(&self, ctx: &PipelineContext, path: &std::path::Path) {
        let Some(file_id) = ctx.file_id.as_deref() else {
            return;
        };
        if let Err(e) = self
            .gateway
            .update_storage_path(file_id, &path.to_string_lossy())
        {
            warn!("Could not record new location of {}: {}", file_id, e);
        }
    }
}

fn missing(stage: Stage, what: &str) -> PipelineError {
    PipelineError::Transition {
        stage,
        message: format!("{} missing", what),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, RetryPolicy};
    use crate::pipeline::FailureKind;
    use crate::semantic::SemanticMatcher;
    use crate::storage::error_log_path;
    use crate::tags::types::CATEGORY_TECHNICAL;
    use crate::tags::TagNormalizer;
    use crate::test_support::{
        candidate_tags_payload, resume_payload, ScriptedInference, ScriptedOcr, TableEmbedder,
        RESUME_TEXT,
    };
    use crate::vocabulary::TagVocabulary;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Harness {
        _temp: TempDir,
        gateway: PersistenceGateway,
        uploads: UploadDirs,
        ocr: Arc<ScriptedOcr>,
        pipeline: DocumentPipeline,
    }

    fn harness(ocr: ScriptedOcr, inference: ScriptedInference) -> Harness {
        let temp = TempDir::new().unwrap();
        let uploads = UploadDirs::new(temp.path().join("uploads"), vec!["pdf".to_string()]);
        uploads.ensure().unwrap();

        let gateway =
            PersistenceGateway::new(Database::open_in_memory().unwrap(), RetryPolicy::immediate(1));
        let matcher = Arc::new(SemanticMatcher::new(Arc::new(TableEmbedder::new())));
        let normalizer = Arc::new(TagNormalizer::new(matcher, Arc::new(TagVocabulary::builtin())));
        let inference: Arc<dyn Inference> = Arc::new(inference);
        let tags = TagExtractionService::new(gateway.clone(), Arc::clone(&inference), normalizer);

        let ocr = Arc::new(ocr);
        let pipeline = DocumentPipeline::new(
            gateway.clone(),
            Arc::clone(&ocr) as Arc<dyn OcrEngine>,
            inference,
            tags,
            uploads.clone(),
        );

        Harness {
            _temp: temp,
            gateway,
            uploads,
            ocr,
            pipeline,
        }
    }

    fn upload(h: &Harness, name: &str) -> PathBuf {
        let path = h.uploads.pending().join(name);
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();
        path
    }

    fn working_inference() -> ScriptedInference {
        ScriptedInference::new()
            .with_profile(resume_payload("张三"))
            .with_candidate_tags(candidate_tags_payload(
                CATEGORY_TECHNICAL,
                "web3",
                &["layer1", "DeFi"],
            ))
    }

    #[test]
    fn test_success_path() {
        let h = harness(ScriptedOcr::returning(RESUME_TEXT), working_inference());
        let source = upload(&h, "cv.pdf");

        let result = h.pipeline.run(Job::new(source.clone()));

        assert!(result.success, "failed: {:?}", result.error);
        assert!(!source.exists());
        let final_path = result.final_path.clone().unwrap();
        assert_eq!(final_path, h.uploads.completed().join("cv.pdf"));
        assert!(final_path.exists());

        let file = h.gateway.find_file(result.file_id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(file.ocr_status, StageStatus::Completed);
        assert_eq!(file.llm_status, StageStatus::Completed);
        assert!(file.ocr_started_at.is_some());
        assert!(file.llm_completed_at.is_some());
        assert_eq!(file.file_name, "cv.pdf");
        assert_eq!(file.storage_path, final_path.to_string_lossy());

        let profile = h
            .gateway
            .find_profile(result.resume_id.as_deref().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("张三"));

        let pool = h.gateway.candidate_pool().unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].tags.market_field, vec!["layer1", "defi"]);

        assert_eq!(h.ocr.cleaned(), vec![h.uploads.processing().join("cv.pdf")]);
    }

    #[test]
    fn test_ocr_timeout_skips_extraction() {
        let inference = working_inference();
        let h = harness(ScriptedOcr::timing_out(), inference);
        let source = upload(&h, "scan.pdf");

        let result = h.pipeline.run(Job::new(source));

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Ocr));

        let file = h.gateway.find_file(result.file_id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(file.ocr_status, StageStatus::Failed);
        assert_eq!(file.ocr_error.as_deref(), Some("OCR timed out after 300s"));
        assert_eq!(file.llm_status, StageStatus::Pending);
        assert!(file.llm_started_at.is_none());

        let failed = result.final_path.unwrap();
        assert_eq!(failed.parent().unwrap(), h.uploads.failed());
        assert!(failed.exists());
        assert!(error_log_path(&failed).exists());
        assert_eq!(h.gateway.profile_count().unwrap(), 0);
        assert_eq!(h.ocr.cleaned().len(), 1);
    }

    #[test]
    fn test_short_text_fails_extraction() {
        let h = harness(ScriptedOcr::returning("张三 简历"), working_inference());
        let source = upload(&h, "short.pdf");

        let result = h.pipeline.run(Job::new(source));

        assert_eq!(result.failure, Some(FailureKind::Extraction));
        let file = h.gateway.find_file(result.file_id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(file.ocr_status, StageStatus::Completed);
        assert_eq!(file.llm_status, StageStatus::Failed);
        assert!(file.llm_error.unwrap().contains("input rejected"));
    }

    #[test]
    fn test_invalid_profile_fails_extraction() {
        let inference = ScriptedInference::new().with_profile(serde_json::json!({ "name": "x" }));
        let h = harness(ScriptedOcr::returning(RESUME_TEXT), inference);
        let source = upload(&h, "bad.pdf");

        let result = h.pipeline.run(Job::new(source));

        assert_eq!(result.failure, Some(FailureKind::Extraction));
        assert_eq!(h.gateway.profile_count().unwrap(), 0);
    }

    #[test]
    fn test_malformed_tags_fall_back() {
        let inference = ScriptedInference::new()
            .with_profile(resume_payload("李四"))
            .with_candidate_tags(serde_json::json!({ "category": 7 }));
        let h = harness(ScriptedOcr::returning(RESUME_TEXT), inference);
        let source = upload(&h, "cv.pdf");

        let result = h.pipeline.run(Job::new(source));

        assert!(result.success, "failed: {:?}", result.error);
        let pool = h.gateway.candidate_pool().unwrap();
        assert_eq!(pool[0].tags, crate::tags::CandidateTags::fallback());
    }

    #[test]
    fn test_persistence_failure_is_distinct() {
        let h = harness(ScriptedOcr::returning(RESUME_TEXT), working_inference());
        h.gateway
            .database()
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE resume_tags; DROP TABLE resume;")?;
                Ok(())
            })
            .unwrap();
        let source = upload(&h, "cv.pdf");

        let result = h.pipeline.run(Job::new(source));

        assert_eq!(result.failure, Some(FailureKind::Persistence));
        let file = h.gateway.find_file(result.file_id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(file.llm_status, StageStatus::Failed);
        assert!(file.llm_error.unwrap().starts_with("persistence failure"));
        assert!(result.final_path.unwrap().starts_with(h.uploads.failed()));
    }

    #[test]
    fn test_failed_tag_write_leaves_no_profile() {
        let h = harness(ScriptedOcr::returning(RESUME_TEXT), working_inference());
        h.gateway
            .database()
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE resume_tags;")?;
                Ok(())
            })
            .unwrap();
        let source = upload(&h, "cv.pdf");

        let result = h.pipeline.run(Job::new(source));

        assert_eq!(result.failure, Some(FailureKind::Persistence));
        let file = h.gateway.find_file(result.file_id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(file.llm_status, StageStatus::Failed);
        assert_eq!(h.gateway.profile_count().unwrap(), 0);
    }

    #[test]
    fn test_missing_source_is_intake_failure() {
        let h = harness(ScriptedOcr::returning(RESUME_TEXT), working_inference());
        let ghost = h.uploads.pending().join("ghost.pdf");

        let result = h.pipeline.run(Job::new(ghost));

        assert_eq!(result.failure, Some(FailureKind::Intake));
        assert!(result.file_id.is_none());
        assert!(result.final_path.is_none());
    }

    #[test]
    fn test_file_already_in_processing_is_not_moved_twice() {
        let h = harness(ScriptedOcr::returning(RESUME_TEXT), working_inference());
        let path = h.uploads.processing().join("recovered.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let result = h.pipeline.run(Job::new(path));

        assert!(result.success, "failed: {:?}", result.error);
        assert_eq!(
            result.final_path.unwrap(),
            h.uploads.completed().join("recovered.pdf")
        );
    }
}
