//! Tag extraction passes over stored positions and profiles.

use std::sync::Arc;

use log::{info, warn};
use tracing::info_span;

use super::position::{format_position_content, PositionInput};
use super::profile::ResumeDocument;
use super::{decode_candidate_tags, decode_position_tags, ExtractionError, Inference};
use crate::db::position_repo::PositionRow;
use crate::db::resume_repo::ResumeRow;
use crate::db::{now_timestamp, DatabaseError, PersistenceGateway};
use crate::error::ResumatchError;
use crate::report::BatchReport;
use crate::tags::{CandidateTags, PositionTags, TagNormalizer};

/// Produces canonical tags for profiles and positions through the
/// inference collaborator and the normalizer.
#[derive(Clone)]
pub struct TagExtractionService {
    gateway: PersistenceGateway,
    inference: Arc<dyn Inference>,
    normalizer: Arc<TagNormalizer>,
}

impl TagExtractionService {
    pub fn new(
        gateway: PersistenceGateway,
        inference: Arc<dyn Inference>,
        normalizer: Arc<TagNormalizer>,
    ) -> Self {
        Self {
            gateway,
            inference,
            normalizer,
        }
    }

    /// Canonical candidate tags for a profile.
    ///
    /// A payload that does not decode yields [`CandidateTags::fallback`].
    /// Transport and embedding failures are returned.
    pub fn candidate_tags(&self, document: &ResumeDocument) -> Result<CandidateTags, ResumatchError> {
        let payload = self
            .inference
            .extract_candidate_tags(&document.tag_analysis_text())?;
        match decode_candidate_tags(payload) {
            Ok(raw) => Ok(self.normalizer.normalize_candidate(&raw)?),
            Err(e) => {
                warn!("Candidate tag payload rejected, using fallback tags: {}", e);
                Ok(CandidateTags::fallback())
            }
        }
    }

    /// Canonical tags for a stored position. Falls back to the formatted
    /// text when polishing fails.
    pub fn position_tags(&self, position: &PositionRow) -> Result<PositionTags, ResumatchError> {
        let content =
            format_position_content(position).ok_or(ExtractionError::MissingField("title"))?;

        let text = match self.inference.polish_position(&content) {
            Ok(polished) if !polished.trim().is_empty() => polished,
            Ok(_) => content,
            Err(e) => {
                warn!("Polishing position {} failed, using raw text: {}", position.id, e);
                content
            }
        };

        let raw = decode_position_tags(self.inference.extract_position_tags(&text)?)?;
        Ok(self.normalizer.normalize_position(&raw)?)
    }

    /// Stores imported positions. A record without a title, or one the
    /// database rejects, is reported and skipped.
    pub fn import_positions(&self, inputs: Vec<PositionInput>) -> BatchReport {
        let mut report = BatchReport::new();
        let created_at = now_timestamp();

        for (index, input) in inputs.into_iter().enumerate() {
            let label = input
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("#{}", index + 1));

            let result = input
                .into_row(&created_at)
                .map_err(ResumatchError::from)
                .and_then(|row| {
                    self.gateway.import_position(&row)?;
                    Ok(row)
                });
            match result {
                Ok(row) => report.succeeded(row.id, row.position_name),
                Err(e) => {
                    warn!("Skipping position {}: {}", label, e);
                    report.failed(label, e.to_string());
                }
            }
        }

        info!(
            "Imported {} positions, {} skipped",
            report.success_count(),
            report.failure_count()
        );
        report
    }

    /// Tags every position that has no tag record yet.
    pub fn scan_positions(&self) -> Result<BatchReport, DatabaseError> {
        let positions = self.gateway.untagged_positions()?;
        let mut report = BatchReport::new();

        for position in &positions {
            let span = info_span!("tag_position", position_id = %position.id);
            let _guard = span.enter();

            let result = self
                .position_tags(position)
                .and_then(|tags| {
                    self.gateway.save_position_tags(&position.id, &tags)?;
                    Ok(tags)
                });
            match result {
                Ok(tags) => {
                    report.succeeded(&position.id, format!("{} / {}", tags.category, tags.market))
                }
                Err(e) => {
                    warn!("Tagging position {} failed: {}", position.id, e);
                    report.failed(&position.id, e.to_string());
                }
            }
        }

        if !report.is_empty() {
            info!(
                "Position tag scan: {} tagged, {} failed",
                report.success_count(),
                report.failure_count()
            );
        }
        Ok(report)
    }

    /// Tags every stored profile that has no tag record, e.g. after an
    /// inference outage.
    pub fn scan_resumes(&self) -> Result<BatchReport, DatabaseError> {
        let profiles = self.gateway.untagged_profiles()?;
        let mut report = BatchReport::new();

        for profile in &profiles {
            let span = info_span!("tag_resume", resume_id = %profile.id);
            let _guard = span.enter();

            match self.retag_profile(profile) {
                Ok(tags) => {
                    report.succeeded(&profile.id, format!("{} / {}", tags.category, tags.market))
                }
                Err(e) => {
                    warn!("Tagging resume {} failed: {}", profile.id, e);
                    report.failed(&profile.id, e.to_string());
                }
            }
        }

        if !report.is_empty() {
            info!(
                "Resume tag scan: {} tagged, {} failed",
                report.success_count(),
                report.failure_count()
            );
        }
        Ok(report)
    }

    fn retag_profile(&self, profile: &ResumeRow) -> Result<CandidateTags, ResumatchError> {
        let document: ResumeDocument =
            serde_json::from_str(&profile.raw_json).map_err(ExtractionError::from)?;
        let tags = self.candidate_tags(&document)?;
        self.gateway.save_candidate_tags(&profile.id, &tags)?;
        Ok(tags)
    }
}
