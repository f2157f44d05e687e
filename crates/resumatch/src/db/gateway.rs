//! Retrying persistence facade used by the pipeline, the tag scans and the
//! matching engine.
//!
//! Every write goes through the configured [`RetryPolicy`]. Reads are
//! attempted once.

use chrono::Datelike;
use log::warn;
use serde::Serialize;

use super::file_repo::{self, FileRow};
use super::match_repo::{self, MatchRow};
use super::position_repo::{self, PositionRow, PositionTagsRow};
use super::resume_repo::{self, ResumeRow};
use super::stats_repo::{self, CounterDelta, ProcessingStatRow};
use super::tag_repo::{self, ResumeTagsRow};
use super::{dictionary_repo, now_timestamp, Database, DatabaseError, RetryPolicy};
use crate::extraction::profile::{present, ResumeDocument};
use crate::pipeline::status::{Stage, StageStatus};
use crate::tags::{CandidateTags, PositionTags};

/// Status written on a freshly stored profile.
pub const PROFILE_STATUS_TAGGED: &str = "tagged";

/// A candidate as seen by the matching engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub resume_id: String,
    pub tags: CandidateTags,
}

#[derive(Clone)]
pub struct PersistenceGateway {
    db: Database,
    retry: RetryPolicy,
}

fn to_json<T: Serialize + ?Sized>(column: &'static str, value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|source| DatabaseError::Json { column, source })
}

impl PersistenceGateway {
    pub fn new(db: Database, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn create_file_record(&self, file: &FileRow) -> Result<(), DatabaseError> {
        self.retry
            .run("create file record", || file_repo::insert(&self.db, file))
    }

    pub fn update_stage(
        &self,
        file_id: &str,
        stage: Stage,
        status: StageStatus,
        error: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.retry.run("update stage status", || {
            file_repo::set_stage_status(&self.db, file_id, stage, status, error)
        })
    }

    pub fn update_storage_path(&self, file_id: &str, path: &str) -> Result<(), DatabaseError> {
        self.retry.run("update storage path", || {
            file_repo::update_storage_path(&self.db, file_id, path)
        })
    }

    pub fn find_file(&self, file_id: &str) -> Result<Option<FileRow>, DatabaseError> {
        file_repo::find_by_id(&self.db, file_id)
    }

    pub fn file_status_counts(&self, stage: Stage) -> Result<Vec<(String, u64)>, DatabaseError> {
        file_repo::count_by_status(&self.db, stage)
    }

    /// Stores the profile derived from `document` together with its tag
    /// record in one transaction. Returns the new resume id.
    pub fn create_profile(
        &self,
        file_id: &str,
        document: &ResumeDocument,
        tags: &CandidateTags,
    ) -> Result<String, DatabaseError> {
        let row = profile_row(file_id, document, tags, chrono::Utc::now().year())?;
        let tags_row = candidate_tags_row(&row.id, tags)?;
        self.retry.run("create profile", || {
            resume_repo::insert_with_tags(&self.db, &row, &tags_row)
        })?;
        Ok(row.id)
    }

    pub fn save_candidate_tags(
        &self,
        resume_id: &str,
        tags: &CandidateTags,
    ) -> Result<(), DatabaseError> {
        let row = candidate_tags_row(resume_id, tags)?;
        self.retry
            .run("save candidate tags", || tag_repo::upsert(&self.db, &row))
    }

    pub fn find_profile(&self, resume_id: &str) -> Result<Option<ResumeRow>, DatabaseError> {
        resume_repo::find_by_id(&self.db, resume_id)
    }

    pub fn profile_count(&self) -> Result<u64, DatabaseError> {
        resume_repo::count(&self.db)
    }

    /// Profiles without a tag record.
    pub fn untagged_profiles(&self) -> Result<Vec<ResumeRow>, DatabaseError> {
        resume_repo::list_untagged(&self.db)
    }

    /// Every tagged candidate. Records whose tag JSON cannot be read are
    /// skipped with a warning.
    pub fn candidate_pool(&self) -> Result<Vec<CandidateRecord>, DatabaseError> {
        let rows = tag_repo::list_all(&self.db)?;
        let mut pool = Vec::with_capacity(rows.len());
        for row in rows {
            match decode_candidate_tags(&row) {
                Ok(tags) => pool.push(CandidateRecord {
                    resume_id: row.resume_id,
                    tags,
                }),
                Err(e) => warn!("Skipping candidate {}: {}", row.resume_id, e),
            }
        }
        Ok(pool)
    }

    pub fn import_position(&self, position: &PositionRow) -> Result<(), DatabaseError> {
        self.retry
            .run("import position", || position_repo::insert(&self.db, position))
    }

    pub fn untagged_positions(&self) -> Result<Vec<PositionRow>, DatabaseError> {
        position_repo::list_untagged(&self.db)
    }

    /// Writes a position's tag record with status `uploaded`.
    pub fn save_position_tags(
        &self,
        position_id: &str,
        tags: &PositionTags,
    ) -> Result<(), DatabaseError> {
        let row = PositionTagsRow {
            id: uuid::Uuid::new_v4().to_string(),
            position_id: position_id.to_string(),
            category: tags.category.clone(),
            market: tags.market.clone(),
            tags: to_json("position_tags.tags", tags)?,
            status: position_repo::STATUS_UPLOADED.to_string(),
            match_count: 0,
            matched_at: None,
            created_at: now_timestamp(),
        };
        self.retry
            .run("save position tags", || position_repo::upsert_tags(&self.db, &row))
    }

    /// Tag records due for scoring: `uploaded` ones, or every record when
    /// `rematch_all` is set.
    pub fn positions_to_match(
        &self,
        rematch_all: bool,
    ) -> Result<Vec<PositionTagsRow>, DatabaseError> {
        let status = if rematch_all {
            None
        } else {
            Some(position_repo::STATUS_UPLOADED)
        };
        position_repo::list_tags(&self.db, status)
    }

    /// Replaces a position's results and marks it matched.
    ///
    /// Delete and insert are retried separately; a crash between them
    /// leaves the position with no results until its next pass.
    pub fn replace_match_results(
        &self,
        position_id: &str,
        rows: &[MatchRow],
    ) -> Result<(), DatabaseError> {
        self.retry.run("delete match results", || {
            match_repo::delete_for_position(&self.db, position_id)
        })?;
        self.retry
            .run("insert match results", || match_repo::insert_all(&self.db, rows))?;
        self.retry.run("mark position matched", || {
            position_repo::mark_matched(&self.db, position_id, rows.len())
        })
    }

    pub fn match_results(&self, position_id: &str) -> Result<Vec<MatchRow>, DatabaseError> {
        match_repo::list_for_position(&self.db, position_id)
    }

    pub fn dictionary_entries(&self) -> Result<Vec<dictionary_repo::DictionaryEntry>, DatabaseError> {
        dictionary_repo::list_all(&self.db)
    }

    pub fn add_dictionary_entry(&self, tag_name: &str, category: &str) -> Result<(), DatabaseError> {
        self.retry.run("add dictionary entry", || {
            dictionary_repo::insert(&self.db, tag_name, category)
        })
    }

    pub fn record_stats(&self, date: &str, delta: &CounterDelta) -> Result<(), DatabaseError> {
        if delta.is_empty() {
            return Ok(());
        }
        self.retry
            .run("record processing stats", || stats_repo::record(&self.db, date, delta))
    }

    pub fn recent_stats(&self, limit: u32) -> Result<Vec<ProcessingStatRow>, DatabaseError> {
        stats_repo::recent(&self.db, limit)
    }
}

/// Reads a `resume_tags` row back into canonical tags.
fn candidate_tags_row(
    resume_id: &str,
    tags: &CandidateTags,
) -> Result<ResumeTagsRow, DatabaseError> {
    Ok(ResumeTagsRow {
        id: uuid::Uuid::new_v4().to_string(),
        resume_id: resume_id.to_string(),
        category: tags.category.clone(),
        market: tags.market.clone(),
        tags: to_json("resume_tags.tags", tags)?,
        created_at: now_timestamp(),
    })
}

pub fn decode_candidate_tags(row: &ResumeTagsRow) -> Result<CandidateTags, DatabaseError> {
    let mut tags: CandidateTags = serde_json::from_str(&row.tags).map_err(|source| {
        DatabaseError::Json {
            column: "resume_tags.tags",
            source,
        }
    })?;
    tags.category = row.category.clone();
    tags.market = row.market.clone();
    Ok(tags)
}

/// Reads a `position_tags` row back into canonical tags.
pub fn decode_position_tags(row: &PositionTagsRow) -> Result<PositionTags, DatabaseError> {
    let mut tags: PositionTags = serde_json::from_str(&row.tags).map_err(|source| {
        DatabaseError::Json {
            column: "position_tags.tags",
            source,
        }
    })?;
    tags.category = row.category.clone();
    tags.market = row.market.clone();
    Ok(tags)
}

fn optional(value: &str) -> Option<String> {
    present(value).map(str::to_string)
}

fn profile_row(
    file_id: &str,
    document: &ResumeDocument,
    tags: &CandidateTags,
    current_year: i32,
) -> Result<ResumeRow, DatabaseError> {
    let info = &document.basic_info;
    Ok(ResumeRow {
        id: uuid::Uuid::new_v4().to_string(),
        file_id: file_id.to_string(),
        full_name: optional(&info.name),
        email: optional(&info.email),
        phone: optional(&info.phone),
        location: optional(&info.location),
        headline: document.headline().map(str::to_string),
        summary: document.summary(),
        years_experience: document.years_of_experience(current_year),
        education: to_json("education", &document.education)?,
        work_experience: to_json("work_experience", &document.work_experience)?,
        projects: to_json("projects", &document.projects)?,
        skills: to_json("skills", &document.skills)?,
        certifications: to_json("certifications", &document.certifications)?,
        languages: to_json("languages", &document.languages)?,
        extra_sections: to_json(
            "extra_sections",
            &serde_json::json!({ "others": document.others }),
        )?,
        raw_json: to_json("raw_json", document)?,
        tags: to_json("tags", tags)?,
        status: PROFILE_STATUS_TAGGED.to_string(),
        created_at: now_timestamp(),
    })
}
