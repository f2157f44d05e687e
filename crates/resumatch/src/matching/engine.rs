use log::{debug, info, warn};
use serde::Serialize;

use crate::db::gateway::{decode_position_tags, CandidateRecord};
use crate::db::match_repo::MatchRow;
use crate::db::position_repo::PositionTagsRow;
use crate::db::{now_timestamp, DatabaseError, PersistenceGateway};
use crate::matching::filter;
use crate::matching::scoring::{self, MatchScores};
use crate::report::BatchReport;
use crate::tags::PositionTags;

pub const DEFAULT_MAX_RESULTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCandidate {
    pub resume_id: String,
    pub scores: MatchScores,
    /// Position market-field tags this candidate holds.
    pub matched_tags: Vec<String>,
}

/// Filters, scores and ranks the tagged candidate pool for each position.
pub struct MatchingEngine {
    gateway: PersistenceGateway,
    max_results: usize,
}

impl MatchingEngine {
    pub fn new(gateway: PersistenceGateway, max_results: usize) -> Self {
        Self {
            gateway,
            max_results: max_results.max(1),
        }
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Eligible candidates ordered by descending sum score, ties by
    /// ascending resume id, truncated to `max_results`.
    pub fn rank(&self, position: &PositionTags, pool: &[CandidateRecord]) -> Vec<RankedCandidate> {
        rank(position, pool, self.max_results)
    }

    /// Scores every position due for matching against the current candidate
    /// pool. A position that fails keeps its status and is reported; the
    /// pass continues with the next one.
    pub fn run_pass(&self, rematch_all: bool) -> Result<BatchReport, DatabaseError> {
        let positions = self.gateway.positions_to_match(rematch_all)?;
        let mut report = BatchReport::new();
        if positions.is_empty() {
            debug!("No positions to match");
            return Ok(report);
        }

        let pool = self.gateway.candidate_pool()?;
        info!(
            "Matching {} positions against {} candidates",
            positions.len(),
            pool.len()
        );

        for row in &positions {
            match self.match_position(row, &pool) {
                Ok(count) => report.succeeded(&row.position_id, format!("{} matches", count)),
                Err(e) => {
                    warn!("Matching failed for position {}: {}", row.position_id, e);
                    report.failed(&row.position_id, e.to_string());
                }
            }
        }

        info!(
            "Matching pass finished: {} succeeded, {} failed",
            report.success_count(),
            report.failure_count()
        );
        Ok(report)
    }

    /// Replaces one position's results. Returns the number of rows written.
    pub fn match_position(
        &self,
        row: &PositionTagsRow,
        pool: &[CandidateRecord],
    ) -> Result<usize, DatabaseError> {
        let position = decode_position_tags(row)?;
        let ranked = self.rank(&position, pool);

        let created_at = now_timestamp();
        let rows: Vec<MatchRow> = ranked
            .iter()
            .enumerate()
            .map(|(i, candidate)| MatchRow {
                position_id: row.position_id.clone(),
                match_resume: candidate.resume_id.clone(),
                rank: i as i64 + 1,
                skill_score: i64::from(candidate.scores.market),
                education_score: i64::from(candidate.scores.education),
                other_score: i64::from(candidate.scores.other),
                sum_score: i64::from(candidate.scores.sum),
                created_at: created_at.clone(),
            })
            .collect();

        self.gateway.replace_match_results(&row.position_id, &rows)?;
        debug!(
            "Position {} matched {} candidates",
            row.position_id,
            rows.len()
        );
        Ok(rows.len())
    }
}

pub fn rank(
    position: &PositionTags,
    pool: &[CandidateRecord],
    max_results: usize,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = pool
        .iter()
        .filter(|record| filter::is_eligible(position, &record.tags))
        .map(|record| RankedCandidate {
            resume_id: record.resume_id.clone(),
            scores: scoring::score(&record.tags),
            matched_tags: filter::skill_overlap(position, &record.tags)
                .into_iter()
                .map(String::from)
                .collect(),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.scores
            .sum
            .cmp(&a.scores.sum)
            .then_with(|| a.resume_id.cmp(&b.resume_id))
    });
    ranked.truncate(max_results);
    ranked
}
