//! Maps free-form extracted tags onto vocabulary labels.
//!
//! Categorical fields (`category`, `market`) are forced to their nearest
//! label. Tag lists keep a tag only when its nearest label is closer than
//! the acceptance threshold; the list corpus depends on the already
//! normalized category or market, and an unknown parent means an empty
//! corpus and therefore no tags.

use std::sync::Arc;

use log::debug;

use super::types::{
    CandidateTags, PositionTags, RawCandidateTags, RawPositionTags, TieredTags,
};
use crate::semantic::{EmbeddingError, SemanticMatcher};
use crate::vocabulary::TagVocabulary;

/// Minimum (exclusive) cosine similarity for a tag to be kept.
pub const ACCEPTANCE_THRESHOLD: f32 = 0.8;

pub struct TagNormalizer {
    matcher: Arc<SemanticMatcher>,
    vocabulary: Arc<TagVocabulary>,
    threshold: f32,
}

impl TagNormalizer {
    pub fn new(matcher: Arc<SemanticMatcher>, vocabulary: Arc<TagVocabulary>) -> Self {
        Self {
            matcher,
            vocabulary,
            threshold: ACCEPTANCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn vocabulary(&self) -> &Arc<TagVocabulary> {
        &self.vocabulary
    }

    pub fn normalize_candidate(
        &self,
        raw: &RawCandidateTags,
    ) -> Result<CandidateTags, EmbeddingError> {
        let snapshot = self.vocabulary.snapshot();

        let category = self.force_label(&raw.category, snapshot.categories())?;
        let market = self.force_label(&raw.market, snapshot.markets())?;

        Ok(CandidateTags {
            category_skills: self
                .filter_tags(&raw.category_skills, snapshot.category_skills(&category))?,
            market_field: self.filter_tags(&raw.market_field, snapshot.market_fields(&market))?,
            education: self.filter_tags(&raw.education, snapshot.education())?,
            title: raw.title.trim().to_lowercase(),
            skills: keywords(&raw.skills),
            others: keywords(&raw.others),
            category,
            market,
        })
    }

    pub fn normalize_position(&self, raw: &RawPositionTags) -> Result<PositionTags, EmbeddingError> {
        let snapshot = self.vocabulary.snapshot();

        let category = self.force_label(&raw.category, snapshot.categories())?;
        let market = self.force_label(&raw.market, snapshot.markets())?;
        let fields = snapshot.market_fields(&market);
        let education = snapshot.education();

        Ok(PositionTags {
            market_field: TieredTags {
                required: self.filter_tags(&raw.market_field.required, fields)?,
                recommended: self.filter_tags(&raw.market_field.recommended, fields)?,
                exclude: self.filter_tags(&raw.market_field.exclude, fields)?,
            },
            education: TieredTags {
                required: self.filter_tags(&raw.education.required, education)?,
                recommended: self.filter_tags(&raw.education.recommended, education)?,
                exclude: self.filter_tags(&raw.education.exclude, education)?,
            },
            work_experience: keyword_tiers(&raw.work_experience),
            others: keyword_tiers(&raw.others),
            title: raw.title.trim().to_lowercase(),
            category,
            market,
        })
    }

    /// Nearest label, no threshold. A blank value is matched like any other
    /// text, so the result is always a vocabulary label.
    fn force_label(&self, raw: &str, corpus: &[String]) -> Result<String, EmbeddingError> {
        Ok(self
            .matcher
            .best_match(raw, corpus)?
            .map(|m| m.label)
            .unwrap_or_default())
    }

    fn filter_tags(&self, raw: &[String], corpus: &[String]) -> Result<Vec<String>, EmbeddingError> {
        let mut kept: Vec<String> = Vec::new();
        if corpus.is_empty() {
            return Ok(kept);
        }
        for tag in raw {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            match self.matcher.best_match(tag, corpus)? {
                Some(m) if m.similarity > self.threshold => {
                    if !kept.contains(&m.label) {
                        kept.push(m.label);
                    }
                }
                Some(m) => debug!(
                    "dropping tag '{}' (nearest '{}' at {:.3})",
                    tag, m.label, m.similarity
                ),
                None => {}
            }
        }
        Ok(kept)
    }
}

fn keywords(list: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in list {
        let item = item.trim().to_lowercase();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn keyword_tiers(tiers: &TieredTags) -> TieredTags {
    TieredTags {
        required: keywords(&tiers.required),
        recommended: keywords(&tiers.recommended),
        exclude: keywords(&tiers.exclude),
    }
}
