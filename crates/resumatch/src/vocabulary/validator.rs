//! Vocabulary membership checks and spelling suggestions.

use std::sync::Arc;

use super::{Dimension, VocabularySnapshot};

const SUGGESTION_CUTOFF: f64 = 0.6;
const MAX_SUGGESTIONS: usize = 3;

/// Outcome of [`TagValidator::validate_and_fix`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub tags: Vec<String>,
    /// `(original, replacement)` pairs for tags that were corrected.
    pub fixed: Vec<(String, String)>,
    pub removed: Vec<String>,
}

/// Checks category-skill tags against one vocabulary snapshot.
pub struct TagValidator {
    snapshot: Arc<VocabularySnapshot>,
}

impl TagValidator {
    pub fn new(snapshot: Arc<VocabularySnapshot>) -> Self {
        Self { snapshot }
    }

    pub fn validate_category(&self, category: &str) -> bool {
        self.snapshot.contains(Dimension::Category, "", category)
    }

    /// Splits `tags` into `(valid, invalid)` for a category.
    pub fn validate_tags_for_category(
        &self,
        tags: &[String],
        category: &str,
    ) -> (Vec<String>, Vec<String>) {
        tags.iter()
            .cloned()
            .partition(|tag| self.snapshot.contains(Dimension::CategorySkills, category, tag))
    }

    pub fn filter_valid_tags(&self, tags: &[String], category: &str) -> Vec<String> {
        self.validate_tags_for_category(tags, category).0
    }

    pub fn available_tags(&self, category: &str) -> &[String] {
        self.snapshot.category_skills(category)
    }

    /// Up to three vocabulary tags that look like `tag`, best first.
    pub fn suggest_similar_tags(&self, tag: &str, category: &str) -> Vec<String> {
        let needle = tag.to_lowercase();
        let mut scored: Vec<(f64, &String)> = self
            .snapshot
            .category_skills(category)
            .iter()
            .map(|candidate| {
                (
                    strsim::normalized_levenshtein(&needle, &candidate.to_lowercase()),
                    candidate,
                )
            })
            .filter(|(score, _)| *score >= SUGGESTION_CUTOFF)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, tag)| tag.clone())
            .collect()
    }

    /// Keeps valid tags, replaces invalid ones with their best suggestion,
    /// and drops the rest.
    pub fn validate_and_fix(&self, tags: &[String], category: &str) -> ValidationReport {
        let mut report = ValidationReport::default();
        for tag in tags {
            let resolved = if self.snapshot.contains(Dimension::CategorySkills, category, tag) {
                Some(tag.clone())
            } else {
                match self.suggest_similar_tags(tag, category).into_iter().next() {
                    Some(best) => {
                        report.fixed.push((tag.clone(), best.clone()));
                        Some(best)
                    }
                    None => {
                        report.removed.push(tag.clone());
                        None
                    }
                }
            };
            if let Some(resolved) = resolved {
                if !report.tags.contains(&resolved) {
                    report.tags.push(resolved);
                }
            }
        }
        report
    }
}
