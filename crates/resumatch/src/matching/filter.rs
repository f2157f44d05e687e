//! Candidate eligibility for a position.

use crate::tags::{CandidateTags, PositionTags};

/// Category and market must be identical strings.
pub fn same_segment(position: &PositionTags, candidate: &CandidateTags) -> bool {
    position.category == candidate.category && position.market == candidate.market
}

/// Position `market_field` tags (required and recommended) the candidate
/// holds in either `market_field` or `category_skills`.
pub fn skill_overlap<'a>(position: &'a PositionTags, candidate: &CandidateTags) -> Vec<&'a str> {
    position
        .market_field
        .wanted()
        .into_iter()
        .filter(|tag| {
            candidate
                .market_field
                .iter()
                .chain(candidate.category_skills.iter())
                .any(|held| held == tag)
        })
        .collect()
}

/// A position that asks for no market-field tags admits everyone in its
/// segment.
pub fn passes_skill_gate(position: &PositionTags, candidate: &CandidateTags) -> bool {
    position.market_field.wanted().is_empty() || !skill_overlap(position, candidate).is_empty()
}

pub fn is_eligible(position: &PositionTags, candidate: &CandidateTags) -> bool {
    same_segment(position, candidate) && passes_skill_gate(position, candidate)
}
