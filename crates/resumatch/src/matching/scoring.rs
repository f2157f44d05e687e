//! Candidate scores. Each component is capped at 100; the sum is the raw
//! total of the three.

use serde::Serialize;

use crate::tags::CandidateTags;

const COMPONENT_CAP: u32 = 100;
const MARKET_PRESENT: u32 = 20;
const PER_MARKET_FIELD: u32 = 10;
const MARKET_FIELD_CAP: u32 = 60;
const PER_CATEGORY_SKILL: u32 = 10;
const CATEGORY_SKILL_CAP: u32 = 60;
const PER_SKILL: u32 = 5;
const SKILL_CAP: u32 = 40;

/// Weight per canonical education label. Unknown labels weigh zero.
pub const EDUCATION_WEIGHTS: &[(&str, u32)] = &[
    ("清北", 100),
    ("qs50", 90),
    ("博士", 85),
    ("qs100", 80),
    ("985高校", 75),
    ("海外学历", 70),
    ("硕士", 70),
    ("211高校", 65),
    ("本科", 60),
    ("专升本", 40),
    ("专科", 30),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchScores {
    pub market: u32,
    pub education: u32,
    pub other: u32,
    pub sum: u32,
}

fn capped(count: usize, per_item: u32, cap: u32) -> u32 {
    u32::try_from(count)
        .unwrap_or(u32::MAX)
        .saturating_mul(per_item)
        .min(cap)
}

pub fn education_weight(label: &str) -> u32 {
    EDUCATION_WEIGHTS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, weight)| *weight)
        .unwrap_or(0)
}

pub fn market_score(candidate: &CandidateTags) -> u32 {
    let base = if candidate.market.trim().is_empty() {
        0
    } else {
        MARKET_PRESENT
    };
    let fields = capped(candidate.market_field.len(), PER_MARKET_FIELD, MARKET_FIELD_CAP);
    (base + fields).min(COMPONENT_CAP)
}

/// Highest weight among the candidate's education labels.
pub fn education_score(candidate: &CandidateTags) -> u32 {
    candidate
        .education
        .iter()
        .map(|label| education_weight(label))
        .max()
        .unwrap_or(0)
}

pub fn other_score(candidate: &CandidateTags) -> u32 {
    let category = capped(
        candidate.category_skills.len(),
        PER_CATEGORY_SKILL,
        CATEGORY_SKILL_CAP,
    );
    let skills = capped(candidate.skills.len(), PER_SKILL, SKILL_CAP);
    (category + skills).min(COMPONENT_CAP)
}

pub fn score(candidate: &CandidateTags) -> MatchScores {
    let market = market_score(candidate);
    let education = education_score(candidate);
    let other = other_score(candidate);
    MatchScores {
        market,
        education,
        other,
        sum: market + education + other,
    }
}
