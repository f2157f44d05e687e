//! Raw (as extracted) and canonical tag records for candidates and positions.

use serde::{Deserialize, Serialize};

pub const CATEGORY_TECHNICAL: &str = "技术类";
pub const CATEGORY_NON_TECHNICAL: &str = "非技术类";

pub const MARKET_WEB3: &str = "web3";
pub const MARKET_AI: &str = "AI";
pub const MARKET_FINANCE: &str = "金融";

/// Candidate tags exactly as the inference service returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandidateTags {
    pub category: String,
    pub market: String,
    #[serde(default)]
    pub category_skills: Vec<String>,
    #[serde(default)]
    pub market_field: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub others: Vec<String>,
}

/// Canonical candidate tags.
///
/// `category`, `market`, `category_skills`, `market_field` and `education`
/// only ever hold vocabulary labels. `title`, `skills` and `others` are
/// free keywords kept lower-cased for scoring and display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateTags {
    pub category: String,
    pub market: String,
    pub category_skills: Vec<String>,
    pub market_field: Vec<String>,
    pub education: Vec<String>,
    pub title: String,
    pub skills: Vec<String>,
    pub others: Vec<String>,
}

impl CandidateTags {
    /// Record used when tag extraction fails validation: non-technical,
    /// no market, no tags.
    pub fn fallback() -> Self {
        Self {
            category: CATEGORY_NON_TECHNICAL.to_string(),
            ..Default::default()
        }
    }
}

/// One tag dimension of a position, split by how the employer weighs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TieredTags {
    pub required: Vec<String>,
    pub recommended: Vec<String>,
    pub exclude: Vec<String>,
}

impl TieredTags {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.recommended.is_empty() && self.exclude.is_empty()
    }

    /// `required ∪ recommended`, first occurrence order.
    pub fn wanted(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for tag in self.required.iter().chain(self.recommended.iter()) {
            if !out.contains(&tag.as_str()) {
                out.push(tag);
            }
        }
        out
    }
}

/// Position tags exactly as the inference service returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPositionTags {
    pub category: String,
    pub market: String,
    #[serde(default)]
    pub market_field: TieredTags,
    #[serde(default)]
    pub education: TieredTags,
    #[serde(default)]
    pub work_experience: TieredTags,
    #[serde(default)]
    pub others: TieredTags,
    #[serde(default)]
    pub title: String,
}

/// Canonical position tags. `market_field` and `education` tiers hold
/// vocabulary labels; `work_experience` and `others` are free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionTags {
    pub category: String,
    pub market: String,
    pub market_field: TieredTags,
    pub education: TieredTags,
    pub work_experience: TieredTags,
    pub others: TieredTags,
    pub title: String,
}
