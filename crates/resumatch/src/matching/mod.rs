//! Position-to-candidate matching: segment filter, skill gate, scoring
//! and ranking.

pub mod engine;
pub mod filter;
pub mod scoring;

pub use engine::{rank, MatchingEngine, RankedCandidate, DEFAULT_MAX_RESULTS};
pub use scoring::{MatchScores, EDUCATION_WEIGHTS};
