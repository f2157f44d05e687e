//! Tag records and their normalization onto the vocabulary.

pub mod normalizer;
pub mod types;

pub use normalizer::{TagNormalizer, ACCEPTANCE_THRESHOLD};
pub use types::{CandidateTags, PositionTags, RawCandidateTags, RawPositionTags, TieredTags};
