//! Inference boundary.
//!
//! Everything the inference service returns is untrusted until it has been
//! checked here: resume documents against the embedded JSON Schema, tag
//! payloads through typed decoding.

pub mod client;
pub mod position;
pub mod profile;
pub mod schema;
pub mod service;

use serde_json::Value;
use thiserror::Error;

use crate::tags::{RawCandidateTags, RawPositionTags};

pub use client::{ChatInference, Inference};
pub use position::{format_position_content, PositionInput};
pub use profile::{ResumeDocument, PLACEHOLDER};
pub use service::TagExtractionService;

/// Texts shorter than this (in characters, after trimming) are not sent
/// to the inference service.
pub const MIN_INPUT_CHARS: usize = 50;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Inference request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Inference response is malformed: {0}")]
    MalformedResponse(String),

    #[error("Embedded response schema is invalid: {0}")]
    InvalidSchema(String),
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Input text too short for extraction ({0} characters)")]
    InputTooShort(usize),

    #[error("Schema validation failed: {0}")]
    Schema(String),

    #[error("Failed to decode extracted payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Required field is missing or blank: {0}")]
    MissingField(&'static str),
}

/// Rejects inputs that are too short to be worth an inference call.
pub fn check_input_length(text: &str) -> Result<(), ExtractionError> {
    let chars = text.trim().chars().count();
    if chars < MIN_INPUT_CHARS {
        return Err(ExtractionError::InputTooShort(chars));
    }
    Ok(())
}

/// Decodes a candidate tag payload. `category` and `market` must be present.
pub fn decode_candidate_tags(value: Value) -> Result<RawCandidateTags, ExtractionError> {
    Ok(serde_json::from_value(value)?)
}

/// Decodes a position tag payload. `category` and `market` must be present.
pub fn decode_position_tags(value: Value) -> Result<RawPositionTags, ExtractionError> {
    Ok(serde_json::from_value(value)?)
}
