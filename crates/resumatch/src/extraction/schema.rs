//! Embedded JSON Schemas for inference payloads.

use std::sync::LazyLock;

use jsonschema::Validator;
use serde_json::Value;

use super::ExtractionError;

pub const RESUME_SCHEMA: &str = include_str!("../../../../schema/resume-v1.json");
pub const CANDIDATE_TAGS_SCHEMA: &str = include_str!("../../../../schema/candidate-tags-v1.json");
pub const POSITION_TAGS_SCHEMA: &str = include_str!("../../../../schema/position-tags-v1.json");
pub const POLISHED_POSITION_SCHEMA: &str =
    include_str!("../../../../schema/polished-position-v1.json");

/// The embedded schemas, each compiled on first use.
static COMPILED: LazyLock<Vec<(&'static str, Result<Validator, String>)>> = LazyLock::new(|| {
    [
        RESUME_SCHEMA,
        CANDIDATE_TAGS_SCHEMA,
        POSITION_TAGS_SCHEMA,
        POLISHED_POSITION_SCHEMA,
    ]
    .into_iter()
    .map(|schema| (schema, compile(schema).map_err(|e| e.to_string())))
    .collect()
});

/// Parses one of the embedded schemas.
pub fn parse(schema_json: &str) -> Result<Value, ExtractionError> {
    serde_json::from_str(schema_json)
        .map_err(|e| ExtractionError::Schema(format!("Invalid embedded schema JSON: {}", e)))
}

fn compile(schema_json: &str) -> Result<Validator, ExtractionError> {
    let schema = parse(schema_json)?;
    jsonschema::validator_for(&schema)
        .map_err(|e| ExtractionError::Schema(format!("Failed to compile JSON schema: {}", e)))
}

/// Validates `instance` against a schema, joining every violation into a
/// single message. The embedded schemas are compiled once per process; any
/// other schema is compiled per call.
pub fn validate(schema_json: &str, instance: &Value) -> Result<(), ExtractionError> {
    match COMPILED.iter().find(|(schema, _)| *schema == schema_json) {
        Some((_, Ok(validator))) => check(validator, instance),
        Some((_, Err(message))) => Err(ExtractionError::Schema(message.clone())),
        None => check(&compile(schema_json)?, instance),
    }
}

fn check(validator: &Validator, instance: &Value) -> Result<(), ExtractionError> {
    let errors: Vec<String> = validator.iter_errors(instance).map(|e| e.to_string()).collect();
    if !errors.is_empty() {
        return Err(ExtractionError::Schema(errors.join("; ")));
    }
    Ok(())
}
