use std::path::{Path, PathBuf};

use crate::config::schema::{Config, OcrEngineKind, CONFIG_VERSION};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub const ENV_UPLOADS_ROOT: &str = "RESUMATCH_UPLOADS_ROOT";
pub const ENV_DATABASE_PATH: &str = "RESUMATCH_DATABASE_PATH";
pub const ENV_WORKERS: &str = "RESUMATCH_WORKERS";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";

/// Loads, validates and applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = load_config_from_str(&content)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Parses and validates a config document. Environment overrides are not
/// applied.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Applies the `RESUMATCH_*` and `OPENAI_BASE_URL` overrides read through
/// `lookup`. `OPENAI_BASE_URL` replaces both service base URLs.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let set = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(root) = set(ENV_UPLOADS_ROOT) {
        config.uploads_root = PathBuf::from(root);
    }
    if let Some(path) = set(ENV_DATABASE_PATH) {
        config.database_path = Some(PathBuf::from(path));
    }
    if let Some(workers) = set(ENV_WORKERS) {
        config.worker_count = match workers.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            Ok(_) => {
                return Err(ConfigError::InvalidOverride {
                    name: ENV_WORKERS.to_string(),
                    value: workers,
                    reason: "must be greater than 0".to_string(),
                })
            }
            Err(e) => {
                return Err(ConfigError::InvalidOverride {
                    name: ENV_WORKERS.to_string(),
                    value: workers,
                    reason: e.to_string(),
                })
            }
        };
    }
    if let Some(base_url) = set(ENV_BASE_URL) {
        config.inference.base_url = base_url.clone();
        config.embedding.base_url = base_url;
    }
    Ok(())
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Semantic checks the schema cannot express. Also run after overrides.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be greater than 0".to_string(),
        });
    }

    if config.supported_extensions.is_empty() {
        return Err(ConfigError::Validation {
            message: "supported_extensions must not be empty".to_string(),
        });
    }

    if config.ocr.engine == OcrEngineKind::Mineru && config.ocr.command.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "ocr.command must be set for the mineru engine".to_string(),
        });
    }

    let threshold = config.matching.acceptance_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ConfigError::Validation {
            message: format!("matching.acceptance_threshold out of range: {}", threshold),
        });
    }

    if config.matching.max_results == 0 {
        return Err(ConfigError::Validation {
            message: "matching.max_results must be greater than 0".to_string(),
        });
    }

    if config.retry.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "retry.max_attempts must be greater than 0".to_string(),
        });
    }

    Ok(())
}
