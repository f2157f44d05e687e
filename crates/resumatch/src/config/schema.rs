use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::db::RetryPolicy;
use crate::secrets::{resolve_secret_optional, SecretError};

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    /// Parent of the pending/processing/completed/failed directories.
    #[serde(default = "default_uploads_root")]
    pub uploads_root: PathBuf,
    /// Root for per-document OCR scratch directories.
    #[serde(default = "default_temp_directory")]
    pub temp_directory: PathBuf,
    /// Falls back to `~/.resumatch/data/resumatch.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,
    #[serde(default = "default_settle_timeout")]
    pub file_settle_timeout_secs: u64,
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    #[serde(default = "default_supported_extensions")]
    pub supported_extensions: Vec<String>,
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
    #[serde(default = "default_match_interval")]
    pub match_interval_secs: u64,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_uploads_root() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_temp_directory() -> PathBuf {
    PathBuf::from("temp")
}

fn default_worker_count() -> usize {
    3
}

fn default_watch_interval() -> u64 {
    2
}

fn default_settle_timeout() -> u64 {
    30
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_supported_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}

fn default_stats_interval() -> u64 {
    30
}

fn default_match_interval() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            uploads_root: default_uploads_root(),
            temp_directory: default_temp_directory(),
            database_path: None,
            worker_count: default_worker_count(),
            watch_interval_secs: default_watch_interval(),
            file_settle_timeout_secs: default_settle_timeout(),
            max_file_size_bytes: default_max_file_size(),
            supported_extensions: default_supported_extensions(),
            stats_interval_secs: default_stats_interval(),
            match_interval_secs: default_match_interval(),
            ocr: OcrConfig::default(),
            inference: InferenceConfig::default(),
            embedding: EmbeddingConfig::default(),
            matching: MatchingConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Configured database path, or the per-user default.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
            .unwrap_or_else(|| PathBuf::from("resumatch.db"))
    }

    /// Case-insensitive extension check against `supported_extensions`.
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.supported_extensions
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(ext))
            })
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.file_settle_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrEngineKind {
    Mineru,
    PdfText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: OcrEngineKind,
    pub command: String,
    pub timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Mineru,
            command: "mineru".to_string(),
            timeout_secs: 300,
            probe_timeout_secs: 15,
        }
    }
}

/// Where an API key comes from. Never printed.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ApiCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

impl ApiCredentials {
    /// Direct value, then file, then env var. An unset env var means no key.
    pub fn resolve(&self) -> Result<Option<SecretString>, SecretError> {
        resolve_secret_optional(
            self.api_key.as_deref(),
            self.api_key_file.as_deref(),
            self.api_key_env.as_deref(),
        )
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_file", &self.api_key_file)
            .field("api_key_env", &self.api_key_env)
            .finish()
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_inference_model")]
    pub model: String,
    #[serde(flatten)]
    pub credentials: ApiCredentials,
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

fn default_inference_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_inference_timeout() -> u64 {
    120
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_inference_model(),
            credentials: ApiCredentials {
                api_key_env: default_api_key_env(),
                ..Default::default()
            },
            timeout_secs: default_inference_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub dimensions: Option<u32>,
    #[serde(flatten)]
    pub credentials: ApiCredentials,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_timeout() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_embedding_model(),
            dimensions: None,
            credentials: ApiCredentials {
                api_key_env: default_api_key_env(),
                ..Default::default()
            },
            timeout_secs: default_embedding_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub max_results: usize,
    pub acceptance_threshold: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_results: 100,
            acceptance_threshold: crate::tags::ACCEPTANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 2000,
            multiplier: 2,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            multiplier: self.multiplier,
        }
    }
}
