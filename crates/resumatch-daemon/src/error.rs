use std::path::PathBuf;

use resumatch::{ConfigError, DatabaseError, ResumatchError, WorkerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error(transparent)]
    Resumatch(#[from] ResumatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Failed to read '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid positions file '{path}': {source}")]
    ParseInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Environment check failed: {0}")]
    Environment(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}
