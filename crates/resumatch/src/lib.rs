pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod matching;
pub mod pipeline;
pub mod processor;
pub mod report;
pub mod sanitize;
pub mod scheduler;
pub mod secrets;
pub mod semantic;
pub mod services;
pub mod stats;
pub mod storage;
pub mod tags;
pub mod vocabulary;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use config::{load_config, Config};
pub use db::{Database, DatabaseError, PersistenceGateway, RetryPolicy};
pub use error::{ConfigError, ProcessError, ResumatchError, Result, StorageError, WorkerError};
pub use extraction::{ChatInference, Inference, InferenceError, TagExtractionService};
pub use matching::{MatchingEngine, RankedCandidate};
pub use pipeline::{DocumentPipeline, FailureKind, PipelineError};
pub use processor::{OcrEngine, OcrOutput};
pub use report::{BatchReport, RecordOutcome};
pub use scheduler::{CycleReport, MatchScheduler};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use semantic::{Embedder, EmbeddingError, SemanticMatcher};
pub use services::{EnvironmentReport, Services};
pub use stats::{PipelineStats, StatsReporter};
pub use storage::UploadDirs;
pub use tags::{CandidateTags, PositionTags, TagNormalizer};
pub use vocabulary::TagVocabulary;
pub use worker::{DirectoryScanner, FileQueue, Job, JobResult, WorkerPool};
