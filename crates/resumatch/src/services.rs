//! Long-lived service handles, built once at startup from the config.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;

use crate::config::Config;
use crate::db::{Database, PersistenceGateway};
use crate::error::Result;
use crate::extraction::{ChatInference, Inference, TagExtractionService};
use crate::matching::MatchingEngine;
use crate::pipeline::DocumentPipeline;
use crate::processor::{build_engine, OcrEngine};
use crate::scheduler::MatchScheduler;
use crate::semantic::{Embedder, HttpEmbedder, SemanticMatcher};
use crate::storage::UploadDirs;
use crate::tags::TagNormalizer;
use crate::vocabulary::TagVocabulary;
use crate::worker::DirectoryScanner;

/// Result of the startup environment check.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentReport {
    pub ocr_engine: String,
    pub ocr_available: bool,
    pub database_reachable: bool,
    pub directories_ready: bool,
    pub problems: Vec<String>,
}

impl EnvironmentReport {
    pub fn is_healthy(&self) -> bool {
        self.problems.is_empty()
    }
}

pub struct Services {
    pub config: Config,
    pub gateway: PersistenceGateway,
    pub vocabulary: Arc<TagVocabulary>,
    pub ocr: Arc<dyn OcrEngine>,
    pub tags: TagExtractionService,
    pub uploads: UploadDirs,
    pub pipeline: Arc<DocumentPipeline>,
    pub engine: Arc<MatchingEngine>,
}

impl Services {
    /// Opens the database and builds every collaborator from `config`.
    pub fn build(config: Config) -> Result<Self> {
        let database = Database::open(&config.database_path())?;
        let vocabulary = Arc::new(TagVocabulary::with_dictionary(database.clone())?);

        let embedding = &config.embedding;
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(
            &embedding.base_url,
            &embedding.model,
            embedding.dimensions,
            embedding.credentials.resolve()?,
            Duration::from_secs(embedding.timeout_secs),
        )?);

        let inference_config = &config.inference;
        let inference: Arc<dyn Inference> = Arc::new(ChatInference::new(
            &inference_config.base_url,
            &inference_config.model,
            inference_config.credentials.resolve()?,
            Duration::from_secs(inference_config.timeout_secs),
        )?);

        let ocr = build_engine(&config.ocr, config.temp_directory.clone());

        Ok(Self::assemble(
            config, database, vocabulary, embedder, inference, ocr,
        ))
    }

    /// Builds the services around caller-supplied collaborators.
    pub fn assemble(
        config: Config,
        database: Database,
        vocabulary: Arc<TagVocabulary>,
        embedder: Arc<dyn Embedder>,
        inference: Arc<dyn Inference>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        let gateway = PersistenceGateway::new(database, config.retry.policy());
        let matcher = Arc::new(SemanticMatcher::new(embedder));
        let normalizer = Arc::new(
            TagNormalizer::new(matcher, Arc::clone(&vocabulary))
                .with_threshold(config.matching.acceptance_threshold),
        );
        let tags = TagExtractionService::new(gateway.clone(), Arc::clone(&inference), normalizer);
        let uploads = UploadDirs::new(&config.uploads_root, config.supported_extensions.clone());
        let pipeline = Arc::new(DocumentPipeline::new(
            gateway.clone(),
            Arc::clone(&ocr),
            inference,
            tags.clone(),
            uploads.clone(),
        ));
        let engine = Arc::new(MatchingEngine::new(
            gateway.clone(),
            config.matching.max_results,
        ));

        Self {
            config,
            gateway,
            vocabulary,
            ocr,
            tags,
            uploads,
            pipeline,
            engine,
        }
    }

    pub fn scanner(&self) -> DirectoryScanner {
        DirectoryScanner::new(self.uploads.pending(), &self.config)
    }

    pub fn scheduler(&self, rematch_all: bool) -> MatchScheduler {
        MatchScheduler::new(
            self.tags.clone(),
            Arc::clone(&self.engine),
            Duration::from_secs(self.config.match_interval_secs),
        )
        .with_rematch_all(rematch_all)
    }

    /// Probes the OCR engine and the database and creates the upload
    /// directories. Problems are logged and collected; nothing here fails.
    pub fn check_environment(&self) -> EnvironmentReport {
        let mut report = EnvironmentReport {
            ocr_engine: self.ocr.name().to_string(),
            ..EnvironmentReport::default()
        };

        report.ocr_available = self.ocr.is_available();
        if !report.ocr_available {
            report
                .problems
                .push(format!("OCR engine '{}' is not available", self.ocr.name()));
        }

        match self.gateway.database().ping() {
            Ok(()) => report.database_reachable = true,
            Err(e) => report.problems.push(format!("database unreachable: {}", e)),
        }

        match self.uploads.ensure() {
            Ok(()) => report.directories_ready = true,
            Err(e) => report.problems.push(e.to_string()),
        }

        let cpus = num_cpus::get();
        if self.config.worker_count > cpus * 2 {
            warn!(
                "{} workers configured on {} CPUs",
                self.config.worker_count, cpus
            );
        }

        for problem in &report.problems {
            warn!("Environment check: {}", problem);
        }
        if report.is_healthy() {
            info!(
                "Environment check passed (ocr={}, uploads={})",
                report.ocr_engine,
                self.uploads.root().display()
            );
        }
        report
    }
}
