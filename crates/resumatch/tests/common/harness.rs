//! Isolated service environment for integration tests.
//!
//! Each harness owns a temp directory holding the upload tree and a SQLite
//! file, and builds `Services` around fake collaborators.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use resumatch::processor::OcrEngine;
use resumatch::{Config, Database, Embedder, Inference, Services, TagVocabulary};

use super::fakes::FakeEmbedder;

pub struct TestHarness {
    temp_dir: TempDir,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let config = Config {
            uploads_root: base.join("uploads"),
            temp_directory: base.join("temp"),
            database_path: Some(base.join("data").join("resumatch.db")),
            worker_count: 2,
            file_settle_timeout_secs: 0,
            ..Config::default()
        };
        Self { temp_dir, config }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Services over a fresh database file, with the given collaborators.
    pub fn services(&self, inference: impl Inference + 'static, ocr: impl OcrEngine + 'static) -> Services {
        self.services_with_embedder(FakeEmbedder::new(), inference, ocr)
    }

    pub fn services_with_embedder(
        &self,
        embedder: impl Embedder + 'static,
        inference: impl Inference + 'static,
        ocr: impl OcrEngine + 'static,
    ) -> Services {
        let database =
            Database::open(&self.config.database_path()).expect("Failed to open database");
        let vocabulary = Arc::new(
            TagVocabulary::with_dictionary(database.clone()).expect("Failed to load vocabulary"),
        );
        let mut config = self.config.clone();
        config.retry.initial_delay_ms = 0;
        config.retry.max_attempts = 1;

        let services = Services::assemble(
            config,
            database,
            vocabulary,
            Arc::new(embedder),
            Arc::new(inference),
            Arc::new(ocr),
        );
        services.uploads.ensure().expect("Failed to create upload directories");
        services
    }

    /// Writes an upload into `pending/`.
    pub fn upload(&self, name: &str) -> PathBuf {
        let path = self.config.uploads_root.join("pending").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"%PDF-1.4 test upload").expect("Failed to write upload");
        path
    }

    /// File names directly inside an upload directory, sorted.
    pub fn files_in(&self, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.config.uploads_root.join(dir))
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
