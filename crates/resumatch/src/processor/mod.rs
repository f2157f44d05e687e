//! OCR collaborators: PDF in, text out.

pub mod ocr;
pub mod pdf;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{OcrConfig, OcrEngineKind};
use crate::error::ProcessError;

pub use ocr::MineruEngine;
pub use pdf::PdfTextEngine;

/// Text recovered from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrOutput {
    pub text: String,
    /// Number of text parts that were joined (markdown files or pages).
    pub parts: usize,
}

pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extracts the text of `pdf`. Every error is a stage failure.
    fn extract(&self, pdf: &Path) -> Result<OcrOutput, ProcessError>;

    /// Whether the engine can run at all on this host.
    fn is_available(&self) -> bool;

    /// Removes scratch output left for `pdf`. Never fails.
    fn cleanup(&self, _pdf: &Path) {}
}

/// Builds the configured engine. `temp_root` holds per-document scratch
/// directories.
pub fn build_engine(config: &OcrConfig, temp_root: PathBuf) -> Arc<dyn OcrEngine> {
    match config.engine {
        OcrEngineKind::Mineru => Arc::new(MineruEngine::new(
            &config.command,
            temp_root,
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.probe_timeout_secs),
        )),
        OcrEngineKind::PdfText => Arc::new(PdfTextEngine::new()),
    }
}

/// Stem used for a document's scratch directory.
pub(crate) fn document_stem(pdf: &Path) -> String {
    pdf.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string()
}
