use std::path::Path;

use super::{OcrEngine, OcrOutput};
use crate::error::ProcessError;

/// Pattern for Identity-H Unimplemented errors (common with CID fonts).
const IDENTITY_H_PATTERN: &str = "?Identity-H Unimplemented?";

/// Documents with fewer meaningful characters than this have no usable
/// text layer.
pub const MIN_MEANINGFUL_CHARS: usize = 50;

/// Reads the embedded text layer with `lopdf`. Needs no external binary,
/// but cannot read scanned resumes.
#[derive(Debug, Default)]
pub struct PdfTextEngine;

impl PdfTextEngine {
    pub fn new() -> Self {
        Self
    }
}

impl OcrEngine for PdfTextEngine {
    fn name(&self) -> &'static str {
        "pdf-text"
    }

    fn extract(&self, pdf: &Path) -> Result<OcrOutput, ProcessError> {
        let _span = tracing::info_span!("processor.pdf").entered();

        let bytes = std::fs::read(pdf).map_err(|e| ProcessError::ReadDocument {
            path: pdf.to_path_buf(),
            source: e,
        })?;
        let doc = lopdf::Document::load_mem(&bytes)
            .map_err(|e| ProcessError::PdfProcessing(format!("Failed to load PDF: {}", e)))?;

        let mut pages: Vec<String> = Vec::new();
        for (page_num, _) in doc.get_pages() {
            if let Ok(page_text) = doc.extract_text(&[page_num]) {
                let page_text = page_text.replace(IDENTITY_H_PATTERN, "");
                let page_text = page_text.trim();
                if !page_text.is_empty() {
                    pages.push(page_text.to_string());
                }
            }
        }

        let text = pages.join("\n\n");
        let meaningful = meaningful_chars(&text);
        if meaningful < MIN_MEANINGFUL_CHARS {
            return Err(ProcessError::OcrFailed(format!(
                "no usable text layer ({} meaningful characters)",
                meaningful
            )));
        }

        Ok(OcrOutput {
            parts: pages.len(),
            text,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Alphanumeric characters, counting CJK ideographs.
fn meaningful_chars(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_meaningful_chars() {
        assert_eq!(meaningful_chars(""), 0);
        assert_eq!(meaningful_chars("  \n\t --- ?? "), 0);
        assert_eq!(meaningful_chars("张三 Rust 5年"), 8);
    }

    #[test]
    fn test_corrupted_pdf_error() {
        let temp_file = NamedTempFile::with_suffix(".pdf").unwrap();
        std::fs::write(temp_file.path(), b"not a valid pdf content").unwrap();

        match PdfTextEngine::new().extract(temp_file.path()) {
            Err(ProcessError::PdfProcessing(msg)) => assert!(msg.contains("Failed to load PDF")),
            _ => panic!("Expected PdfProcessing error"),
        }
    }

    #[test]
    fn test_pdf_file_not_found_error() {
        match PdfTextEngine::new().extract(Path::new("/nonexistent/file.pdf")) {
            Err(ProcessError::ReadDocument { path, .. }) => {
                assert_eq!(path.to_str().unwrap(), "/nonexistent/file.pdf");
            }
            _ => panic!("Expected ReadDocument error"),
        }
    }

    #[test]
    fn test_pdf_without_text_layer_fails() {
        use lopdf::{dictionary, Document, Object};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut pdf_bytes = Vec::new();
        doc.save_to(&mut pdf_bytes).unwrap();
        let temp_file = NamedTempFile::with_suffix(".pdf").unwrap();
        std::fs::write(temp_file.path(), &pdf_bytes).unwrap();

        assert!(matches!(
            PdfTextEngine::new().extract(temp_file.path()),
            Err(ProcessError::OcrFailed(_))
        ));
    }

    #[test]
    fn test_always_available() {
        let engine = PdfTextEngine::new();
        assert!(engine.is_available());
        assert_eq!(engine.name(), "pdf-text");
    }
}
