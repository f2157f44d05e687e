//! The four upload directories a resume moves through.

use std::path::{Path, PathBuf};

use chrono::Local;
use log::warn;
use serde::Serialize;

use crate::error::StorageError;

const REASON_MAX_CHARS: usize = 20;

/// Move a file from `src` to `dst`. Uses `rename` first (fast, atomic on same
/// filesystem). Falls back to copy + delete when rename fails, which handles
/// cross-device moves.
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Supported-file counts per directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// `pending/`, `processing/`, `completed/` and `failed/` under one root.
#[derive(Debug, Clone)]
pub struct UploadDirs {
    root: PathBuf,
    supported_extensions: Vec<String>,
}

impl UploadDirs {
    pub fn new<P: AsRef<Path>>(root: P, supported_extensions: Vec<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            supported_extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pending(&self) -> PathBuf {
        self.root.join("pending")
    }

    pub fn processing(&self) -> PathBuf {
        self.root.join("processing")
    }

    pub fn completed(&self) -> PathBuf {
        self.root.join("completed")
    }

    pub fn failed(&self) -> PathBuf {
        self.root.join("failed")
    }

    /// Creates all four directories.
    pub fn ensure(&self) -> Result<(), StorageError> {
        for dir in [self.pending(), self.processing(), self.completed(), self.failed()] {
            std::fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDirectory {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.supported_extensions
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(ext))
            })
    }

    pub fn move_to_processing(&self, path: &Path) -> Result<PathBuf, StorageError> {
        self.move_into(path, &self.processing(), file_name(path))
    }

    pub fn move_to_completed(&self, path: &Path) -> Result<PathBuf, StorageError> {
        self.move_into(path, &self.completed(), file_name(path))
    }

    /// Moves a file to `failed/` as `{stem}_{timestamp}_{reason}{ext}` and
    /// writes a `<name>.error.log` sidecar next to it.
    pub fn move_to_failed(&self, path: &Path, reason: &str) -> Result<PathBuf, StorageError> {
        let original = file_name(path);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let failed_name = format!(
            "{}_{}_{}{}",
            stem,
            Local::now().format("%Y%m%d_%H%M%S"),
            sanitize_reason(reason),
            ext
        );
        let target = self.move_into(path, &self.failed(), failed_name)?;

        let sidecar = error_log_path(&target);
        let body = format!(
            "processing_time: {}\noriginal_file: {}\nerror: {}\n",
            Local::now().to_rfc3339(),
            original,
            reason
        );
        if let Err(e) = std::fs::write(&sidecar, body) {
            warn!("Failed to write error log {}: {}", sidecar.display(), e);
        }

        Ok(target)
    }

    fn move_into(&self, path: &Path, dir: &Path, name: String) -> Result<PathBuf, StorageError> {
        std::fs::create_dir_all(dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let target = unique_destination(dir, &name)?;
        move_file(path, &target)?;
        Ok(target)
    }

    /// Counts supported files directly inside each directory. A missing
    /// directory counts zero.
    pub fn directory_stats(&self) -> DirectoryStats {
        DirectoryStats {
            pending: self.count_supported(&self.pending()),
            processing: self.count_supported(&self.processing()),
            completed: self.count_supported(&self.completed()),
            failed: self.count_supported(&self.failed()),
        }
    }

    fn count_supported(&self, dir: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .filter(|e| self.is_supported(&e.path()))
            .count()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document")
        .to_string()
}

/// `<file name>.error.log` next to the given file.
pub fn error_log_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".error.log");
    path.with_file_name(name)
}

/// `dir/name`, or `dir/{stem}_{timestamp}{ext}` when that is taken. A
/// numeric suffix is added if the timestamped name is taken as well.
fn unique_destination(dir: &Path, name: &str) -> Result<PathBuf, StorageError> {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

    for counter in 1..=1000 {
        let try_name = if counter == 1 {
            format!("{}_{}{}", stem, stamp, ext)
        } else {
            format!("{}_{}_{}{}", stem, stamp, counter, ext)
        };
        let try_path = dir.join(try_name);
        if !try_path.exists() {
            return Ok(try_path);
        }
    }

    Err(StorageError::FileExists(candidate))
}

/// At most 20 characters; anything but letters, digits and `-` becomes `_`.
fn sanitize_reason(reason: &str) -> String {
    let cleaned: String = reason
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .take(REASON_MAX_CHARS)
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "error".to_string()
    } else {
        trimmed.to_string()
    }
}
