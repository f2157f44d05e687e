use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::{document_stem, OcrEngine, OcrOutput};
use crate::error::ProcessError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs the `mineru` command line and collects the markdown it writes.
///
/// `<command> -p <pdf> -o <temp_root>` writes its output under
/// `<temp_root>/<stem>/`.
pub struct MineruEngine {
    command: String,
    temp_root: PathBuf,
    timeout: Duration,
    probe_timeout: Duration,
}

impl MineruEngine {
    pub fn new(command: &str, temp_root: PathBuf, timeout: Duration, probe_timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            temp_root,
            timeout,
            probe_timeout,
        }
    }

    pub fn output_dir(&self, pdf: &Path) -> PathBuf {
        self.temp_root.join(document_stem(pdf))
    }
}

impl OcrEngine for MineruEngine {
    fn name(&self) -> &'static str {
        "mineru"
    }

    fn extract(&self, pdf: &Path) -> Result<OcrOutput, ProcessError> {
        let _span = tracing::info_span!("processor.ocr", engine = "mineru").entered();

        if !pdf.is_file() {
            return Err(ProcessError::ReadDocument {
                path: pdf.to_path_buf(),
                source: std::io::Error::new(ErrorKind::NotFound, "document not found"),
            });
        }
        std::fs::create_dir_all(&self.temp_root).map_err(|e| {
            ProcessError::OcrFailed(format!(
                "cannot create scratch directory {}: {}",
                self.temp_root.display(),
                e
            ))
        })?;

        let mut child = Command::new(&self.command)
            .arg("-p")
            .arg(pdf)
            .arg("-o")
            .arg(&self.temp_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProcessError::Spawn {
                command: self.command.clone(),
                source: e,
            })?;

        // Drained on its own thread so a chatty child cannot block on a full pipe.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let status = wait_with_timeout(&mut child, self.timeout).map_err(|e| {
            ProcessError::OcrFailed(format!("waiting for {} failed: {}", self.command, e))
        })?;

        let Some(status) = status else {
            return Err(ProcessError::Timeout {
                seconds: self.timeout.as_secs(),
            });
        };

        if !status.success() {
            let stderr = stderr_reader
                .and_then(|h| h.join().ok())
                .unwrap_or_default();
            return Err(ProcessError::CommandFailed {
                status: status.to_string(),
                stderr: tail(&stderr, 500),
            });
        }

        collect_markdown(&self.output_dir(pdf))
    }

    fn is_available(&self) -> bool {
        let child = Command::new(&self.command)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                debug!("{} is not runnable: {}", self.command, e);
                return false;
            }
        };
        match wait_with_timeout(&mut child, self.probe_timeout) {
            Ok(Some(status)) => status.success(),
            Ok(None) => {
                warn!(
                    "{} --help did not finish within {:?}",
                    self.command, self.probe_timeout
                );
                false
            }
            Err(_) => false,
        }
    }

    fn cleanup(&self, pdf: &Path) {
        let dir = self.output_dir(pdf);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => debug!("Removed OCR scratch directory {}", dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove OCR scratch directory {}: {}", dir.display(), e),
        }
    }
}

/// Polls the child until it exits or `timeout` passes. On timeout the
/// child is killed and reaped and `None` is returned.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Joins every non-empty `*.md` under `dir` (recursively, sorted by path)
/// with a blank line.
fn collect_markdown(dir: &Path) -> Result<OcrOutput, ProcessError> {
    let pattern = format!(
        "{}/**/*.md",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern)
        .map_err(|e| ProcessError::OcrFailed(format!("invalid output pattern: {}", e)))?;

    let mut files: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
    files.sort();

    let mut parts: Vec<String> = Vec::new();
    for file in files {
        let content = std::fs::read_to_string(&file).map_err(|e| ProcessError::ReadDocument {
            path: file.clone(),
            source: e,
        })?;
        let content = content.trim();
        if !content.is_empty() {
            parts.push(content.to_string());
        }
    }

    if parts.is_empty() {
        return Err(ProcessError::MissingOutput(dir.to_path_buf()));
    }

    Ok(OcrOutput {
        parts: parts.len(),
        text: parts.join("\n\n"),
    })
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.trim().to_string();
    }
    text.chars().skip(count - max_chars).collect::<String>().trim().to_string()
}
