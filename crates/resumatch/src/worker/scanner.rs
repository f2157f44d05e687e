use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use notify::{Config as NotifyConfig, PollWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer_opt, Config as DebouncerConfig, DebouncedEventKind};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::WorkerError;
use crate::sanitize;

const DEFAULT_SETTLE_POLL: Duration = Duration::from_secs(1);

/// Finds uploads in `pending/`: once at startup and then by polling.
pub struct DirectoryScanner {
    pending: PathBuf,
    supported_extensions: Vec<String>,
    max_file_size: u64,
    watch_interval: Duration,
    settle_timeout: Duration,
    settle_poll: Duration,
}

impl DirectoryScanner {
    pub fn new<P: AsRef<Path>>(pending: P, config: &Config) -> Self {
        Self {
            pending: pending.as_ref().to_path_buf(),
            supported_extensions: config.supported_extensions.clone(),
            max_file_size: config.max_file_size_bytes,
            watch_interval: Duration::from_secs(config.watch_interval_secs.max(1)),
            settle_timeout: config.settle_timeout(),
            settle_poll: DEFAULT_SETTLE_POLL,
        }
    }

    /// Interval between size checks while a file settles.
    pub fn with_settle_poll(mut self, poll: Duration) -> Self {
        self.settle_poll = poll;
        self
    }

    pub fn pending_directory(&self) -> &Path {
        &self.pending
    }

    /// Every acceptable file directly inside `pending/`, sorted by name.
    pub fn scan(&self) -> Result<Vec<PathBuf>, WorkerError> {
        let mut found = Vec::new();

        for entry in WalkDir::new(&self.pending)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(WorkerError::ScanFailed {
                        path: self.pending.clone(),
                        source: e,
                    })
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if self.is_acceptable(entry.path()) {
                debug!("Found upload: {}", sanitize::redact_path(entry.path()));
                found.push(entry.into_path());
            }
        }

        info!(
            "Scanned {} uploads in {}",
            found.len(),
            self.pending.display()
        );
        Ok(found)
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.supported_extensions
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(ext))
            })
    }

    /// A regular file with a supported extension and no larger than the
    /// configured maximum.
    pub fn is_acceptable(&self, path: &Path) -> bool {
        let Ok(metadata) = std::fs::metadata(path) else {
            return false;
        };
        if !metadata.is_file() || !self.is_supported(path) {
            return false;
        }
        if metadata.len() > self.max_file_size {
            warn!(
                "Ignoring {}: {} bytes exceeds the {} byte limit",
                sanitize::redact_path(path),
                metadata.len(),
                self.max_file_size
            );
            return false;
        }
        true
    }

    /// Waits until two consecutive size checks agree, or gives up after the
    /// settle timeout. A zero timeout accepts the file as it is.
    pub fn wait_until_settled(&self, path: &Path) -> bool {
        let size_of = |p: &Path| std::fs::metadata(p).ok().map(|m| m.len());

        let Some(mut last) = size_of(path) else {
            return false;
        };
        if self.settle_timeout.is_zero() {
            return true;
        }

        let deadline = Instant::now() + self.settle_timeout;
        while Instant::now() < deadline {
            thread::sleep(self.settle_poll);
            match size_of(path) {
                Some(size) if size == last && size > 0 => return true,
                Some(size) => last = size,
                None => return false,
            }
        }

        warn!(
            "{} did not settle within {:?}",
            sanitize::redact_path(path),
            self.settle_timeout
        );
        false
    }

    /// Polls `pending/` until `shutdown` is set, calling `callback` for each
    /// new, settled, acceptable file.
    pub fn watch<F>(&self, callback: F, shutdown: Arc<AtomicBool>) -> Result<(), WorkerError>
    where
        F: Fn(PathBuf),
    {
        // PollWatcher works on network and container mounts
        let poll_config = NotifyConfig::default().with_poll_interval(self.watch_interval);

        let debouncer_config = DebouncerConfig::default()
            .with_timeout(Duration::from_millis(500))
            .with_notify_config(poll_config);

        let (tx, rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer_opt::<_, PollWatcher>(debouncer_config, tx)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&self.pending, RecursiveMode::NonRecursive)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        info!("Watching directory: {}", self.pending.display());

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("Watcher shutting down...");
                break;
            }

            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(events)) => {
                    for event in events {
                        if !matches!(event.kind, DebouncedEventKind::Any) {
                            continue;
                        }
                        let path = event.path;
                        if path.parent() != Some(self.pending.as_path()) {
                            continue;
                        }
                        if !self.is_acceptable(&path) || !self.wait_until_settled(&path) {
                            continue;
                        }
                        info!("New upload detected: {}", sanitize::redact_path(&path));
                        callback(path);
                    }
                }
                Ok(Err(e)) => {
                    warn!("Watch error: {:?}", e);
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    continue;
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watch channel disconnected");
                    break;
                }
            }
        }

        Ok(())
    }
}
