//! Pipeline counters and the periodic stats reporter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Local;
use crossbeam_channel::{bounded, select, tick, Sender};
use log::{debug, error, info, warn};

use crate::db::stats_repo::CounterDelta;
use crate::db::PersistenceGateway;
use crate::error::WorkerError;
use crate::pipeline::FailureKind;
use crate::storage::UploadDirs;
use crate::worker::job::JobResult;
use crate::worker::FileQueue;

/// Process-lifetime counters, updated by the workers.
#[derive(Debug, Default)]
pub struct PipelineStats {
    total_processed: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    ocr_failed: AtomicU64,
    llm_failed: AtomicU64,
    db_failed: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one finished job. Intake failures only count as failed.
    pub fn record(&self, result: &JobResult) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        if result.success {
            self.successful.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.failed.fetch_add(1, Ordering::Relaxed);
        match result.failure {
            Some(FailureKind::Ocr) => {
                self.ocr_failed.fetch_add(1, Ordering::Relaxed);
            }
            Some(FailureKind::Extraction) => {
                self.llm_failed.fetch_add(1, Ordering::Relaxed);
            }
            Some(FailureKind::Persistence) => {
                self.db_failed.fetch_add(1, Ordering::Relaxed);
            }
            Some(FailureKind::Intake) | None => {}
        }
    }

    pub fn snapshot(&self) -> CounterDelta {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed) as i64;
        CounterDelta {
            total_processed: load(&self.total_processed),
            successful: load(&self.successful),
            failed: load(&self.failed),
            ocr_failed: load(&self.ocr_failed),
            llm_failed: load(&self.llm_failed),
            db_failed: load(&self.db_failed),
        }
    }
}

fn difference(current: &CounterDelta, previous: &CounterDelta) -> CounterDelta {
    CounterDelta {
        total_processed: current.total_processed - previous.total_processed,
        successful: current.successful - previous.successful,
        failed: current.failed - previous.failed,
        ocr_failed: current.ocr_failed - previous.ocr_failed,
        llm_failed: current.llm_failed - previous.llm_failed,
        db_failed: current.db_failed - previous.db_failed,
    }
}

/// One reporting step: log the counters and persist what changed since the
/// last successful write.
struct Reporting {
    stats: Arc<PipelineStats>,
    uploads: UploadDirs,
    queue: FileQueue,
    gateway: PersistenceGateway,
    persisted: CounterDelta,
}

impl Reporting {
    fn report(&mut self) {
        let current = self.stats.snapshot();
        let dirs = self.uploads.directory_stats();
        info!(
            "Stats: processed={} successful={} failed={} (ocr={} llm={} db={}) | \
             pending={} processing={} completed={} failed={} | queued={}",
            current.total_processed,
            current.successful,
            current.failed,
            current.ocr_failed,
            current.llm_failed,
            current.db_failed,
            dirs.pending,
            dirs.processing,
            dirs.completed,
            dirs.failed,
            self.queue.len()
        );

        let delta = difference(&current, &self.persisted);
        if delta.is_empty() {
            return;
        }
        let date = Local::now().format("%Y-%m-%d").to_string();
        match self.gateway.record_stats(&date, &delta) {
            Ok(()) => self.persisted = current,
            Err(e) => warn!("Could not persist processing stats: {}", e),
        }
    }
}

/// Background thread that reports every `interval` and once more on stop.
pub struct StatsReporter {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl StatsReporter {
    pub fn start(
        stats: Arc<PipelineStats>,
        uploads: UploadDirs,
        queue: FileQueue,
        gateway: PersistenceGateway,
        interval: Duration,
    ) -> Result<Self, WorkerError> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let mut reporting = Reporting {
            stats,
            uploads,
            queue,
            gateway,
            persisted: CounterDelta::default(),
        };

        let handle = thread::Builder::new()
            .name("stats-reporter".to_string())
            .spawn(move || {
                let ticker = tick(interval.max(Duration::from_secs(1)));
                loop {
                    select! {
                        recv(ticker) -> _ => reporting.report(),
                        recv(stop_rx) -> _ => {
                            reporting.report();
                            break;
                        }
                    }
                }
                debug!("Stats reporter stopped");
            })
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        Ok(Self { stop_tx, handle })
    }

    /// Writes the final stats line and joins the thread.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            error!("Stats reporter panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, RetryPolicy};
    use crate::worker::job::Job;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn result(kind: Option<FailureKind>) -> JobResult {
        let job = Job::new(PathBuf::from("/u/pending/cv.pdf"));
        match kind {
            None => JobResult::success(&job, "f".to_string(), "r".to_string(), None),
            Some(kind) => JobResult::failure(&job, None, kind, "boom".to_string(), None),
        }
    }

    #[test]
    fn test_record_counts_by_kind() {
        let stats = PipelineStats::new();
        stats.record(&result(None));
        stats.record(&result(Some(FailureKind::Ocr)));
        stats.record(&result(Some(FailureKind::Extraction)));
        stats.record(&result(Some(FailureKind::Persistence)));
        stats.record(&result(Some(FailureKind::Intake)));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_processed, 5);
        assert_eq!(snapshot.successful, 1);
        assert_eq!(snapshot.failed, 4);
        assert_eq!(snapshot.ocr_failed, 1);
        assert_eq!(snapshot.llm_failed, 1);
        assert_eq!(snapshot.db_failed, 1);
    }

    #[test]
    fn test_report_persists_only_new_counts() {
        let temp = TempDir::new().unwrap();
        let uploads = UploadDirs::new(temp.path(), vec!["pdf".to_string()]);
        uploads.ensure().unwrap();
        let gateway =
            PersistenceGateway::new(Database::open_in_memory().unwrap(), RetryPolicy::immediate(1));
        let stats = Arc::new(PipelineStats::new());

        let mut reporting = Reporting {
            stats: Arc::clone(&stats),
            uploads,
            queue: FileQueue::new(),
            gateway: gateway.clone(),
            persisted: CounterDelta::default(),
        };

        stats.record(&result(None));
        stats.record(&result(Some(FailureKind::Ocr)));
        reporting.report();
        reporting.report();
        stats.record(&result(None));
        reporting.report();

        let rows = gateway.recent_stats(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].counters.total_processed, 3);
        assert_eq!(rows[0].counters.successful, 2);
        assert_eq!(rows[0].counters.ocr_failed, 1);
    }

    #[test]
    fn test_reporter_writes_on_stop() {
        let temp = TempDir::new().unwrap();
        let uploads = UploadDirs::new(temp.path(), vec!["pdf".to_string()]);
        let gateway =
            PersistenceGateway::new(Database::open_in_memory().unwrap(), RetryPolicy::immediate(1));
        let stats = Arc::new(PipelineStats::new());
        stats.record(&result(None));

        let reporter = StatsReporter::start(
            Arc::clone(&stats),
            uploads,
            FileQueue::new(),
            gateway.clone(),
            Duration::from_secs(3600),
        )
        .unwrap();
        reporter.stop();

        let rows = gateway.recent_stats(10).unwrap();
        assert_eq!(rows[0].counters.successful, 1);
    }
}
