use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::DocumentPipeline;
use crate::stats::PipelineStats;
use crate::worker::job::{Job, JobResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Fixed set of worker threads, each running one pipeline at a time.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn start(
        pipeline: Arc<DocumentPipeline>,
        jobs: Receiver<Job>,
        worker_count: usize,
        stats: Arc<PipelineStats>,
    ) -> Result<Self, WorkerError> {
        Self::spawn(pipeline, jobs, worker_count, stats, None)
    }

    /// Like [`WorkerPool::start`], also forwarding every result to `results`.
    pub fn start_with_results(
        pipeline: Arc<DocumentPipeline>,
        jobs: Receiver<Job>,
        worker_count: usize,
        stats: Arc<PipelineStats>,
        results: Sender<JobResult>,
    ) -> Result<Self, WorkerError> {
        Self::spawn(pipeline, jobs, worker_count, stats, Some(results))
    }

    fn spawn(
        pipeline: Arc<DocumentPipeline>,
        jobs: Receiver<Job>,
        worker_count: usize,
        stats: Arc<PipelineStats>,
        results: Option<Sender<JobResult>>,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be > 0".to_string(),
            ));
        }

        let running = Arc::new(AtomicBool::new(true));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let worker = Worker {
                id: worker_id,
                pipeline: Arc::clone(&pipeline),
                jobs: jobs.clone(),
                running: Arc::clone(&running),
                in_flight: Arc::clone(&in_flight),
                stats: Arc::clone(&stats),
                results: results.clone(),
            };

            let spawned = thread::Builder::new()
                .name(format!("worker-{}", worker_id))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    running.store(false, Ordering::SeqCst);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(WorkerError::SpawnFailed(e.to_string()));
                }
            }
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            workers,
            running,
            in_flight,
        })
    }

    /// Workers stop taking new jobs. Jobs already running finish.
    pub fn stop(&self) {
        info!("Stopping worker pool...");
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Pipelines currently executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Waits for every worker to exit. Call [`WorkerPool::stop`] first, or
    /// drop every job sender.
    pub fn wait(self) {
        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

struct Worker {
    id: usize,
    pipeline: Arc<DocumentPipeline>,
    jobs: Receiver<Job>,
    running: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    stats: Arc<PipelineStats>,
    results: Option<Sender<JobResult>>,
}

impl Worker {
    fn run(self) {
        debug!("Worker {} started", self.id);

        while self.running.load(Ordering::SeqCst) {
            match self.jobs.recv_timeout(POLL_INTERVAL) {
                Ok(job) => {
                    debug!("Worker {} processing job {}", self.id, job.id);
                    self.in_flight.fetch_add(1, Ordering::SeqCst);
                    let result = self.pipeline.run(job);
                    self.in_flight.fetch_sub(1, Ordering::SeqCst);

                    self.stats.record(&result);
                    if let Some(ref results) = self.results {
                        if results.send(result).is_err() {
                            debug!("Worker {} result receiver dropped", self.id);
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("Worker {} job channel disconnected", self.id);
                    break;
                }
            }
        }

        debug!("Worker {} stopped", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, PersistenceGateway, RetryPolicy};
    use crate::extraction::{Inference, TagExtractionService};
    use crate::processor::OcrEngine;
    use crate::semantic::SemanticMatcher;
    use crate::storage::UploadDirs;
    use crate::tags::TagNormalizer;
    use crate::test_support::{
        candidate_tags_payload, resume_payload, ScriptedInference, ScriptedOcr, TableEmbedder,
        RESUME_TEXT,
    };
    use crate::vocabulary::TagVocabulary;
    use crate::worker::FileQueue;
    use crossbeam_channel::unbounded;
    use tempfile::TempDir;

    fn pipeline(temp: &TempDir) -> (Arc<DocumentPipeline>, UploadDirs) {
        let uploads = UploadDirs::new(temp.path(), vec!["pdf".to_string()]);
        uploads.ensure().unwrap();
        let gateway =
            PersistenceGateway::new(Database::open_in_memory().unwrap(), RetryPolicy::immediate(1));
        let matcher = Arc::new(SemanticMatcher::new(Arc::new(TableEmbedder::new())));
        let normalizer = Arc::new(TagNormalizer::new(matcher, Arc::new(TagVocabulary::builtin())));
        let inference: Arc<dyn Inference> = Arc::new(
            ScriptedInference::new()
                .with_profile(resume_payload("王五"))
                .with_candidate_tags(candidate_tags_payload("技术类", "web3", &["defi"])),
        );
        let tags = TagExtractionService::new(gateway.clone(), Arc::clone(&inference), normalizer);
        let ocr: Arc<dyn OcrEngine> = Arc::new(ScriptedOcr::returning(RESUME_TEXT));
        let pipeline = DocumentPipeline::new(gateway, ocr, inference, tags, uploads.clone());
        (Arc::new(pipeline), uploads)
    }

    #[test]
    fn test_zero_workers_rejected() {
        let temp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&temp);
        let queue = FileQueue::new();
        let result = WorkerPool::start(pipeline, queue.receiver(), 0, Arc::new(PipelineStats::new()));
        assert!(matches!(result, Err(WorkerError::SpawnFailed(_))));
    }

    #[test]
    fn test_processes_queued_files() {
        let temp = TempDir::new().unwrap();
        let (pipeline, uploads) = pipeline(&temp);
        let queue = FileQueue::new();
        let stats = Arc::new(PipelineStats::new());
        let (tx, rx) = unbounded();

        let pool =
            WorkerPool::start_with_results(pipeline, queue.receiver(), 2, Arc::clone(&stats), tx)
                .unwrap();

        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            let path = uploads.pending().join(name);
            std::fs::write(&path, b"%PDF").unwrap();
            queue.push(path).unwrap();
        }

        let mut results = Vec::new();
        for _ in 0..3 {
            results.push(rx.recv_timeout(Duration::from_secs(10)).unwrap());
        }
        assert!(results.iter().all(|r| r.success));

        pool.stop();
        assert!(!pool.is_running());
        pool.wait();

        assert_eq!(stats.snapshot().successful, 3);
        assert_eq!(uploads.directory_stats().completed, 3);
    }

    #[test]
    fn test_stop_leaves_unstarted_jobs_queued() {
        let temp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&temp);
        let queue = FileQueue::new();

        let pool =
            WorkerPool::start(pipeline, queue.receiver(), 1, Arc::new(PipelineStats::new())).unwrap();
        pool.stop();
        pool.wait();

        queue.push(std::path::PathBuf::from("/never/processed.pdf")).unwrap();
        assert_eq!(queue.len(), 1);
    }
}
