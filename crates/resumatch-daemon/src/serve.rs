use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use resumatch::worker::crossbeam_channel::{bounded, unbounded, Receiver};
use resumatch::{
    DirectoryScanner, FileQueue, JobResult, PipelineStats, Services, StatsReporter, WorkerPool,
    WorkerError,
};

use crate::error::DaemonError;

/// Runs until SIGINT or SIGTERM, then stops the scheduler, the workers,
/// the watcher, drains in-flight pipelines and writes a final stats line.
pub fn run(services: Services, rematch_all: bool) -> Result<(), DaemonError> {
    let environment = services.check_environment();
    if !environment.database_reachable {
        return Err(DaemonError::Environment(environment.problems.join("; ")));
    }
    if !environment.ocr_available {
        warn!("Starting without a working OCR engine; uploads will fail until it is installed");
    }

    let queue = FileQueue::new();
    let stats = Arc::new(PipelineStats::new());
    let (result_tx, result_rx) = unbounded();

    let pool = WorkerPool::start_with_results(
        Arc::clone(&services.pipeline),
        queue.receiver(),
        services.config.worker_count,
        Arc::clone(&stats),
        result_tx,
    )?;
    let results = spawn_result_logger(result_rx)?;

    // Files left in processing/ by an interrupted run go first.
    let leftovers = DirectoryScanner::new(services.uploads.processing(), &services.config);
    let scanner = services.scanner();
    for path in scan_or_warn(&leftovers)
        .into_iter()
        .chain(scan_or_warn(&scanner))
    {
        queue.push(path)?;
    }

    let watcher_shutdown = Arc::new(AtomicBool::new(false));
    let watcher = spawn_watcher(scanner, queue.clone(), Arc::clone(&watcher_shutdown))?;

    let scheduler = services.scheduler(rematch_all);
    let (trigger_tx, trigger_rx) = bounded::<()>(1);
    let scheduler_handle = scheduler.start(trigger_rx)?;

    let reporter = StatsReporter::start(
        Arc::clone(&stats),
        services.uploads.clone(),
        queue.clone(),
        services.gateway.clone(),
        Duration::from_secs(services.config.stats_interval_secs),
    )?;

    let (signal_tx, signal_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = signal_tx.try_send(());
    })?;

    info!(
        "resumatchd running: {} workers, watching {}",
        services.config.worker_count,
        services.uploads.pending().display()
    );
    let _ = signal_rx.recv();
    info!("Shutdown requested");

    scheduler.stop();
    drop(trigger_tx);
    if scheduler_handle.join().is_err() {
        error!("Match scheduler panicked");
    }

    pool.stop();

    watcher_shutdown.store(true, Ordering::Relaxed);
    if watcher.join().is_err() {
        error!("Watcher thread panicked");
    }

    info!("Waiting for {} in-flight pipelines", pool.in_flight());
    pool.wait();
    if results.join().is_err() {
        error!("Result logger panicked");
    }

    if !queue.is_empty() {
        info!(
            "{} queued uploads stay in pending/ for the next start",
            queue.len()
        );
    }
    reporter.stop();
    info!("resumatchd stopped");
    Ok(())
}

fn scan_or_warn(scanner: &DirectoryScanner) -> Vec<PathBuf> {
    match scanner.scan() {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Initial scan failed: {}", e);
            Vec::new()
        }
    }
}

fn spawn_watcher(
    scanner: DirectoryScanner,
    queue: FileQueue,
    shutdown: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, WorkerError> {
    thread::Builder::new()
        .name("upload-watcher".to_string())
        .spawn(move || {
            let enqueue = |path: PathBuf| {
                if let Err(e) = queue.push(path) {
                    error!("Failed to enqueue upload: {}", e);
                }
            };
            if let Err(e) = scanner.watch(enqueue, shutdown) {
                error!("Upload watcher stopped: {}", e);
            }
        })
        .map_err(|e| WorkerError::SpawnFailed(e.to_string()))
}

/// Logs each finished job. Ends once every worker has exited.
fn spawn_result_logger(results: Receiver<JobResult>) -> Result<JoinHandle<()>, WorkerError> {
    thread::Builder::new()
        .name("result-logger".to_string())
        .spawn(move || {
            for result in results {
                if result.success {
                    info!(
                        "Job {} completed: resume {}",
                        result.job_id,
                        result.resume_id.as_deref().unwrap_or("-")
                    );
                } else {
                    warn!(
                        "Job {} failed ({}): {}",
                        result.job_id,
                        result
                            .failure
                            .map(|kind| kind.as_str())
                            .unwrap_or("unknown"),
                        result.error.as_deref().unwrap_or("")
                    );
                }
            }
            debug!("Result logger finished");
        })
        .map_err(|e| WorkerError::SpawnFailed(e.to_string()))
}
