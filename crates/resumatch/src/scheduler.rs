//! Periodic position tagging and matching.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use log::{error, info};
use serde::Serialize;

use crate::db::DatabaseError;
use crate::error::WorkerError;
use crate::extraction::TagExtractionService;
use crate::matching::MatchingEngine;
use crate::report::BatchReport;

/// Outcome of one scheduler cycle.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub tagging: BatchReport,
    pub matching: BatchReport,
}

/// Runs the position tag scan and then the matching pass every
/// `interval`, or when triggered.
pub struct MatchScheduler {
    extraction: TagExtractionService,
    engine: Arc<MatchingEngine>,
    interval: Duration,
    rematch_all: bool,
    shutdown: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl MatchScheduler {
    pub fn new(
        extraction: TagExtractionService,
        engine: Arc<MatchingEngine>,
        interval: Duration,
    ) -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            extraction,
            engine,
            interval: interval.max(Duration::from_secs(1)),
            rematch_all: false,
            shutdown: Arc::new(AtomicBool::new(false)),
            wake_tx,
            wake_rx,
        }
    }

    /// Score every tagged position on each cycle, not only `uploaded` ones.
    pub fn with_rematch_all(mut self, rematch_all: bool) -> Self {
        self.rematch_all = rematch_all;
        self
    }

    /// One cycle on the calling thread. A failed tag scan is logged and the
    /// matching pass still runs.
    pub fn run_once(&self) -> Result<CycleReport, DatabaseError> {
        run_cycle(&self.extraction, &self.engine, self.rematch_all)
    }

    /// Starts the loop on its own thread. Each message on `trigger_rx`
    /// runs a cycle right away.
    pub fn start(&self, trigger_rx: Receiver<()>) -> Result<JoinHandle<()>, WorkerError> {
        let extraction = self.extraction.clone();
        let engine = Arc::clone(&self.engine);
        let shutdown = Arc::clone(&self.shutdown);
        let wake_rx = self.wake_rx.clone();
        let interval = self.interval;
        let rematch_all = self.rematch_all;

        thread::Builder::new()
            .name("match-scheduler".to_string())
            .spawn(move || {
                // first tick fires after one full interval
                let ticker = tick(interval);
                info!("Match scheduler started (every {:?})", interval);

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    select! {
                        recv(ticker) -> _ => {},
                        recv(trigger_rx) -> msg => {
                            if msg.is_err() {
                                break;
                            }
                            info!("Manual matching run triggered");
                        },
                        recv(wake_rx) -> _ => {},
                    }

                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    if let Err(e) = run_cycle(&extraction, &engine, rematch_all) {
                        error!("Matching cycle failed: {}", e);
                    }
                }

                info!("Match scheduler stopped");
            })
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))
    }

    /// Signals the loop to stop. A cycle already running completes first.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.wake_tx.try_send(());
    }
}

fn run_cycle(
    extraction: &TagExtractionService,
    engine: &MatchingEngine,
    rematch_all: bool,
) -> Result<CycleReport, DatabaseError> {
    let tagging = match extraction.scan_positions() {
        Ok(report) => report,
        Err(e) => {
            error!("Position tag scan failed: {}", e);
            BatchReport::new()
        }
    };
    let matching = engine.run_pass(rematch_all)?;
    Ok(CycleReport { tagging, matching })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::position_repo::{self, fixtures::position, STATUS_MATCHED};
    use crate::db::{Database, PersistenceGateway, RetryPolicy};
    use crate::matching::DEFAULT_MAX_RESULTS;
    use crate::semantic::SemanticMatcher;
    use crate::tags::TagNormalizer;
    use crate::test_support::{ScriptedInference, TableEmbedder};
    use crate::vocabulary::TagVocabulary;
    use std::time::Instant;

    fn scheduler(interval: Duration) -> (MatchScheduler, PersistenceGateway) {
        let gateway =
            PersistenceGateway::new(Database::open_in_memory().unwrap(), RetryPolicy::immediate(1));
        let matcher = Arc::new(SemanticMatcher::new(Arc::new(TableEmbedder::new())));
        let normalizer = Arc::new(TagNormalizer::new(matcher, Arc::new(TagVocabulary::builtin())));
        let inference = ScriptedInference::new().with_position_tags(serde_json::json!({
            "category": "技术类",
            "market": "web3",
            "market_field": { "required": ["defi"] },
            "title": "Solidity 工程师"
        }));
        let extraction = TagExtractionService::new(gateway.clone(), Arc::new(inference), normalizer);
        let engine = Arc::new(MatchingEngine::new(gateway.clone(), DEFAULT_MAX_RESULTS));

        position_repo::insert(gateway.database(), &position("p1", "Solidity 工程师")).unwrap();
        (MatchScheduler::new(extraction, engine, interval), gateway)
    }

    #[test]
    fn test_run_once_tags_then_matches() {
        let (scheduler, gateway) = scheduler(Duration::from_secs(60));

        let report = scheduler.run_once().unwrap();

        assert_eq!(report.tagging.success_count(), 1);
        assert_eq!(report.matching.success_count(), 1);
        let row = position_repo::find_tags(gateway.database(), "p1")
            .unwrap()
            .unwrap();
        assert_eq!(row.status, STATUS_MATCHED);
    }

    #[test]
    fn test_trigger_and_stop() {
        let (scheduler, gateway) = scheduler(Duration::from_secs(3600));
        let (trigger_tx, trigger_rx) = bounded(1);
        let handle = scheduler.start(trigger_rx).unwrap();

        trigger_tx.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut matched = false;
        while Instant::now() < deadline {
            let row = position_repo::find_tags(gateway.database(), "p1").unwrap();
            if row.is_some_and(|r| r.status == STATUS_MATCHED) {
                matched = true;
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        assert!(matched);

        scheduler.stop();
        handle.join().unwrap();
    }
}
