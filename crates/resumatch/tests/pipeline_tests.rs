//! End-to-end tests for the document pipeline: an upload in `pending/` goes
//! through OCR, extraction, tagging and persistence and ends up in
//! `completed/` or `failed/`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{candidate_tags, resume_profile, FakeInference, FakeOcr, TestHarness, RESUME_TEXT};
use resumatch::pipeline::{Stage, StageStatus};
use resumatch::storage::error_log_path;
use resumatch::worker::crossbeam_channel::unbounded;
use resumatch::{FailureKind, FileQueue, Job, PipelineStats, WorkerPool};

fn working_ocr() -> FakeOcr {
    FakeOcr::Text(RESUME_TEXT.to_string())
}

#[test]
fn test_upload_becomes_tagged_profile() {
    let harness = TestHarness::new();
    let services = harness.services(
        FakeInference::for_resume(resume_profile("李雷"), candidate_tags("web3", &["layer1"])),
        working_ocr(),
    );
    let upload = harness.upload("李雷.pdf");

    let result = services.pipeline.run(Job::new(upload));

    assert!(result.success, "{:?}", result.error);
    assert_eq!(harness.files_in("completed"), vec!["李雷.pdf"]);
    assert!(harness.files_in("pending").is_empty());
    assert!(harness.files_in("processing").is_empty());

    let file = services
        .gateway
        .find_file(result.file_id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(file.status(Stage::Ocr), StageStatus::Completed);
    assert_eq!(file.status(Stage::Extraction), StageStatus::Completed);
    assert!(file.storage_path.ends_with("李雷.pdf"));
    assert!(file.storage_path.contains("completed"));

    let profile = services
        .gateway
        .find_profile(result.resume_id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("李雷"));
    assert_eq!(profile.phone, None);
    assert_eq!(profile.headline.as_deref(), Some("区块链研发工程师"));

    let pool = services.gateway.candidate_pool().unwrap();
    assert_eq!(pool.len(), 1);
    assert_eq!(pool[0].tags.market, "web3");
    assert_eq!(pool[0].tags.market_field, vec!["layer1"]);
    assert_eq!(pool[0].tags.education, vec!["硕士"]);
}

#[test]
fn test_ocr_timeout_routes_to_failed() {
    let harness = TestHarness::new();
    let services = harness.services(FakeInference::unreachable(), FakeOcr::Timeout);
    let upload = harness.upload("cv.pdf");

    let result = services.pipeline.run(Job::new(upload));

    assert!(!result.success);
    assert_eq!(result.failure, Some(FailureKind::Ocr));

    let file = services
        .gateway
        .find_file(result.file_id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(file.status(Stage::Ocr), StageStatus::Failed);
    assert_eq!(file.status(Stage::Extraction), StageStatus::Pending);
    assert!(file.error(Stage::Ocr).unwrap().contains("timed out"));

    let failed_path = result.final_path.unwrap();
    assert!(failed_path.exists());
    assert!(failed_path.starts_with(harness.config.uploads_root.join("failed")));
    let log = std::fs::read_to_string(error_log_path(&failed_path)).unwrap();
    assert!(log.contains("original_file: cv.pdf"));
    assert!(log.contains("timed out"));
    assert_eq!(services.gateway.profile_count().unwrap(), 0);
}

#[test]
fn test_unreachable_inference_fails_extraction() {
    let harness = TestHarness::new();
    let services = harness.services(FakeInference::unreachable(), working_ocr());
    let upload = harness.upload("cv.pdf");

    let result = services.pipeline.run(Job::new(upload));

    assert_eq!(result.failure, Some(FailureKind::Extraction));
    let file = services
        .gateway
        .find_file(result.file_id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(file.status(Stage::Ocr), StageStatus::Completed);
    assert_eq!(file.status(Stage::Extraction), StageStatus::Failed);
    assert_eq!(harness.files_in("failed").len(), 2);
}

#[test]
fn test_worker_pool_drains_queue() {
    let harness = TestHarness::new();
    let services = harness.services(
        FakeInference::for_resume(resume_profile("韩梅梅"), candidate_tags("AI", &["rag"])),
        working_ocr(),
    );
    let queue = FileQueue::new();
    let stats = Arc::new(PipelineStats::new());
    let (tx, rx) = unbounded();

    let pool = WorkerPool::start_with_results(
        Arc::clone(&services.pipeline),
        queue.receiver(),
        2,
        Arc::clone(&stats),
        tx,
    )
    .unwrap();

    for name in ["a.pdf", "b.pdf", "c.pdf", "d.pdf"] {
        assert!(queue.push(harness.upload(name)).unwrap());
    }
    // A duplicate notification for the same path is ignored
    assert!(!queue
        .push(harness.config.uploads_root.join("pending").join("a.pdf"))
        .unwrap());

    for _ in 0..4 {
        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(result.success, "{:?}", result.error);
    }
    pool.stop();
    pool.wait();

    let counters = stats.snapshot();
    assert_eq!(counters.total_processed, 4);
    assert_eq!(counters.successful, 4);
    assert_eq!(services.uploads.directory_stats().completed, 4);
    assert_eq!(services.gateway.profile_count().unwrap(), 4);
}
