//! One-shot maintenance subcommands. Each prints a JSON document on stdout.

use std::path::Path;

use log::info;
use resumatch::extraction::PositionInput;
use resumatch::pipeline::Stage;
use resumatch::{BatchReport, Services};
use serde_json::{json, Value};

use crate::error::DaemonError;

pub fn run_match(services: &Services, rematch_all: bool) -> Result<Value, DaemonError> {
    let cycle = services.scheduler(rematch_all).run_once()?;
    Ok(serde_json::to_value(cycle)?)
}

pub fn scan_tags(services: &Services) -> Result<Value, DaemonError> {
    let positions = services.tags.scan_positions()?;
    let resumes = services.tags.scan_resumes()?;
    Ok(json!({
        "positions": summary(&positions),
        "resumes": summary(&resumes),
    }))
}

pub fn import_positions(services: &Services, file: &Path) -> Result<Value, DaemonError> {
    let inputs = read_positions(file)?;
    info!("Importing {} positions from {}", inputs.len(), file.display());
    let report = services.tags.import_positions(inputs);
    Ok(summary(&report))
}

pub fn reload_vocab(services: &Services) -> Result<Value, DaemonError> {
    let version = services.vocabulary.reload()?;
    Ok(json!({ "version": version }))
}

pub fn check(services: &Services) -> Result<Value, DaemonError> {
    Ok(serde_json::to_value(services.check_environment())?)
}

pub fn stats(services: &Services, days: u32) -> Result<Value, DaemonError> {
    let gateway = &services.gateway;
    let counts = |stage| -> Result<Value, DaemonError> {
        let pairs = gateway.file_status_counts(stage)?;
        Ok(pairs
            .into_iter()
            .map(|(status, count)| (status, Value::from(count)))
            .collect::<serde_json::Map<_, _>>()
            .into())
    };

    Ok(json!({
        "directories": services.uploads.directory_stats(),
        "ocr": counts(Stage::Ocr)?,
        "extraction": counts(Stage::Extraction)?,
        "profiles": gateway.profile_count()?,
        "daily": gateway.recent_stats(days)?,
    }))
}

/// Reads a JSON array of positions.
pub fn read_positions(file: &Path) -> Result<Vec<PositionInput>, DaemonError> {
    let content = std::fs::read_to_string(file).map_err(|source| DaemonError::ReadInput {
        path: file.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DaemonError::ParseInput {
        path: file.to_path_buf(),
        source,
    })
}

fn summary(report: &BatchReport) -> Value {
    let failures: Vec<Value> = report
        .failures()
        .map(|(id, reason)| json!({ "id": id, "reason": reason }))
        .collect();
    json!({
        "succeeded": report.success_count(),
        "failed": report.failure_count(),
        "failures": failures,
    })
}
