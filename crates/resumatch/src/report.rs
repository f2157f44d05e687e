//! Per-record outcomes of batch passes.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub id: String,
    pub result: Result<String, String>,
}

/// Outcome of one batch pass (matching, tag scan, position import).
/// A failing record never aborts the pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeeded(&mut self, id: impl Into<String>, detail: impl Into<String>) {
        self.outcomes.push(RecordOutcome {
            id: id.into(),
            result: Ok(detail.into()),
        });
    }

    pub fn failed(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.outcomes.push(RecordOutcome {
            id: id.into(),
            result: Err(reason.into()),
        });
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Err(reason) => Some((o.id.as_str(), reason.as_str())),
            Ok(_) => None,
        })
    }
}
