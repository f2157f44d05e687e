//! Deterministic collaborators for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::ProcessError;
use crate::extraction::{Inference, InferenceError};
use crate::processor::{OcrEngine, OcrOutput};
use crate::semantic::{Embedder, EmbeddingError};

const DIM: usize = 1024;
const FIRST_FREE_AXIS: usize = 64;

/// Embeds texts from a fixed table. Any other text gets its own axis, so
/// equal texts score 1.0 and different unknown texts score 0.0.
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    axes: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl TableEmbedder {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            axes: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Registers an explicit vector (at most 64 components) for `text`.
    pub fn with(mut self, text: &str, vector: &[f32]) -> Self {
        assert!(vector.len() <= FIRST_FREE_AXIS);
        let mut padded = vec![0.0; DIM];
        padded[..vector.len()].copy_from_slice(vector);
        self.table.insert(text.to_string(), padded);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for TableEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut axes = self.axes.lock().unwrap();
        Ok(texts
            .iter()
            .map(|text| {
                if let Some(vector) = self.table.get(text) {
                    return vector.clone();
                }
                let next = FIRST_FREE_AXIS + axes.len();
                let axis = *axes.entry(text.clone()).or_insert(next);
                let mut vector = vec![0.0; DIM];
                vector[axis % DIM] = 1.0;
                vector
            })
            .collect())
    }
}

/// An embedder whose service is down.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::MalformedResponse("service unavailable".to_string()))
    }
}

/// Returns canned payloads. `None` payloads fail like an unreachable service.
pub struct ScriptedInference {
    pub profile: Option<Value>,
    pub candidate_tags: Option<Value>,
    pub position_tags: Option<Value>,
    /// `None` echoes the formatted content back.
    pub polished: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedInference {
    pub fn new() -> Self {
        Self {
            profile: None,
            candidate_tags: None,
            position_tags: None,
            polished: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_profile(mut self, value: Value) -> Self {
        self.profile = Some(value);
        self
    }

    pub fn with_candidate_tags(mut self, value: Value) -> Self {
        self.candidate_tags = Some(value);
        self
    }

    pub fn with_position_tags(mut self, value: Value) -> Self {
        self.position_tags = Some(value);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn canned(&self, value: &Option<Value>) -> Result<Value, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        value
            .clone()
            .ok_or_else(|| InferenceError::MalformedResponse("no scripted response".to_string()))
    }
}

impl Inference for ScriptedInference {
    fn extract_profile(&self, _text: &str) -> Result<Value, InferenceError> {
        self.canned(&self.profile)
    }

    fn extract_candidate_tags(&self, _summary: &str) -> Result<Value, InferenceError> {
        self.canned(&self.candidate_tags)
    }

    fn polish_position(&self, content: &str) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.polished.clone().unwrap_or_else(|| content.to_string()))
    }

    fn extract_position_tags(&self, _content: &str) -> Result<Value, InferenceError> {
        self.canned(&self.position_tags)
    }
}

/// A resume payload that passes schema validation.
pub fn resume_payload(name: &str) -> Value {
    serde_json::json!({
        "basic_info": { "name": name, "email": "暂无", "phone": "暂无", "location": "北京" },
        "job_intention": "智能合约工程师",
        "personal_expertise": ["Solidity", "DeFi 协议设计"],
        "education": [{
            "school": "北京大学", "degree": "本科", "field": "软件工程",
            "start_date": "2014-09", "end_date": "2018-06", "gpa": "暂无", "description": "暂无"
        }],
        "work_experience": [{
            "company": "某 DEX", "position": "合约开发",
            "start_date": "2018-07", "end_date": "2022-07",
            "responsibilities": ["AMM 合约开发"], "achievements": []
        }],
        "projects": [],
        "skills": ["solidity", "rust"],
        "certifications": [],
        "languages": [],
        "others": []
    })
}

/// OCR text long enough to pass the input length check.
pub const RESUME_TEXT: &str = "张三 智能合约工程师 北京大学 软件工程 本科 2014-2018 \
    某 DEX 合约开发 2018-2022 负责 AMM 合约开发与审计 熟悉 Solidity Rust DeFi 协议设计";

/// Returns fixed text, or a timeout when built with [`ScriptedOcr::timing_out`].
pub struct ScriptedOcr {
    text: Option<String>,
    available: bool,
    cleaned: Mutex<Vec<PathBuf>>,
}

impl ScriptedOcr {
    pub fn returning(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            available: true,
            cleaned: Mutex::new(Vec::new()),
        }
    }

    pub fn timing_out() -> Self {
        Self {
            text: None,
            available: true,
            cleaned: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn cleaned(&self) -> Vec<PathBuf> {
        self.cleaned.lock().unwrap().clone()
    }
}

impl OcrEngine for ScriptedOcr {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn extract(&self, _pdf: &Path) -> Result<OcrOutput, ProcessError> {
        match &self.text {
            Some(text) => Ok(OcrOutput {
                text: text.clone(),
                parts: 1,
            }),
            None => Err(ProcessError::Timeout { seconds: 300 }),
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn cleanup(&self, pdf: &Path) {
        self.cleaned.lock().unwrap().push(pdf.to_path_buf());
    }
}

/// A candidate tag payload that normalizes against the built-in vocabulary.
pub fn candidate_tags_payload(category: &str, market: &str, fields: &[&str]) -> Value {
    serde_json::json!({
        "category": category,
        "market": market,
        "category_skills": ["solidity"],
        "market_field": fields,
        "education": ["本科"],
        "title": "智能合约工程师",
        "skills": ["solidity", "rust"],
        "others": []
    })
}
