//! Fake collaborators implementing the public traits.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use serde_json::{json, Value};

use resumatch::processor::{OcrEngine, OcrOutput};
use resumatch::{Embedder, EmbeddingError, Inference, InferenceError, ProcessError};

const DIM: usize = 512;
const FIRST_FREE_AXIS: usize = 32;

/// Known texts map to fixed vectors; every other text gets its own axis.
#[derive(Default)]
pub struct FakeEmbedder {
    table: HashMap<String, Vec<f32>>,
    axes: Mutex<HashMap<String, usize>>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: &[f32]) -> Self {
        let mut padded = vec![0.0; DIM];
        padded[..vector.len()].copy_from_slice(vector);
        self.table.insert(text.to_string(), padded);
        self
    }
}

impl Embedder for FakeEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
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

/// Canned inference responses. A missing response fails the call.
#[derive(Default)]
pub struct FakeInference {
    pub profile: Option<Value>,
    pub candidate_tags: Option<Value>,
    pub position_tags: Option<Value>,
}

impl FakeInference {
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn for_resume(profile: Value, candidate_tags: Value) -> Self {
        Self {
            profile: Some(profile),
            candidate_tags: Some(candidate_tags),
            position_tags: None,
        }
    }

    fn answer(value: &Option<Value>) -> Result<Value, InferenceError> {
        value
            .clone()
            .ok_or_else(|| InferenceError::MalformedResponse("connection refused".to_string()))
    }
}

impl Inference for FakeInference {
    fn extract_profile(&self, _text: &str) -> Result<Value, InferenceError> {
        Self::answer(&self.profile)
    }

    fn extract_candidate_tags(&self, _summary: &str) -> Result<Value, InferenceError> {
        Self::answer(&self.candidate_tags)
    }

    fn polish_position(&self, content: &str) -> Result<String, InferenceError> {
        Ok(content.to_string())
    }

    fn extract_position_tags(&self, _content: &str) -> Result<Value, InferenceError> {
        Self::answer(&self.position_tags)
    }
}

pub enum FakeOcr {
    Text(String),
    Timeout,
}

impl OcrEngine for FakeOcr {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn extract(&self, _pdf: &Path) -> Result<OcrOutput, ProcessError> {
        match self {
            FakeOcr::Text(text) => Ok(OcrOutput {
                text: text.clone(),
                parts: 1,
            }),
            FakeOcr::Timeout => Err(ProcessError::Timeout { seconds: 300 }),
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

pub const RESUME_TEXT: &str = "李雷 区块链研发工程师 清华大学 计算机科学 硕士 2015-2018 \
    某公链 核心开发 2018-2023 负责共识模块与节点性能优化 熟悉 Rust Go 零知识证明";

pub fn resume_profile(name: &str) -> Value {
    json!({
        "basic_info": { "name": name, "email": "lilei@example.com", "phone": "暂无", "location": "上海" },
        "job_intention": "区块链研发工程师",
        "personal_expertise": ["共识算法", "Rust"],
        "education": [{
            "school": "清华大学", "degree": "硕士", "field": "计算机科学",
            "start_date": "2015-09", "end_date": "2018-06", "gpa": "暂无", "description": "暂无"
        }],
        "work_experience": [{
            "company": "某公链", "position": "核心开发",
            "start_date": "2018-07", "end_date": "2023-03",
            "responsibilities": ["共识模块"], "achievements": ["TPS 提升 3 倍"]
        }],
        "projects": [],
        "skills": ["rust", "go"],
        "certifications": [],
        "languages": [],
        "others": []
    })
}

pub fn candidate_tags(market: &str, market_field: &[&str]) -> Value {
    json!({
        "category": "技术类",
        "market": market,
        "category_skills": ["rust"],
        "market_field": market_field,
        "education": ["硕士"],
        "title": "区块链研发工程师",
        "skills": ["rust", "go"],
        "others": []
    })
}
