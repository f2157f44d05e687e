//! Embedding collaborator.

use std::time::Duration;

use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Embedding response is malformed: {0}")]
    MalformedResponse(String),

    #[error("Embedding service returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

/// Turns texts into vectors, one per input, in input order.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    client: Client,
    url: String,
    model: String,
    dimensions: Option<u32>,
    api_key: Option<SecretString>,
}

impl HttpEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        dimensions: Option<u32>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimensions,
            api_key,
        })
    }
}

impl Embedder for HttpEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        if let Some(dimensions) = self.dimensions {
            body["dimensions"] = dimensions.into();
        }

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let json: Value = request.send()?.error_for_status()?.json()?;
        let vectors = parse_embedding_response(json)?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

/// Reads `data[*].embedding`, ordered by each item's `index`.
pub(crate) fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let data = json
        .get("data")
        .and_then(|v| v.as_array())
        .ok_or_else(|| EmbeddingError::MalformedResponse("missing data array".to_string()))?;

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (fallback_index, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(fallback_index);
        let embedding = item
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                EmbeddingError::MalformedResponse("item missing embedding array".to_string())
            })?;
        let mut vector = Vec::with_capacity(embedding.len());
        for value in embedding {
            let number = value.as_f64().ok_or_else(|| {
                EmbeddingError::MalformedResponse("embedding value must be numeric".to_string())
            })?;
            vector.push(number as f32);
        }
        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(index, _)| *index);

    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
