use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;

use super::embedder::{Embedder, EmbeddingError};

/// The corpus entry closest to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    /// The corpus entry as given (original casing).
    pub label: String,
    /// Position of `label` in the corpus.
    pub index: usize,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f32,
}

/// Nearest-neighbour lookup by cosine similarity.
///
/// Queries and corpus entries are lower-cased before embedding. Vectors are
/// length-normalized. Corpus vectors are memoized per text, so repeated
/// corpora cost one embedding call in total; query vectors are not kept, so
/// the memo is bounded by the vocabulary.
pub struct SemanticMatcher {
    embedder: Arc<dyn Embedder>,
    cache: Mutex<HashMap<String, Arc<Vec<f32>>>>,
}

impl SemanticMatcher {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the best corpus entry for `query`, or `None` for an empty
    /// corpus. Ties go to the earliest entry.
    pub fn best_match(
        &self,
        query: &str,
        corpus: &[String],
    ) -> Result<Option<SemanticMatch>, EmbeddingError> {
        if corpus.is_empty() {
            return Ok(None);
        }

        let keys: Vec<String> = corpus.iter().map(|c| c.trim().to_lowercase()).collect();
        let (corpus_vectors, query_vector) =
            self.embeddings(&keys, &query.trim().to_lowercase())?;

        let mut best: Option<SemanticMatch> = None;
        for (index, vector) in corpus_vectors.iter().enumerate() {
            let similarity = dot(&query_vector, vector).clamp(-1.0, 1.0);
            if best.as_ref().map_or(true, |b| similarity > b.similarity) {
                best = Some(SemanticMatch {
                    label: corpus[index].clone(),
                    index,
                    similarity,
                });
            }
        }

        if let Some(found) = &best {
            debug!(
                "best match for '{}': '{}' ({:.3})",
                query, found.label, found.similarity
            );
        }
        Ok(best)
    }

    /// Number of memoized vectors.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Vectors for the corpus `keys` and for `query`. Missing texts are
    /// embedded in one call; only corpus texts enter the memo.
    fn embeddings(
        &self,
        keys: &[String],
        query: &str,
    ) -> Result<(Vec<Arc<Vec<f32>>>, Arc<Vec<f32>>), EmbeddingError> {
        let request: Vec<String> = {
            let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            let mut missing: Vec<String> = Vec::new();
            for key in keys.iter().map(String::as_str).chain(std::iter::once(query)) {
                if !cache.contains_key(key) && !missing.iter().any(|m| m == key) {
                    missing.push(key.to_string());
                }
            }
            missing
        };

        let mut fresh: HashMap<String, Arc<Vec<f32>>> = HashMap::with_capacity(request.len());
        if !request.is_empty() {
            let vectors = self.embedder.embed(&request)?;
            if vectors.len() != request.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: request.len(),
                    got: vectors.len(),
                });
            }
            for (key, mut vector) in request.into_iter().zip(vectors) {
                normalize(&mut vector);
                fresh.insert(key, Arc::new(vector));
            }
        }

        let missing_vector =
            |key: &str| EmbeddingError::MalformedResponse(format!("no vector for '{}'", key));
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        let query_vector = fresh
            .get(query)
            .or_else(|| cache.get(query))
            .cloned()
            .ok_or_else(|| missing_vector(query))?;
        for (key, vector) in fresh {
            if keys.contains(&key) {
                cache.insert(key, vector);
            }
        }
        let corpus_vectors = keys
            .iter()
            .map(|key| cache.get(key).cloned().ok_or_else(|| missing_vector(key.as_str())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((corpus_vectors, query_vector))
    }
}

/// Scales `vector` to unit length; the zero vector is left as is.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Dot product; vectors of different length score 0.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
