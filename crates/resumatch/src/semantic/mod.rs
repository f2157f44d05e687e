//! Embedding similarity over small candidate corpora.

pub mod embedder;
pub mod matcher;

pub use embedder::{Embedder, EmbeddingError, HttpEmbedder};
pub use matcher::{SemanticMatch, SemanticMatcher};
