// Embeddings module
// Turns movie text into vectors and assembles them into a flat index

pub mod ollama;
pub mod vector_index;

use crate::{CinemateError, Result};

pub use ollama::{ModelInfo, OllamaClient};
pub use vector_index::{VectorIndex, build_index};

/// A dense embedding vector
pub type Embedding = Vec<f32>;

/// Text embedding model.
///
/// Implementations must be deterministic for a fixed model and must return one
/// vector per input, in input order. Batching is an internal detail and must
/// not change any individual vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single search query with the same model used for documents
    fn embed_query(&self, query: &str) -> Result<Embedding> {
        self.embed(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| CinemateError::Embedding("model returned no embeddings".to_string()))
    }

    /// Identifier of the underlying model, recorded alongside the index
    fn model_name(&self) -> &str;
}
