use docsense_core::error::AppError;
use sha2::{Digest, Sha256};

use super::Embedder;

/// Deterministic, model-free embeddings derived from a SHA-256 of the input.
///
/// Identical text always maps to the identical vector and every component is
/// in `[-1, 1]`. Similarity between different texts carries no meaning; this
/// exists so the index and pipeline can run without a model server.
#[derive(Debug, Clone)]
pub struct PlaceholderEmbedder {
    size: usize,
}

impl PlaceholderEmbedder {
    pub fn new(vector_size: usize) -> Result<Self, AppError> {
        if vector_size == 0 {
            return Err(AppError::configuration(
                "CONFIG_VECTOR_SIZE_INVALID",
                "vector_size must be > 0",
            ));
        }
        Ok(Self { size: vector_size })
    }

    pub fn vector_size(&self) -> usize {
        self.size
    }
}

impl Embedder for PlaceholderEmbedder {
    fn dims(&self) -> Result<usize, AppError> {
        Ok(self.size)
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        let digest = Sha256::digest(input.as_bytes());
        Ok(digest
            .iter()
            .cycle()
            .take(self.size)
            .map(|&b| (b as f32 / 255.0) * 2.0 - 1.0)
            .collect())
    }
}
