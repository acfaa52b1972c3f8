use std::sync::Arc;

use docsense_core::error::AppError;
use docsense_core::settings::{EmbeddingProvider, Settings};

use crate::ollama::OllamaClient;

pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces.
    fn dims(&self) -> Result<usize, AppError>;

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError>;

    /// Embed many inputs; output order matches input order.
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, AppError> {
        inputs.iter().map(|t| self.embed(t)).collect()
    }
}

pub mod ollama_embed;
pub mod placeholder;

pub use ollama_embed::OllamaEmbedder;
pub use placeholder::PlaceholderEmbedder;

pub fn embedder_from_settings(settings: &Settings) -> Result<Arc<dyn Embedder>, AppError> {
    match settings.embedding_provider {
        EmbeddingProvider::Placeholder => Ok(Arc::new(PlaceholderEmbedder::new(
            settings.qdrant_vector_size,
        )?)),
        EmbeddingProvider::Ollama => {
            let client = OllamaClient::new(&settings.ollama_url)?;
            Ok(Arc::new(OllamaEmbedder::new(
                client,
                settings.embedding_model.clone(),
            )))
        }
    }
}
