use std::sync::Mutex;
use std::time::Duration;

use docsense_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::ollama::OllamaClient;

/// Embeddings from an Ollama server. The vector width is discovered with one
/// sample request the first time it is needed and cached afterwards.
#[derive(Debug)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    dims: Mutex<Option<usize>>,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: String) -> Self {
        Self {
            client,
            model,
            dims: Mutex::new(None),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

impl Embedder for OllamaEmbedder {
    fn dims(&self) -> Result<usize, AppError> {
        // Held across the sample request so concurrent first callers wait for one result.
        let mut guard = self.dims.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(d) = *guard {
            return Ok(d);
        }
        let d = self.embed("dimension check")?.len();
        tracing::info!(model = %self.model, dims = d, "discovered embedding dimension");
        *guard = Some(d);
        Ok(d)
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        // Keep requests bounded; cut on a char boundary.
        let prompt = match input.char_indices().nth(12_000) {
            Some((cut, _)) => &input[..cut],
            None => input,
        };

        let url = format!("{}/api/embeddings", self.client.base_url());
        let req = EmbeddingsRequest {
            model: &self.model,
            prompt,
        };
        let resp = ureq::post(&url)
            .timeout(Duration::from_secs(10))
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::retrieval("RAG_EMBEDDINGS_FAILED", "Failed to encode embeddings request")
                    .with_details(e.to_string())
            })?);

        match resp {
            Ok(r) if r.status() == 200 => {
                let v: EmbeddingsResponse = r.into_json().map_err(|e| {
                    AppError::retrieval("RAG_EMBEDDINGS_FAILED", "Failed to decode embeddings response")
                        .with_details(e.to_string())
                })?;
                if v.embedding.is_empty() {
                    return Err(AppError::retrieval(
                        "RAG_EMBEDDINGS_FAILED",
                        "Embeddings response was empty",
                    ));
                }
                Ok(v.embedding)
            }
            Ok(r) => Err(
                AppError::retrieval("RAG_EMBEDDINGS_FAILED", "Embeddings request failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(ureq::Error::Status(code, _)) => Err(
                AppError::retrieval("RAG_EMBEDDINGS_FAILED", "Embeddings request failed")
                    .with_details(format!("status={code}"))
                    .with_retryable(code >= 500),
            ),
            Err(e) => Err(
                AppError::retrieval("RAG_EMBEDDINGS_FAILED", "Failed to call embeddings endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}
