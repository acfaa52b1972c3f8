use std::sync::Arc;

use docsense_core::error::{AppError, ErrorKind};
use serde_json::{json, Value};

use crate::chunk::{ChunkInput, RetrievedChunk};
use crate::embeddings::Embedder;
use crate::index::{IndexPoint, Payload, SearchHit, SimilarityIndex};

/// Hook between search and budgeting. The pipeline ships no re-ranking model.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, chunks: Vec<RetrievedChunk>) -> Vec<RetrievedChunk>;
}

/// Leaves index order untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Reranker for PassThrough {
    fn rerank(&self, _query: &str, chunks: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
        chunks
    }
}

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
    collection: String,
    reranker: Arc<dyn Reranker>,
}

fn payload_str(payload: &Payload, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(str::to_string)
}

fn payload_u32(payload: &Payload, key: &str) -> Option<u32> {
    payload
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

impl From<SearchHit> for RetrievedChunk {
    fn from(hit: SearchHit) -> Self {
        let payload = hit.payload.unwrap_or_default();
        Self {
            // Indexes may store points under a derived id; the payload keeps the chunk's own.
            id: payload_str(&payload, "chunk_id").unwrap_or(hit.id),
            document_id: payload_str(&payload, "document_id"),
            chunk_index: payload_u32(&payload, "chunk_index"),
            text: payload_str(&payload, "text"),
            score: hit.score,
        }
    }
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn SimilarityIndex>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
            reranker: Arc::new(PassThrough),
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection sized for this retriever's embedder.
    pub fn ensure_collection(&self) -> Result<(), AppError> {
        let dims = self.embedder.dims()?;
        self.index.ensure_collection(&self.collection, dims)
    }

    /// Top `top_k` chunks for `text`, in the order the index returned them.
    pub fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, AppError> {
        if top_k == 0 {
            return Err(AppError::validation(
                "VALIDATION_TOP_K",
                "top_k must be a positive integer",
            ));
        }

        let vector = self
            .embedder
            .embed(text)
            .map_err(|e| e.into_kind(ErrorKind::Retrieval))?;
        let hits = self
            .index
            .search(&self.collection, &vector, top_k)
            .map_err(|e| e.into_kind(ErrorKind::Retrieval))?;

        let chunks: Vec<RetrievedChunk> = hits.into_iter().map(RetrievedChunk::from).collect();
        tracing::debug!(collection = %self.collection, top_k, hits = chunks.len(), "retrieved chunks");
        Ok(self.reranker.rerank(text, chunks))
    }

    /// Embed and store every chunk of one document. Returns how many points were written.
    pub fn upsert(&self, document_id: &str, chunks: &[ChunkInput]) -> Result<usize, AppError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .map_err(|e| e.into_kind(ErrorKind::Retrieval))?;
        if vectors.len() != chunks.len() {
            return Err(AppError::retrieval(
                "RAG_EMBEDDINGS_FAILED",
                "Embedding batch size does not match chunk count",
            )
            .with_details(format!("chunks={}; vectors={}", chunks.len(), vectors.len())));
        }

        let points: Vec<IndexPoint> = chunks
            .iter()
            .zip(vectors)
            .map(|(c, vector)| {
                let mut payload = Payload::new();
                payload.insert("chunk_id".to_string(), json!(c.chunk_id));
                payload.insert("document_id".to_string(), json!(document_id));
                payload.insert("chunk_index".to_string(), json!(c.chunk_index));
                payload.insert("text".to_string(), json!(c.text));
                IndexPoint {
                    id: c.chunk_id.clone(),
                    vector,
                    payload,
                }
            })
            .collect();

        let n = points.len();
        self.index
            .upsert(&self.collection, points)
            .map_err(|e| e.into_kind(ErrorKind::Retrieval))?;
        tracing::info!(collection = %self.collection, document_id, upserted = n, "stored document chunks");
        Ok(n)
    }
}
