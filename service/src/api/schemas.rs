//! Request and response bodies.
//!
//! Requests are deserialized loosely and then checked by `validate`, so every
//! rejection carries a `VALIDATION_*` code instead of a serde message.

use docsense_core::error::AppError;
use docsense_rag::{ChunkInput, Citation, QueryOutcome, RetrievedChunk};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_K: i64 = 5;
pub const MAX_TOP_K: i64 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedChunk {
    pub chunk_id: String,
    pub chunk_index: i64,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedRequest {
    pub document_id: String,
    pub chunks: Vec<EmbedChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedResponse {
    pub upserted: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub top_k: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub matches: Vec<RetrievedChunk>,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(out: QueryOutcome) -> Self {
        Self {
            answer: out.answer.answer,
            citations: out.answer.citations,
            matches: out.matches,
        }
    }
}

fn field_error(code: &str, message: &str, field: String) -> AppError {
    AppError::validation(code, message).with_details(format!("field={field}"))
}

impl EmbedRequest {
    /// Checked chunks ready for ingestion.
    pub fn validate(&self) -> Result<Vec<ChunkInput>, AppError> {
        if self.document_id.trim().is_empty() {
            return Err(field_error(
                "VALIDATION_DOCUMENT_ID",
                "document_id must not be empty",
                "document_id".to_string(),
            ));
        }

        if self.chunks.is_empty() {
            return Err(field_error(
                "VALIDATION_CHUNKS",
                "chunks must contain at least one chunk",
                "chunks".to_string(),
            ));
        }

        self.chunks
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if c.chunk_id.trim().is_empty() {
                    return Err(field_error(
                        "VALIDATION_CHUNK_ID",
                        "chunk_id must not be empty",
                        format!("chunks[{i}].chunk_id"),
                    ));
                }
                let chunk_index = u32::try_from(c.chunk_index).map_err(|_| {
                    field_error(
                        "VALIDATION_CHUNK_INDEX",
                        "chunk_index must be a non-negative integer",
                        format!("chunks[{i}].chunk_index"),
                    )
                })?;
                if c.text.is_empty() {
                    return Err(field_error(
                        "VALIDATION_CHUNK_TEXT",
                        "chunk text must not be empty",
                        format!("chunks[{i}].text"),
                    ));
                }
                Ok(ChunkInput {
                    chunk_id: c.chunk_id.clone(),
                    chunk_index,
                    text: c.text.clone(),
                })
            })
            .collect()
    }
}

impl QueryRequest {
    /// The effective `top_k`.
    pub fn validate(&self) -> Result<usize, AppError> {
        if self.query.trim().is_empty() {
            return Err(field_error(
                "VALIDATION_QUERY",
                "query must not be empty",
                "query".to_string(),
            ));
        }
        let top_k = self.top_k.unwrap_or(DEFAULT_TOP_K);
        if !(1..=MAX_TOP_K).contains(&top_k) {
            return Err(AppError::validation(
                "VALIDATION_TOP_K",
                "top_k must be between 1 and 50",
            )
            .with_details(format!("top_k={top_k}")));
        }
        Ok(top_k as usize)
    }
}
