use std::time::Duration;

use docsense_core::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{IndexPoint, Payload, SearchHit, SimilarityIndex};

/// Qdrant over its REST API.
#[derive(Debug, Clone)]
pub struct QdrantIndex {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct QdrantPoint<'a> {
    id: Value,
    vector: &'a [f32],
    payload: &'a Payload,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Value,
    score: f32,
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct CollectionInfoResponse {
    result: Value,
}

/// Qdrant only accepts unsigned integers or UUIDs as point ids, so every chunk
/// id is mapped to a name-based UUID. The original id travels in the payload.
fn point_id(id: &str) -> Value {
    json!(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string())
}

fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn call_failed(code: &str, message: &str, err: ureq::Error) -> AppError {
    match err {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            AppError::retrieval(code, message)
                .with_details(format!("status={status}; body={body}"))
                .with_retryable(status >= 500)
        }
        e => AppError::retrieval(code, message)
            .with_details(e.to_string())
            .with_retryable(true),
    }
}

impl QdrantIndex {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::configuration(
                "CONFIG_QDRANT_URL_INVALID",
                "Qdrant URL must start with http:// or https://",
            )
            .with_details(format!("qdrant_url={base_url}")));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Ok(Self {
            agent,
            base_url,
            api_key,
        })
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        let req = self.agent.request(method, &url);
        match &self.api_key {
            Some(key) => req.set("api-key", key),
            None => req,
        }
    }

    fn create_collection(&self, collection: &str, vector_size: usize) -> Result<(), AppError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });
        match self
            .request("PUT", &format!("/collections/{collection}"))
            .send_json(body)
        {
            Ok(_) => {
                tracing::info!(collection, vector_size, "created qdrant collection");
                Ok(())
            }
            // Lost a creation race with another instance.
            Err(ureq::Error::Status(409, _)) => Ok(()),
            Err(e) => Err(call_failed(
                "RAG_INDEX_CREATE_FAILED",
                "Failed to create Qdrant collection",
                e,
            )),
        }
    }
}

impl SimilarityIndex for QdrantIndex {
    fn ensure_collection(&self, collection: &str, vector_size: usize) -> Result<(), AppError> {
        match self.request("GET", &format!("/collections/{collection}")).call() {
            Ok(resp) => {
                // Existing collections are kept as-is; a size drift is surfaced, not repaired.
                if let Ok(info) = resp.into_json::<CollectionInfoResponse>() {
                    let existing = info
                        .result
                        .pointer("/config/params/vectors/size")
                        .and_then(Value::as_u64);
                    if let Some(existing) = existing {
                        if existing as usize != vector_size {
                            tracing::warn!(
                                collection,
                                existing,
                                requested = vector_size,
                                "qdrant collection vector size differs from embedder"
                            );
                        }
                    }
                }
                Ok(())
            }
            Err(ureq::Error::Status(404, _)) => self.create_collection(collection, vector_size),
            Err(e) => Err(call_failed(
                "RAG_INDEX_UNAVAILABLE",
                "Failed to read Qdrant collection",
                e,
            )),
        }
    }

    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        let body = SearchRequest {
            vector,
            limit,
            with_payload: true,
        };
        let resp = self
            .request("POST", &format!("/collections/{collection}/points/search"))
            .send_json(body)
            .map_err(|e| call_failed("RAG_SEARCH_FAILED", "Qdrant search failed", e))?;
        let parsed: SearchResponse = resp.into_json().map_err(|e| {
            AppError::retrieval("RAG_SEARCH_FAILED", "Failed to decode Qdrant search response")
                .with_details(e.to_string())
        })?;

        Ok(parsed
            .result
            .into_iter()
            .map(|e| SearchHit {
                id: render_id(&e.id),
                score: e.score,
                payload: e.payload,
            })
            .collect())
    }

    fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<(), AppError> {
        if points.is_empty() {
            return Ok(());
        }
        let wire: Vec<QdrantPoint<'_>> = points
            .iter()
            .map(|p| QdrantPoint {
                id: point_id(&p.id),
                vector: &p.vector,
                payload: &p.payload,
            })
            .collect();
        self.request("PUT", &format!("/collections/{collection}/points?wait=true"))
            .send_json(json!({ "points": wire }))
            .map_err(|e| call_failed("RAG_UPSERT_FAILED", "Qdrant upsert failed", e))?;
        tracing::debug!(collection, points = points.len(), "upserted points");
        Ok(())
    }
}
