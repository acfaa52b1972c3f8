use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use docsense_core::error::AppError;
use serde_json::{json, Value};

use super::schemas::{EmbedRequest, EmbedResponse, QueryRequest, QueryResponse};
use super::ApiError;
use crate::AppState;

/// Run a blocking pipeline call off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            AppError::internal("INTERNAL_TASK_FAILED", "Pipeline task did not complete")
                .with_details(e.to_string())
        })?
        .map_err(ApiError::from)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn embed(
    State(state): State<AppState>,
    body: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let Json(req) = body?;
    let chunks = req.validate()?;
    let document_id = req.document_id;

    let pipeline = state.pipeline.clone();
    let upserted = blocking(move || pipeline.ingest(&document_id, &chunks)).await?;
    Ok(Json(EmbedResponse { upserted }))
}

pub async fn query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(req) = body?;
    let top_k = req.validate()?;
    let question = req.query;

    let pipeline = state.pipeline.clone();
    let outcome = blocking(move || pipeline.ask(&question, top_k)).await?;
    tracing::info!(
        top_k,
        matches = outcome.matches.len(),
        citations = outcome.answer.citations.len(),
        "answered query"
    );
    Ok(Json(QueryResponse::from(outcome)))
}
