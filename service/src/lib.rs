//! HTTP surface for the DocSense pipeline.

use std::sync::Arc;

use docsense_rag::Pipeline;

pub mod api;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
