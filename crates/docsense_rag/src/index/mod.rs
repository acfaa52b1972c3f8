//! Vector storage behind a small capability trait.
//!
//! Two implementations: [`QdrantIndex`] talks to a Qdrant server over REST,
//! [`SqliteIndex`] keeps vectors in a local SQLite file and scores them with
//! exact cosine similarity. Both treat the collection as fixed-dimension and
//! cosine-scored.

use std::path::PathBuf;
use std::sync::Arc;

use docsense_core::error::AppError;
use docsense_core::settings::{IndexBackend, Settings};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod qdrant;
pub mod similarity;
pub mod sqlite;

pub use qdrant::QdrantIndex;
pub use sqlite::SqliteIndex;

pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: Option<Payload>,
}

pub trait SimilarityIndex: Send + Sync {
    /// Create the collection if it is missing. Safe to call repeatedly.
    fn ensure_collection(&self, collection: &str, vector_size: usize) -> Result<(), AppError>;

    /// Nearest neighbours, best first, at most `limit` hits.
    fn search(&self, collection: &str, vector: &[f32], limit: usize)
        -> Result<Vec<SearchHit>, AppError>;

    /// Insert or overwrite points by id.
    fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<(), AppError>;
}

pub fn index_from_settings(settings: &Settings) -> Result<Arc<dyn SimilarityIndex>, AppError> {
    match settings.index_backend {
        IndexBackend::Qdrant => Ok(Arc::new(QdrantIndex::new(
            &settings.qdrant_url,
            settings.qdrant_api_key.clone(),
        )?)),
        IndexBackend::Sqlite => Ok(Arc::new(SqliteIndex::open(PathBuf::from(
            &settings.sqlite_path,
        ))?)),
    }
}
