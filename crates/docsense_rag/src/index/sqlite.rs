use std::path::{Path, PathBuf};

use docsense_core::db;
use docsense_core::error::AppError;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::{similarity, IndexPoint, Payload, SearchHit, SimilarityIndex};

/// File-backed index with exact cosine search.
///
/// The schema is migrated once in [`SqliteIndex::open`]. After that a plain
/// connection is opened per call, so the handle itself is just a path and can
/// be shared freely between request threads.
#[derive(Debug, Clone)]
pub struct SqliteIndex {
    path: PathBuf,
}

fn query_failed(message: &str, e: rusqlite::Error) -> AppError {
    AppError::storage("DB_QUERY_FAILED", message).with_details(e.to_string())
}

fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::storage("DB_TIME_FAILED", "Failed to format time").with_details(e.to_string())
    })
}

impl SqliteIndex {
    /// Create or upgrade the index file at `path`.
    pub fn open(path: PathBuf) -> Result<Self, AppError> {
        db::open_and_migrate(&path)?;
        tracing::debug!(path = %path.display(), "sqlite index ready");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn connect(&self) -> Result<Connection, AppError> {
        db::open(&self.path)
    }

    fn collection_size(conn: &Connection, collection: &str) -> Result<Option<usize>, AppError> {
        let size: Option<i64> = conn
            .query_row(
                "SELECT vector_size FROM collections WHERE name = ?1",
                [collection],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| query_failed("Failed to read collection", e))?;
        Ok(size.map(|s| s as usize))
    }

    fn require_collection(conn: &Connection, collection: &str) -> Result<usize, AppError> {
        Self::collection_size(conn, collection)?.ok_or_else(|| {
            AppError::retrieval("RAG_INDEX_COLLECTION_MISSING", "Collection does not exist")
                .with_details(format!("collection={collection}"))
        })
    }

    /// Number of stored points in a collection.
    pub fn count(&self, collection: &str) -> Result<usize, AppError> {
        let conn = self.connect()?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM points WHERE collection = ?1",
                [collection],
                |row| row.get(0),
            )
            .map_err(|e| query_failed("Failed to count points", e))?;
        Ok(n as usize)
    }
}

fn dims_mismatch(expected: usize, got: usize, what: &str) -> AppError {
    AppError::retrieval("RAG_INDEX_DIMS_MISMATCH", "Vector dimension does not match collection")
        .with_details(format!("{what}; expected={expected}; got={got}"))
}

fn text_sha256(payload: &Payload) -> Option<String> {
    payload
        .get("text")
        .and_then(|v| v.as_str())
        .map(|t| hex::encode(Sha256::digest(t.as_bytes())))
}

impl SimilarityIndex for SqliteIndex {
    fn ensure_collection(&self, collection: &str, vector_size: usize) -> Result<(), AppError> {
        if vector_size == 0 {
            return Err(AppError::configuration(
                "CONFIG_VECTOR_SIZE_INVALID",
                "vector_size must be > 0",
            ));
        }
        let conn = self.connect()?;
        match Self::collection_size(&conn, collection)? {
            Some(existing) if existing == vector_size => Ok(()),
            Some(existing) => Err(AppError::configuration(
                "CONFIG_VECTOR_SIZE_MISMATCH",
                "Existing collection has a different vector size",
            )
            .with_details(format!(
                "collection={collection}; existing={existing}; requested={vector_size}"
            ))),
            None => {
                conn.execute(
                    "INSERT INTO collections(name, vector_size, distance, created_at) VALUES (?1, ?2, 'cosine', ?3)",
                    params![collection, vector_size as i64, now_rfc3339_utc()?],
                )
                .map_err(|e| query_failed("Failed to create collection", e))?;
                tracing::info!(collection, vector_size, "created sqlite collection");
                Ok(())
            }
        }
    }

    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        let conn = self.connect()?;
        let dims = Self::require_collection(&conn, collection)?;
        if vector.len() != dims {
            return Err(dims_mismatch(dims, vector.len(), "query"));
        }
        let qnorm = similarity::l2_norm(vector);
        if qnorm == 0.0 {
            return Err(AppError::retrieval(
                "RAG_SEARCH_FAILED",
                "Query embedding norm is zero",
            ));
        }

        let mut stmt = conn
            .prepare("SELECT point_id, vector_json, payload_json FROM points WHERE collection = ?1")
            .map_err(|e| query_failed("Failed to prepare search", e))?;
        let rows = stmt
            .query_map([collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| query_failed("Failed to scan points", e))?;

        let mut hits: Vec<SearchHit> = Vec::new();
        for r in rows {
            let (id, vector_json, payload_json) =
                r.map_err(|e| query_failed("Failed to read point row", e))?;
            let v: Vec<f32> = serde_json::from_str(&vector_json).map_err(|e| {
                AppError::storage("DB_DECODE_FAILED", "Failed to decode stored vector")
                    .with_details(format!("point_id={id}; err={e}"))
            })?;
            if v.len() != dims {
                return Err(dims_mismatch(dims, v.len(), &format!("point_id={id}")));
            }
            let vnorm = similarity::l2_norm(&v);
            if vnorm == 0.0 {
                continue;
            }
            let payload: Payload = serde_json::from_str(&payload_json).map_err(|e| {
                AppError::storage("DB_DECODE_FAILED", "Failed to decode stored payload")
                    .with_details(format!("point_id={id}; err={e}"))
            })?;
            hits.push(SearchHit {
                score: similarity::cosine_similarity(vector, &v, qnorm, vnorm),
                id,
                payload: Some(payload),
            });
        }

        // Best first; equal scores fall back to id so results are reproducible.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<(), AppError> {
        if points.is_empty() {
            return Ok(());
        }
        let mut conn = self.connect()?;
        let dims = Self::require_collection(&conn, collection)?;
        for p in points.iter() {
            if p.vector.len() != dims {
                return Err(dims_mismatch(dims, p.vector.len(), &format!("point_id={}", p.id)));
            }
        }

        let updated_at = now_rfc3339_utc()?;
        let tx = conn.transaction().map_err(|e| {
            AppError::storage("DB_TX_FAILED", "Failed to start upsert transaction")
                .with_details(e.to_string())
        })?;
        for p in points.iter() {
            let vector_json = serde_json::to_string(&p.vector).map_err(|e| {
                AppError::storage("DB_ENCODE_FAILED", "Failed to encode vector")
                    .with_details(e.to_string())
            })?;
            let payload_json = serde_json::to_string(&p.payload).map_err(|e| {
                AppError::storage("DB_ENCODE_FAILED", "Failed to encode payload")
                    .with_details(e.to_string())
            })?;
            tx.execute(
                r#"
        INSERT INTO points(collection, point_id, vector_json, payload_json, text_sha256, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(collection, point_id) DO UPDATE SET
          vector_json = excluded.vector_json,
          payload_json = excluded.payload_json,
          text_sha256 = excluded.text_sha256,
          updated_at = excluded.updated_at
        "#,
                params![
                    collection,
                    p.id,
                    vector_json,
                    payload_json,
                    text_sha256(&p.payload),
                    updated_at
                ],
            )
            .map_err(|e| {
                query_failed("Failed to upsert point", e)
            })?;
        }
        tx.commit().map_err(|e| {
            AppError::storage("DB_TX_FAILED", "Failed to commit upsert transaction")
                .with_details(e.to_string())
        })?;
        tracing::debug!(collection, points = points.len(), "upserted points");
        Ok(())
    }
}
