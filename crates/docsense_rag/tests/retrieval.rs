use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::json;

use docsense_core::error::{AppError, ErrorKind};
use docsense_rag::chunk::ChunkInput;
use docsense_rag::embeddings::Embedder;
use docsense_rag::index::{IndexPoint, Payload, SearchHit, SimilarityIndex};
use docsense_rag::retrieve::Reranker;
use docsense_rag::{RetrievedChunk, Retriever};

/// Two-dimensional embedding: counts of 'a' and 'b'.
struct CountingEmbedder {
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for CountingEmbedder {
    fn dims(&self) -> Result<usize, AppError> {
        Ok(2)
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let a = input.chars().filter(|&c| c == 'a').count();
        let b = input.chars().filter(|&c| c == 'b').count();
        Ok(vec![a as f32, b as f32])
    }
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn dims(&self) -> Result<usize, AppError> {
        Ok(2)
    }

    fn embed(&self, _input: &str) -> Result<Vec<f32>, AppError> {
        Err(AppError::configuration("RAG_EMBEDDINGS_FAILED", "Embedding server unreachable")
            .with_retryable(true))
    }
}

/// Records every call and answers searches with canned hits.
#[derive(Default)]
struct FakeIndex {
    canned: Vec<SearchHit>,
    created: Mutex<Vec<(String, usize)>>,
    upserts: Mutex<Vec<(String, Vec<IndexPoint>)>>,
    searches: Mutex<Vec<(String, Vec<f32>, usize)>>,
}

impl FakeIndex {
    fn with_hits(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            canned: hits,
            ..Self::default()
        })
    }
}

impl SimilarityIndex for FakeIndex {
    fn ensure_collection(&self, collection: &str, vector_size: usize) -> Result<(), AppError> {
        self.created
            .lock()
            .unwrap()
            .push((collection.to_string(), vector_size));
        Ok(())
    }

    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        self.searches
            .lock()
            .unwrap()
            .push((collection.to_string(), vector.to_vec(), limit));
        Ok(self.canned.iter().take(limit).cloned().collect())
    }

    fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<(), AppError> {
        self.upserts
            .lock()
            .unwrap()
            .push((collection.to_string(), points));
        Ok(())
    }
}

struct DownIndex;

impl SimilarityIndex for DownIndex {
    fn ensure_collection(&self, _collection: &str, _vector_size: usize) -> Result<(), AppError> {
        Ok(())
    }

    fn search(&self, _c: &str, _v: &[f32], _l: usize) -> Result<Vec<SearchHit>, AppError> {
        Err(AppError::storage("DB_QUERY_FAILED", "Failed to scan points"))
    }

    fn upsert(&self, _c: &str, _p: Vec<IndexPoint>) -> Result<(), AppError> {
        Err(AppError::storage("DB_QUERY_FAILED", "Failed to upsert point"))
    }
}

fn hit(id: &str, score: f32, payload: serde_json::Value) -> SearchHit {
    let payload: Option<Payload> = match payload {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    };
    SearchHit {
        id: id.to_string(),
        score,
        payload,
    }
}

fn chunk_input(id: &str, index: u32, text: &str) -> ChunkInput {
    ChunkInput {
        chunk_id: id.to_string(),
        chunk_index: index,
        text: text.to_string(),
    }
}

#[test]
fn ensure_collection_uses_embedder_dims() {
    let index = FakeIndex::with_hits(Vec::new());
    let retriever = Retriever::new(CountingEmbedder::new(), index.clone(), "docs");
    retriever.ensure_collection().expect("ensure");
    assert_eq!(*index.created.lock().unwrap(), vec![("docs".to_string(), 2)]);
}

#[test]
fn empty_upsert_touches_nothing() {
    let embedder = CountingEmbedder::new();
    let index = FakeIndex::with_hits(Vec::new());
    let retriever = Retriever::new(embedder.clone(), index.clone(), "docs");

    assert_eq!(retriever.upsert("doc-1", &[]).expect("upsert"), 0);
    assert_eq!(embedder.calls(), 0);
    assert!(index.upserts.lock().unwrap().is_empty());
}

#[test]
fn upsert_writes_one_point_per_chunk_with_payload() {
    let embedder = CountingEmbedder::new();
    let index = FakeIndex::with_hits(Vec::new());
    let retriever = Retriever::new(embedder.clone(), index.clone(), "docs");

    let n = retriever
        .upsert(
            "doc-1",
            &[chunk_input("c-0", 0, "aab"), chunk_input("c-1", 1, "bbb")],
        )
        .expect("upsert");
    assert_eq!(n, 2);
    assert_eq!(embedder.calls(), 2);

    let upserts = index.upserts.lock().unwrap();
    assert_eq!(upserts.len(), 1);
    let (collection, points) = &upserts[0];
    assert_eq!(collection, "docs");
    assert_eq!(points.len(), 2);

    assert_eq!(points[0].id, "c-0");
    assert_eq!(points[0].vector, vec![2.0, 1.0]);
    assert_eq!(
        serde_json::Value::Object(points[0].payload.clone()),
        json!({"chunk_id": "c-0", "document_id": "doc-1", "chunk_index": 0, "text": "aab"})
    );
    assert_eq!(points[1].id, "c-1");
    assert_eq!(points[1].vector, vec![0.0, 3.0]);
    assert_eq!(points[1].payload.get("chunk_index"), Some(&json!(1)));
}

#[test]
fn query_keeps_index_order_without_resorting() {
    let index = FakeIndex::with_hits(vec![
        hit("second-best", 0.4, json!({"document_id": "d", "chunk_index": 1, "text": "x"})),
        hit("best", 0.9, json!({"document_id": "d", "chunk_index": 0, "text": "y"})),
    ]);
    let retriever = Retriever::new(CountingEmbedder::new(), index, "docs");

    let out = retriever.query("ab", 5).expect("query");
    let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["second-best", "best"]);
    assert_eq!(out[1].score, 0.9);
    assert_eq!(out[1].text.as_deref(), Some("y"));
}

#[test]
fn query_passes_limit_and_query_vector_to_index() {
    let embedder = CountingEmbedder::new();
    let index = FakeIndex::with_hits(Vec::new());
    let retriever = Retriever::new(embedder.clone(), index.clone(), "docs");

    let out = retriever.query("aaab", 7).expect("query");
    assert!(out.is_empty());
    assert_eq!(embedder.calls(), 1);
    assert_eq!(
        *index.searches.lock().unwrap(),
        vec![("docs".to_string(), vec![3.0, 1.0], 7)]
    );
}

#[test]
fn missing_payload_fields_become_none() {
    let index = FakeIndex::with_hits(vec![
        hit("bare", 0.5, serde_json::Value::Null),
        hit("partial", 0.4, json!({"text": "only text", "chunk_index": "seven"})),
    ]);
    let retriever = Retriever::new(CountingEmbedder::new(), index, "docs");

    let out = retriever.query("a", 2).expect("query");
    assert_eq!(
        out[0],
        RetrievedChunk {
            id: "bare".to_string(),
            score: 0.5,
            document_id: None,
            chunk_index: None,
            text: None,
        }
    );
    assert_eq!(out[1].text.as_deref(), Some("only text"));
    assert_eq!(out[1].document_id, None);
    assert_eq!(out[1].chunk_index, None);
}

#[test]
fn stored_chunk_id_wins_over_index_point_id() {
    let index = FakeIndex::with_hits(vec![
        hit(
            "9a1f3c1e-8d1e-5b0e-9a55-0c1f6d1d2b11",
            0.8,
            json!({"chunk_id": "007", "document_id": "d", "chunk_index": 0, "text": "x"}),
        ),
        hit("plain", 0.7, json!({"text": "y"})),
    ]);
    let retriever = Retriever::new(CountingEmbedder::new(), index, "docs");

    let out = retriever.query("a", 2).expect("query");
    let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["007", "plain"]);
}

#[test]
fn zero_top_k_is_rejected_before_embedding() {
    let embedder = CountingEmbedder::new();
    let retriever = Retriever::new(embedder.clone(), FakeIndex::with_hits(Vec::new()), "docs");

    let err = retriever.query("a", 0).expect_err("should reject");
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.code, "VALIDATION_TOP_K");
    assert_eq!(embedder.calls(), 0);
}

#[test]
fn embedder_failure_surfaces_as_retrieval_error() {
    let retriever = Retriever::new(
        Arc::new(FailingEmbedder),
        FakeIndex::with_hits(Vec::new()),
        "docs",
    );

    let err = retriever.query("a", 3).expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Retrieval);
    assert_eq!(err.code, "RAG_EMBEDDINGS_FAILED");
    assert!(err.retryable);

    let err = retriever
        .upsert("doc", &[chunk_input("c", 0, "a")])
        .expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Retrieval);
}

#[test]
fn index_failure_surfaces_as_retrieval_error() {
    let retriever = Retriever::new(CountingEmbedder::new(), Arc::new(DownIndex), "docs");

    let err = retriever.query("a", 3).expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Retrieval);
    assert_eq!(err.code, "DB_QUERY_FAILED");

    let err = retriever
        .upsert("doc", &[chunk_input("c", 0, "a")])
        .expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Retrieval);
}

struct Reverse;

impl Reranker for Reverse {
    fn rerank(&self, _query: &str, mut chunks: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
        chunks.reverse();
        chunks
    }
}

#[test]
fn reranker_sees_index_order_and_decides_final_order() {
    let index = FakeIndex::with_hits(vec![
        hit("one", 0.9, json!({"text": "1"})),
        hit("two", 0.8, json!({"text": "2"})),
    ]);
    let retriever =
        Retriever::new(CountingEmbedder::new(), index, "docs").with_reranker(Arc::new(Reverse));

    let out = retriever.query("a", 2).expect("query");
    let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["two", "one"]);
}
