use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use docsense_core::db;
use docsense_core::error::ErrorKind;
use docsense_rag::chunk::ChunkInput;
use docsense_rag::embeddings::PlaceholderEmbedder;
use docsense_rag::index::{IndexPoint, Payload, SimilarityIndex, SqliteIndex};
use docsense_rag::Retriever;

fn temp_index() -> (tempfile::TempDir, SqliteIndex) {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = SqliteIndex::open(dir.path().join("index.sqlite")).expect("open");
    (dir, index)
}

fn point(id: &str, vector: Vec<f32>, text: &str) -> IndexPoint {
    let mut payload = Payload::new();
    payload.insert("text".to_string(), json!(text));
    IndexPoint {
        id: id.to_string(),
        vector,
        payload,
    }
}

#[test]
fn ensure_collection_is_idempotent_and_rejects_resize() {
    let (_dir, index) = temp_index();
    index.ensure_collection("docs", 3).expect("create");
    index.ensure_collection("docs", 3).expect("again");

    let err = index.ensure_collection("docs", 4).expect_err("resize");
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert_eq!(err.code, "CONFIG_VECTOR_SIZE_MISMATCH");

    let err = index.ensure_collection("other", 0).expect_err("zero");
    assert_eq!(err.code, "CONFIG_VECTOR_SIZE_INVALID");
}

#[test]
fn upsert_overwrites_points_by_id() {
    let (_dir, index) = temp_index();
    index.ensure_collection("docs", 2).expect("create");

    index
        .upsert("docs", vec![point("p1", vec![1.0, 0.0], "old")])
        .expect("first");
    index
        .upsert("docs", vec![point("p1", vec![0.0, 1.0], "new")])
        .expect("second");
    assert_eq!(index.count("docs").expect("count"), 1);

    let hits = index.search("docs", &[0.0, 1.0], 5).expect("search");
    assert_eq!(hits.len(), 1);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    let payload = hits[0].payload.as_ref().expect("payload");
    assert_eq!(payload.get("text"), Some(&json!("new")));
}

#[test]
fn search_ranks_by_cosine_and_breaks_ties_by_id() {
    let (_dir, index) = temp_index();
    index.ensure_collection("docs", 2).expect("create");
    index
        .upsert(
            "docs",
            vec![
                point("z-same", vec![2.0, 0.0], "z"),
                point("a-same", vec![1.0, 0.0], "a"),
                point("diag", vec![1.0, 1.0], "d"),
                point("away", vec![-1.0, 0.0], "w"),
                point("zero", vec![0.0, 0.0], "0"),
            ],
        )
        .expect("upsert");

    let hits = index.search("docs", &[1.0, 0.0], 10).expect("search");
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["a-same", "z-same", "diag", "away"]);

    let top2 = index.search("docs", &[1.0, 0.0], 2).expect("search");
    assert_eq!(top2.len(), 2);
}

#[test]
fn search_and_upsert_check_dimensions() {
    let (_dir, index) = temp_index();
    index.ensure_collection("docs", 2).expect("create");

    let err = index.search("docs", &[1.0, 0.0, 0.0], 3).expect_err("dims");
    assert_eq!(err.code, "RAG_INDEX_DIMS_MISMATCH");

    let err = index
        .upsert("docs", vec![point("p", vec![1.0], "t")])
        .expect_err("dims");
    assert_eq!(err.code, "RAG_INDEX_DIMS_MISMATCH");
    assert_eq!(index.count("docs").expect("count"), 0);

    let err = index.search("docs", &[0.0, 0.0], 3).expect_err("zero query");
    assert_eq!(err.code, "RAG_SEARCH_FAILED");
}

#[test]
fn missing_collection_is_a_retrieval_error() {
    let (_dir, index) = temp_index();
    let err = index.search("nope", &[1.0], 1).expect_err("missing");
    assert_eq!(err.kind, ErrorKind::Retrieval);
    assert_eq!(err.code, "RAG_INDEX_COLLECTION_MISSING");

    let err = index
        .upsert("nope", vec![point("p", vec![1.0], "t")])
        .expect_err("missing");
    assert_eq!(err.code, "RAG_INDEX_COLLECTION_MISSING");
}

#[test]
fn exact_text_query_finds_its_own_chunk_first() {
    let (_dir, index) = temp_index();
    let embedder = Arc::new(PlaceholderEmbedder::new(64).expect("embedder"));
    let retriever = Retriever::new(embedder, Arc::new(index.clone()), "handbook");
    retriever.ensure_collection().expect("ensure");

    let chunks: Vec<ChunkInput> = [
        "Refunds are accepted within 30 days of purchase.",
        "Shipping to Europe takes five to seven business days.",
        "Support is available on weekdays from 9 to 5.",
    ]
    .iter()
    .enumerate()
    .map(|(i, text)| ChunkInput {
        chunk_id: format!("handbook-{i}"),
        chunk_index: i as u32,
        text: text.to_string(),
    })
    .collect();
    assert_eq!(retriever.upsert("handbook", &chunks).expect("upsert"), 3);
    assert_eq!(index.count("handbook").expect("count"), 3);

    let out = retriever
        .query("Shipping to Europe takes five to seven business days.", 3)
        .expect("query");
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].id, "handbook-1");
    assert!((out[0].score - 1.0).abs() < 1e-5);
    assert_eq!(out[0].document_id.as_deref(), Some("handbook"));
    assert_eq!(out[0].chunk_index, Some(1));
    assert_eq!(
        out[0].text.as_deref(),
        Some("Shipping to Europe takes five to seven business days.")
    );
}

#[test]
fn index_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("index.sqlite");
    {
        let index = SqliteIndex::open(path.clone()).expect("open");
        index.ensure_collection("docs", 2).expect("create");
        index
            .upsert("docs", vec![point("p", vec![1.0, 1.0], "kept")])
            .expect("upsert");
    }
    let reopened = SqliteIndex::open(path).expect("reopen");
    assert_eq!(reopened.count("docs").expect("count"), 1);
    reopened.ensure_collection("docs", 2).expect("same size");
}

#[test]
fn open_migrates_once_and_requests_do_not_touch_the_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("index.sqlite");
    let index = SqliteIndex::open(path.clone()).expect("open");
    index.ensure_collection("docs", 2).expect("create");

    // With the ledger gone, any re-run of the migrations would recreate it.
    db::open(&path)
        .expect("raw open")
        .execute_batch("DROP TABLE _migrations;")
        .expect("drop ledger");

    index
        .upsert("docs", vec![point("p", vec![1.0, 0.0], "t")])
        .expect("upsert");
    index.search("docs", &[1.0, 0.0], 1).expect("search");
    assert_eq!(index.count("docs").expect("count"), 1);

    let ledger: i64 = db::open(&path)
        .expect("raw open")
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_migrations'",
            [],
            |row| row.get(0),
        )
        .expect("sqlite_master");
    assert_eq!(ledger, 0);
}

#[test]
fn open_fails_for_unreachable_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = SqliteIndex::open(dir.path().join("no-such-dir").join("index.sqlite"))
        .expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Storage);
}
