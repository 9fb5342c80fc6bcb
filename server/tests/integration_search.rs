use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use server::{build_app, AppConfig};
use std::fs;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn build_tiny_corpus() -> (TempDir, Router) {
    let dir = tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("a.txt"), "rust is great rust systems programming").unwrap();
    fs::write(docs.join("b.txt"), "learning rust programming today").unwrap();
    fs::write(docs.join("c.txt"), "gardening for beginners").unwrap();
    let pagerank = dir.path().join("pagerank.txt");
    fs::write(&pagerank, "a.txt=0.2\nb.txt=0.7\nc.txt=0.1\n").unwrap();

    let app = build_app(AppConfig { corpus: docs, pagerank: Some(pagerank), kgram_k: 2, stem: false }).unwrap();
    (dir, app)
}

fn build_single_doc(stem: bool) -> (TempDir, Router) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("fast.txt"), "Rust programs are running fast").unwrap();
    let app = build_app(AppConfig { corpus: dir.path().to_path_buf(), pagerank: None, kgram_k: 2, stem }).unwrap();
    (dir, app)
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = call(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn doc_ids(json: &Value) -> Vec<u64> {
    json["results"].as_array().unwrap().iter().map(|r| r["doc_id"].as_u64().unwrap()).collect()
}

#[tokio::test]
async fn tf_idf_search_returns_ranked_results() {
    let (_dir, app) = build_tiny_corpus();
    let (status, json) = get(app, "/search?q=rust&type=ranked&ranking=tf_idf&k=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 2);
    // a.txt: tf 2 over 6 tokens beats b.txt: tf 1 over 4 tokens
    assert_eq!(doc_ids(&json), vec![0, 1]);
}

#[tokio::test]
async fn pagerank_search_orders_by_pagerank() {
    let (_dir, app) = build_tiny_corpus();
    let (status, json) = get(app, "/search?q=rust&type=ranked&ranking=pagerank").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc_ids(&json), vec![1, 0]);
}

#[tokio::test]
async fn phrase_search_reports_end_offsets() {
    let (_dir, app) = build_tiny_corpus();
    let (status, json) = get(app, "/search?q=rust+programming&type=phrase").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc_ids(&json), vec![1]);
    assert_eq!(json["results"][0]["offsets"], serde_json::json!([2]));
}

#[tokio::test]
async fn intersection_with_unknown_term_is_not_found() {
    let (_dir, app) = build_tiny_corpus();
    let (status, _) = get(app, "/search?q=rust+haskell&type=intersection").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn kgram_lookup_and_wildcard() {
    let (_dir, app) = build_tiny_corpus();
    let (status, json) = get(app.clone(), "/kgram?grams=ru+st").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["terms"], serde_json::json!(["rust"]));

    let (status, json) = get(app.clone(), "/kgram?pattern=gr*").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["terms"], serde_json::json!(["great"]));

    let (status, _) = get(app, "/kgram?grams=rus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feedback_reranks_with_expanded_query() {
    let (_dir, app) = build_tiny_corpus();
    let body = serde_json::json!({ "q": "programming", "relevant": [1] }).to_string();
    let req = Request::post("/feedback").header(header::CONTENT_TYPE, "application/json").body(Body::from(body)).unwrap();
    let (status, bytes) = call(app, req).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    let terms: Vec<&str> = json["query"].as_array().unwrap().iter().map(|t| t["term"].as_str().unwrap()).collect();
    assert_eq!(terms[0], "programming");
    assert!(terms.contains(&"systems"));
}

#[tokio::test]
async fn query_case_is_folded_like_documents() {
    let (_dir, app) = build_single_doc(false);
    let (status, json) = get(app, "/search?q=Rust&type=ranked").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["query"][0]["term"], "rust");
}

#[tokio::test]
async fn stemmed_corpus_matches_inflected_query() {
    let (_dir, app) = build_single_doc(true);
    let (status, json) = get(app.clone(), "/search?q=Running&type=ranked").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 1);

    let (status, json) = get(app, "/search?q=programs+running&type=phrase").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc_ids(&json), vec![0]);
}

#[tokio::test]
async fn wildcard_is_an_alternative_in_boolean_queries() {
    let (_dir, app) = build_tiny_corpus();
    let (status, json) = get(app.clone(), "/search?q=progr*+today&type=intersection").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc_ids(&json), vec![1]);

    let (status, json) = get(app, "/search?q=rust+progr*&type=phrase").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc_ids(&json), vec![1]);
}
