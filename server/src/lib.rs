use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use ranksearch_core::corpus::{build_from_dir, Corpus};
use ranksearch_core::tokenizer::TokenizerConfig;
use ranksearch_core::{DocId, PageRankTable, PostingsList, QueryTerm, QueryType, RankingType, SearchError, Searcher};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct AppConfig {
    pub corpus: PathBuf,
    pub pagerank: Option<PathBuf>,
    pub kgram_k: i64,
    pub stem: bool,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(rename = "type", default = "default_query_type")]
    pub query_type: QueryType,
    #[serde(default)]
    pub ranking: RankingType,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }
fn default_query_type() -> QueryType { QueryType::Ranked }

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub q: String,
    #[serde(rename = "type", default = "default_query_type")]
    pub query_type: QueryType,
    #[serde(default)]
    pub ranking: RankingType,
    /// Ranks (0-based) of the results the user judged relevant.
    pub relevant: Vec<usize>,
    #[serde(default = "default_k")]
    pub k: usize,
    pub alpha: Option<f64>,
}

#[derive(Deserialize)]
pub struct KGramParams {
    pub grams: Option<String>,
    pub pattern: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: Vec<QueryTerm>,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub name: String,
    pub offsets: Vec<u32>,
}

#[derive(Serialize)]
pub struct KGramResponse {
    pub total_hits: usize,
    pub terms: Vec<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub corpus: Arc<Corpus>,
    pub pagerank: Arc<PageRankTable>,
}

impl AppState {
    fn searcher(&self) -> Searcher<'_> {
        let searcher = Searcher::new(&self.corpus.index, self.pagerank.clone());
        match &self.corpus.kgram {
            Some(kgram) => searcher.with_kgram_index(kgram),
            None => searcher,
        }
    }
}

type ApiError = (StatusCode, String);

pub fn build_app(config: AppConfig) -> Result<Router> {
    let tokenizer = if config.stem { TokenizerConfig::stemmed() } else { TokenizerConfig::default() };
    let corpus = build_from_dir(&config.corpus, tokenizer, Some(config.kgram_k))?;
    let pagerank = config.pagerank.as_ref().map(PageRankTable::load).unwrap_or_default();
    Ok(router(AppState { corpus: Arc::new(corpus), pagerank: Arc::new(pagerank) }))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/feedback", post(feedback_handler))
        .route("/kgram", get(kgram_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let searcher = state.searcher();
    let query = state.corpus.parse_query(&params.q);
    if query.is_empty() {
        let elapsed = start.elapsed();
        return Ok(Json(SearchResponse { query: vec![], took_s: elapsed.as_secs_f64(), total_hits: 0, results: vec![] }));
    }
    let results = searcher.search(&query, params.query_type, params.ranking).map_err(to_api_error)?;
    let elapsed = start.elapsed();
    Ok(Json(respond(&state, query.terms().to_vec(), results.as_ref(), params.k, elapsed.as_secs_f64())))
}

/// Runs the query, applies relevance feedback for the judged ranks and
/// returns the ranked results of the updated query.
pub async fn feedback_handler(State(state): State<AppState>, Json(req): Json<FeedbackRequest>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let searcher = state.searcher();
    let mut query = state.corpus.parse_query(&req.q);
    if let Some(alpha) = req.alpha {
        query = query.with_feedback_alpha(alpha);
    }
    let results = searcher
        .search(&query, req.query_type, req.ranking)
        .map_err(to_api_error)?
        .ok_or((StatusCode::NOT_FOUND, "no such term".to_string()))?;

    let mut relevant = vec![false; results.size()];
    for &rank in &req.relevant {
        match relevant.get_mut(rank) {
            Some(flag) => *flag = true,
            None => return Err((StatusCode::BAD_REQUEST, format!("rank {rank} is past the {} results", results.size()))),
        }
    }
    let mut query = searcher.expand_wildcards(&query).map_err(to_api_error)?;
    query.relevance_feedback(&results, &relevant, &state.corpus.documents());

    let reranked = searcher.search(&query, QueryType::Ranked, req.ranking).map_err(to_api_error)?;
    let elapsed = start.elapsed();
    Ok(Json(respond(&state, query.terms().to_vec(), reranked.as_ref(), req.k, elapsed.as_secs_f64())))
}

pub async fn kgram_handler(State(state): State<AppState>, Query(params): Query<KGramParams>) -> Result<Json<KGramResponse>, ApiError> {
    let kgram = state.corpus.kgram.as_ref().ok_or((StatusCode::NOT_FOUND, "k-gram index not built".to_string()))?;
    let terms: Vec<String> = match (&params.grams, &params.pattern) {
        (Some(grams), _) => kgram
            .search_str(grams)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
            .into_iter()
            .filter_map(|e| kgram.term_by_id(e.token_id).map(str::to_string))
            .collect(),
        (None, Some(pattern)) => kgram
            .wildcard(pattern)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
            .into_iter()
            .map(str::to_string)
            .collect(),
        (None, None) => return Err((StatusCode::BAD_REQUEST, "grams or pattern is required".into())),
    };
    Ok(Json(KGramResponse { total_hits: terms.len(), terms }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<u32>) -> Json<serde_json::Value> {
    if let Some(meta) = state.corpus.index.document(doc_id) {
        let mut obj = serde_json::json!({
            "doc_id": doc_id,
            "name": meta.name,
            "length": meta.length,
        });
        if let Ok(text) = std::fs::read_to_string(&meta.name) {
            obj["text"] = serde_json::Value::String(text);
        }
        return Json(obj);
    }
    Json(serde_json::json!({ "error": "not found" }))
}

fn respond(state: &AppState, query: Vec<QueryTerm>, results: Option<&PostingsList>, k: usize, took_s: f64) -> SearchResponse {
    let Some(results) = results else {
        return SearchResponse { query, took_s, total_hits: 0, results: vec![] };
    };
    let k = k.clamp(1, 100);
    let hits = results
        .iter()
        .take(k)
        .map(|e| SearchHit {
            doc_id: e.doc_id,
            score: e.score,
            name: state.corpus.index.document_name(e.doc_id).unwrap_or_default().to_string(),
            offsets: e.offsets.clone(),
        })
        .collect();
    SearchResponse { query, took_s, total_hits: results.size(), results: hits }
}

fn to_api_error(err: SearchError) -> ApiError {
    let status = match err {
        SearchError::UnknownTerm(_) => StatusCode::NOT_FOUND,
        SearchError::EmptyQuery | SearchError::KGram(_) => StatusCode::BAD_REQUEST,
        SearchError::UnknownDocument(_) | SearchError::MissingPageRank(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    tracing::debug!(error = %err, %status, "query rejected");
    (status, err.to_string())
}
