use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use loa_search_core::{
    collection_stats, ChromaStore, ChunkType, GeminiEmbedder, IndexingPipeline, IndexingSnapshot,
    IndexingStatus, SearchError, SearchFilters, SearchService, Section, VectorStore,
    EMBEDDING_DIMENSION, GEMINI_EMBEDDING_MODEL,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

const API_VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_RESULTS: usize = 5;
const MAX_RESULTS: usize = 20;

pub struct AppState {
    search: SearchService<GeminiEmbedder, ChromaStore>,
    pipeline: IndexingPipeline<GeminiEmbedder, ChromaStore>,
    stats_store: ChromaStore,
    status: IndexingStatus,
    collection: String,
    pdf_path: PathBuf,
}

impl AppState {
    pub fn new(
        chroma_url: &str,
        collection: &str,
        gemini_api_key: String,
        pdf_path: PathBuf,
    ) -> Result<Arc<Self>, SearchError> {
        let search = SearchService::new(
            GeminiEmbedder::new(gemini_api_key.clone()),
            ChromaStore::new(chroma_url, collection, EMBEDDING_DIMENSION)?,
        );
        let pipeline = IndexingPipeline::new(
            GeminiEmbedder::new(gemini_api_key),
            ChromaStore::new(chroma_url, collection, EMBEDDING_DIMENSION)?,
        )
        .with_collection_name(collection);
        let stats_store = ChromaStore::new(chroma_url, collection, EMBEDDING_DIMENSION)?;

        Ok(Arc::new(Self {
            search,
            pipeline,
            stats_store,
            status: IndexingStatus::new(),
            collection: collection.to_string(),
            pdf_path,
        }))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/api/health", get(handle_health))
        .route("/api/stats", get(handle_stats))
        .route("/api/search", post(handle_search_post).get(handle_search_get))
        .route("/api/reindex", post(handle_reindex))
        .route("/api/indexing-status", get(handle_indexing_status))
        .route("/api/clear", delete(handle_clear))
        .layer(Extension(state))
}

pub async fn run(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    info!("HTTP server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Unreachable collaborators map to 503 so clients can tell "no service"
/// apart from "no data"; bad input maps to 400.
fn error_status(error: &SearchError) -> StatusCode {
    match error {
        SearchError::Http(_) | SearchError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::Request(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(error: &SearchError) -> Json<Value> {
    Json(json!({ "error": error.to_string() }))
}

async fn handle_root() -> Json<Value> {
    Json(json!({
        "name": "LOA 2026 Semantic Search API",
        "version": API_VERSION,
        "endpoints": {
            "search": "/api/search",
            "stats": "/api/stats",
            "health": "/api/health",
            "reindex": "/api/reindex",
            "indexing_status": "/api/indexing-status",
            "clear": "/api/clear",
        },
    }))
}

async fn handle_health(
    Extension(state): Extension<Arc<AppState>>,
) -> (StatusCode, Json<Value>) {
    match state.stats_store.count().await {
        Ok(total_documents) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "collection_loaded": true,
                "total_documents": total_documents,
                "api_version": API_VERSION,
            })),
        ),
        Err(error) => {
            error!(error = %error, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "error",
                    "collection_loaded": false,
                    "api_version": API_VERSION,
                })),
            )
        }
    }
}

async fn handle_stats(Extension(state): Extension<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let stats = collection_stats(
        &state.stats_store,
        &state.collection,
        GEMINI_EMBEDDING_MODEL,
        EMBEDDING_DIMENSION,
    )
    .await;

    match stats {
        Ok(stats) => match serde_json::to_value(&stats) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(error) => {
                error!(error = %error, "stats serialization failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": error.to_string() })),
                )
            }
        },
        Err(error) => {
            error!(error = %error, "stats lookup failed");
            (error_status(&error), error_body(&error))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    query: String,
    #[serde(default = "default_n_results")]
    n_results: usize,
    #[serde(default)]
    filters: Option<SearchFilters>,
}

fn default_n_results() -> usize {
    DEFAULT_RESULTS
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: String,
    n_results: Option<usize>,
    section: Option<Section>,
    chunk_type: Option<ChunkType>,
}

async fn handle_search_post(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> (StatusCode, Json<Value>) {
    run_search(&state, &body.query, body.n_results, body.filters.as_ref()).await
}

async fn handle_search_get(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> (StatusCode, Json<Value>) {
    let filters = SearchFilters {
        section: params.section,
        chunk_type: params.chunk_type,
        ..Default::default()
    };
    let filters = (!filters.is_empty()).then_some(filters);

    run_search(
        &state,
        &params.query,
        params.n_results.unwrap_or(DEFAULT_RESULTS),
        filters.as_ref(),
    )
    .await
}

async fn run_search(
    state: &AppState,
    query: &str,
    n_results: usize,
    filters: Option<&SearchFilters>,
) -> (StatusCode, Json<Value>) {
    if query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "query must not be empty" })),
        );
    }
    if n_results == 0 || n_results > MAX_RESULTS {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("n_results must be between 1 and {MAX_RESULTS}")
            })),
        );
    }

    match state.search.search(query, n_results, filters).await {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            ),
        },
        Err(error) => {
            error!(error = %error, "search failed");
            (error_status(&error), error_body(&error))
        }
    }
}

async fn handle_reindex(
    Extension(state): Extension<Arc<AppState>>,
) -> (StatusCode, Json<Value>) {
    if state.status.start().is_err() {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "status": "error",
                "message": "indexing already in progress, check GET /api/indexing-status",
            })),
        );
    }

    if !state.pdf_path.exists() {
        let message = format!("pdf not found: {}", state.pdf_path.display());
        state.status.fail(message.as_str());
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "message": message })),
        );
    }

    let task_state = state.clone();
    tokio::spawn(async move {
        task_state.status.update(0, "processing pdf");
        match task_state.pipeline.index_pdf(&task_state.pdf_path).await {
            Ok(report) => {
                info!(
                    total_chunks = report.total_chunks,
                    total_inserted = report.total_inserted,
                    "reindex finished"
                );
                task_state.status.complete(report);
            }
            Err(error) => {
                error!(error = %error, "reindex failed");
                task_state.status.fail(error.to_string());
            }
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "started",
            "message": "indexing started in background, check GET /api/indexing-status",
        })),
    )
}

async fn handle_indexing_status(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<IndexingSnapshot> {
    Json(state.status.snapshot())
}

async fn handle_clear(Extension(state): Extension<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.stats_store.reset().await {
        Ok(documents_deleted) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "documents_deleted": documents_deleted,
            })),
        ),
        Err(error) => {
            error!(error = %error, "clear failed");
            (error_status(&error), error_body(&error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_backend_maps_to_service_unavailable() {
        let error = SearchError::NotReady("chroma offline".to_string());
        assert_eq!(error_status(&error), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_requests_map_to_bad_request() {
        let error = SearchError::Request("query is empty".to_string());
        assert_eq!(error_status(&error), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn backend_response_errors_map_to_internal() {
        let error = SearchError::BackendResponse {
            backend: "chroma".to_string(),
            details: "500 Internal Server Error".to_string(),
        };
        assert_eq!(error_status(&error), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn search_body_defaults_to_five_results() {
        let body: SearchBody =
            serde_json::from_value(json!({ "query": "educação" })).expect("valid body");
        assert_eq!(body.n_results, 5);
        assert!(body.filters.is_none());
    }

    #[test]
    fn search_body_accepts_filters() {
        let body: SearchBody = serde_json::from_value(json!({
            "query": "educação",
            "n_results": 3,
            "filters": { "section": "DESPESA", "chunk_type": "tabela" },
        }))
        .expect("valid body");

        let filters = body.filters.expect("filters present");
        assert_eq!(filters.section, Some(Section::Despesa));
        assert_eq!(filters.chunk_type, Some(ChunkType::Tabela));
    }
}
