//! JSON HTTP API.
//!
//! Holds documents in an in-memory [`DocumentStore`] and answers context
//! requests against them, or against text supplied inline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/documents` | Store a document `{title?, text}` and chunk it |
//! | `GET`  | `/documents` | List stored documents |
//! | `GET`  | `/documents/{id}/chunks` | Current chunk list of a document |
//! | `GET`  | `/documents/{id}/stats` | Chunk statistics of a document |
//! | `POST` | `/documents/{id}/rechunk` | Re-chunk one document |
//! | `POST` | `/documents/rechunk` | Re-chunk every document |
//! | `POST` | `/documents/{id}/context` | Context for `{query, topK?, maxContextLength?}` |
//! | `POST` | `/context` | Context for `{query, text, topK?, maxContextLength?}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//! Rating failures are never errors; they show up in the bundle metadata.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docqa_context_core::models::{Chunk, ContextBundle};
use docqa_context_core::pipeline::{get_relevant_context, ContextSource, RetrievalOptions};
use docqa_context_core::rater::Rater;
use docqa_context_core::stats::{chunk_stats, ChunkStats};
use docqa_context_core::store::memory::InMemoryDocumentStore;
use docqa_context_core::store::{
    ingest_document, rechunk_all, rechunk_document, Document, DocumentStore, DocumentSummary,
    RechunkReport,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::rater::create_rater;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
    rater: Arc<dyn Rater>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>, rater: Arc<dyn Rater>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            rater,
        }
    }
}

/// Build the router with CORS open to all origins.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents", post(handle_create_document).get(handle_list_documents))
        .route("/documents/rechunk", post(handle_rechunk_all))
        .route("/documents/{id}/chunks", get(handle_document_chunks))
        .route("/documents/{id}/stats", get(handle_document_stats))
        .route("/documents/{id}/rechunk", post(handle_rechunk_document))
        .route("/documents/{id}/context", post(handle_document_context))
        .route("/context", post(handle_inline_context))
        .layer(cors)
        .with_state(state)
}

/// Start the server on `[server].bind` with an empty in-memory store.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let rater = create_rater(&config.rater)?;
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let bind_addr = config.server.bind.clone();
    let app = build_router(AppState::new(config.clone(), store, rater));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        addr = %bind_addr,
        rater = %config.rater.provider,
        "docqa server listening"
    );
    println!("docqa server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

/// Store errors carry no type information; map by message.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        if message.contains("not found") {
            not_found(message)
        } else {
            tracing::error!(error = %message, "request failed");
            AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal",
                message,
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    rater: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rater: state.rater.name().to_string(),
    })
}

// ============ /documents ============

#[derive(Deserialize)]
struct CreateDocumentRequest {
    #[serde(default)]
    title: Option<String>,
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentCreated {
    id: String,
    title: Option<String>,
    content_hash: String,
    chunk_count: usize,
}

async fn handle_create_document(
    State(state): State<AppState>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentCreated>), AppError> {
    let doc = Document::new(req.title, req.text);
    let set = ingest_document(state.store.as_ref(), &doc, &state.config.chunking_options()).await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentCreated {
            id: doc.id,
            title: doc.title,
            content_hash: doc.content_hash,
            chunk_count: set.chunks.len(),
        }),
    ))
}

#[derive(Serialize)]
struct DocumentList {
    documents: Vec<DocumentSummary>,
}

async fn handle_list_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentList>, AppError> {
    Ok(Json(DocumentList {
        documents: state.store.list_documents().await?,
    }))
}

/// Current chunks of `id`; a stored but never-chunked document has none.
async fn load_chunks(state: &AppState, id: &str) -> Result<Arc<[Chunk]>, AppError> {
    if state.store.get_document(id).await?.is_none() {
        return Err(not_found(format!("document not found: {}", id)));
    }
    Ok(match state.store.chunks(id).await? {
        Some(set) => set.chunks,
        None => Arc::from(Vec::new()),
    })
}

#[derive(Serialize)]
struct ChunkList {
    id: String,
    chunks: Vec<Chunk>,
}

async fn handle_document_chunks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChunkList>, AppError> {
    let chunks = load_chunks(&state, &id).await?;
    Ok(Json(ChunkList {
        id,
        chunks: chunks.to_vec(),
    }))
}

async fn handle_document_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChunkStats>, AppError> {
    let chunks = load_chunks(&state, &id).await?;
    Ok(Json(chunk_stats(&chunks)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Rechunked {
    id: String,
    chunk_count: usize,
}

async fn handle_rechunk_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Rechunked>, AppError> {
    let set = rechunk_document(state.store.as_ref(), &id, &state.config.chunking_options()).await?;
    Ok(Json(Rechunked {
        id,
        chunk_count: set.chunks.len(),
    }))
}

async fn handle_rechunk_all(
    State(state): State<AppState>,
) -> Result<Json<RechunkReport>, AppError> {
    let report = rechunk_all(state.store.as_ref(), &state.config.chunking_options()).await?;
    Ok(Json(report))
}

// ============ Context ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentContextRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    max_context_length: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineContextRequest {
    query: String,
    text: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    max_context_length: Option<usize>,
}

/// Configured options with per-request overrides applied.
fn request_options(
    config: &Config,
    query: &str,
    top_k: Option<usize>,
    max_context_length: Option<usize>,
) -> Result<RetrievalOptions, AppError> {
    if query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let mut options = config.retrieval_options();
    if let Some(k) = top_k {
        if k == 0 {
            return Err(bad_request("topK must be >= 1"));
        }
        options.rank.top_k = k;
    }
    if let Some(max) = max_context_length {
        options.assemble.max_context_length = max;
    }
    Ok(options)
}

async fn handle_document_context(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DocumentContextRequest>,
) -> Result<Json<ContextBundle>, AppError> {
    let options = request_options(&state.config, &req.query, req.top_k, req.max_context_length)?;
    let chunks = load_chunks(&state, &id).await?;
    let bundle = get_relevant_context(
        &req.query,
        ContextSource::Chunks(&chunks),
        &options,
        state.rater.as_ref(),
    )
    .await;
    Ok(Json(bundle))
}

async fn handle_inline_context(
    State(state): State<AppState>,
    Json(req): Json<InlineContextRequest>,
) -> Result<Json<ContextBundle>, AppError> {
    let options = request_options(&state.config, &req.query, req.top_k, req.max_context_length)?;
    let bundle = get_relevant_context(
        &req.query,
        ContextSource::Text(&req.text),
        &options,
        state.rater.as_ref(),
    )
    .await;
    Ok(Json(bundle))
}
