/// Shared backend service for multi-client access.
///
/// One long-running process owns the sled database and serves every client
/// (CLI, MCP stdio server, scripts) over HTTP, so the database lock is never
/// contended. Clients detect it through `/health` and switch to remote mode.
///
/// # Endpoints
///
/// - `GET /health` - Liveness probe
/// - `POST /api/ask` - Ask a question about a user's documents
/// - `GET /api/documents?user_id=&project_id=` - List visible documents
/// - `POST /api/documents` - Upload extracted document text
/// - `DELETE /api/documents/{id}?user_id=` - Delete a document; uploader only
///
/// Store routes back `RemoteDocumentStore` in other tanya processes on the
/// same machine. They skip the library's ownership checks, which those
/// processes apply before calling them; keep the service on loopback.
///
/// - `GET|PUT|DELETE /api/store/documents/{id}` - Raw document records
/// - `GET /api/store/corpus?user_id=` - Full visible corpus
///
/// # Environment Variables
///
/// - `TANYA_LOG`: Set logging level (trace, debug, info, warn, error)
/// - `TANYA_DATA_DIR`: Override data directory location
/// - `TANYA_SERVICE_PORT`: Port (default: 3210)
/// - `TANYA_SERVICE_HOST`: Bind address (default: 127.0.0.1)
///

#[cfg(feature = "http-service")]
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};

#[cfg(feature = "http-service")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "http-service")]
use std::net::SocketAddr;

#[cfg(feature = "http-service")]
use tanya::{
    application::{
        AskRequest, AskResponse, DocumentListResponse, UploadDocumentRequest,
    },
    domain::{Document, DocumentSummary, DomainError},
    AppHandles,
};

#[cfg(feature = "http-service")]
use tokio_util::sync::CancellationToken;

#[cfg(feature = "http-service")]
use tracing::{error, info};

#[cfg(feature = "http-service")]
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(feature = "http-service")]
use uuid::Uuid;

// ============================================================================
// Data Types
// ============================================================================

#[cfg(feature = "http-service")]
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

#[cfg(feature = "http-service")]
#[derive(Debug, Deserialize)]
struct ListParams {
    user_id: String,
    project_id: Option<String>,
}

#[cfg(feature = "http-service")]
#[derive(Debug, Deserialize)]
struct UserParams {
    user_id: String,
}

#[cfg(feature = "http-service")]
#[derive(Debug)]
struct ApiError(DomainError);

#[cfg(feature = "http-service")]
impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::Validation(_) | DomainError::LimitExceeded(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Generation(_) => StatusCode::BAD_GATEWAY,
            DomainError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Storage(_) | DomainError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(feature = "http-service")]
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!(target: "tanya::service", %status, error = %self.0, "request failed");
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(feature = "http-service")]
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError(DomainError::other(err.to_string())))?
        .map_err(ApiError)
}

// ============================================================================
// HTTP Handlers
// ============================================================================

#[cfg(feature = "http-service")]
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "tanya-service"
    }))
}

#[cfg(feature = "http-service")]
async fn ask(
    State(state): State<AppHandles>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let result = state
        .query
        .ask(
            &payload.user_id,
            &payload.query,
            payload.project_id.as_deref(),
            &CancellationToken::new(),
        )
        .await
        .map_err(ApiError)?;

    Ok(Json(AskResponse {
        query: payload.query,
        result: result.map(|shared| (*shared).clone()),
    }))
}

#[cfg(feature = "http-service")]
async fn list_documents(
    State(state): State<AppHandles>,
    Query(params): Query<ListParams>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let library = state.library;
    let response =
        blocking(move || library.list(&params.user_id, params.project_id.as_deref())).await?;
    Ok(Json(response))
}

#[cfg(feature = "http-service")]
async fn upload_document(
    State(state): State<AppHandles>,
    Json(payload): Json<UploadDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentSummary>), ApiError> {
    let library = state.library;
    let summary = blocking(move || library.upload(payload)).await?;
    info!(target: "tanya::service", id = %summary.id, "document uploaded");
    Ok((StatusCode::CREATED, Json(summary)))
}

#[cfg(feature = "http-service")]
async fn get_document(
    State(state): State<AppHandles>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError> {
    let store = state.store;
    let document = blocking(move || store.get(id))
        .await?
        .ok_or_else(|| ApiError(DomainError::not_found(format!("document {id}"))))?;
    Ok(Json(document))
}

#[cfg(feature = "http-service")]
async fn put_document(
    State(state): State<AppHandles>,
    Path(id): Path<Uuid>,
    Json(document): Json<Document>,
) -> Result<StatusCode, ApiError> {
    if document.id != id {
        return Err(ApiError(DomainError::validation(
            "document id does not match path",
        )));
    }
    let store = state.store;
    blocking(move || store.persist(&document)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(feature = "http-service")]
async fn delete_document(
    State(state): State<AppHandles>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserParams>,
) -> Result<StatusCode, ApiError> {
    let library = state.library;
    blocking(move || library.remove(&params.user_id, id)).await?;
    info!(target: "tanya::service", %id, "document deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(feature = "http-service")]
async fn store_delete_document(
    State(state): State<AppHandles>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let store = state.store;
    blocking(move || store.remove(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(feature = "http-service")]
async fn corpus(
    State(state): State<AppHandles>,
    Query(params): Query<UserParams>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let store = state.store;
    let documents = blocking(move || store.fetch_documents(&params.user_id)).await?;
    Ok(Json(documents))
}

// ============================================================================
// Service Setup and Main
// ============================================================================

#[cfg(feature = "http-service")]
fn router(state: AppHandles) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/ask", post(ask))
        .route("/api/documents", get(list_documents).post(upload_document))
        .route("/api/documents/:id", delete(delete_document))
        .route(
            "/api/store/documents/:id",
            get(get_document)
                .put(put_document)
                .delete(store_delete_document),
        )
        .route("/api/store/corpus", get(corpus))
        .with_state(state)
}

#[cfg(feature = "http-service")]
async fn run_service() -> anyhow::Result<()> {
    use anyhow::Context;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("TANYA_LOG")
                .unwrap_or_else(|_| EnvFilter::new("info,tanya=debug")),
        )
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();

    info!(
        "Starting Tanya Backend Service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let handles = tokio::task::spawn_blocking(|| {
        let data_dir = tanya::resolve_data_dir()?;
        tanya::build_environment_local(&data_dir)
    })
    .await
    .context("initialization task panicked")?
    .context("failed to initialize application")?;

    info!("Data directory: {}", handles.data_dir.display());
    info!("Answer generator: {}", handles.query.generator_name());

    let app = router(handles);

    let (host, port) = tanya::service_endpoint();
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("invalid bind address")?;

    info!("Tanya Backend Service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server failed")?;

    info!("Tanya Backend Service stopped");
    Ok(())
}

#[cfg(feature = "http-service")]
#[tokio::main]
async fn main() {
    if let Err(err) = run_service().await {
        eprintln!("[tanya::service] Service failed: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "http-service"))]
fn main() {
    eprintln!("[tanya::service] Build with required features to enable the service.");
    eprintln!("Example: cargo build --release --bin tanya-service --features http-service");
    std::process::exit(1);
}
