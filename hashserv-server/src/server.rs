use crate::config::Config;
use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use hashserv_core::{
    ContentStore, HashservError, ListFilesOperation, ReadFileOperation, ReadFileOperationOutcome,
    ReadFileOperationRequest, Result, StagingArea, StoredObject, UploadFileOperation,
    UploadFileOperationRequest,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

const UPLOAD_FIELD: &str = "file";

pub struct ServerState {
    pub upload: UploadFileOperation,
    pub read: ReadFileOperation,
    pub list: ListFilesOperation,
    pub config: Config,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    digest: String,
    file_name: String,
    size_bytes: u64,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    count: usize,
    files: Vec<StoredObject>,
}

impl ServerState {
    /// Open the staging area and content store described by `config`,
    /// creating their directories.
    pub fn open(config: Config) -> Result<Self> {
        let staging = Arc::new(StagingArea::new(config.store.process_dir.clone())?);
        let store = Arc::new(ContentStore::new(config.store.data_dir.clone())?);

        Ok(Self {
            upload: UploadFileOperation::new(&config.store, staging, store.clone()),
            read: ReadFileOperation::new(store.clone()),
            list: ListFilesOperation::new(store),
            config,
        })
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let staging = StagingArea::new(config.store.process_dir.clone())?;
    staging.purge_orphans().await?;

    let bind_addr = config.server.bind_addr.clone();
    let state = Arc::new(ServerState::open(config)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(list_files))
        .route("/api/upload", post(upload_file))
        .route("/api/download/:digest", get(download_file))
        .route("/api/serve/:digest/:extension", get(serve_file))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", error);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining in-flight requests");
}

async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

async fn list_files(State(state): State<Arc<ServerState>>) -> Response {
    match state.list.run().await {
        Ok(result) => {
            let resp = ApiResponse {
                success: true,
                data: Some(ListResponse {
                    count: result.items.len(),
                    files: result.items,
                }),
                error: None,
            };
            (StatusCode::OK, axum::Json(resp)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn upload_file(State(state): State<Arc<ServerState>>, mut multipart: Multipart) -> Response {
    let mut request = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return api_error(e.status(), e.to_string()),
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let body: Bytes = match field.bytes().await {
            Ok(body) => body,
            Err(e) => return api_error(e.status(), e.to_string()),
        };

        request = Some(UploadFileOperationRequest { file_name, body });
        break;
    }

    let Some(request) = request else {
        return api_error(
            StatusCode::BAD_REQUEST,
            format!("missing multipart field '{}'", UPLOAD_FIELD),
        );
    };

    match state.upload.run(request).await {
        Ok(result) => {
            let resp = ApiResponse {
                success: true,
                data: Some(UploadResponse {
                    digest: result.digest.to_string(),
                    file_name: result.file_name,
                    size_bytes: result.size_bytes,
                }),
                error: None,
            };
            (StatusCode::OK, axum::Json(resp)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn download_file(
    State(state): State<Arc<ServerState>>,
    Path(digest): Path<String>,
) -> Response {
    read_file(&state, digest, None).await
}

async fn serve_file(
    State(state): State<Arc<ServerState>>,
    Path((digest, extension)): Path<(String, String)>,
) -> Response {
    read_file(&state, digest, Some(extension)).await
}

async fn read_file(state: &ServerState, digest: String, extension: Option<String>) -> Response {
    let request = ReadFileOperationRequest { digest, extension };

    let result = match state.read.run(request).await {
        Ok(ReadFileOperationOutcome::Found(result)) => result,
        Ok(ReadFileOperationOutcome::NotFound) => {
            return api_error(StatusCode::NOT_FOUND, "file not found".to_string());
        }
        Err(e) => return error_response(e),
    };

    let digest = result.digest.to_string();
    let cache_headers = [
        (header::ETAG, format!("\"{}\"", digest)),
        (
            header::CACHE_CONTROL,
            "public, max-age=31536000, immutable".to_string(),
        ),
    ];

    match result.media_type {
        Some(media_type) => (
            StatusCode::OK,
            cache_headers,
            [(header::CONTENT_TYPE, media_type.to_string())],
            result.body,
        )
            .into_response(),
        None => (
            StatusCode::OK,
            cache_headers,
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", digest),
                ),
            ],
            result.body,
        )
            .into_response(),
    }
}

fn api_error(status: StatusCode, message: String) -> Response {
    let resp = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(message),
    };
    (status, axum::Json(resp)).into_response()
}

fn error_response(error: HashservError) -> Response {
    let status = match &error {
        HashservError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        // Malformed keys cannot name a stored object.
        HashservError::InvalidDigest(_) | HashservError::NotFound(_) => StatusCode::NOT_FOUND,
        HashservError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        HashservError::Io(_) | HashservError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
    } else {
        tracing::debug!("Request rejected: {}", error);
    }

    api_error(status, error.to_string())
}
