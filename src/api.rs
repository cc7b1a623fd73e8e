//! HTTP surface of the relay.
//!
//! Every handler performs exactly one or two external side effects and
//! returns their result; no state is kept between requests. Nothing here
//! tracks whether a dispatched remote command ever completes - the caller
//! sequences its own requests and polls the object store.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{
    Config, DOWNLOAD_URL_TTL_SECS, EXECUTION_TIMEOUT_SECS, UPLOAD_URL_TTL_SECS,
};
use crate::dispatch::{self, CommandDispatch};
use crate::error::RelayError;
use crate::storage::{self, ObjectStore, INPUT_PREFIX, OUTPUT_PREFIX};
use crate::{assets, proxy};

/// Shared application state, constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ObjectStore>,
    pub dispatch: Arc<dyn CommandDispatch>,
    pub http: reqwest::Client,
}

/// Build the router with every endpoint mounted. Unknown paths fall
/// through to the static frontend bundle.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/generate-presigned-url", post(generate_presigned_url))
        .route("/run-inference", post(run_inference))
        .route("/prepare-download", post(prepare_download))
        .route("/download-prepared-output", get(download_prepared_output))
        .route("/list-s3-files", get(list_s3_files))
        .route("/clear-folders", post(clear_folders));

    if state.config.upload_forward_url.is_some() {
        app = app.route("/upload", post(proxy::upload));
    }

    app.fallback_service(assets::spa_service(&state.config.frontend_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateUrlRequest {
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateUrlResponse {
    pub url: String,
    pub s3_key: String,
}

#[derive(Debug, Serialize)]
pub struct RunInferenceResponse {
    pub status: String,
    pub command_id: String,
}

#[derive(Debug, Serialize)]
pub struct PrepareDownloadResponse {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearFoldersResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Issue a time-limited upload URL for a client file.
///
/// POST /generate-presigned-url
async fn generate_presigned_url(
    State(state): State<AppState>,
    body: Result<Json<GenerateUrlRequest>, JsonRejection>,
) -> Result<Json<GenerateUrlResponse>, RelayError> {
    let file_name = match body {
        Ok(Json(request)) => request.file_name,
        Err(_) => None,
    }
    .ok_or(RelayError::MissingField("file_name"))?;

    let timestamp = chrono::Utc::now().timestamp();
    let s3_key = storage::input_object_key(&file_name, timestamp);

    let url = state
        .store
        .presigned_put_url(
            &s3_key,
            "application/gzip",
            Duration::from_secs(UPLOAD_URL_TTL_SECS),
        )
        .await?;

    info!("Issued upload URL for {}", s3_key);
    Ok(Json(GenerateUrlResponse { url, s3_key }))
}

/// Kick off the containerized segmentation run on the GPU host. Returns the
/// dispatch's acceptance token only; completion is never observed here.
///
/// POST /run-inference
async fn run_inference(
    State(state): State<AppState>,
) -> Result<Json<RunInferenceResponse>, RelayError> {
    let commands = dispatch::inference_commands(
        &state.config.remote_config,
        &state.config.storage_config.bucket,
    );

    let command_id = state
        .dispatch
        .dispatch(commands, Duration::from_secs(EXECUTION_TIMEOUT_SECS))
        .await?;

    info!("Inference dispatched (command {})", command_id);
    Ok(Json(RunInferenceResponse {
        status: "Inference started".to_string(),
        command_id,
    }))
}

/// Ask the GPU host to zip its output directory and push the archive to the
/// bucket. The filename is returned before the remote operation is known to
/// have completed; the caller polls the object store for it.
///
/// POST /prepare-download
async fn prepare_download(
    State(state): State<AppState>,
) -> Result<Json<PrepareDownloadResponse>, RelayError> {
    let filename = storage::output_archive_name(chrono::Utc::now().timestamp());
    let commands = dispatch::package_commands(
        &state.config.remote_config,
        &state.config.storage_config.bucket,
        &filename,
    );

    state
        .dispatch
        .dispatch(commands, Duration::from_secs(EXECUTION_TIMEOUT_SECS))
        .await?;

    info!("Output packaging dispatched for {}", filename);
    Ok(Json(PrepareDownloadResponse { filename }))
}

/// Issue a time-limited download URL for a packaged archive. The object is
/// not checked to exist first.
///
/// GET /download-prepared-output?filename=
async fn download_prepared_output(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<DownloadResponse>, RelayError> {
    let filename = query
        .filename
        .filter(|name| !name.is_empty())
        .ok_or(RelayError::MissingField("filename"))?;

    let url = state
        .store
        .presigned_get_url(
            &storage::output_object_key(&filename),
            Duration::from_secs(DOWNLOAD_URL_TTL_SECS),
        )
        .await?;

    info!("Issued download URL for {}", filename);
    Ok(Json(DownloadResponse { url, filename }))
}

/// List the staged input keys. One listing page only.
///
/// GET /list-s3-files
async fn list_s3_files(
    State(state): State<AppState>,
) -> Result<Json<ListFilesResponse>, RelayError> {
    let files = state.store.list_keys(INPUT_PREFIX).await?;
    Ok(Json(ListFilesResponse { files }))
}

/// Delete everything under both bucket prefixes, then ask the GPU host to
/// remove its local staging directories. Failure is reported in-band with a
/// 200 status; objects already deleted stay deleted.
///
/// POST /clear-folders
async fn clear_folders(State(state): State<AppState>) -> Json<ClearFoldersResponse> {
    match clear_all(&state).await {
        Ok(()) => Json(ClearFoldersResponse {
            success: true,
            error: None,
        }),
        Err(e) => {
            error!("Cleanup failed: {}", e);
            Json(ClearFoldersResponse {
                success: false,
                error: Some(e.to_string()),
            })
        }
    }
}

async fn clear_all(state: &AppState) -> Result<(), RelayError> {
    for prefix in [INPUT_PREFIX, OUTPUT_PREFIX] {
        let keys = state.store.list_keys(prefix).await?;
        for key in &keys {
            state.store.delete_key(key).await?;
        }
        info!("Cleared {} object(s) under {}", keys.len(), prefix);
    }

    let commands = dispatch::purge_commands(&state.config.remote_config);
    state
        .dispatch
        .dispatch(commands, Duration::from_secs(EXECUTION_TIMEOUT_SECS))
        .await?;

    Ok(())
}
