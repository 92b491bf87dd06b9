//! HTTP JSON API over the project catalog and build pipeline.
//!
//! A thin shim: every handler resolves to one service-layer call. Suitable
//! for a local frontend — CORS is fully permissive.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/projects` | List all projects with derived metadata |
//! | `POST`   | `/projects/import` | Upload an archive (multipart) as a new project |
//! | `POST`   | `/projects/link` | Clone a remote repository as a new project |
//! | `POST`   | `/projects/{id}/sync` | Pull the latest remote state |
//! | `POST`   | `/projects/{id}/build` | Sync, then run the jobset outputs |
//! | `GET`    | `/projects/{id}/tree` | Materialized file tree (`?scope=` optional) |
//! | `GET`    | `/projects/{id}/file/{*path}` | Serve one file with its media type |
//! | `GET`    | `/projects/{id}/model/{*path}` | Cached 3D model conversion of a board file |
//! | `DELETE` | `/projects/{id}` | Remove the project directory |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "project not found: ..." } }
//! ```
//!
//! Codes: `bad_request` (400), `not_found` (404), `access_denied` (403),
//! `tool_unavailable` (500), `external_tool` (500), `internal` (500).

use axum::{
    extract::{Multipart, Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::build;
use crate::catalog;
use crate::config::Config;
use crate::convert::{self, ModelFormat};
use crate::error::Error;
use crate::ingest;
use crate::models::Project;
use crate::store::ContentStore;
use crate::tree;
use crate::vcs;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<ContentStore>,
}

/// Start the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let store = Arc::new(ContentStore::new(config.store.root.clone()));
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/projects", get(handle_list_projects))
        .route("/projects/import", post(handle_import))
        .route("/projects/link", post(handle_link))
        .route("/projects/{id}/sync", post(handle_sync))
        .route("/projects/{id}/build", post(handle_build))
        .route("/projects/{id}/tree", get(handle_tree))
        .route("/projects/{id}/file/{*path}", get(handle_file))
        .route("/projects/{id}/model/{*path}", get(handle_model))
        .route("/projects/{id}", delete(handle_delete))
        .layer(cors)
        .with_state(state);

    info!(bind = %bind_addr, "workbench server listening");
    println!("Workbench server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
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

/// Internal error type that converts into an HTTP response.
struct AppError {
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

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::ProjectNotFound(_) | Error::FileNotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            Error::UnsupportedFormat(_) | Error::InvalidUrl(_) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            Error::AccessDenied(_) => (StatusCode::FORBIDDEN, "access_denied"),
            Error::ToolUnavailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, "tool_unavailable"),
            Error::BuildFailed(_)
            | Error::CloneFailed(_)
            | Error::SyncFailed(_)
            | Error::IngestionFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "external_tool"),
            Error::DeletionFailed(_) | Error::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        AppError {
            status,
            code,
            message: err.to_string(),
        }
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

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /projects ============

#[derive(Serialize)]
struct ProjectListResponse {
    projects: Vec<Project>,
}

async fn handle_list_projects(State(state): State<AppState>) -> Json<ProjectListResponse> {
    Json(ProjectListResponse {
        projects: catalog::list_projects(&state.store),
    })
}

// ============ POST /projects/import ============

#[derive(Serialize)]
struct ImportResponse {
    id: String,
}

/// Accepts a multipart upload; the first field carrying a filename is taken
/// as the archive.
async fn handle_import(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;

        let id = ingest::ingest_from_archive(&state.store, Cursor::new(bytes), &filename)?;
        return Ok(Json(ImportResponse { id }));
    }

    Err(bad_request("no file field in multipart body"))
}

// ============ POST /projects/link ============

#[derive(Deserialize)]
struct LinkRequest {
    url: String,
}

async fn handle_link(
    State(state): State<AppState>,
    Json(req): Json<LinkRequest>,
) -> Result<Json<crate::models::CloneOutcome>, AppError> {
    let outcome = ingest::ingest_from_remote(&state.store, &req.url)?;
    Ok(Json(outcome))
}

// ============ POST /projects/{id}/sync ============

async fn handle_sync(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<crate::models::SyncOutcome>, AppError> {
    let outcome = vcs::sync(&state.store, &id)?;
    Ok(Json(outcome))
}

// ============ POST /projects/{id}/build ============

async fn handle_build(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<crate::models::BuildOutcome>, AppError> {
    let outcome = build::run_build(&state.config, &state.store, &id).await?;
    Ok(Json(outcome))
}

// ============ GET /projects/{id}/tree ============

#[derive(Deserialize)]
struct TreeQuery {
    scope: Option<String>,
}

async fn handle_tree(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<std::collections::BTreeMap<String, Vec<crate::models::TreeNode>>>, AppError> {
    let tree = tree::get_tree(&state.store, &id, query.scope.as_deref())?;
    Ok(Json(tree))
}

// ============ GET /projects/{id}/file/{*path} ============

async fn handle_file(
    State(state): State<AppState>,
    AxumPath((id, path)): AxumPath<(String, String)>,
) -> Result<Response, AppError> {
    let (bytes, media_type) = tree::get_file(&state.store, &id, &path)?;
    Ok(([(header::CONTENT_TYPE, media_type)], bytes).into_response())
}

// ============ GET /projects/{id}/model/{*path} ============

#[derive(Deserialize)]
struct ModelQuery {
    format: Option<String>,
}

/// Converts a board file to a web-viewable model, serving the cached
/// artifact when fresh. Absence of a preview is a 404, not a server error.
async fn handle_model(
    State(state): State<AppState>,
    AxumPath((id, path)): AxumPath<(String, String)>,
    Query(query): Query<ModelQuery>,
) -> Result<Response, AppError> {
    let format = match query.format.as_deref() {
        Some(s) => s
            .parse::<ModelFormat>()
            .map_err(|e| bad_request(e.to_string()))?,
        None => ModelFormat::Glb,
    };

    let root = state.store.require_project(&id)?;
    let source = tree::resolve_within(&root, &path)?;

    let Some(converted) = convert::get_or_convert(&state.config, &root, &source, format).await
    else {
        return Err(not_found(format!("no preview available for {}", path)));
    };

    let bytes = std::fs::read(&converted).map_err(Error::Io)?;
    Ok((
        [(header::CONTENT_TYPE, tree::media_type_for(&converted))],
        bytes,
    )
        .into_response())
}

// ============ DELETE /projects/{id} ============

#[derive(Serialize)]
struct DeleteResponse {
    id: String,
    message: String,
}

async fn handle_delete(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    catalog::delete_project(&state.store, &id)?;
    Ok(Json(DeleteResponse {
        id,
        message: "project deleted".to_string(),
    }))
}
