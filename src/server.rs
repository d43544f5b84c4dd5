//! Dashboard HTTP server.
//!
//! Exposes the index, search, activity feed, and scheduled tasks as a JSON
//! HTTP API for the dashboard UI. The scan root is always the configured
//! `workspace.root`; requests never choose it.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/index` | Scan listing (`?content=true` adds file content), or one file with `?path=` |
//! | `POST` | `/index` | Run a reindex pass (`{"fullReindex": bool, "prune": bool}`) |
//! | `GET`  | `/search` | Filtered search (`q`, `limit`, `fileType`, `sourceType`, `contentType`) |
//! | `GET`  | `/search/stats` | Index statistics |
//! | `GET`  | `/search/recent` | Most recently indexed chunks |
//! | `GET`  | `/search/files` | Indexed files grouped by path |
//! | `DELETE` | `/search/files?path=` | Clear the index for one file |
//! | `GET`  | `/activities` | Cursor page (`limit`, `cursor`, `actionType`) |
//! | `GET`  | `/activities/range` | Range query (`start`, `end`, `order`) |
//! | `GET`  | `/activities/stats` | Rolling window counters |
//! | `POST` | `/activities` | Log an activity |
//! | `GET`  | `/tasks` | Scheduled tasks (`status`, `from`, `to`) |
//! | `POST` | `/tasks` | Create a scheduled task |
//! | `POST` | `/tasks/{id}/status` | Update a task's status |
//! | `DELETE` | `/tasks/{id}` | Delete a scheduled task |
//! | `GET`  | `/calendar` | Calendar events by start time (`from`, `to`) |
//! | `POST` | `/calendar` | Create a calendar event |
//! | `GET`  | `/calendar/upcoming` | Next events from now (`limit`, default 10) |
//! | `DELETE` | `/calendar/{id}` | Delete a calendar event |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "actionType is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the dashboard can be
//! served from a different origin.
//!
//! Filesystem work (scans, file reads, previews) runs on the blocking pool.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use workspace_index_core::activity::{ActivityFeed, ActivityPage, ActivityQuery, ActivityStats};
use workspace_index_core::calendar::{self, CalendarFilter};
use workspace_index_core::models::{
    ActivityRecord, CalendarEvent, FileEntry, IndexedChunk, IndexedFile, NewActivity,
    NewCalendarEvent, NewScheduledTask, ScheduledTask, TaskStatus,
};
use workspace_index_core::search::{
    recent_indexed, search_with_context, SearchFilters, SearchHit, SearchRequest,
};
use workspace_index_core::stats::{index_stats, IndexStats};
use workspace_index_core::store::{IndexStore, SortOrder};
use workspace_index_core::tasks::{self, TaskFilter};
use workspace_index_core::CoreError;

use crate::config::Config;
use crate::indexer::{arm_deadline, now_ms, reindex, IndexerOptions, ReindexSummary};
use crate::scan::{read_workspace_file, scan_workspace, summarize_file, FileSummary, ScanOptions};
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<SqliteStore>,
    /// Held for the duration of a reindex pass.
    reindex_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, store: SqliteStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            reindex_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Starts the dashboard HTTP server.
///
/// Opens the database, applies migrations, binds to `[server].bind`, and
/// serves until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;

    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(config.clone(), SqliteStore::new(pool)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, root = %config.workspace.root.display(), "server listening");
    println!("Workspace Index server listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

/// Builds the router with every endpoint and permissive CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/index", get(handle_index_listing).post(handle_reindex))
        .route("/search", get(handle_search))
        .route("/search/stats", get(handle_search_stats))
        .route("/search/recent", get(handle_search_recent))
        .route(
            "/search/files",
            get(handle_indexed_files).delete(handle_clear_file),
        )
        .route(
            "/activities",
            get(handle_list_activities).post(handle_log_activity),
        )
        .route("/activities/range", get(handle_activity_range))
        .route("/activities/stats", get(handle_activity_stats))
        .route("/tasks", get(handle_list_tasks).post(handle_create_task))
        .route("/tasks/{id}", delete(handle_delete_task))
        .route("/tasks/{id}/status", post(handle_task_status))
        .route(
            "/calendar",
            get(handle_list_events).post(handle_create_event),
        )
        .route("/calendar/upcoming", get(handle_upcoming_events))
        .route("/calendar/{id}", delete(handle_delete_event))
        .layer(cors)
        .with_state(state)
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

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(_) => bad_request(err.to_string()),
            CoreError::NotFound(_) => not_found(err.to_string()),
        }
    }
}

/// Typed core errors keep their status; anything else is a 500.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<CoreError>() {
            Some(core) => core.clone().into(),
            None => {
                tracing::error!(error = %format!("{:#}", err), "request failed");
                internal(err.to_string())
            }
        }
    }
}

/// Deserialize a JSON body, reporting shape errors in the JSON error schema.
fn parse_body<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| bad_request(format!("invalid request body: {}", e)))
}

/// Run filesystem work off the async runtime.
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| internal(format!("blocking task failed: {}", e)))?
        .map_err(AppError::from)
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

// ============ GET /index ============

#[derive(Deserialize)]
struct IndexListingParams {
    #[serde(default)]
    content: bool,
    path: Option<String>,
}

#[derive(Serialize)]
struct ListedFile {
    #[serde(flatten)]
    entry: FileEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Serialize)]
struct FileContentResponse {
    path: String,
    content: String,
}

#[derive(Serialize)]
struct IndexListingResponse {
    root: String,
    count: usize,
    files: Vec<ListedFile>,
}

async fn handle_index_listing(
    State(state): State<AppState>,
    Query(params): Query<IndexListingParams>,
) -> Result<Response, AppError> {
    let root = state.config.workspace.root.clone();

    if let Some(path) = params.path {
        let content = {
            let root = root.clone();
            let path = path.clone();
            blocking(move || read_workspace_file(&root, &path)).await?
        };
        return Ok(Json(FileContentResponse { path, content }).into_response());
    }

    let scan = ScanOptions::from(&state.config.workspace);
    let with_content = params.content;
    let files = {
        let root = root.clone();
        blocking(move || list_files(&root, &scan, with_content)).await?
    };

    Ok(Json(IndexListingResponse {
        root: root.display().to_string(),
        count: files.len(),
        files,
    })
    .into_response())
}

fn list_files(
    root: &std::path::Path,
    scan: &ScanOptions,
    with_content: bool,
) -> anyhow::Result<Vec<ListedFile>> {
    let entries = scan_workspace(root, scan)?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            let content = if with_content {
                match read_workspace_file(root, &entry.path) {
                    Ok(c) => Some(c),
                    Err(err) => {
                        tracing::warn!(path = %entry.path, error = %err, "failed to read file");
                        None
                    }
                }
            } else {
                None
            };
            ListedFile { entry, content }
        })
        .collect())
}

// ============ POST /index ============

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ReindexRequest {
    full_reindex: bool,
    prune: Option<bool>,
}

#[derive(Serialize)]
struct ReindexResponse {
    #[serde(flatten)]
    summary: ReindexSummary,
    previews: Vec<FileSummary>,
}

async fn handle_reindex(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ReindexResponse>, AppError> {
    let req: ReindexRequest = parse_body(body)?;
    let config = &state.config;
    let root = &config.workspace.root;

    let mut options = IndexerOptions::from_config(config);
    options.full = req.full_reindex;
    if let Some(prune) = req.prune {
        options.prune_missing = prune;
    }

    let _guard = state.reindex_lock.lock().await;
    let cancel = CancellationToken::new();
    let _deadline = arm_deadline(
        &cancel,
        config.indexing.deadline_secs.map(Duration::from_secs),
    );
    let summary = reindex(state.store.as_ref(), root, &options, &cancel).await?;

    let previews = {
        let root = root.clone();
        let scan = options.scan.clone();
        blocking(move || summarize_all(&root, &scan)).await?
    };

    Ok(Json(ReindexResponse { summary, previews }))
}

fn summarize_all(root: &std::path::Path, scan: &ScanOptions) -> anyhow::Result<Vec<FileSummary>> {
    Ok(scan_workspace(root, scan)?
        .iter()
        .filter_map(|entry| match summarize_file(root, entry) {
            Ok(s) => Some(s),
            Err(err) => {
                tracing::warn!(path = %entry.path, error = %err, "failed to summarize file");
                None
            }
        })
        .collect())
}

// ============ GET /search ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
    file_type: Option<String>,
    source_type: Option<String>,
    content_type: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    count: usize,
    results: Vec<SearchHit>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let filters = SearchFilters::from_params(
        params.file_type.as_deref(),
        params.source_type.as_deref(),
        params.content_type.as_deref(),
    )?;
    let req = SearchRequest {
        query: &params.q,
        filters,
        limit: params.limit,
    };
    let results =
        search_with_context(state.store.as_ref(), &req, &state.config.retrieval_limits()).await?;
    Ok(Json(SearchResponse {
        count: results.len(),
        results,
    }))
}

async fn handle_search_stats(State(state): State<AppState>) -> Result<Json<IndexStats>, AppError> {
    Ok(Json(index_stats(state.store.as_ref()).await?))
}

#[derive(Deserialize)]
struct LimitParams {
    limit: Option<usize>,
}

async fn handle_search_recent(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<IndexedChunk>>, AppError> {
    let chunks = recent_indexed(
        state.store.as_ref(),
        params.limit,
        &state.config.retrieval_limits(),
    )
    .await?;
    Ok(Json(chunks))
}

// ============ /search/files ============

async fn handle_indexed_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<IndexedFile>>, AppError> {
    Ok(Json(state.store.indexed_files().await?))
}

#[derive(Deserialize)]
struct PathParams {
    path: Option<String>,
}

#[derive(Serialize)]
struct ClearResponse {
    path: String,
    removed: usize,
}

async fn handle_clear_file(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
) -> Result<Json<ClearResponse>, AppError> {
    let path = params
        .path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| bad_request("path is required"))?;
    let removed = state.store.clear_file(&path).await?;
    tracing::info!(path = %path, removed, "index cleared for file");
    Ok(Json(ClearResponse { path, removed }))
}

// ============ /activities ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityListParams {
    limit: Option<usize>,
    cursor: Option<i64>,
    action_type: Option<String>,
}

async fn handle_list_activities(
    State(state): State<AppState>,
    Query(params): Query<ActivityListParams>,
) -> Result<Json<ActivityPage>, AppError> {
    let feed = ActivityFeed::new(state.store.as_ref(), state.config.feed_settings());
    let page = feed
        .list(&ActivityQuery {
            limit: params.limit,
            cursor: params.cursor,
            action_type: params.action_type,
        })
        .await?;
    Ok(Json(page))
}

#[derive(Deserialize)]
struct RangeParams {
    start: i64,
    end: i64,
    #[serde(default)]
    order: SortOrder,
}

#[derive(Serialize)]
struct RangeResponse {
    count: usize,
    items: Vec<ActivityRecord>,
}

async fn handle_activity_range(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<RangeResponse>, AppError> {
    let feed = ActivityFeed::new(state.store.as_ref(), state.config.feed_settings());
    let items = feed
        .list_by_range(params.start, params.end, params.order)
        .await?;
    Ok(Json(RangeResponse {
        count: items.len(),
        items,
    }))
}

async fn handle_activity_stats(
    State(state): State<AppState>,
) -> Result<Json<ActivityStats>, AppError> {
    let feed = ActivityFeed::new(state.store.as_ref(), state.config.feed_settings());
    Ok(Json(feed.stats(now_ms()).await?))
}

async fn handle_log_activity(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<ActivityRecord>), AppError> {
    let activity: NewActivity = parse_body(body)?;
    let feed = ActivityFeed::new(state.store.as_ref(), state.config.feed_settings());
    let record = feed.log(activity, now_ms()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// ============ /tasks ============

#[derive(Deserialize)]
struct TaskListParams {
    status: Option<String>,
    from: Option<i64>,
    to: Option<i64>,
}

async fn handle_list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskListParams>,
) -> Result<Json<Vec<ScheduledTask>>, AppError> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<TaskStatus>)
        .transpose()?;
    let filter = TaskFilter {
        status,
        from: params.from,
        to: params.to,
    };
    Ok(Json(tasks::list(state.store.as_ref(), &filter).await?))
}

async fn handle_create_task(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<ScheduledTask>), AppError> {
    let new_task: NewScheduledTask = parse_body(body)?;
    let task = tasks::create(state.store.as_ref(), new_task).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Deserialize)]
struct TaskStatusBody {
    status: TaskStatus,
}

#[derive(Serialize)]
struct TaskStatusResponse {
    id: String,
    status: TaskStatus,
}

async fn handle_task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<TaskStatusResponse>, AppError> {
    let TaskStatusBody { status } = parse_body(body)?;
    tasks::update_status(state.store.as_ref(), &id, status).await?;
    Ok(Json(TaskStatusResponse { id, status }))
}

#[derive(Serialize)]
struct DeletedResponse {
    id: String,
    deleted: bool,
}

async fn handle_delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    tasks::delete(state.store.as_ref(), &id).await?;
    Ok(Json(DeletedResponse { id, deleted: true }))
}

// ============ /calendar ============

#[derive(Deserialize)]
struct CalendarListParams {
    from: Option<i64>,
    to: Option<i64>,
}

async fn handle_list_events(
    State(state): State<AppState>,
    Query(params): Query<CalendarListParams>,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    let filter = CalendarFilter {
        from: params.from,
        to: params.to,
    };
    Ok(Json(calendar::list(state.store.as_ref(), &filter).await?))
}

async fn handle_upcoming_events(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    let events = calendar::upcoming(state.store.as_ref(), now_ms(), params.limit).await?;
    Ok(Json(events))
}

async fn handle_create_event(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<CalendarEvent>), AppError> {
    let new_event: NewCalendarEvent = parse_body(body)?;
    let event = calendar::create(state.store.as_ref(), new_event).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn handle_delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    calendar::delete(state.store.as_ref(), &id).await?;
    Ok(Json(DeletedResponse { id, deleted: true }))
}
