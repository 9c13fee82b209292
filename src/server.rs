//! Read-only dashboard HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Health check (returns version) |
//! | `GET` | `/api/conversations` | Search by `engagement`, `participant`, `limit` |
//! | `GET` | `/api/conversations/{uuid}` | Conversation detail with roster |
//! | `GET` | `/api/conversations/{uuid}/messages` | Messages and mentor response time |
//! | `GET` | `/api/stats` | Row counts |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "conversation not found: ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//! Store failures are logged and reported as a generic `internal` error.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! can be served from another origin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use convo_inspector_core::search::{ConversationFilter, ConversationListItem};
use convo_inspector_core::store::{DashboardStore, StoreStats};

use crate::config::Config;
use crate::conversations;
use crate::inspect::{self, ConversationDetail, MessagesView};
use crate::sqlite_store;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn DashboardStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DashboardStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

/// Build the dashboard router over any [`DashboardStore`].
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/conversations", get(handle_search))
        .route("/api/conversations/{uuid}", get(handle_detail))
        .route("/api/conversations/{uuid}/messages", get(handle_messages))
        .route("/api/stats", get(handle_stats))
        .layer(cors)
        .with_state(state)
}

/// Starts the dashboard server on `[server].bind` over the SQLite store.
///
/// Runs until Ctrl-C is received.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let store = sqlite_store::open(config).await?;
    let state = AppState::new(config.clone(), Arc::new(store));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("dashboard listening on http://{}", bind_addr);
    println!("Dashboard listening on http://{}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

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

/// Internal error type that converts into an Axum HTTP response.
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

fn internal() -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: "internal error".to_string(),
    }
}

/// Map an operation error onto a response: "not found" errors become 404,
/// everything else is logged and reported as 500.
fn classify_error(route: &str, err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    if msg.contains("not found") {
        not_found(msg)
    } else {
        tracing::error!(route, error = %format!("{:#}", err), "request failed");
        internal()
    }
}

fn parse_uuid(raw: &str) -> Result<(), AppError> {
    Uuid::parse_str(raw)
        .map(|_| ())
        .map_err(|_| bad_request(format!("invalid conversation uuid: {}", raw)))
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

// ============ GET /api/conversations ============

#[derive(Debug, Deserialize)]
struct SearchQuery {
    engagement: Option<String>,
    participant: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    conversations: Vec<ConversationListItem>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let filter = ConversationFilter {
        engagement: query.engagement,
        participant: query.participant,
    };
    let limit = state.config.dashboard.effective_limit(query.limit);

    let conversations = conversations::search(state.store.as_ref(), &filter, limit)
        .await
        .map_err(|e| classify_error("search", e))?;

    Ok(Json(SearchResponse { conversations }))
}

// ============ GET /api/conversations/{uuid} ============

async fn handle_detail(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<ConversationDetail>, AppError> {
    parse_uuid(&uuid)?;

    let detail = inspect::conversation_detail(state.store.as_ref(), &uuid)
        .await
        .map_err(|e| classify_error("detail", e))?;

    Ok(Json(detail))
}

// ============ GET /api/conversations/{uuid}/messages ============

async fn handle_messages(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    parse_uuid(&uuid)?;

    let (conversation_uuid, messages) = inspect::conversation_messages(
        state.store.as_ref(),
        &uuid,
        state.config.dashboard.message_limit,
    )
    .await
    .map_err(|e| classify_error("messages", e))?;

    let view = MessagesView::new(&conversation_uuid, &messages);
    let body = serde_json::to_value(&view).map_err(|e| classify_error("messages", e.into()))?;

    Ok(Json(body))
}

// ============ GET /api/stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<StoreStats>, AppError> {
    let stats = state
        .store
        .stats()
        .await
        .map_err(|e| classify_error("stats", e))?;
    Ok(Json(stats))
}
