//! HTTP front end for the spaceapps data explorer.
//!
//! Exposes exploration runs and per-thread conversation memory as JSON
//! endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use spaceapps_agent::config::DEFAULT_WEB_THREAD_ID;
use spaceapps_agent::{AgentError, AgentEvent, Checkpoint, ExplorerSession, ThreadSummary};
use tokio::net::TcpListener;
use tracing::{error, info};

const RECENT_CHECKPOINTS: usize = 5;

/// Configuration for the explorer HTTP server.
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    pub addr: SocketAddr,
    pub max_body_bytes: usize,
    /// Upper bound on one exploration run; `None` lets runs take as long as they need.
    pub request_timeout: Option<Duration>,
}

impl WebServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            max_body_bytes: 1024 * 1024,
            request_timeout: Some(Duration::from_secs(600)),
        }
    }

    #[must_use]
    pub const fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, request_timeout: Option<Duration>) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 7860)))
    }
}

/// Explorer HTTP server wrapper.
pub struct WebServer {
    config: WebServerConfig,
    state: AppState,
}

impl WebServer {
    #[must_use]
    pub const fn new(session: Arc<ExplorerSession>, config: WebServerConfig) -> Self {
        let state = AppState {
            session,
            request_timeout: config.request_timeout,
        };
        Self { config, state }
    }

    /// Runs the HTTP server until shutdown.
    ///
    /// # Errors
    /// Returns any listener or server error.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.addr;
        let listener = TcpListener::bind(addr).await?;
        let app = build_router(self.state, self.config.max_body_bytes);

        info!("data explorer listening on {addr}");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Builds the router without binding a listener.
#[must_use]
pub fn router(session: Arc<ExplorerSession>, config: &WebServerConfig) -> Router {
    build_router(
        AppState {
            session,
            request_timeout: config.request_timeout,
        },
        config.max_body_bytes,
    )
}

#[derive(Clone)]
struct AppState {
    session: Arc<ExplorerSession>,
    request_timeout: Option<Duration>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn timeout() -> Self {
        Self {
            status: StatusCode::REQUEST_TIMEOUT,
            message: "exploration request timed out".to_string(),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        let status = match &err {
            AgentError::StepLimit { .. } | AgentError::LoopDetected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AgentError::Configuration(_) | AgentError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AgentError::Mcp(_)
            | AgentError::ModelApi { .. }
            | AgentError::Authentication(_)
            | AgentError::Network(_)
            | AgentError::Serialization(_)
            | AgentError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: format!("Error: {err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse { error: self.message });
        (self.status, payload).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ExplorePayload {
    query: String,
    thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExploreResponse {
    thread_id: String,
    answer: String,
    events: Vec<AgentEvent>,
    checkpoint: Checkpoint,
}

#[derive(Debug, Serialize)]
struct ThreadView {
    thread_id: String,
    message_count: usize,
    summary: ThreadSummary,
    checkpoints: Vec<Checkpoint>,
}

#[derive(Debug, Serialize)]
struct ThreadCleared {
    thread_id: String,
    cleared: bool,
    message: String,
}

fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/explore", post(explore))
        .route("/threads/:thread_id", get(thread).delete(clear_thread))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn explore(
    State(state): State<AppState>,
    Json(payload): Json<ExplorePayload>,
) -> Result<Json<ExploreResponse>, ApiError> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("query is required"));
    }
    let thread_id = thread_or_default(payload.thread_id.as_deref());
    info!(thread_id, "exploration requested");

    let run = state.session.ask(thread_id, query, |_| {});
    let outcome = match state.request_timeout {
        Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| ApiError::timeout())?,
        None => run.await,
    };
    let reply = outcome.inspect_err(|err| error!(thread_id, error = %err, "exploration failed"))?;

    Ok(Json(ExploreResponse {
        thread_id: reply.thread_id,
        answer: reply.answer,
        events: reply.events,
        checkpoint: reply.checkpoint,
    }))
}

async fn thread(State(state): State<AppState>, Path(thread_id): Path<String>) -> Json<ThreadView> {
    let store = state.session.store();
    let summary = store.summary(&thread_id).await;
    Json(ThreadView {
        message_count: summary.message_count,
        checkpoints: store.recent_checkpoints(&thread_id, RECENT_CHECKPOINTS).await,
        summary,
        thread_id,
    })
}

async fn clear_thread(State(state): State<AppState>, Path(thread_id): Path<String>) -> Json<ThreadCleared> {
    let cleared = state.session.store().clear(&thread_id).await;
    info!(thread_id, cleared, "conversation cleared");
    let message = if cleared {
        "Conversation history cleared successfully."
    } else {
        "No conversation history for this thread."
    };
    Json(ThreadCleared {
        thread_id,
        cleared,
        message: message.to_string(),
    })
}

fn thread_or_default(thread_id: Option<&str>) -> &str {
    thread_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_WEB_THREAD_ID)
}
