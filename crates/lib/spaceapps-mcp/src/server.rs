//! MCP server runners for spaceapps-mcp.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use spaceapps_core::control::SpaceAppsControlPlane;
use tokio::net::TcpListener;
use tracing::info;

use crate::SpaceAppsMcp;

pub type ServeError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for the MCP streamable HTTP server.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

impl McpHttpServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
        }
    }

    #[must_use]
    pub const fn with_stateful_mode(mut self, stateful_mode: bool) -> Self {
        self.stateful_mode = stateful_mode;
        self
    }

    #[must_use]
    pub const fn with_sse_keep_alive(mut self, sse_keep_alive: Option<Duration>) -> Self {
        self.sse_keep_alive = sse_keep_alive;
        self
    }

    #[must_use]
    pub const fn with_sse_retry(mut self, sse_retry: Option<Duration>) -> Self {
        self.sse_retry = sse_retry;
        self
    }
}

impl Default for McpHttpServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8000)))
    }
}

/// Serves the MCP server over stdio.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio(control: Arc<SpaceAppsControlPlane>) -> Result<(), ServeError> {
    let service = SpaceAppsMcp::with_control(control);
    let (stdin, stdout) = stdio();
    info!("serving MCP over stdio");
    let running = serve_server(service, (stdin, stdout)).await?;
    let _ = running.waiting().await?;
    Ok(())
}

/// Builds the HTTP router: `/health` plus the MCP service nested at `/mcp`.
#[must_use]
pub fn router(control: Arc<SpaceAppsControlPlane>, config: &McpHttpServerConfig) -> Router {
    let service: StreamableHttpService<SpaceAppsMcp, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(SpaceAppsMcp::with_control(control.clone())),
            Arc::new(LocalSessionManager::default()),
            StreamableHttpServerConfig {
                sse_keep_alive: config.sse_keep_alive,
                sse_retry: config.sse_retry,
                stateful_mode: config.stateful_mode,
                ..Default::default()
            },
        );

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service("/mcp", service)
}

/// Serves the MCP server using streamable HTTP transport.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_streamable_http(
    control: Arc<SpaceAppsControlPlane>,
    config: McpHttpServerConfig,
) -> Result<(), ServeError> {
    let listener = TcpListener::bind(config.addr).await?;
    serve_streamable_http_on(listener, control, config).await
}

/// Serves streamable HTTP on an already-bound listener.
///
/// # Errors
/// Returns any server error.
pub async fn serve_streamable_http_on(
    listener: TcpListener,
    control: Arc<SpaceAppsControlPlane>,
    config: McpHttpServerConfig,
) -> Result<(), ServeError> {
    let app = router(control, &config);
    info!(addr = %listener.local_addr()?, "serving MCP over streamable HTTP at /mcp");
    axum::serve(listener, app).await?;
    Ok(())
}
