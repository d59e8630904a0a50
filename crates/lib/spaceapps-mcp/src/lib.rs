//! MCP server implementation for spaceapps-mcp.
//!
//! This crate wires the Elasticsearch and `AppEEARS` adapters into rmcp tool
//! handlers and exposes the MCP-facing tool surface used by the explorer
//! agent.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, ServerCapabilities, ServerInfo};
use serde_json::json;
use spaceapps_core::control::SpaceAppsControlPlane;

pub use tools::appeears::{
    DownloadTaskParams,
    LayerParams,
    LocationId,
    LocationParams,
    PointRequestParams,
    ProductLayersParams,
    TaskIdParams,
};
pub use tools::context::HelpCommands;
pub use tools::elastic::{BulkIngestParams, IngestDocumentParams, SearchIndexParams};
pub use tools::jobs::{DownloadJobParams, JobIdParams, ListJobsParams};

const SERVER_INSTRUCTIONS: &str = r"spaceapps-mcp exposes Elasticsearch and NASA AppEEARS as MCP tools for environmental data exploration.

Workflow:
1. Explore stored data in Elasticsearch:
   - `list_elastic_indices`, then `search_elastic_index` with a query DSL object.
   - `ingest_elastic_document` / `bulk_ingest_elastic` to store new documents.
2. Discover AppEEARS data:
   - `list_appears_products`, then `get_appears_layers` for a `product_and_version` such as `MOD11A1.061`.
3. Request point samples:
   - `submit_appears_point_request` (or `submit_appears_job_tool`) with layers, locations and a
     `YYYY-MM-DD` date range. Submission returns a task id immediately.
4. Poll until the task is done:
   - `get_appears_task_status`, `check_job_status_tool`, `get_job_progress_tool`.
5. Fetch results through the bundle API:
   - `list_bundle_files_tool`, then `download_appears_task` or `download_job_results_tool`.

Notes:
- Every result is JSON with `status` set to `success` or `error`.
- Malformed arguments are rejected as invalid params.
- Use `help` for the tool list and `health` to check the server.";

/// MCP server wrapper around the control plane and tool routers.
#[derive(Clone)]
pub struct SpaceAppsMcp {
    tool_router: ToolRouter<Self>,
    control: Arc<SpaceAppsControlPlane>,
}

impl SpaceAppsMcp {
    /// Creates a new server owning the control plane.
    #[must_use]
    pub fn new(control: SpaceAppsControlPlane) -> Self {
        Self::with_control(Arc::new(control))
    }

    /// Creates a new server using a shared control plane handle.
    #[must_use]
    pub fn with_control(control: Arc<SpaceAppsControlPlane>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_elastic()
            + Self::tool_router_appeears()
            + Self::tool_router_jobs()
            + Self::tool_router_context();
        Self {
            tool_router,
            control,
        }
    }

    /// Names of every registered tool, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        names
    }

    pub(crate) fn control(&self) -> &SpaceAppsControlPlane {
        &self.control
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl SpaceAppsMcp {
    #[tool(description = "Health check. Returns status 'success' with 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        helpers::success(json!({
            "health": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }
}

#[tool_handler]
impl ServerHandler for SpaceAppsMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
