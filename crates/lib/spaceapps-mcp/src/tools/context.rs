use rmcp::{
    ErrorData,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{SpaceAppsMcp, helpers};

/// Payload listing the MCP commands and the bundle workflow.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub commands: Vec<String>,
    pub bundle_workflow: Vec<String>,
}

impl Default for HelpCommands {
    fn default() -> Self {
        Self {
            commands: vec![
                "help - List MCP commands and the AppEEARS bundle workflow.".to_string(),
                "health - Check that the MCP server is up.".to_string(),
                "list_elastic_indices - List all Elasticsearch indices.".to_string(),
                "search_elastic_index - Search an index with a query DSL object.".to_string(),
                "ingest_elastic_document - Index one JSON document.".to_string(),
                "bulk_ingest_elastic - Index many JSON documents in one request.".to_string(),
                "list_appears_products - List AppEEARS products.".to_string(),
                "get_appears_layers - List the layers of a product_and_version.".to_string(),
                "submit_appears_point_request - Submit a point-sample task.".to_string(),
                "get_appears_task_status - Get the status of a task.".to_string(),
                "download_appears_task - Download the bundle of a completed task.".to_string(),
                "submit_appears_job_tool - Submit a point-sample job.".to_string(),
                "check_job_status_tool - Check a job's status.".to_string(),
                "get_job_progress_tool - Get a job's progress and elapsed time.".to_string(),
                "get_job_details_tool - Get a job's parameters and full API response.".to_string(),
                "list_appears_jobs_tool - List jobs with optional limit/offset.".to_string(),
                "list_bundle_files_tool - List the files of a completed job.".to_string(),
                "download_job_results_tool - Download every file of a completed job.".to_string(),
                "cancel_appears_job_tool - Cancel a job that has not finished.".to_string(),
            ],
            bundle_workflow: vec![
                "1. Submit with submit_appears_job_tool (or submit_appears_point_request).".to_string(),
                "2. Poll check_job_status_tool until job_status is completed.".to_string(),
                "3. Call list_bundle_files_tool to see the files available.".to_string(),
                "4. Call download_job_results_tool to save them into task_{job_id}.".to_string(),
            ],
        }
    }
}

#[tool_router(router = tool_router_context, vis = "pub")]
impl SpaceAppsMcp {
    #[tool(description = "List the MCP commands and the AppEEARS bundle workflow.")]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        helpers::success(HelpCommands::default())
    }
}
