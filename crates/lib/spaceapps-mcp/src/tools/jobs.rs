use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use spaceapps_types::schema::DEFAULT_JOB_TASK_NAME;
use tracing::info;

use super::appeears::{PointRequestParams, output_path};
use crate::{SpaceAppsMcp, helpers};

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct JobIdParams {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DownloadJobParams {
    pub job_id: String,
    /// Directory (or file path whose directory) receives the `task_{id}` folder.
    /// Defaults to the server's download directory.
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListJobsParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[tool_router(router = tool_router_jobs, vis = "pub")]
impl SpaceAppsMcp {
    #[tool(
        name = "submit_appears_job_tool",
        description = "Submit an AppEEARS point-sample job and return its job id. Dates are YYYY-MM-DD."
    )]
    async fn submit_appears_job(
        &self,
        Parameters(params): Parameters<PointRequestParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = params.into_request(DEFAULT_JOB_TASK_NAME)?;
        info!(tool = "submit_appears_job_tool", task_name = %request.task_name, "tool invoked");
        let result = self.control().submit_job(request).await;
        helpers::respond(
            "submit_appears_job_tool",
            result.map(|submission| {
                let message = format!(
                    "AppEEARS job submitted successfully. Job ID: {}",
                    submission.job_id
                );
                let mut body = json!(submission);
                body["message"] = json!(message);
                body
            }),
        )
    }

    #[tool(
        name = "check_job_status_tool",
        description = "Check the status of an AppEEARS job: pending, running, completed, failed or cancelled."
    )]
    async fn check_job_status(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let job_id = helpers::require("job_id", &params.job_id)?;
        info!(tool = "check_job_status_tool", job_id, "tool invoked");
        helpers::respond("check_job_status_tool", self.control().job_status(job_id).await)
    }

    #[tool(
        name = "download_job_results_tool",
        description = "Download all result files of a completed AppEEARS job through the bundle API."
    )]
    async fn download_job_results(
        &self,
        Parameters(params): Parameters<DownloadJobParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let job_id = helpers::require("job_id", &params.job_id)?;
        let target = output_path(params.output_path.as_deref());
        info!(tool = "download_job_results_tool", job_id, ?target, "tool invoked");
        let result = self.control().download_job(job_id, target.as_deref()).await;
        helpers::respond(
            "download_job_results_tool",
            result.map(|report| {
                let message = format!("Results downloaded successfully to {}", report.download_folder);
                let mut body = json!(report);
                body["job_id"] = json!(job_id);
                body["message"] = json!(message);
                body
            }),
        )
    }

    #[tool(
        name = "list_bundle_files_tool",
        description = "List the files in the bundle of a completed AppEEARS job."
    )]
    async fn list_bundle_files(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let job_id = helpers::require("job_id", &params.job_id)?;
        info!(tool = "list_bundle_files_tool", job_id, "tool invoked");
        helpers::respond("list_bundle_files_tool", self.control().job_bundle_files(job_id).await)
    }

    #[tool(
        name = "list_appears_jobs_tool",
        description = "List AppEEARS jobs for the configured account, with optional limit and offset."
    )]
    async fn list_appears_jobs(
        &self,
        Parameters(params): Parameters<ListJobsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        info!(tool = "list_appears_jobs_tool", limit = ?params.limit, offset = ?params.offset, "tool invoked");
        helpers::respond(
            "list_appears_jobs_tool",
            self.control().list_jobs(params.limit, params.offset).await,
        )
    }

    #[tool(
        name = "get_job_details_tool",
        description = "Get detailed information about an AppEEARS job, including its parameters and the full API response."
    )]
    async fn get_job_details(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let job_id = helpers::require("job_id", &params.job_id)?;
        info!(tool = "get_job_details_tool", job_id, "tool invoked");
        helpers::respond("get_job_details_tool", self.control().job_details(job_id).await)
    }

    #[tool(
        name = "cancel_appears_job_tool",
        description = "Cancel an AppEEARS job that has not finished."
    )]
    async fn cancel_appears_job(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let job_id = helpers::require("job_id", &params.job_id)?;
        info!(tool = "cancel_appears_job_tool", job_id, "tool invoked");
        let result = self.control().cancel_job(job_id).await;
        helpers::respond(
            "cancel_appears_job_tool",
            result.map(|cancellation| {
                let mut body = json!(cancellation);
                body["message"] = json!(format!("Job {job_id} cancelled successfully"));
                body
            }),
        )
    }

    #[tool(
        name = "get_job_progress_tool",
        description = "Get progress information and elapsed time for an AppEEARS job."
    )]
    async fn get_job_progress(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let job_id = helpers::require("job_id", &params.job_id)?;
        info!(tool = "get_job_progress_tool", job_id, "tool invoked");
        helpers::respond("get_job_progress_tool", self.control().job_progress(job_id).await)
    }
}
