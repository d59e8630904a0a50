use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spaceapps_types::{
    BundleFile,
    Coordinate,
    DownloadReport,
    JobStatus,
    LayerSelection,
    PointRequest,
    TaskRecord,
};
use tracing::{info, warn};

use crate::error::{AdapterError, AdapterResult, Service};

use super::SpaceAppsControlPlane;

/// Echo of an accepted job submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSubmission {
    pub job_id: String,
    pub job_status: JobStatus,
    pub task_name: String,
    pub layers: Vec<LayerSelection>,
    pub locations: Vec<Coordinate>,
    pub start_date: String,
    pub end_date: String,
}

/// Task fields surfaced alongside a job status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobTaskInfo {
    pub task_name: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub progress: Option<Value>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusView {
    pub job_id: String,
    pub job_status: JobStatus,
    pub api_status: String,
    pub elapsed_time: Option<f64>,
    pub task_info: JobTaskInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDetails {
    pub job_id: String,
    pub job_status: JobStatus,
    pub api_status: String,
    pub task_name: Option<String>,
    pub task_type: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub progress: Option<Value>,
    pub message: Option<String>,
    pub parameters: Option<Value>,
    pub download_url: Option<String>,
    pub elapsed_time: Option<f64>,
    pub full_response: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobProgress {
    pub job_id: String,
    pub job_status: JobStatus,
    pub is_terminal: bool,
    pub progress: Option<Value>,
    pub message: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_time_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_time_formatted: Option<String>,
}

/// One row of a job listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSummary {
    pub job_id: Option<String>,
    pub task_name: Option<String>,
    pub status: JobStatus,
    pub api_status: String,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub progress: Option<Value>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobListing {
    pub jobs: Vec<JobSummary>,
    pub total_jobs: usize,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleListing {
    pub job_id: String,
    pub files: Vec<BundleFile>,
    pub file_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobCancellation {
    pub job_id: String,
    pub job_status: JobStatus,
    pub response: Value,
}

impl JobTaskInfo {
    fn from_record(record: &TaskRecord) -> Self {
        Self {
            task_name: record.task_name.clone(),
            created: record.created.clone(),
            updated: record.updated.clone(),
            progress: record.progress.clone(),
            message: record.message.clone(),
        }
    }
}

impl JobStatusView {
    #[must_use]
    pub fn from_record(job_id: &str, record: &TaskRecord, now: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.to_string(),
            job_status: record.status.job_status(),
            api_status: record.api_status.clone(),
            elapsed_time: record.elapsed_seconds(now),
            task_info: JobTaskInfo::from_record(record),
        }
    }
}

impl JobDetails {
    #[must_use]
    pub fn from_record(job_id: &str, record: &TaskRecord, now: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.to_string(),
            job_status: record.status.job_status(),
            api_status: record.api_status.clone(),
            task_name: record.task_name.clone(),
            task_type: record.task_type.clone(),
            created: record.created.clone(),
            updated: record.updated.clone(),
            progress: record.progress.clone(),
            message: record.message.clone(),
            parameters: record.params.clone(),
            download_url: record
                .raw
                .get("download_url")
                .and_then(Value::as_str)
                .map(str::to_string),
            elapsed_time: record.elapsed_seconds(now),
            full_response: record.raw.clone(),
        }
    }
}

impl JobProgress {
    #[must_use]
    pub fn from_record(job_id: &str, record: &TaskRecord, now: DateTime<Utc>) -> Self {
        let elapsed = record.elapsed_seconds(now);
        Self {
            job_id: job_id.to_string(),
            job_status: record.status.job_status(),
            is_terminal: record.status.is_terminal(),
            progress: record.progress.clone(),
            message: record.message.clone(),
            created: record.created.clone(),
            updated: record.updated.clone(),
            elapsed_time_seconds: elapsed,
            elapsed_time_formatted: elapsed.map(|seconds| format!("{seconds:.0} seconds")),
        }
    }
}

impl From<TaskRecord> for JobSummary {
    fn from(record: TaskRecord) -> Self {
        Self {
            job_id: record.task_id,
            task_name: record.task_name,
            status: record.status.job_status(),
            api_status: record.api_status,
            created: record.created,
            updated: record.updated,
            progress: record.progress,
            message: record.message,
        }
    }
}

impl SpaceAppsControlPlane {
    /// Submits a point request as a job.
    ///
    /// # Errors
    /// Returns `AdapterError` if the request is invalid or submission fails.
    pub async fn submit_job(&self, request: PointRequest) -> AdapterResult<JobSubmission> {
        let job_id = self.appeears().submit_point_request(&request).await?;
        info!(job_id, "job submitted");
        Ok(JobSubmission {
            job_id,
            job_status: JobStatus::Pending,
            task_name: request.task_name,
            layers: request.layers,
            locations: request.coordinates,
            start_date: request.start_date.to_string(),
            end_date: request.end_date.to_string(),
        })
    }

    /// # Errors
    /// Returns `AdapterError` if the task cannot be read.
    pub async fn job_status(&self, job_id: &str) -> AdapterResult<JobStatusView> {
        let record = self.appeears().task_status(job_id).await?;
        Ok(JobStatusView::from_record(job_id, &record, Utc::now()))
    }

    /// # Errors
    /// Returns `AdapterError` if the task cannot be read.
    pub async fn job_details(&self, job_id: &str) -> AdapterResult<JobDetails> {
        let record = self.appeears().task_status(job_id).await?;
        Ok(JobDetails::from_record(job_id, &record, Utc::now()))
    }

    /// # Errors
    /// Returns `AdapterError` if the task cannot be read.
    pub async fn job_progress(&self, job_id: &str) -> AdapterResult<JobProgress> {
        let record = self.appeears().task_status(job_id).await?;
        Ok(JobProgress::from_record(job_id, &record, Utc::now()))
    }

    /// # Errors
    /// Returns `AdapterError` if the listing fails.
    pub async fn list_jobs(&self, limit: Option<u32>, offset: Option<u32>) -> AdapterResult<JobListing> {
        let jobs: Vec<JobSummary> = self
            .appeears()
            .list_tasks(limit, offset)
            .await?
            .into_iter()
            .map(JobSummary::from)
            .collect();
        Ok(JobListing {
            total_jobs: jobs.len(),
            jobs,
            limit,
            offset,
        })
    }

    /// Lists bundle files of a completed job.
    ///
    /// # Errors
    /// Returns `AdapterError` if the job is not completed or the listing fails.
    pub async fn job_bundle_files(&self, job_id: &str) -> AdapterResult<BundleListing> {
        self.require_completed(job_id).await?;
        let files = self.appeears().bundle_files(job_id).await?;
        Ok(BundleListing {
            job_id: job_id.to_string(),
            file_count: files.len(),
            files,
        })
    }

    /// Downloads results of a completed job.
    ///
    /// # Errors
    /// Returns `AdapterError` if the job is not completed or the download fails.
    pub async fn download_job(&self, job_id: &str, output_path: Option<&Path>) -> AdapterResult<DownloadReport> {
        self.require_completed(job_id).await?;
        self.download_task(job_id, output_path).await
    }

    /// Cancels a job that has not reached a terminal state.
    ///
    /// # Errors
    /// Returns `AdapterError` if the job is already terminal, or the service
    /// refuses or does not support cancellation.
    pub async fn cancel_job(&self, job_id: &str) -> AdapterResult<JobCancellation> {
        let status = self.appeears().task_status(job_id).await?.status.job_status();
        if status.is_terminal() {
            return Err(AdapterError::remote(
                Service::Appeears,
                format!("Cannot cancel job {job_id} - it is already {status}"),
            ));
        }

        match self.appeears().cancel_task(job_id).await {
            Ok(response) => Ok(JobCancellation {
                job_id: job_id.to_string(),
                job_status: JobStatus::Cancelled,
                response,
            }),
            Err(err) if err.http_status() == Some(405) => {
                warn!(job_id, "AppEEARS does not support cancellation");
                Err(AdapterError::Remote {
                    service: Service::Appeears,
                    status: Some(405),
                    message: "Job cancellation is not supported by the AppEEARS API".to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn require_completed(&self, job_id: &str) -> AdapterResult<()> {
        let status = self.appeears().task_status(job_id).await?.status.job_status();
        if status == JobStatus::Completed {
            Ok(())
        } else {
            Err(AdapterError::remote(
                Service::Appeears,
                format!("Job {job_id} is not completed (current status: {status})"),
            ))
        }
    }
}
