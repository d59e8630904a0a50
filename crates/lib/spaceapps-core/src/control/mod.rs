use std::path::{Path, PathBuf};

use spaceapps_types::DownloadReport;

use crate::appeears::AppeearsClient;
use crate::elastic::ElasticClient;
use crate::error::AdapterResult;

pub mod jobs;

pub use jobs::{
    BundleListing,
    JobCancellation,
    JobDetails,
    JobListing,
    JobProgress,
    JobStatusView,
    JobSubmission,
    JobSummary,
    JobTaskInfo,
};

/// Both service adapters plus the default download location.
#[derive(Debug, Clone)]
pub struct SpaceAppsControlPlane {
    elastic: ElasticClient,
    appeears: AppeearsClient,
    download_dir: PathBuf,
}

impl SpaceAppsControlPlane {
    #[must_use]
    pub fn new(elastic: ElasticClient, appeears: AppeearsClient, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            elastic,
            appeears,
            download_dir: download_dir.into(),
        }
    }

    #[must_use]
    pub const fn elastic(&self) -> &ElasticClient {
        &self.elastic
    }

    #[must_use]
    pub const fn appeears(&self) -> &AppeearsClient {
        &self.appeears
    }

    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Downloads a task bundle, defaulting to the configured download directory.
    ///
    /// # Errors
    /// Returns `AdapterError` if the task is not done or nothing could be downloaded.
    pub async fn download_task(
        &self,
        task_id: &str,
        output_path: Option<&Path>,
    ) -> AdapterResult<DownloadReport> {
        let output_path = output_path.unwrap_or(&self.download_dir);
        self.appeears.download_task(task_id, output_path).await
    }
}
