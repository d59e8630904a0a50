use std::path::{Component, Path, PathBuf};

use futures::{Stream, StreamExt};
use spaceapps_types::schema::{fallback_file_name, task_folder_name};
use spaceapps_types::{BundleFile, DownloadReport, DownloadedFile, TaskStatus};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{AdapterError, AdapterResult, Service, require};

use super::AppeearsClient;

/// Resolves the `task_{id}` folder for a download target.
///
/// Existing directories, and missing paths without an extension, hold the
/// folder directly. Any other path is taken as a file path and the folder is
/// placed next to it.
#[must_use]
pub fn task_download_folder(output_path: &Path, task_id: &str) -> PathBuf {
    let is_directory = output_path.is_dir()
        || (!output_path.exists() && output_path.extension().is_none());
    let base = if is_directory {
        output_path
    } else {
        output_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    };
    base.join(task_folder_name(task_id))
}

/// Maps a service-provided file name onto a relative path inside the task folder.
fn relative_file_path(file: &BundleFile) -> PathBuf {
    let relative: PathBuf = Path::new(&file.file_name)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    if relative.as_os_str().is_empty() {
        PathBuf::from(fallback_file_name(&file.file_id))
    } else {
        relative
    }
}

impl AppeearsClient {
    /// Downloads every file of a completed task into `task_{id}` under `output_path`.
    ///
    /// Files that fail individually are skipped and logged.
    ///
    /// # Errors
    /// Returns `AdapterError` if the task is not done, its bundle is empty,
    /// the folder cannot be created, or no file could be downloaded.
    pub async fn download_task(&self, task_id: &str, output_path: &Path) -> AdapterResult<DownloadReport> {
        let task_id = require("task_id", task_id)?;
        let record = self.task_status(task_id).await?;
        if record.status != TaskStatus::Done {
            return Err(AdapterError::remote(
                Service::Appeears,
                format!("Task is not complete. Current status: {}", record.api_status),
            ));
        }

        let files = self.bundle_files(task_id).await?;
        if files.is_empty() {
            return Err(AdapterError::remote(Service::Appeears, "No files found in bundle"));
        }

        let folder = task_download_folder(output_path, task_id);
        fs::create_dir_all(&folder).await?;
        info!(task_id, folder = %folder.display(), files = files.len(), "downloading AppEEARS bundle");

        let mut downloaded = Vec::with_capacity(files.len());
        for file in &files {
            match self.download_file(task_id, file, &folder).await {
                Ok(saved) => downloaded.push(saved),
                Err(err) => warn!(
                    task_id,
                    file_id = %file.file_id,
                    file_name = %file.file_name,
                    error = %err,
                    "skipping bundle file"
                ),
            }
        }

        if downloaded.is_empty() {
            return Err(AdapterError::remote(Service::Appeears, "Failed to download any files"));
        }

        let report = DownloadReport::new(task_id, folder.display().to_string(), downloaded);
        info!(
            task_id,
            file_count = report.file_count,
            total_size = report.total_size,
            "AppEEARS bundle downloaded"
        );
        Ok(report)
    }

    async fn download_file(
        &self,
        task_id: &str,
        file: &BundleFile,
        folder: &Path,
    ) -> AdapterResult<DownloadedFile> {
        let path = folder.join(relative_file_path(file));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let response = self.open_bundle_file(task_id, &file.file_id).await?;
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|source| AdapterError::transport(Service::Appeears, source)));
        let file_size = write_chunks(&path, chunks).await?;

        Ok(DownloadedFile {
            file_name: file.file_name.clone(),
            file_path: path.display().to_string(),
            file_id: file.file_id.clone(),
            file_size,
        })
    }
}

/// Streams `chunks` into a new file at `path`.
///
/// A failed transfer removes whatever was written so far.
async fn write_chunks<S, B>(path: &Path, chunks: S) -> AdapterResult<u64>
where
    S: Stream<Item = AdapterResult<B>>,
    B: AsRef<[u8]>,
{
    let written = copy_chunks(path, chunks).await;
    if written.is_err() {
        match fs::remove_file(path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %path.display(), error = %err, "could not remove partial download"),
        }
    }
    written
}

async fn copy_chunks<S, B>(path: &Path, chunks: S) -> AdapterResult<u64>
where
    S: Stream<Item = AdapterResult<B>>,
    B: AsRef<[u8]>,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut output = fs::File::create(path).await?;
    let mut file_size = 0_u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        let bytes = chunk.as_ref();
        output.write_all(bytes).await?;
        file_size += bytes.len() as u64;
    }
    output.flush().await?;
    Ok(file_size)
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    fn bundle_file(file_id: &str, file_name: &str) -> BundleFile {
        BundleFile {
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
            file_size: None,
            file_type: None,
        }
    }

    #[test]
    fn folder_goes_inside_existing_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let folder = task_download_folder(dir.path(), "abc");
        assert_eq!(folder, dir.path().join("task_abc"));
    }

    #[test]
    fn folder_goes_next_to_file_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("results.csv");
        assert_eq!(task_download_folder(&target, "abc"), dir.path().join("task_abc"));
    }

    #[test]
    fn missing_paths_without_extension_are_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("downloads");
        assert_eq!(
            task_download_folder(&target, "abc"),
            dir.path().join("downloads").join("task_abc")
        );
    }

    #[test]
    fn file_names_cannot_escape_the_task_folder() {
        assert_eq!(
            relative_file_path(&bundle_file("1", "../../etc/passwd")),
            PathBuf::from("etc/passwd")
        );
        assert_eq!(
            relative_file_path(&bundle_file("2", "MOD11A1/results.csv")),
            PathBuf::from("MOD11A1/results.csv")
        );
        assert_eq!(relative_file_path(&bundle_file("3", "/")), PathBuf::from("file_3"));
    }

    #[tokio::test]
    async fn complete_transfers_report_their_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.csv");
        let chunks = stream::iter([Ok::<_, AdapterError>("a,b\n"), Ok("1,2\n")]);

        let size = write_chunks(&path, chunks).await.expect("written");
        assert_eq!(size, 8);
        assert_eq!(std::fs::read_to_string(&path).expect("file"), "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn interrupted_transfers_leave_no_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.csv");
        let chunks = stream::iter([
            Ok("a,b\n"),
            Err(AdapterError::remote(Service::Appeears, "connection reset")),
        ]);

        let err = write_chunks(&path, chunks).await.expect_err("stream failed");
        assert!(err.to_string().contains("connection reset"));
        assert!(!path.exists());
    }
}
