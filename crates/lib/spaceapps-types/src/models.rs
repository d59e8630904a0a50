use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::schema::{
    APPEEARS_DATE_FORMAT,
    INPUT_DATE_FORMAT,
    TASK_TYPE_POINT,
    fallback_file_name,
};

/// Tool metadata as advertised over MCP `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Remote status of an `AppEEARS` task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Done,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Maps the service's status string; unknown values count as pending.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "processing" | "running" => Self::Processing,
            "done" => Self::Done,
            "failed" | "error" => Self::Failed,
            "cancelled" | "canceled" | "deleted" => Self::Cancelled,
            _ => Self::Pending,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Position along `pending -> processing -> terminal`.
    #[must_use]
    pub const fn progress_rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Done | Self::Failed | Self::Cancelled => 2,
        }
    }

    #[must_use]
    pub const fn job_status(self) -> JobStatus {
        match self {
            Self::Pending => JobStatus::Pending,
            Self::Processing => JobStatus::Running,
            Self::Done => JobStatus::Completed,
            Self::Failed => JobStatus::Failed,
            Self::Cancelled => JobStatus::Cancelled,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job-facing label for a task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of an `AppEEARS` task as reported by `GET task/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    pub status: TaskStatus,
    pub api_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub raw: Value,
}

impl TaskRecord {
    #[must_use]
    pub fn from_value(raw: Value) -> Self {
        let api_status = string_field(&raw, "status").unwrap_or_else(|| "unknown".to_string());
        Self {
            task_id: string_field(&raw, "task_id"),
            task_name: string_field(&raw, "task_name"),
            task_type: string_field(&raw, "task_type"),
            status: TaskStatus::parse(&api_status),
            api_status,
            created: string_field(&raw, "created"),
            updated: string_field(&raw, "updated"),
            progress: raw.get("progress").filter(|value| !value.is_null()).cloned(),
            message: string_field(&raw, "message"),
            params: raw.get("params").filter(|value| !value.is_null()).cloned(),
            raw,
        }
    }

    /// Parses `created`; timestamps without an offset are taken as UTC.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created.as_deref().and_then(parse_timestamp)
    }

    #[must_use]
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> Option<f64> {
        let created = self.created_at()?;
        let elapsed = now.signed_duration_since(created);
        #[allow(clippy::cast_precision_loss)]
        Some(elapsed.num_milliseconds() as f64 / 1000.0)
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// A JSON document addressed to an Elasticsearch index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub index: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: Value,
}

impl Document {
    #[must_use]
    pub fn new(index: impl Into<String>, source: Value) -> Self {
        Self {
            index: index.into(),
            id: None,
            source,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The `_bulk` action line preceding this document's source.
    #[must_use]
    pub fn bulk_action(&self) -> Value {
        let mut meta = Map::new();
        meta.insert("_index".to_string(), Value::String(self.index.clone()));
        if let Some(id) = self.id.as_ref() {
            meta.insert("_id".to_string(), Value::String(id.clone()));
        }
        json!({ "index": meta })
    }
}

/// Renders documents as a newline-delimited `_bulk` body.
///
/// # Errors
/// Returns an error if a document source cannot be serialized.
pub fn bulk_body(documents: &[Document]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for document in documents {
        body.push_str(&serde_json::to_string(&document.bulk_action())?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&document.source)?);
        body.push('\n');
    }
    Ok(body)
}

/// A layer of an `AppEEARS` product, e.g. `LST_Day_1km` of `MOD11A1.061`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayerSelection {
    pub layer: String,
    pub product: String,
}

/// A sample location for a point request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// A point-sample extraction over layers, locations and a date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointRequest {
    pub task_name: String,
    pub layers: Vec<LayerSelection>,
    pub coordinates: Vec<Coordinate>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl PointRequest {
    /// Builds the `POST task` body.
    #[must_use]
    pub fn to_task_payload(&self) -> Value {
        json!({
            "task_type": TASK_TYPE_POINT,
            "task_name": self.task_name,
            "params": {
                "dates": [{
                    "startDate": self.start_date.format(APPEEARS_DATE_FORMAT).to_string(),
                    "endDate": self.end_date.format(APPEEARS_DATE_FORMAT).to_string(),
                }],
                "layers": self.layers,
                "coordinates": self.coordinates,
            }
        })
    }
}

/// Parses a `YYYY-MM-DD` caller date.
///
/// # Errors
/// Returns the chrono parse error for malformed input.
pub fn parse_input_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), INPUT_DATE_FORMAT)
}

/// Layer name to description, as returned for `GET product/{product}`.
pub type ProductLayers = BTreeMap<String, String>;

#[must_use]
pub fn layer_descriptions(value: &Value) -> ProductLayers {
    let Some(layers) = value.as_object() else {
        return ProductLayers::new();
    };
    layers
        .iter()
        .map(|(name, info)| {
            let description = info
                .get("Description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            (name.clone(), description)
        })
        .collect()
}

/// One output file of a completed task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleFile {
    pub file_id: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

/// Parses a bundle listing.
///
/// The listing is either a list of entries or an object holding one under
/// `files` or `data`. Entries are objects with `file_id`/`file_name` or bare
/// id strings; entries without an id are skipped. Returns `None` for any
/// other shape.
#[must_use]
pub fn parse_bundle_listing(value: &Value) -> Option<Vec<BundleFile>> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("files").or_else(|| map.get("data")) {
            Some(Value::Array(entries)) => entries,
            _ => return None,
        },
        _ => return None,
    };

    Some(entries.iter().filter_map(parse_bundle_entry).collect())
}

fn parse_bundle_entry(entry: &Value) -> Option<BundleFile> {
    match entry {
        Value::String(file_id) if !file_id.is_empty() => Some(BundleFile {
            file_id: file_id.clone(),
            file_name: fallback_file_name(file_id),
            file_size: None,
            file_type: None,
        }),
        Value::Object(map) => {
            let file_id = match map.get("file_id") {
                Some(Value::String(id)) if !id.is_empty() => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => return None,
            };
            let file_name = map
                .get("file_name")
                .and_then(Value::as_str)
                .map_or_else(|| format!("unknown_file_{file_id}"), str::to_string);
            Some(BundleFile {
                file_id,
                file_name,
                file_size: map.get("file_size").and_then(Value::as_u64),
                file_type: map.get("file_type").and_then(Value::as_str).map(str::to_string),
            })
        }
        _ => None,
    }
}

/// A bundle file written to disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: String,
    pub file_path: String,
    pub file_id: String,
    pub file_size: u64,
}

/// Summary of a task download.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadReport {
    pub task_id: String,
    pub download_folder: String,
    pub files: Vec<DownloadedFile>,
    pub file_count: usize,
    pub total_size: u64,
}

impl DownloadReport {
    #[must_use]
    pub fn new(task_id: impl Into<String>, download_folder: impl Into<String>, files: Vec<DownloadedFile>) -> Self {
        let total_size = files.iter().map(|file| file.file_size).sum();
        Self {
            task_id: task_id.into(),
            download_folder: download_folder.into(),
            file_count: files.len(),
            files,
            total_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_parsing_is_case_insensitive_and_defaults_to_pending() {
        assert_eq!(TaskStatus::parse("DONE"), TaskStatus::Done);
        assert_eq!(TaskStatus::parse("queued"), TaskStatus::Pending);
        assert_eq!(TaskStatus::parse("processing"), TaskStatus::Processing);
        assert_eq!(TaskStatus::parse("error"), TaskStatus::Failed);
        assert_eq!(TaskStatus::parse("something-new"), TaskStatus::Pending);
        assert!(TaskStatus::Done.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Pending.progress_rank() < TaskStatus::Processing.progress_rank());
        assert!(TaskStatus::Processing.progress_rank() < TaskStatus::Failed.progress_rank());
    }

    #[test]
    fn job_labels_follow_task_status() {
        assert_eq!(TaskStatus::Done.job_status(), JobStatus::Completed);
        assert_eq!(TaskStatus::Processing.job_status().as_str(), "running");
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn task_record_reads_known_fields() {
        let record = TaskRecord::from_value(json!({
            "task_id": "abc",
            "task_name": "chicago",
            "status": "done",
            "created": "2024-05-01T10:00:00Z",
            "progress": {"summary": 100},
        }));

        assert_eq!(record.task_id.as_deref(), Some("abc"));
        assert_eq!(record.status, TaskStatus::Done);
        assert_eq!(record.api_status, "done");
        assert!(record.message.is_none());

        let now = DateTime::parse_from_rfc3339("2024-05-01T10:01:30Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        assert_eq!(record.elapsed_seconds(now), Some(90.0));
    }

    #[test]
    fn task_record_accepts_naive_timestamps() {
        let record = TaskRecord::from_value(json!({
            "status": "pending",
            "created": "2024-05-01T10:00:00.250000",
        }));
        assert!(record.created_at().is_some());
        assert_eq!(record.api_status, "pending");
    }

    #[test]
    fn point_request_payload_uses_appeears_date_format() {
        let request = PointRequest {
            task_name: "chicago-lst".to_string(),
            layers: vec![LayerSelection {
                layer: "LST_Day_1km".to_string(),
                product: "MOD11A1.061".to_string(),
            }],
            coordinates: vec![Coordinate {
                id: Some("1".to_string()),
                category: Some("city".to_string()),
                latitude: 41.88,
                longitude: -87.63,
            }],
            start_date: parse_input_date("2020-01-31").expect("valid date"),
            end_date: parse_input_date("2020-03-01").expect("valid date"),
        };

        let payload = request.to_task_payload();
        assert_eq!(payload["task_type"], "point");
        assert_eq!(payload["params"]["dates"][0]["startDate"], "01-31-2020");
        assert_eq!(payload["params"]["dates"][0]["endDate"], "03-01-2020");
        assert_eq!(payload["params"]["layers"][0]["product"], "MOD11A1.061");
        assert_eq!(payload["params"]["coordinates"][0]["latitude"], 41.88);
    }

    #[test]
    fn parse_input_date_rejects_other_formats() {
        assert!(parse_input_date("01/31/2020").is_err());
        assert!(parse_input_date("2020-13-01").is_err());
    }

    #[test]
    fn bundle_listing_accepts_object_and_string_entries() {
        let listing = json!({
            "files": [
                {"file_id": "f1", "file_name": "MOD11A1-061-results.csv", "file_size": 512},
                "f2",
                {"file_name": "missing-id.txt"}
            ],
            "task_id": "abc"
        });

        let files = parse_bundle_listing(&listing).expect("files list");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_size, Some(512));
        assert_eq!(files[1].file_name, "file_f2");
    }

    #[test]
    fn bundle_listing_rejects_unknown_shapes() {
        assert!(parse_bundle_listing(&json!({"unexpected": true})).is_none());
        assert!(parse_bundle_listing(&json!("f1")).is_none());
        assert_eq!(parse_bundle_listing(&json!({"data": []})), Some(Vec::new()));
    }

    #[test]
    fn layer_descriptions_fall_back_to_empty_text() {
        let layers = layer_descriptions(&json!({
            "LST_Day_1km": {"Description": "Day land surface temperature"},
            "QC_Day": {}
        }));
        assert_eq!(layers["LST_Day_1km"], "Day land surface temperature");
        assert_eq!(layers["QC_Day"], "");
    }

    #[test]
    fn bulk_body_interleaves_actions_and_sources() {
        let documents = vec![
            Document::new("readings", json!({"value": 1})),
            Document::new("readings", json!({"value": 2})).with_id("two"),
        ];
        let body = bulk_body(&documents).expect("serializable");
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        let first: Value = serde_json::from_str(lines[0]).expect("action line");
        let third: Value = serde_json::from_str(lines[2]).expect("action line");
        assert_eq!(first, json!({"index": {"_index": "readings"}}));
        assert_eq!(third, json!({"index": {"_index": "readings", "_id": "two"}}));
        assert_eq!(lines[3], r#"{"value":2}"#);
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn download_report_totals_file_sizes() {
        let report = DownloadReport::new(
            "abc",
            "/tmp/task_abc",
            vec![
                DownloadedFile {
                    file_name: "a.csv".to_string(),
                    file_path: "/tmp/task_abc/a.csv".to_string(),
                    file_id: "1".to_string(),
                    file_size: 10,
                },
                DownloadedFile {
                    file_name: "b.csv".to_string(),
                    file_path: "/tmp/task_abc/b.csv".to_string(),
                    file_id: "2".to_string(),
                    file_size: 5,
                },
            ],
        );
        assert_eq!(report.file_count, 2);
        assert_eq!(report.total_size, 15);
    }
}
