pub const DEFAULT_APPEEARS_URL: &str = "https://appeears.earthdatacloud.nasa.gov/api";

pub const APPEEARS_LOGIN: &str = "login";
pub const APPEEARS_PRODUCT: &str = "product";
pub const APPEEARS_TASK: &str = "task";
pub const APPEEARS_BUNDLE: &str = "bundle";

pub const TASK_TYPE_POINT: &str = "point";

pub const DEFAULT_POINT_TASK_NAME: &str = "LlamaAgentTask";
pub const DEFAULT_JOB_TASK_NAME: &str = "AgentTask";

/// Seconds shaved off a token's advertised expiration before it is refreshed.
pub const TOKEN_EXPIRY_BUFFER_SECS: i64 = 300;

/// Date format accepted from tool callers.
pub const INPUT_DATE_FORMAT: &str = "%Y-%m-%d";
/// Date format `AppEEARS` expects inside task payloads.
pub const APPEEARS_DATE_FORMAT: &str = "%m-%d-%Y";

pub const ELASTIC_ALIAS: &str = "_alias";
pub const ELASTIC_SEARCH: &str = "_search";
pub const ELASTIC_DOC: &str = "_doc";
pub const ELASTIC_BULK: &str = "_bulk";

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

pub fn task_folder_name(task_id: &str) -> String {
    format!("task_{task_id}")
}

pub fn fallback_file_name(file_id: &str) -> String {
    format!("file_{file_id}")
}
