//! MCP tool modules.
//!
//! Tools are grouped by domain: Elasticsearch access, `AppEEARS` catalog and
//! task requests, the job-oriented views over `AppEEARS` tasks, and help.

pub mod appeears;
pub mod context;
pub mod elastic;
pub mod jobs;
