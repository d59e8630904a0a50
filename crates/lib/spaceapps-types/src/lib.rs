//! Data model and endpoint constants for spaceapps-mcp.
//!
//! This crate defines the shapes shared by the service adapters, the MCP
//! dispatch layer, and the agent: `AppEEARS` task records, point requests and
//! bundle files, Elasticsearch documents, and tool descriptors.

pub mod models;
pub mod schema;

pub use models::*;
