//! Service adapters for spaceapps-mcp.
//!
//! This crate wraps the two external services behind the MCP tools: an
//! Elasticsearch cluster reached over its REST API and NASA's `AppEEARS` API.
//! The control plane bundles both adapters and layers the job-oriented views
//! on top of `AppEEARS` tasks.

pub mod appeears;
pub mod control;
pub mod elastic;
pub mod error;
pub mod http;

pub use error::{AdapterError, AdapterResult, ErrorOrigin, Service};
