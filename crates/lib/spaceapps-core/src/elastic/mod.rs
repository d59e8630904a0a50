//! Elasticsearch adapter over the cluster's REST API.

mod client;
mod config;

pub use client::ElasticClient;
pub use config::ElasticConfig;
