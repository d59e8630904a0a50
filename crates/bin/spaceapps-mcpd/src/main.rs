//! Daemon entry point for the Space Apps MCP server.
//!
//! Loads configuration from the environment (and `.env`), builds the
//! Elasticsearch and `AppEEARS` adapters, and serves the MCP protocol over
//! streamable HTTP and/or stdio.

mod backends;
mod config;
mod serve;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::backends::build_control_plane;
use crate::config::SpaceAppsConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _ = dotenvy::dotenv();

    // stdout carries the MCP stream in stdio mode
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let config = SpaceAppsConfig::from_args()?;
    info!(?config, "starting spaceapps-mcpd");
    let control = Arc::new(build_control_plane(&config)?);

    if let Err(err) = serve::run(&config, control).await {
        error!(error = %err, "spaceapps-mcpd stopped");
        return Err(err);
    }
    Ok(())
}
