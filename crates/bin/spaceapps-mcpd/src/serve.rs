use std::sync::Arc;

use spaceapps_core::control::SpaceAppsControlPlane;
use spaceapps_mcp::server::{McpHttpServerConfig, ServeError, serve_stdio, serve_streamable_http};

use crate::config::SpaceAppsConfig;

/// Runs the enabled transports until one of them stops.
///
/// With both enabled, whichever finishes first decides the result.
///
/// # Errors
/// Returns the first transport error, including an HTTP bind failure.
pub async fn run(config: &SpaceAppsConfig, control: Arc<SpaceAppsControlPlane>) -> Result<(), ServeError> {
    let http = config.mcp_serve.then(|| {
        let http_config = McpHttpServerConfig::new(config.mcp_http_addr).with_stateful_mode(!config.mcp_stateless);
        tokio::spawn(serve_streamable_http(control.clone(), http_config))
    });

    match (config.enable_stdio, http) {
        (true, Some(http)) => tokio::select! {
            served = serve_stdio(control) => served,
            joined = http => joined?,
        },
        (true, None) => serve_stdio(control).await,
        (false, Some(http)) => http.await?,
        (false, None) => Ok(()),
    }
}
