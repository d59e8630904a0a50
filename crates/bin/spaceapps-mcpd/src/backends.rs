use spaceapps_core::appeears::{AppeearsClient, AppeearsConfig};
use spaceapps_core::control::SpaceAppsControlPlane;
use spaceapps_core::elastic::{ElasticClient, ElasticConfig};
use spaceapps_core::{AdapterResult, http::build_client};
use tracing::warn;

use crate::config::SpaceAppsConfig;

/// Builds the control plane over both service adapters with one shared HTTP client.
pub fn build_control_plane(config: &SpaceAppsConfig) -> AdapterResult<SpaceAppsControlPlane> {
    let http = build_client(config.http_timeout)?;

    let elastic_config = ElasticConfig::new(config.elastic_url.clone())
        .with_basic_auth(config.elastic_username.clone(), config.elastic_password.clone());
    let elastic = ElasticClient::with_http(elastic_config, http.clone())?;

    let mut appeears_config = AppeearsConfig::default().with_base_url(config.appeears_api_url.clone());
    appeears_config.username.clone_from(&config.appeears_username);
    appeears_config.password.clone_from(&config.appeears_password);
    if appeears_config.username.is_none() {
        warn!("APPEEARS_USERNAME is not set; AppEEARS tools will fail until credentials are configured");
    }
    let appeears = AppeearsClient::with_http(appeears_config, http)?;

    Ok(SpaceAppsControlPlane::new(elastic, appeears, config.download_dir.clone()))
}
