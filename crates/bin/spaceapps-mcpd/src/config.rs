use clap::{Parser, builder::BoolishValueParser};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use spaceapps_types::schema::DEFAULT_APPEEARS_URL;
use thiserror::Error;

const DEFAULT_ELASTIC_HOST: &str = "localhost";
const DEFAULT_ELASTIC_PORT: u16 = 9200;
const DEFAULT_ELASTIC_USERNAME: &str = "elastic";
const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Parser, Debug)]
#[command(
    name = "spaceapps-mcpd",
    version,
    about = "Space Apps MCP daemon exposing Elasticsearch and AppEEARS tools."
)]
struct CliArgs {
    #[arg(long, env = "ELASTIC_URL")]
    elastic_url: Option<String>,

    #[arg(long, env = "ELASTIC_HOST", default_value = DEFAULT_ELASTIC_HOST)]
    elastic_host: String,

    #[arg(long, env = "ELASTIC_PORT", default_value_t = DEFAULT_ELASTIC_PORT)]
    elastic_port: u16,

    #[arg(long, env = "ELASTIC_USERNAME", default_value = DEFAULT_ELASTIC_USERNAME)]
    elastic_username: String,

    #[arg(long, env = "ELASTIC_PASSWORD", hide_env_values = true)]
    elastic_password: Option<String>,

    #[arg(long, env = "APPEEARS_API_URL", default_value = DEFAULT_APPEEARS_URL)]
    appeears_api_url: String,

    #[arg(long, env = "APPEEARS_USERNAME")]
    appeears_username: Option<String>,

    #[arg(long, env = "APPEEARS_PASSWORD", hide_env_values = true)]
    appeears_password: Option<String>,

    #[arg(long, env = "DOWNLOAD_PATH")]
    download_path: Option<PathBuf>,

    #[arg(
        long = "stdio",
        env = "SPACEAPPS_ENABLE_STDIO",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(
        long,
        env = "SPACEAPPS_MCP_SERVE",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    mcp_serve: bool,

    #[arg(long, env = "SPACEAPPS_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(
        long,
        env = "SPACEAPPS_MCP_STATELESS",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    mcp_stateless: bool,

    /// Outbound request timeout in seconds; 0 disables it.
    #[arg(long, env = "SPACEAPPS_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    http_timeout_secs: u64,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone)]
pub struct SpaceAppsConfig {
    pub elastic_url: String,
    pub elastic_username: String,
    pub elastic_password: Option<String>,
    pub appeears_api_url: String,
    pub appeears_username: Option<String>,
    pub appeears_password: Option<String>,
    pub download_dir: PathBuf,
    pub enable_stdio: bool,
    pub mcp_serve: bool,
    pub mcp_http_addr: SocketAddr,
    pub mcp_stateless: bool,
    pub http_timeout: Option<Duration>,
}

impl std::fmt::Debug for SpaceAppsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpaceAppsConfig")
            .field("elastic_url", &self.elastic_url)
            .field("elastic_username", &self.elastic_username)
            .field("appeears_api_url", &self.appeears_api_url)
            .field("appeears_username", &self.appeears_username)
            .field("download_dir", &self.download_dir)
            .field("enable_stdio", &self.enable_stdio)
            .field("mcp_serve", &self.mcp_serve)
            .field("mcp_http_addr", &self.mcp_http_addr)
            .field("mcp_stateless", &self.mcp_stateless)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),
    #[error("invalid {name} value: {value}")]
    InvalidSetting { name: &'static str, value: String },
}

impl SpaceAppsConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl TryFrom<CliArgs> for SpaceAppsConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if !args.enable_stdio && !args.mcp_serve {
            return Err(ConfigError::InvalidSetting {
                name: "SPACEAPPS_MCP_SERVE",
                value: "false (and stdio is disabled, so nothing would be served)".to_string(),
            });
        }

        let elastic_url = match non_blank(args.elastic_url) {
            Some(url) => url,
            None => {
                if args.elastic_host.trim().is_empty() {
                    return Err(ConfigError::InvalidSetting {
                        name: "ELASTIC_HOST",
                        value: args.elastic_host,
                    });
                }
                format!("http://{}:{}", args.elastic_host.trim(), args.elastic_port)
            }
        };

        if args.appeears_api_url.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "APPEEARS_API_URL",
                value: args.appeears_api_url,
            });
        }

        let appeears_username = non_blank(args.appeears_username);
        let appeears_password = non_blank(args.appeears_password);
        if appeears_username.is_some() && appeears_password.is_none() {
            return Err(ConfigError::MissingSetting("APPEEARS_PASSWORD"));
        }

        let download_dir = args
            .download_path
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(std::env::temp_dir);

        let http_timeout = (args.http_timeout_secs > 0).then(|| Duration::from_secs(args.http_timeout_secs));

        Ok(Self {
            elastic_url,
            elastic_username: args.elastic_username,
            elastic_password: non_blank(args.elastic_password),
            appeears_api_url: args.appeears_api_url,
            appeears_username,
            appeears_password,
            download_dir,
            enable_stdio: args.enable_stdio,
            mcp_serve: args.mcp_serve,
            mcp_http_addr: args.mcp_http_addr,
            mcp_stateless: args.mcp_stateless,
            http_timeout,
        })
    }
}
