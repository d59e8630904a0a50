use std::time::Duration;

use spaceapps_agent::config::host_url;
use spaceapps_agent::{ExplorerLimits, OpenAiSettings};
use spaceapps_web::WebServerConfig;
use thiserror::Error;

use crate::cli::{AgentArgs, ServeArgs};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name} value: {value}")]
    InvalidSetting { name: &'static str, value: String },
}

/// Resolved settings for building an explorer.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub mcp_server_url: String,
    pub openai: OpenAiSettings,
    pub limits: ExplorerLimits,
}

impl TryFrom<AgentArgs> for ExplorerConfig {
    type Error = ConfigError;

    fn try_from(args: AgentArgs) -> Result<Self, Self::Error> {
        let docker_host_ip = args.docker_host_ip.as_deref();
        if args.mcp_server_url.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "MCP_SERVER_URL",
                value: args.mcp_server_url,
            });
        }
        if args.openai_model.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "OPENAI_MODEL",
                value: args.openai_model,
            });
        }
        if args.max_steps == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "EXPLORER_MAX_STEPS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            mcp_server_url: host_url(args.mcp_server_url.trim(), docker_host_ip),
            openai: OpenAiSettings {
                base_url: host_url(args.openai_base_url.trim(), docker_host_ip),
                api_key: args.openai_api_key.filter(|key| !key.trim().is_empty()),
                model: args.openai_model,
                timeout: (args.openai_timeout_secs > 0).then(|| Duration::from_secs(args.openai_timeout_secs)),
            },
            limits: ExplorerLimits {
                max_steps: args.max_steps,
                max_consecutive_tool_steps: args.max_consecutive_tool_steps,
            },
        })
    }
}

impl From<&ServeArgs> for WebServerConfig {
    fn from(args: &ServeArgs) -> Self {
        let request_timeout =
            (args.request_timeout_secs > 0).then(|| Duration::from_secs(args.request_timeout_secs));
        Self::new(args.addr)
            .with_max_body_bytes(args.max_body_bytes)
            .with_request_timeout(request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use spaceapps_agent::config::{DEFAULT_MCP_SERVER_URL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};

    use super::*;
    use crate::cli::{DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_BYTES, DEFAULT_MODEL_TIMEOUT_SECS};

    fn base_args() -> AgentArgs {
        AgentArgs {
            mcp_server_url: DEFAULT_MCP_SERVER_URL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            docker_host_ip: None,
            max_steps: 25,
            max_consecutive_tool_steps: 10,
        }
    }

    #[test]
    fn docker_host_rewrites_localhost_urls() {
        let mut args = base_args();
        args.docker_host_ip = Some("172.17.0.1".to_string());
        args.openai_base_url = "http://localhost:8080/v1".to_string();
        let config = ExplorerConfig::try_from(args).expect("config should parse");
        assert_eq!(config.mcp_server_url, "http://172.17.0.1:8000/mcp");
        assert_eq!(config.openai.base_url, "http://172.17.0.1:8080/v1");
    }

    #[test]
    fn zero_steps_and_blank_keys_are_handled() {
        let mut args = base_args();
        args.max_steps = 0;
        assert!(ExplorerConfig::try_from(args).is_err());

        let mut args = base_args();
        args.openai_api_key = Some(" ".to_string());
        let config = ExplorerConfig::try_from(args).expect("config should parse");
        assert!(config.openai.api_key.is_none());
        assert_eq!(config.limits, ExplorerLimits::default());
    }

    #[test]
    fn zero_request_timeout_disables_the_limit() {
        let mut args = ServeArgs {
            addr: DEFAULT_HTTP_ADDR.parse().expect("valid addr"),
            request_timeout_secs: 0,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        };
        assert_eq!(WebServerConfig::from(&args).request_timeout, None);

        args.request_timeout_secs = 30;
        assert_eq!(
            WebServerConfig::from(&args).request_timeout,
            Some(Duration::from_secs(30))
        );
    }
}
