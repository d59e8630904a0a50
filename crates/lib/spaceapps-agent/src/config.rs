//! Defaults and helpers shared by the explorer front ends.

pub const DEFAULT_MCP_SERVER_URL: &str = "http://localhost:8000/mcp";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_WEB_THREAD_ID: &str = "web_interface";
pub const DEFAULT_CLI_THREAD_ID: &str = "cli";

/// Rewrites `localhost` in `url` to `docker_host_ip` when one is set, so a
/// containerized explorer can reach services on the host.
#[must_use]
pub fn host_url(url: &str, docker_host_ip: Option<&str>) -> String {
    match docker_host_ip.map(str::trim).filter(|ip| !ip.is_empty()) {
        Some(ip) => url.replace("localhost", ip),
        None => url.to_string(),
    }
}
