use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use spaceapps_agent::agent::{DEFAULT_MAX_CONSECUTIVE_TOOL_STEPS, DEFAULT_MAX_STEPS};
use spaceapps_agent::config::{
    DEFAULT_CLI_THREAD_ID,
    DEFAULT_MCP_SERVER_URL,
    DEFAULT_OPENAI_BASE_URL,
    DEFAULT_OPENAI_MODEL,
};

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:7860";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_HISTORY_FILE: &str = ".data-explorer-history.json";

#[derive(Parser, Debug)]
#[command(
    name = "data-explorer",
    version,
    about = "Data Explorer for NASA AppEEARS and Elastic integration."
)]
pub struct Cli {
    #[command(flatten)]
    pub agent: AgentArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a data exploration query and print the answer.
    Explore {
        query: String,

        /// Conversation thread to read history from and append to.
        #[arg(long, default_value = DEFAULT_CLI_THREAD_ID)]
        thread: String,

        #[command(flatten)]
        history: HistoryArgs,
    },
    /// List the conversation threads saved in the history file.
    Threads(HistoryArgs),
    /// List the tools advertised by the MCP server.
    Tools,
    /// Serve the explorer HTTP API.
    Serve(ServeArgs),
}

/// Where `explore` keeps conversation threads between runs.
#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    #[arg(long, env = "EXPLORER_HISTORY_FILE", default_value = DEFAULT_HISTORY_FILE)]
    pub history_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "EXPLORER_HTTP_ADDR", default_value = DEFAULT_HTTP_ADDR)]
    pub addr: SocketAddr,

    /// Per-request exploration timeout in seconds; 0 disables it.
    #[arg(long, env = "EXPLORER_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "EXPLORER_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

#[derive(Args, Debug, Clone)]
pub struct AgentArgs {
    #[arg(long, global = true, env = "MCP_SERVER_URL", default_value = DEFAULT_MCP_SERVER_URL)]
    pub mcp_server_url: String,

    #[arg(long, global = true, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    pub openai_base_url: String,

    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, global = true, env = "OPENAI_MODEL", default_value = DEFAULT_OPENAI_MODEL)]
    pub openai_model: String,

    #[arg(long, global = true, env = "OPENAI_TIMEOUT_SECS", default_value_t = DEFAULT_MODEL_TIMEOUT_SECS)]
    pub openai_timeout_secs: u64,

    #[arg(long, global = true, env = "DOCKER_HOST_IP")]
    pub docker_host_ip: Option<String>,

    #[arg(long, global = true, env = "EXPLORER_MAX_STEPS", default_value_t = DEFAULT_MAX_STEPS)]
    pub max_steps: usize,

    #[arg(
        long,
        global = true,
        env = "EXPLORER_MAX_CONSECUTIVE_TOOL_STEPS",
        default_value_t = DEFAULT_MAX_CONSECUTIVE_TOOL_STEPS
    )]
    pub max_consecutive_tool_steps: usize,
}
