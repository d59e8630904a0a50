//! Entry point for the data explorer CLI and HTTP front end.

mod cli;
mod config;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use spaceapps_agent::{
    ConversationStore,
    Explorer,
    ExplorerSession,
    McpToolClient,
    ModelPlanner,
    OpenAiChatModel,
    SessionReply,
    ToolExecutor,
};
use spaceapps_web::{WebServer, WebServerConfig};
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::ExplorerConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // stdout is reserved for answers
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "data-explorer failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = ExplorerConfig::try_from(cli.agent)?;
    let command = match cli.command {
        // history only, no MCP session needed
        Command::Threads(history) => return list_threads(&history.history_file).await,
        command => command,
    };

    info!(mcp = %config.mcp_server_url, model = %config.openai.model, "connecting explorer");
    let tools = Arc::new(McpToolClient::connect(&config.mcp_server_url).await?);
    let result = execute(command, &config, tools.clone()).await;
    disconnect(tools).await;
    result
}

async fn execute(command: Command, config: &ExplorerConfig, tools: Arc<McpToolClient>) -> Result<(), BoxError> {
    match command {
        Command::Tools => list_tools(&tools).await,
        Command::Threads(history) => list_threads(&history.history_file).await,
        Command::Explore { query, thread, history } => {
            let explorer = build_explorer(config, tools)?;
            let reply = explore_once(explorer, &history.history_file, &thread, &query).await?;
            println!("{}", reply.answer);
            Ok(())
        }
        Command::Serve(args) => {
            let explorer = build_explorer(config, tools)?;
            let session = ExplorerSession::new(explorer, Arc::new(ConversationStore::new()));
            let web_config = WebServerConfig::from(&args);
            WebServer::new(Arc::new(session), web_config).serve().await
        }
    }
}

async fn list_tools(tools: &McpToolClient) -> Result<(), BoxError> {
    for tool in tools.list_tools().await? {
        println!("{}\t{}", tool.name, tool.description.unwrap_or_default());
    }
    Ok(())
}

async fn list_threads(history_file: &Path) -> Result<(), BoxError> {
    let store = ConversationStore::load(history_file).await?;
    for thread_id in store.thread_ids().await {
        println!("{thread_id}\t{}", store.summary(&thread_id).await.text);
    }
    Ok(())
}

/// Answers one query on `thread`, reading the thread from `history_file`
/// and writing it back once the run completes.
async fn explore_once(
    explorer: Explorer,
    history_file: &Path,
    thread: &str,
    query: &str,
) -> Result<SessionReply, BoxError> {
    let store = Arc::new(ConversationStore::load(history_file).await?);
    let session = ExplorerSession::new(explorer, store.clone());
    let reply = session.ask(thread, query, |event| eprintln!("{event}")).await?;
    store.save(history_file).await?;
    Ok(reply)
}

fn build_explorer(config: &ExplorerConfig, tools: Arc<McpToolClient>) -> Result<Explorer, BoxError> {
    let model = OpenAiChatModel::new(config.openai.clone())?;
    let planner = ModelPlanner::new(Arc::new(model));
    Ok(Explorer::new(Arc::new(planner), tools).with_limits(config.limits))
}

async fn disconnect(tools: Arc<McpToolClient>) {
    let Ok(client) = Arc::try_unwrap(tools) else {
        return;
    };
    let url = client.url().to_string();
    match client.close().await {
        Ok(()) => info!(%url, "MCP session closed"),
        Err(err) => warn!(%url, error = %err, "MCP session did not close cleanly"),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;
    use spaceapps_agent::{AgentError, ChatMessage, PlanStep, PlanningPolicy, Role, ToolOutcome};
    use spaceapps_types::ToolDescriptor;

    use super::*;

    /// Answers with how many questions the thread has seen.
    struct CountQuestions;

    #[async_trait]
    impl PlanningPolicy for CountQuestions {
        async fn next_step(&self, history: &[ChatMessage], _: &[ToolDescriptor]) -> Result<PlanStep, AgentError> {
            let questions = history.iter().filter(|message| message.role == Role::User).count();
            Ok(PlanStep::Finish {
                answer: format!("questions so far: {questions}"),
            })
        }
    }

    struct NoTools;

    #[async_trait]
    impl ToolExecutor for NoTools {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
            Ok(Vec::new())
        }

        async fn call_tool(&self, _: &str, _: Value) -> Result<ToolOutcome, AgentError> {
            Ok(ToolOutcome::error("no tools"))
        }
    }

    fn explorer() -> Explorer {
        Explorer::new(Arc::new(CountQuestions), Arc::new(NoTools))
    }

    #[tokio::test]
    async fn threads_carry_over_between_runs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let history = dir.path().join("history.json");

        let first = explore_once(explorer(), &history, "t1", "LST for Chicago").await.expect("first run");
        assert_eq!(first.answer, "questions so far: 1");

        let second = explore_once(explorer(), &history, "t1", "and NDVI?").await.expect("second run");
        assert_eq!(second.answer, "questions so far: 2");
        assert_eq!(second.checkpoint.message_count, 4);

        let other = explore_once(explorer(), &history, "t2", "fresh start").await.expect("other thread");
        assert_eq!(other.answer, "questions so far: 1");

        let store = ConversationStore::load(&history).await.expect("history");
        assert_eq!(store.thread_ids().await, vec!["t1".to_string(), "t2".to_string()]);
    }
}
