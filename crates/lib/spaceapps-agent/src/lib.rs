//! Data-exploration agent for spaceapps-mcp.
//!
//! The explorer answers a natural-language query by repeatedly asking a
//! [`PlanningPolicy`] for the next step and executing the tool calls it
//! requests against the MCP dispatch server. The default policy is an
//! OpenAI-compatible chat model with tool calling; the loop itself only
//! enforces step and loop limits. Conversation history is kept per thread in
//! a [`ConversationStore`].

pub mod agent;
pub mod config;
pub mod error;
pub mod memory;
pub mod message;
pub mod model;
pub mod policy;
pub mod session;
pub mod tools;

pub use agent::{AgentEvent, ExplorationRun, Explorer, ExplorerLimits, summarize_tool_result};
pub use error::AgentError;
pub use memory::{Checkpoint, ConversationStore, ThreadSummary};
pub use message::{ChatMessage, Role, ToolCall};
pub use model::{ChatModel, Completion, OpenAiChatModel, OpenAiSettings};
pub use policy::{ModelPlanner, PlanStep, PlanningPolicy};
pub use session::{ExplorerSession, SessionReply};
pub use tools::{McpToolClient, ToolExecutor, ToolOutcome};
