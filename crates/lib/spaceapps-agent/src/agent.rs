//! The exploration loop.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::message::ChatMessage;
use crate::policy::{PlanStep, PlanningPolicy};
use crate::tools::ToolExecutor;

pub const DEFAULT_MAX_STEPS: usize = 25;
pub const DEFAULT_MAX_CONSECUTIVE_TOOL_STEPS: usize = 10;
const SUMMARY_PREVIEW_CHARS: usize = 100;

pub const SYSTEM_PROMPT: &str = "You are the NASA Space Apps Chicago data explorer. \
Answer questions about Earth observation data using the available tools. \
Find relevant products and layers in AppEEARS, submit point-sample jobs for the requested \
locations and dates, poll their status until they complete, download the results, ingest \
them into Elasticsearch and search the indexed data to answer the question. \
Dates passed to tools use YYYY-MM-DD. When a tool reports an error, explain it instead of \
retrying the same call. Reply with a concise final answer once you have the data you need.";

/// Guards on a single exploration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerLimits {
    /// Maximum policy decisions per run.
    pub max_steps: usize,
    /// Maximum tool steps in a row that carry no reasoning text.
    pub max_consecutive_tool_steps: usize,
}

impl Default for ExplorerLimits {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_consecutive_tool_steps: DEFAULT_MAX_CONSECUTIVE_TOOL_STEPS,
        }
    }
}

/// Progress reported while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    ToolCallStarted { name: String, arguments: Value },
    ToolFinished { name: String, is_error: bool, summary: String },
    Assistant { content: String },
    Answer { content: String },
}

impl fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolCallStarted { name, arguments } => write!(f, "Using tool {name} {arguments}"),
            Self::ToolFinished { summary, .. } => f.write_str(summary),
            Self::Assistant { content } | Self::Answer { content } => f.write_str(content),
        }
    }
}

/// Result of one exploration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorationRun {
    pub answer: String,
    pub events: Vec<AgentEvent>,
    /// Messages produced by this run, starting with the user query.
    pub messages: Vec<ChatMessage>,
    pub steps: usize,
}

/// Drives a [`PlanningPolicy`] against a [`ToolExecutor`].
#[derive(Clone)]
pub struct Explorer {
    policy: Arc<dyn PlanningPolicy>,
    executor: Arc<dyn ToolExecutor>,
    limits: ExplorerLimits,
    system_prompt: String,
}

impl fmt::Debug for Explorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Explorer")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Explorer {
    #[must_use]
    pub fn new(policy: Arc<dyn PlanningPolicy>, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            policy,
            executor,
            limits: ExplorerLimits::default(),
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: ExplorerLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub const fn limits(&self) -> ExplorerLimits {
        self.limits
    }

    /// Answers `query` given earlier `history`, reporting progress to `on_event`.
    ///
    /// # Errors
    /// Returns [`AgentError::StepLimit`] or [`AgentError::LoopDetected`] when a
    /// guard trips, and propagates policy and transport failures.
    pub async fn run<F>(
        &self,
        history: &[ChatMessage],
        query: &str,
        mut on_event: F,
    ) -> Result<ExplorationRun, AgentError>
    where
        F: FnMut(&AgentEvent) + Send,
    {
        let tools = self.executor.list_tools().await?;
        info!(tools = tools.len(), history = history.len(), "starting exploration");

        let mut transcript = Vec::with_capacity(history.len() + 2);
        transcript.push(ChatMessage::system(self.system_prompt.clone()));
        transcript.extend(history.iter().cloned());
        let run_start = transcript.len();
        transcript.push(ChatMessage::user(query));

        let mut events = Vec::new();
        let mut emit = |event: AgentEvent, events: &mut Vec<AgentEvent>| {
            on_event(&event);
            events.push(event);
        };
        let mut silent_tool_steps = 0;

        for step in 1..=self.limits.max_steps {
            match self.policy.next_step(&transcript, &tools).await? {
                PlanStep::Finish { answer } => {
                    info!(step, "exploration finished");
                    emit(AgentEvent::Answer { content: answer.clone() }, &mut events);
                    transcript.push(ChatMessage::assistant(answer.clone()));
                    return Ok(ExplorationRun {
                        answer,
                        events,
                        messages: transcript.split_off(run_start),
                        steps: step,
                    });
                }
                PlanStep::CallTools { thought, calls } => {
                    if calls.is_empty() {
                        return Err(AgentError::InvalidResponse(
                            "tool step did not name any tool calls".into(),
                        ));
                    }
                    if let Some(content) = &thought {
                        silent_tool_steps = 0;
                        emit(AgentEvent::Assistant { content: content.clone() }, &mut events);
                    } else {
                        silent_tool_steps += 1;
                        debug!(step, consecutive = silent_tool_steps, "tool step without reasoning");
                        if silent_tool_steps > self.limits.max_consecutive_tool_steps {
                            warn!(step, consecutive = silent_tool_steps, "loop detected");
                            return Err(AgentError::LoopDetected {
                                consecutive: silent_tool_steps,
                            });
                        }
                    }

                    transcript.push(ChatMessage::assistant_tool_calls(thought, calls.clone()));
                    for call in calls {
                        emit(
                            AgentEvent::ToolCallStarted {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                            &mut events,
                        );
                        let outcome = self.executor.call_tool(&call.name, call.arguments.clone()).await?;
                        if outcome.is_error {
                            warn!(tool = %call.name, "tool reported an error");
                        }
                        emit(
                            AgentEvent::ToolFinished {
                                name: call.name.clone(),
                                is_error: outcome.is_error,
                                summary: summarize_tool_result(&call.name, &outcome.content),
                            },
                            &mut events,
                        );
                        transcript.push(ChatMessage::tool_result(&call, outcome.content));
                    }
                }
            }
        }

        warn!(max_steps = self.limits.max_steps, "step limit reached");
        Err(AgentError::StepLimit {
            max_steps: self.limits.max_steps,
        })
    }
}

/// One-line description of a tool's output for progress displays.
#[must_use]
pub fn summarize_tool_result(name: &str, content: &str) -> String {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => map.get("status").map_or_else(
            || format!("Tool {name} returned data"),
            |status| {
                let status = status.as_str().map_or_else(|| status.to_string(), str::to_string);
                let jobs = map.get("jobs").and_then(Value::as_array).map_or_else(
                    || {
                        map.get("total_jobs")
                            .map(|total| format!(" (total: {total} jobs)"))
                            .unwrap_or_default()
                    },
                    |jobs| format!(" (found {} jobs)", jobs.len()),
                );
                format!("Tool {name} completed with status: {status}{jobs}")
            },
        ),
        Ok(other) => format!("Tool {name} returned: {}...", preview(&other.to_string())),
        Err(_) => format!("Tool {name}: {}...", preview(content)),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(SUMMARY_PREVIEW_CHARS).collect()
}
