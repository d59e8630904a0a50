//! Planning policies decide the explorer's next step.

use std::sync::Arc;

use async_trait::async_trait;
use spaceapps_types::ToolDescriptor;
use tracing::debug;

use crate::error::AgentError;
use crate::message::{ChatMessage, ToolCall};
use crate::model::ChatModel;

/// What the explorer should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// Run these tool calls in order, then ask again.
    CallTools { thought: Option<String>, calls: Vec<ToolCall> },
    /// Stop and return this answer.
    Finish { answer: String },
}

#[async_trait]
pub trait PlanningPolicy: Send + Sync {
    async fn next_step(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<PlanStep, AgentError>;
}

/// ReAct-style policy backed by a tool-calling chat model.
#[derive(Clone)]
pub struct ModelPlanner {
    model: Arc<dyn ChatModel>,
}

impl ModelPlanner {
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

impl std::fmt::Debug for ModelPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPlanner").finish_non_exhaustive()
    }
}

#[async_trait]
impl PlanningPolicy for ModelPlanner {
    async fn next_step(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<PlanStep, AgentError> {
        let completion = self.model.complete(history, tools).await?;
        debug!(
            tool_calls = completion.tool_calls.len(),
            finish_reason = completion.finish_reason.as_deref().unwrap_or("none"),
            "model completion"
        );
        if completion.tool_calls.is_empty() {
            return Ok(PlanStep::Finish {
                answer: completion.content.unwrap_or_default(),
            });
        }
        Ok(PlanStep::CallTools {
            thought: completion.content.filter(|text| !text.trim().is_empty()),
            calls: completion.tool_calls,
        })
    }
}
