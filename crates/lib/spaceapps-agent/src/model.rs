//! Chat-completion models used by the planner.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use spaceapps_types::ToolDescriptor;
use tracing::debug;

use crate::error::AgentError;
use crate::message::{ChatMessage, Role, ToolCall};

/// One model completion: optional text plus any requested tool calls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

/// A chat model that can request tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<Completion, AgentError>;
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// OpenAI-compatible `/chat/completions` client with function calling.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    http: reqwest::Client,
    settings: OpenAiSettings,
}

impl OpenAiChatModel {
    /// # Errors
    /// Returns a configuration error when the HTTP client cannot be built.
    pub fn new(settings: OpenAiSettings) -> Result<Self, AgentError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| AgentError::Configuration(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { http, settings })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn headers(&self) -> Result<HeaderMap, AgentError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = self.settings.api_key.as_deref().filter(|key| !key.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| AgentError::Configuration("OPENAI_API_KEY contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn request_body(&self, messages: &[ChatMessage], tools: &[ToolDescriptor]) -> Value {
        let mut body = json!({
            "model": self.settings.model,
            "messages": messages.iter().map(message_to_openai).collect::<Vec<_>>(),
            "stream": false,
            "temperature": 0,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(tool_to_openai).collect());
        }
        body
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<Completion, AgentError> {
        let body = self.request_body(messages, tools);
        debug!(model = %self.settings.model, messages = messages.len(), tools = tools.len(), "chat completion request");

        let response = self
            .http
            .post(self.endpoint())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::from_status(status.as_u16(), &text));
        }

        let data: OpenAiChatResponse = response.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::InvalidResponse("response has no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                arguments: parse_arguments(&call.function.arguments),
                name: call.function.name,
            })
            .collect();

        Ok(Completion {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason,
        })
    }
}

fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn tool_to_openai(tool: &ToolDescriptor) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description.clone().unwrap_or_default(),
            "parameters": tool.input_schema,
        }
    })
}

fn message_to_openai(message: &ChatMessage) -> Value {
    match message.role {
        Role::Assistant if !message.tool_calls.is_empty() => {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            json!({
                "role": "assistant",
                "content": message.content,
                "tool_calls": calls,
            })
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.text_content(),
        }),
        role => json!({
            "role": role.as_str(),
            "content": message.text_content(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OpenAiChatModel {
        OpenAiChatModel::new(OpenAiSettings {
            base_url: "http://localhost:1234/v1/".to_string(),
            api_key: None,
            model: "test-model".to_string(),
            timeout: None,
        })
        .expect("model")
    }

    #[test]
    fn assistant_tool_calls_serialize_arguments_as_strings() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "list_elastic_indices".to_string(),
            arguments: json!({}),
        };
        let value = message_to_openai(&ChatMessage::assistant_tool_calls(None, vec![call.clone()]));
        assert_eq!(value["content"], Value::Null);
        assert_eq!(value["tool_calls"][0]["function"]["arguments"], "{}");

        let result = message_to_openai(&ChatMessage::tool_result(&call, "{\"status\":\"success\"}"));
        assert_eq!(result["role"], "tool");
        assert_eq!(result["tool_call_id"], "call_1");
    }

    #[test]
    fn request_body_omits_empty_tools_and_pins_temperature() {
        let model = model();
        assert_eq!(model.endpoint(), "http://localhost:1234/v1/chat/completions");
        let body = model.request_body(&[ChatMessage::user("hi")], &[]);
        assert_eq!(body["temperature"], 0);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn unparseable_arguments_are_kept_as_strings() {
        assert_eq!(parse_arguments(""), json!({}));
        assert_eq!(parse_arguments("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(parse_arguments("not json"), json!("not json"));
    }
}
