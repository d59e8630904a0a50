//! Tool execution against the MCP dispatch server.

use async_trait::async_trait;
use rmcp::ServiceExt;
use rmcp::model::{
    CallToolRequestParams,
    CallToolResult,
    ClientInfo,
    Content,
    JsonObject,
    ProtocolVersion,
    Tool,
};
use rmcp::service::{ClientInitializeError, RoleClient, RunningService, ServiceError};
use rmcp::transport::StreamableHttpClientTransport;
use serde_json::Value;
use spaceapps_types::ToolDescriptor;
use tracing::{debug, info};

use crate::error::AgentError;

/// Text returned by a tool call and whether the server flagged it as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutcome {
    #[must_use]
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    #[must_use]
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Lists and invokes tools on behalf of the explorer.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError>;

    /// Runs one tool. Failures the tool reports are returned as error outcomes;
    /// only transport-level failures are `Err`.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutcome, AgentError>;
}

type ClientSession = RunningService<RoleClient, ClientInfo>;

/// MCP client over the streamable HTTP transport.
pub struct McpToolClient {
    url: String,
    session: ClientSession,
}

impl std::fmt::Debug for McpToolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolClient").field("url", &self.url).finish_non_exhaustive()
    }
}

impl McpToolClient {
    /// Connects and performs the MCP handshake, retrying once with the
    /// 2024-11-05 protocol when the server rejects the latest version.
    ///
    /// # Errors
    /// Returns [`AgentError::Mcp`] when the server cannot be reached or the
    /// handshake fails.
    pub async fn connect(url: &str) -> Result<Self, AgentError> {
        info!(url, "connecting to MCP server");
        let session = match Self::handshake(url, ProtocolVersion::LATEST).await {
            Ok(session) => session,
            Err(error) if should_retry_protocol_fallback(&error) => {
                debug!(url, "retrying MCP handshake with protocol 2024-11-05");
                Self::handshake(url, ProtocolVersion::V_2024_11_05)
                    .await
                    .map_err(map_client_initialize_error)?
            }
            Err(error) => return Err(map_client_initialize_error(error)),
        };
        Ok(Self {
            url: url.to_string(),
            session,
        })
    }

    async fn handshake(url: &str, protocol_version: ProtocolVersion) -> Result<ClientSession, ClientInitializeError> {
        let transport = StreamableHttpClientTransport::from_uri(url.to_string());
        let client_info = ClientInfo {
            protocol_version,
            ..Default::default()
        };
        client_info.serve(transport).await
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Closes the session.
    ///
    /// # Errors
    /// Returns [`AgentError::Mcp`] when the session task fails to stop.
    pub async fn close(self) -> Result<(), AgentError> {
        self.session
            .cancel()
            .await
            .map(|_| ())
            .map_err(|err| AgentError::Mcp(format!("failed to close MCP session: {err}")))
    }
}

#[async_trait]
impl ToolExecutor for McpToolClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
        let tools = match self.session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => self
                .session
                .list_tools(None)
                .await
                .map(|page| page.tools)
                .map_err(|err| map_service_error("list_tools", err))?,
            Err(err) => return Err(map_service_error("list_tools", err)),
        };
        Ok(tools.into_iter().map(map_tool).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutcome, AgentError> {
        let arguments = match coerce_tool_arguments(arguments) {
            Ok(arguments) => arguments,
            Err(message) => return Ok(ToolOutcome::error(message)),
        };
        debug!(tool = name, "calling MCP tool");
        let result = self
            .session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await;

        match result {
            Ok(result) => Ok(map_call_result(result)),
            Err(ServiceError::McpError(error)) => Ok(ToolOutcome::error(format!(
                "Error: MCP error {}: {}",
                error.code.0, error.message
            ))),
            Err(err) => Err(map_service_error("call_tool", err)),
        }
    }
}

fn map_tool(tool: Tool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.map(|text| text.to_string()),
        input_schema: Value::Object((*tool.input_schema).clone()),
    }
}

/// Normalizes model-supplied arguments into a JSON object.
pub(crate) fn coerce_tool_arguments(value: Value) -> Result<Option<JsonObject>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: Value = serde_json::from_str(trimmed)
                .map_err(|err| format!("Error: tool arguments must be valid JSON: {err}"))?;
            coerce_tool_arguments(parsed)
        }
        other => Err(format!("Error: tool arguments must be a JSON object; got {other}")),
    }
}

fn text_content(content: &[Content]) -> String {
    content
        .iter()
        .filter_map(|item| item.as_text().map(|text| text.text.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn map_call_result(result: CallToolResult) -> ToolOutcome {
    let mut content = text_content(&result.content);
    if content.is_empty()
        && let Some(structured) = result.structured_content.as_ref()
    {
        content = structured.to_string();
    }
    ToolOutcome {
        content,
        is_error: result.is_error.unwrap_or(false),
    }
}

fn should_retry_protocol_fallback(error: &ClientInitializeError) -> bool {
    match error {
        ClientInitializeError::JsonRpcError(error) => {
            let message = error.message.to_ascii_lowercase();
            message.contains("protocol") && message.contains("version")
        }
        _ => false,
    }
}

fn map_client_initialize_error(error: ClientInitializeError) -> AgentError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            AgentError::Mcp(format!("initialize connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => {
            AgentError::Mcp(format!("initialize transport error ({context}): {error}"))
        }
        ClientInitializeError::JsonRpcError(error) => AgentError::Mcp(format!(
            "initialize JSON-RPC error {}: {}",
            error.code.0, error.message
        )),
        ClientInitializeError::Cancelled => AgentError::Mcp("initialize cancelled".into()),
        other => AgentError::Mcp(format!("initialize error: {other}")),
    }
}

fn map_service_error(context: &str, error: ServiceError) -> AgentError {
    match error {
        ServiceError::McpError(error) => {
            AgentError::Mcp(format!("{context}: MCP error {}: {}", error.code.0, error.message))
        }
        ServiceError::TransportSend(error) => AgentError::Mcp(format!("{context}: transport send failed: {error}")),
        ServiceError::TransportClosed => AgentError::Mcp(format!("{context}: transport closed")),
        ServiceError::UnexpectedResponse => AgentError::Mcp(format!("{context}: unexpected MCP response")),
        ServiceError::Cancelled { reason } => {
            let suffix = reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default();
            AgentError::Mcp(format!("{context}: request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => {
            AgentError::Mcp(format!("{context}: timed out after {}ms", timeout.as_millis()))
        }
        other => AgentError::Mcp(format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use rmcp::model::{ErrorCode, ErrorData};
    use serde_json::json;

    use super::*;

    #[test]
    fn arguments_are_coerced_to_objects() {
        assert_eq!(coerce_tool_arguments(Value::Null), Ok(None));
        let parsed = coerce_tool_arguments(json!("{\"index\": \"readings\"}")).expect("object");
        assert_eq!(parsed.and_then(|map| map.get("index").cloned()), Some(json!("readings")));
        assert_eq!(coerce_tool_arguments(json!("  ")), Ok(None));
        assert!(coerce_tool_arguments(json!([1, 2])).is_err());
        assert!(coerce_tool_arguments(json!("[1]")).is_err());
    }

    #[test]
    fn error_results_keep_their_text() {
        let outcome = map_call_result(CallToolResult::error(vec![Content::text("{\"status\":\"error\"}")]));
        assert!(outcome.is_error);
        assert_eq!(outcome.content, "{\"status\":\"error\"}");
    }

    #[test]
    fn protocol_fallback_only_on_version_errors() {
        let version = ClientInitializeError::JsonRpcError(ErrorData::new(
            ErrorCode::INVALID_REQUEST,
            "Unsupported protocol version",
            None,
        ));
        assert!(should_retry_protocol_fallback(&version));
        assert!(!should_retry_protocol_fallback(&ClientInitializeError::Cancelled));
    }
}
