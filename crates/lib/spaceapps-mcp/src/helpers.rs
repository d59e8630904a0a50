use std::borrow::Cow;

use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content, ErrorCode};
use serde::Serialize;
use serde_json::{Map, Value};
use spaceapps_core::{AdapterError, ErrorOrigin};
use spaceapps_types::schema::{STATUS_ERROR, STATUS_SUCCESS};
use tracing::{error, warn};

pub fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

pub fn invalid_params(message: impl Into<Cow<'static, str>>) -> ErrorData {
    mcp_err(ErrorCode::INVALID_PARAMS, message)
}

/// Rejects blank required string arguments.
pub fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ErrorData> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid_params(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Wraps a payload as `{"status": "success", ...fields}`.
///
/// Objects are flattened into the envelope; any other value lands under `result`.
pub fn success(payload: impl Serialize) -> Result<CallToolResult, ErrorData> {
    let payload = serde_json::to_value(payload)
        .map_err(|err| mcp_err(ErrorCode::INTERNAL_ERROR, format!("failed to encode tool result: {err}")))?;
    let mut body = Map::new();
    body.insert("status".to_string(), Value::String(STATUS_SUCCESS.to_string()));
    match payload {
        Value::Object(fields) => body.extend(fields),
        other => {
            body.insert("result".to_string(), other);
        }
    }
    Ok(CallToolResult::success(vec![Content::json(Value::Object(body))?]))
}

/// Reports an adapter failure to the caller.
///
/// Validation failures become `invalid_params` protocol errors; service and
/// transport failures become error tool results carrying the service message.
pub fn failure(tool: &str, err: &AdapterError) -> Result<CallToolResult, ErrorData> {
    let origin = err.origin();
    if origin == ErrorOrigin::Validation {
        warn!(tool, error = %err, "rejected tool arguments");
        return Err(invalid_params(err.to_string()));
    }

    error!(tool, ?origin, error = %err, "tool call failed");
    let body = serde_json::json!({
        "status": STATUS_ERROR,
        "origin": origin,
        "message": err.to_string(),
    });
    Ok(CallToolResult::error(vec![Content::json(body)?]))
}

/// Renders an adapter result with [`success`] or [`failure`].
pub fn respond<T: Serialize>(
    tool: &str,
    result: Result<T, AdapterError>,
) -> Result<CallToolResult, ErrorData> {
    match result {
        Ok(payload) => success(payload),
        Err(err) => failure(tool, &err),
    }
}
