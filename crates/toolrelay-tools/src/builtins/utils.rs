//! Helpers shared by built-in tools.

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use toolrelay_protocol::ToolError;

/// Parse JSON args into a typed struct for tool calls.
pub(super) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|err| ToolError::InvalidArguments(err.to_string()))
}

/// Reject blank string arguments.
pub(super) fn require_non_empty(field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::InvalidArguments(format!(
            "{field} cannot be empty"
        )));
    }
    Ok(())
}

/// Map a transport failure into a tool error.
pub(super) fn request_failed(service: &str, err: reqwest::Error) -> ToolError {
    ToolError::ExecutionFailed(format!("{service} request failed: {err}"))
}

/// Read a response body as JSON, falling back to the raw text.
pub(super) async fn response_body(response: Response) -> Value {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
