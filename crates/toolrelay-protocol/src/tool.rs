use crate::ToolCallId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::{Formatter, Serializer};
use std::io;

/// Errors returned by tool handlers.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool name was not found in registry.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Tool received invalid arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// Tool is registered but lacks the settings it needs.
    #[error("tool not configured: {0}")]
    NotConfigured(String),
}

/// A function call the remote agent wants executed before its run can continue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Call id, unique within the run.
    pub id: ToolCallId,
    /// Function name the agent selected.
    pub name: String,
    /// Decoded argument payload.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<ToolCallId>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Build a request from the wire form where arguments arrive as JSON text.
    ///
    /// Empty text decodes to an empty object. Text that is not JSON is kept as
    /// a string value so the handler can reject it as invalid arguments.
    pub fn from_raw_arguments(
        id: impl Into<ToolCallId>,
        name: impl Into<String>,
        raw: &str,
    ) -> Self {
        let arguments = if raw.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };
        Self::new(id, name, arguments)
    }
}

/// Result of one tool call, sent back to resume the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Id of the originating [`ToolCallRequest`].
    pub tool_call_id: ToolCallId,
    /// Output payload as text.
    pub output: String,
}

impl ToolOutput {
    pub fn new(tool_call_id: impl Into<ToolCallId>, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            output: output.into(),
        }
    }

    /// Render a handler value: strings are sent as-is, everything else as
    /// single-line JSON with `", "` and `": "` separators.
    pub fn from_value(tool_call_id: impl Into<ToolCallId>, value: &Value) -> Self {
        let output = match value {
            Value::String(text) => text.clone(),
            other => render_spaced(other),
        };
        Self::new(tool_call_id, output)
    }

    /// Parse the output back into JSON, if it is JSON.
    pub fn as_json(&self) -> Option<Value> {
        serde_json::from_str(&self.output).ok()
    }
}

/// Single-line JSON formatter with a space after every `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn render_spaced(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, SpacedFormatter);
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}
