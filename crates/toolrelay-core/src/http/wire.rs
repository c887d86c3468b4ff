//! Request and response bodies of the assistants-style REST surface.

use crate::error::ServiceError;
use crate::service::AgentDefinition;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fs;
use toolrelay_config::HostedToolConfig;
use toolrelay_protocol::{
    MessageRole, ParseRunStateError, RunError, RunSnapshot, RunState, ThreadMessage,
    ToolCallRequest, ToolOutput,
};

#[derive(Debug, Deserialize)]
pub(super) struct IdResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireRun {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<WireRunError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RequiredAction {
    #[serde(default)]
    pub submit_tool_outputs: Option<SubmitToolOutputs>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub function: Option<WireFunction>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireRunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl WireRun {
    /// Convert the wire run into a snapshot, decoding function arguments.
    ///
    /// Calls without a function payload are kept under their `type` so that
    /// every surfaced call receives an output.
    pub(super) fn into_snapshot(self) -> Result<RunSnapshot, ParseRunStateError> {
        let state: RunState = self.status.parse()?;
        let pending_calls = if state == RunState::RequiresToolOutput {
            self.required_action
                .and_then(|action| action.submit_tool_outputs)
                .map(|submit| submit.tool_calls)
                .unwrap_or_default()
                .into_iter()
                .map(|call| match call.function {
                    Some(function) => ToolCallRequest::from_raw_arguments(
                        call.id,
                        function.name,
                        &function.arguments,
                    ),
                    None => {
                        // Still answered, with an unknown-tool output.
                        let kind = call.kind.unwrap_or_else(|| "unknown".to_string());
                        warn!(
                            "non-function tool call surfaced (call_id={}, type={})",
                            call.id, kind
                        );
                        ToolCallRequest::new(call.id, kind, Value::Object(Map::new()))
                    }
                })
                .collect()
        } else {
            Vec::new()
        };
        let last_error = self.last_error.map(|err| RunError {
            code: err.code.unwrap_or_else(|| "unknown".to_string()),
            message: err.message.unwrap_or_default(),
        });
        Ok(RunSnapshot {
            run_id: self.id,
            state,
            pending_calls,
            last_error,
        })
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SubmitToolOutputsBody<'a> {
    pub tool_outputs: &'a [ToolOutput],
}

#[derive(Debug, Deserialize)]
pub(super) struct MessageList {
    #[serde(default)]
    pub data: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireMessage {
    pub role: String,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub content: Vec<WireContent>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireContent {
    #[serde(default)]
    pub text: Option<WireText>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireText {
    pub value: String,
}

impl MessageList {
    /// First assistant message with text written by `run_id`, assuming
    /// newest-first order.
    pub(super) fn latest_assistant(self, run_id: &str) -> Option<ThreadMessage> {
        self.data
            .into_iter()
            .filter(|message| {
                message.role == "assistant" && message.run_id.as_deref() == Some(run_id)
            })
            .map(|message| {
                message
                    .content
                    .into_iter()
                    .filter_map(|part| part.text.map(|text| text.value))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .find(|text| !text.is_empty())
            .map(|text| ThreadMessage {
                role: MessageRole::Assistant,
                text,
            })
    }
}

/// Body for a user message, with optional file attachments.
pub(super) fn message_body(content: &str, attachments: &[String]) -> Value {
    let mut body = json!({ "role": "user", "content": content });
    if !attachments.is_empty() {
        body["attachments"] = attachments
            .iter()
            .map(|file_id| json!({ "file_id": file_id }))
            .collect();
    }
    body
}

/// Body for agent creation: function tools, hosted tools, and their resources.
pub(super) fn agent_body(definition: &AgentDefinition) -> Result<Value, ServiceError> {
    let mut tools = definition
        .tools
        .iter()
        .map(|spec| {
            json!({
                "type": "function",
                "function": {
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": spec.args_schema,
                },
            })
        })
        .collect::<Vec<_>>();
    let mut resources = Map::new();

    for hosted in &definition.hosted_tools {
        match hosted {
            HostedToolConfig::CodeInterpreter { file_ids } => {
                tools.push(json!({ "type": "code_interpreter" }));
                if !file_ids.is_empty() {
                    resources.insert(
                        "code_interpreter".to_string(),
                        json!({ "file_ids": file_ids }),
                    );
                }
            }
            HostedToolConfig::FileSearch { vector_store_ids } => {
                tools.push(json!({ "type": "file_search" }));
                if !vector_store_ids.is_empty() {
                    resources.insert(
                        "file_search".to_string(),
                        json!({ "vector_store_ids": vector_store_ids }),
                    );
                }
            }
            HostedToolConfig::AzureAiSearch {
                connection_id,
                index_name,
            } => {
                tools.push(json!({ "type": "azure_ai_search" }));
                resources.insert(
                    "azure_ai_search".to_string(),
                    json!({
                        "indexes": [{
                            "index_connection_id": connection_id,
                            "index_name": index_name,
                        }],
                    }),
                );
            }
            HostedToolConfig::Openapi {
                name,
                description,
                spec_path,
                connection_id,
            } => {
                let raw = fs::read_to_string(spec_path).map_err(|err| {
                    ServiceError::InvalidRequest(format!(
                        "failed to read OpenAPI spec {}: {err}",
                        spec_path.display()
                    ))
                })?;
                let spec: Value = serde_json::from_str(&raw).map_err(|err| {
                    ServiceError::InvalidRequest(format!(
                        "invalid OpenAPI spec {}: {err}",
                        spec_path.display()
                    ))
                })?;
                let auth = match connection_id {
                    Some(id) => json!({
                        "type": "connection",
                        "security_scheme": { "connection_id": id },
                    }),
                    None => json!({ "type": "anonymous" }),
                };
                tools.push(json!({
                    "type": "openapi",
                    "openapi": {
                        "name": name,
                        "description": description.clone().unwrap_or_default(),
                        "spec": spec,
                        "auth": auth,
                    },
                }));
            }
        }
    }

    let mut body = json!({
        "model": definition.model,
        "name": definition.name,
        "instructions": definition.instructions,
        "tools": tools,
    });
    if let Some(temperature) = definition.temperature {
        body["temperature"] = json!(temperature);
    }
    if !resources.is_empty() {
        body["tool_resources"] = Value::Object(resources);
    }
    Ok(body)
}
