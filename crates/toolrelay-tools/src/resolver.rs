//! Resolution of a run's pending tool calls into tool outputs.
//!
//! The resolver reacts to one observed run state at a time. It never polls,
//! sleeps, retries or talks to the agent service; the caller's poll loop owns
//! all of that. Every tool-side failure is turned into an error-shaped
//! output so the remote agent sees it as conversational data.

use crate::output_policy::ToolOutputPolicy;
use crate::registry::ToolRegistry;
use futures_util::FutureExt;
use futures_util::future::join_all;
use log::{debug, warn};
use serde_json::json;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use toolrelay_protocol::{
    RunSnapshot, RunState, TerminalState, ToolCallRequest, ToolError, ToolOutput,
};

/// What the caller should do after one resolution step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The run ended; nothing to submit.
    Terminal(TerminalState),
    /// The run is still pending; poll again later.
    ContinuePolling,
    /// Submit these outputs, one per pending call, in request order.
    SubmitOutputs(Vec<ToolOutput>),
}

/// Inputs the resolver cannot interpret. These are contract violations by
/// whoever produced the run snapshot, never tool failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("run requires tool output but no tool calls were supplied")]
    MissingToolCalls,
    #[error("duplicate tool call id: {0}")]
    DuplicateToolCallId(String),
    #[error("tool call for {name} has an empty id")]
    EmptyToolCallId { name: String },
}

/// How the handlers of one run are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One handler after another, in request order.
    #[default]
    Sequential,
    /// All handlers at once; outputs still follow request order.
    Concurrent,
}

/// Dispatches pending tool calls to registered handlers.
#[derive(Debug, Clone)]
pub struct ToolCallResolver {
    registry: Arc<ToolRegistry>,
    mode: ExecutionMode,
    output_policy: Option<ToolOutputPolicy>,
}

impl ToolCallResolver {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            mode: ExecutionMode::default(),
            output_policy: None,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Apply a redaction/size policy to every successful handler value.
    pub fn with_output_policy(mut self, policy: ToolOutputPolicy) -> Self {
        self.output_policy = Some(policy);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Resolve one observed run state.
    pub async fn resolve_once(
        &self,
        state: RunState,
        pending_calls: &[ToolCallRequest],
    ) -> Result<Resolution, ResolveError> {
        match state {
            RunState::Completed | RunState::Failed | RunState::Cancelled => {
                let terminal = match state {
                    RunState::Completed => TerminalState::Completed,
                    RunState::Failed => TerminalState::Failed,
                    _ => TerminalState::Cancelled,
                };
                debug!("run reached terminal state (state={terminal})");
                Ok(Resolution::Terminal(terminal))
            }
            RunState::Pending => Ok(Resolution::ContinuePolling),
            RunState::RequiresToolOutput => {
                check_calls(pending_calls)?;
                debug!(
                    "resolving tool calls (count={}, mode={:?})",
                    pending_calls.len(),
                    self.mode
                );
                let outputs = match self.mode {
                    ExecutionMode::Sequential => {
                        let mut outputs = Vec::with_capacity(pending_calls.len());
                        for call in pending_calls {
                            outputs.push(self.run_call(call).await);
                        }
                        outputs
                    }
                    ExecutionMode::Concurrent => {
                        join_all(pending_calls.iter().map(|call| self.run_call(call))).await
                    }
                };
                Ok(Resolution::SubmitOutputs(outputs))
            }
        }
    }

    /// Resolve the state and pending calls carried by a poll snapshot.
    pub async fn resolve_snapshot(
        &self,
        snapshot: &RunSnapshot,
    ) -> Result<Resolution, ResolveError> {
        self.resolve_once(snapshot.state, &snapshot.pending_calls)
            .await
    }

    async fn run_call(&self, call: &ToolCallRequest) -> ToolOutput {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!(
                "unknown tool requested (name={}, call_id={})",
                call.name, call.id
            );
            let err = ToolError::UnknownTool(call.name.clone());
            return error_output(&call.id, err.to_string());
        };

        debug!("invoking tool (name={}, call_id={})", call.name, call.id);
        let result = AssertUnwindSafe(tool.call(call.arguments.clone()))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(value)) => {
                let value = match &self.output_policy {
                    Some(policy) => policy.apply(value),
                    None => value,
                };
                ToolOutput::from_value(&call.id, &value)
            }
            Ok(Err(err)) => {
                warn!(
                    "tool failed (name={}, call_id={}, error={})",
                    call.name, call.id, err
                );
                error_output(&call.id, err.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(
                    "tool panicked (name={}, call_id={}, panic={})",
                    call.name, call.id, message
                );
                error_output(&call.id, format!("tool panicked: {message}"))
            }
        }
    }
}

/// Resolve against a registry with sequential execution and no output policy.
pub async fn resolve_once(
    state: RunState,
    pending_calls: &[ToolCallRequest],
    registry: &ToolRegistry,
) -> Result<Resolution, ResolveError> {
    ToolCallResolver::new(Arc::new(registry.clone()))
        .resolve_once(state, pending_calls)
        .await
}

fn check_calls(calls: &[ToolCallRequest]) -> Result<(), ResolveError> {
    if calls.is_empty() {
        return Err(ResolveError::MissingToolCalls);
    }
    let mut seen = HashSet::with_capacity(calls.len());
    for call in calls {
        if call.id.is_empty() {
            return Err(ResolveError::EmptyToolCallId {
                name: call.name.clone(),
            });
        }
        if !seen.insert(call.id.as_str()) {
            return Err(ResolveError::DuplicateToolCallId(call.id.clone()));
        }
    }
    Ok(())
}

fn error_output(call_id: &str, message: String) -> ToolOutput {
    ToolOutput::from_value(call_id, &json!({ "error": message }))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FnTool;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn weather_registry() -> ToolRegistry {
        ToolRegistry::new().with_tool(Arc::new(FnTool::new("get_weather", |_| {
            Ok(json!({ "temp": 20 }))
        })))
    }

    #[tokio::test]
    async fn weather_call_produces_matching_output() {
        let calls = vec![ToolCallRequest::new("c1", "get_weather", json!({}))];
        let resolution = resolve_once(RunState::RequiresToolOutput, &calls, &weather_registry())
            .await
            .expect("resolve");

        let outputs = match resolution {
            Resolution::SubmitOutputs(outputs) => outputs,
            other => panic!("expected outputs, got {other:?}"),
        };
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].tool_call_id, "c1");
        assert_eq!(outputs[0].output, "{\"temp\": 20}");
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_payload() {
        let calls = vec![ToolCallRequest::new(
            "c2",
            "send_email",
            json!({ "email_to": "a@example.com" }),
        )];
        let resolution = resolve_once(RunState::RequiresToolOutput, &calls, &ToolRegistry::new())
            .await
            .expect("resolve");

        let outputs = match resolution {
            Resolution::SubmitOutputs(outputs) => outputs,
            other => panic!("expected outputs, got {other:?}"),
        };
        assert_eq!(outputs[0].tool_call_id, "c2");
        assert!(outputs[0].output.contains("unknown tool"));
    }

    #[tokio::test]
    async fn terminal_and_pending_states_do_not_dispatch() {
        let registry = weather_registry();
        let completed = resolve_once(RunState::Completed, &[], &registry).await;
        assert_eq!(completed, Ok(Resolution::Terminal(TerminalState::Completed)));

        let cancelled = resolve_once(RunState::Cancelled, &[], &registry).await;
        assert_eq!(cancelled, Ok(Resolution::Terminal(TerminalState::Cancelled)));

        let pending = resolve_once(RunState::Pending, &[], &registry).await;
        assert_eq!(pending, Ok(Resolution::ContinuePolling));
    }

    #[tokio::test]
    async fn malformed_pending_calls_are_contract_violations() {
        let registry = weather_registry();
        let missing = resolve_once(RunState::RequiresToolOutput, &[], &registry).await;
        assert_eq!(missing, Err(ResolveError::MissingToolCalls));

        let duplicated = vec![
            ToolCallRequest::new("c1", "get_weather", json!({})),
            ToolCallRequest::new("c1", "get_weather", json!({})),
        ];
        let duplicate = resolve_once(RunState::RequiresToolOutput, &duplicated, &registry).await;
        assert_eq!(
            duplicate,
            Err(ResolveError::DuplicateToolCallId("c1".to_string()))
        );

        let unnamed = vec![ToolCallRequest::new("", "get_weather", json!({}))];
        let empty = resolve_once(RunState::RequiresToolOutput, &unnamed, &registry).await;
        assert!(matches!(empty, Err(ResolveError::EmptyToolCallId { .. })));
    }

    #[tokio::test]
    async fn output_policy_applies_to_handler_values() {
        let registry = ToolRegistry::new().with_tool(Arc::new(FnTool::new("lookup", |_| {
            Ok(json!({ "token": "abc", "city": "London" }))
        })));
        let resolver = ToolCallResolver::new(Arc::new(registry)).with_output_policy(
            ToolOutputPolicy {
                redact_keys: vec!["token".to_string()],
                ..ToolOutputPolicy::default()
            },
        );
        let calls = vec![ToolCallRequest::new("c1", "lookup", Value::Null)];
        let Ok(Resolution::SubmitOutputs(outputs)) = resolver
            .resolve_once(RunState::RequiresToolOutput, &calls)
            .await
        else {
            panic!("expected outputs");
        };
        assert_eq!(
            outputs[0].as_json(),
            Some(json!({ "token": "[REDACTED]", "city": "London" }))
        );
    }
}
