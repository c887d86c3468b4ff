//! Run lifecycle states and poll snapshots.

use crate::{RunId, ToolCallRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a remote run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Queued or in progress on the remote side.
    Pending,
    /// Waiting for local tool outputs.
    RequiresToolOutput,
    Completed,
    Failed,
    Cancelled,
}

/// The subset of [`RunState`] that ends a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    /// Return the terminal state, if this state ends the run.
    pub fn terminal(self) -> Option<TerminalState> {
        match self {
            RunState::Completed => Some(TerminalState::Completed),
            RunState::Failed => Some(TerminalState::Failed),
            RunState::Cancelled => Some(TerminalState::Cancelled),
            RunState::Pending | RunState::RequiresToolOutput => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.terminal().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::RequiresToolOutput => "requires_tool_output",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
        }
    }
}

impl From<TerminalState> for RunState {
    fn from(value: TerminalState) -> Self {
        match value {
            TerminalState::Completed => RunState::Completed,
            TerminalState::Failed => RunState::Failed,
            TerminalState::Cancelled => RunState::Cancelled,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        RunState::from(*self).fmt(f)
    }
}

/// Status string the remote service reported that maps to no known state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized run status: {0}")]
pub struct ParseRunStateError(pub String);

impl FromStr for RunState {
    type Err = ParseRunStateError;

    /// Parse a remote run status string.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" | "in_progress" | "cancelling" | "pending" => Ok(RunState::Pending),
            "requires_action" | "requires_tool_output" => Ok(RunState::RequiresToolOutput),
            "completed" => Ok(RunState::Completed),
            "failed" | "expired" | "incomplete" => Ok(RunState::Failed),
            "cancelled" => Ok(RunState::Cancelled),
            _ => Err(ParseRunStateError(value.to_string())),
        }
    }
}

/// Last error the remote service attached to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub code: String,
    pub message: String,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// One observation of a run, as supplied by a poll tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Run id.
    pub run_id: RunId,
    /// Current state.
    pub state: RunState,
    /// Pending tool calls; only meaningful while `RequiresToolOutput`.
    #[serde(default)]
    pub pending_calls: Vec<ToolCallRequest>,
    /// Remote error attached to a failed run.
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl RunSnapshot {
    pub fn new(run_id: impl Into<RunId>, state: RunState) -> Self {
        Self {
            run_id: run_id.into(),
            state,
            pending_calls: Vec::new(),
            last_error: None,
        }
    }

    pub fn requires_tools(run_id: impl Into<RunId>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            pending_calls: calls,
            ..Self::new(run_id, RunState::RequiresToolOutput)
        }
    }

    /// Snapshot for a run that could not be observed or that failed remotely.
    pub fn failed(run_id: impl Into<RunId>, code: &str, message: impl Into<String>) -> Self {
        Self {
            last_error: Some(RunError {
                code: code.to_string(),
                message: message.into(),
            }),
            ..Self::new(run_id, RunState::Failed)
        }
    }
}
