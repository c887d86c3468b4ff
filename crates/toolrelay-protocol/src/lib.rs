//! Plain data types shared between the resolver, the run driver, and the
//! remote agent service client.

mod run;
mod tool;

pub use run::{ParseRunStateError, RunError, RunSnapshot, RunState, TerminalState};
pub use tool::{ToolCallRequest, ToolError, ToolOutput};

use serde::{Deserialize, Serialize};

/// Remote identifier of an agent resource.
pub type AgentId = String;
/// Remote identifier of a conversation thread.
pub type ThreadId = String;
/// Remote identifier of a run.
pub type RunId = String;
/// Identifier of a single tool call within a run.
pub type ToolCallId = String;
/// Remote identifier of an uploaded file.
pub type FileId = String;

/// Address of a run on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRef {
    /// Thread the run belongs to.
    pub thread_id: ThreadId,
    /// Run id.
    pub run_id: RunId,
}

impl RunRef {
    pub fn new(thread_id: impl Into<ThreadId>, run_id: impl Into<RunId>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
        }
    }
}

/// Role of a message in a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Text message read back from a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Message author.
    pub role: MessageRole,
    /// Concatenated text parts of the message.
    pub text: String,
}
