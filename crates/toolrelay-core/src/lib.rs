//! Run orchestration for toolrelay.
//!
//! This crate owns the seams to the remote agent service, the HTTP client
//! that implements them, the poll-resolve-submit run driver, and the
//! conversation and pipeline drivers built on top of it.

pub mod conversation;
pub mod driver;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod service;

/// Conversation lifecycle and per-turn replies.
pub use conversation::{Conversation, ConversationSettings, TurnReply};
/// Poll loop around the tool-call resolver.
pub use driver::{PollPolicy, RunDriver, RunOutcome, Step};
/// Error types for service calls and orchestration.
pub use error::{CoreError, ServiceError};
/// HTTP implementation of the agent service seams.
pub use http::HttpAgentService;
/// Sequential multi-agent pipeline.
pub use pipeline::{PipelineStep, SequentialPipeline};
/// Remote collaborator seams.
pub use service::{AgentDefinition, AgentService, OutputSubmitter, RunPoller};
