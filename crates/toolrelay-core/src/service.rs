//! Seams to the remote agent service.
//!
//! The run driver only needs [`RunPoller`] and [`OutputSubmitter`]; the
//! conversation driver needs the full [`AgentService`].

use crate::error::ServiceError;
use async_trait::async_trait;
use std::path::Path;
use toolrelay_config::{AgentConfig, HostedToolConfig};
use toolrelay_protocol::{
    AgentId, FileId, RunRef, RunSnapshot, ThreadId, ThreadMessage, ToolOutput,
};
use toolrelay_tools::{ToolRegistry, ToolSpec};

/// Observes a run's current state.
#[async_trait]
pub trait RunPoller: Send + Sync {
    /// Fetch one snapshot of the run.
    ///
    /// Transport and auth failures are reported as a `Failed` snapshot whose
    /// `last_error` carries the failure, so a poll loop always terminates.
    async fn poll(&self, run: &RunRef) -> RunSnapshot;
}

/// Delivers tool outputs back to a run.
#[async_trait]
pub trait OutputSubmitter: Send + Sync {
    /// Submit one batch of outputs and return the run as the service reports it.
    async fn submit(
        &self,
        run: &RunRef,
        outputs: &[ToolOutput],
    ) -> Result<RunSnapshot, ServiceError>;
}

/// Agent, thread, message, and run management on the remote service.
#[async_trait]
pub trait AgentService: RunPoller + OutputSubmitter {
    async fn create_agent(&self, definition: &AgentDefinition) -> Result<AgentId, ServiceError>;
    async fn delete_agent(&self, agent_id: &str) -> Result<(), ServiceError>;
    async fn create_thread(&self) -> Result<ThreadId, ServiceError>;
    async fn delete_thread(&self, thread_id: &str) -> Result<(), ServiceError>;
    /// Upload a local file for use by agents (`purpose=assistants`).
    async fn upload_file(&self, path: &Path) -> Result<FileId, ServiceError>;
    async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError>;
    /// Post a user message, optionally referencing uploaded files.
    async fn add_message(
        &self,
        thread_id: &str,
        content: &str,
        attachments: &[String],
    ) -> Result<(), ServiceError>;
    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<RunRef, ServiceError>;
    async fn cancel_run(&self, run: &RunRef) -> Result<(), ServiceError>;
    /// Most recent assistant message written by the given run, if any.
    async fn latest_assistant_message(
        &self,
        run: &RunRef,
    ) -> Result<Option<ThreadMessage>, ServiceError>;
}

/// Everything the service needs to create an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDefinition {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub temperature: Option<f32>,
    /// Local function tools advertised to the agent.
    pub tools: Vec<ToolSpec>,
    /// Tools executed by the service itself.
    pub hosted_tools: Vec<HostedToolConfig>,
}

impl AgentDefinition {
    /// Build a definition from an agent profile and the tools it may call.
    pub fn from_config(agent: &AgentConfig, tools: &ToolRegistry) -> Self {
        Self {
            name: agent.display_name().to_string(),
            model: agent.model.clone(),
            instructions: agent.instructions.clone(),
            temperature: agent.temperature,
            tools: tools.specs(),
            hosted_tools: agent.hosted_tools.clone(),
        }
    }
}
