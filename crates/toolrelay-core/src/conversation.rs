//! Conversation lifecycle: one remote agent, one thread, many runs.

use crate::driver::{PollPolicy, RunDriver, RunOutcome};
use crate::error::CoreError;
use crate::service::{AgentDefinition, AgentService};
use log::{debug, info, warn};
use std::fs;
use std::sync::Arc;
use toolrelay_config::{AgentConfig, ToolrelayConfig};
use toolrelay_protocol::{AgentId, FileId, ThreadId, ThreadMessage};
use toolrelay_tools::{ExecutionMode, ToolCallResolver, ToolOutputPolicy, ToolRegistry};

/// Run-level settings shared by every conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationSettings {
    pub poll: PollPolicy,
    pub mode: ExecutionMode,
    pub output_policy: Option<ToolOutputPolicy>,
}

impl ConversationSettings {
    pub fn from_config(config: &ToolrelayConfig) -> Self {
        Self {
            poll: PollPolicy::from(&config.polling),
            mode: if config.conversation.concurrent_tools {
                ExecutionMode::Concurrent
            } else {
                ExecutionMode::Sequential
            },
            output_policy: Some(ToolOutputPolicy::from(&config.tools.output_policy)),
        }
    }
}

/// Outcome of one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub outcome: RunOutcome,
    /// Latest assistant message; only fetched for completed runs.
    pub message: Option<ThreadMessage>,
}

impl TurnReply {
    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().map(|message| message.text.as_str())
    }
}

/// A remote agent and thread created for one chat session.
pub struct Conversation {
    service: Arc<dyn AgentService>,
    resolver: ToolCallResolver,
    poll: PollPolicy,
    agent: AgentConfig,
    agent_id: AgentId,
    thread_id: ThreadId,
    file_ids: Vec<FileId>,
    attachments: Vec<String>,
    context: Option<String>,
}

impl Conversation {
    /// Upload the agent's files, then create the remote agent and a thread
    /// for it.
    ///
    /// Only the tools permitted by the agent's tool policy are advertised
    /// and resolvable. Resources created before a failing step are removed.
    pub async fn start(
        service: Arc<dyn AgentService>,
        agent: &AgentConfig,
        tools: &ToolRegistry,
        settings: ConversationSettings,
    ) -> Result<Self, CoreError> {
        let context = match &agent.context_file {
            Some(path) => {
                debug!("loading context file (path={})", path.display());
                Some(fs::read_to_string(path)?)
            }
            None => None,
        };

        let mut file_ids = Vec::with_capacity(agent.files.len());
        for path in &agent.files {
            match service.upload_file(path).await {
                Ok(file_id) => file_ids.push(file_id),
                Err(err) => {
                    cleanup(service.as_ref(), None, None, &file_ids).await;
                    return Err(err.into());
                }
            }
        }

        let tools = tools.filtered(&agent.tools);
        let definition = AgentDefinition::from_config(agent, &tools);
        let agent_id = match service.create_agent(&definition).await {
            Ok(agent_id) => agent_id,
            Err(err) => {
                cleanup(service.as_ref(), None, None, &file_ids).await;
                return Err(err.into());
            }
        };
        let thread_id = match service.create_thread().await {
            Ok(thread_id) => thread_id,
            Err(err) => {
                cleanup(service.as_ref(), None, Some(&agent_id), &file_ids).await;
                return Err(err.into());
            }
        };
        info!(
            "conversation started (agent={}, agent_id={}, thread_id={}, tools={:?}, files={})",
            agent.id,
            agent_id,
            thread_id,
            tools.list(),
            file_ids.len()
        );

        let attachments: Vec<String> = agent
            .attachments
            .iter()
            .chain(&file_ids)
            .cloned()
            .collect();
        let mut resolver = ToolCallResolver::new(Arc::new(tools)).with_mode(settings.mode);
        if let Some(policy) = settings.output_policy {
            resolver = resolver.with_output_policy(policy);
        }
        Ok(Self {
            service,
            resolver,
            poll: settings.poll,
            agent: agent.clone(),
            agent_id,
            thread_id,
            file_ids,
            attachments,
            context,
        })
    }

    pub fn agent(&self) -> &AgentConfig {
        &self.agent
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Ids of the files uploaded for this conversation.
    pub fn file_ids(&self) -> &[FileId] {
        &self.file_ids
    }

    /// Names of the local tools this conversation resolves.
    pub fn tool_names(&self) -> Vec<String> {
        self.resolver.registry().list()
    }

    /// Post a user message, drive the resulting run, and fetch the reply.
    pub async fn send(&mut self, text: &str) -> Result<TurnReply, CoreError> {
        let content = match &self.context {
            Some(context) => format!("{text}\n\n{context}"),
            None => text.to_string(),
        };
        self.service
            .add_message(&self.thread_id, &content, &self.attachments)
            .await?;
        let run = self
            .service
            .create_run(&self.thread_id, &self.agent_id)
            .await?;

        let driver = RunDriver::new(
            self.service.as_ref(),
            &self.resolver,
            self.poll.clone(),
            run.clone(),
        );
        let outcome = match driver.drive().await {
            Ok(outcome) => outcome,
            Err(err) => {
                if matches!(err, CoreError::PollAttemptsExhausted { .. })
                    && let Err(cancel) = self.service.cancel_run(&run).await
                {
                    warn!("failed to cancel run (run_id={}, error={cancel})", run.run_id);
                }
                return Err(err);
            }
        };

        let message = if outcome.is_completed() {
            self.service.latest_assistant_message(&run).await?
        } else {
            warn!(
                "run did not complete (run_id={}, state={}, error={})",
                outcome.run_id,
                outcome.state,
                outcome
                    .last_error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            );
            None
        };
        Ok(TurnReply { outcome, message })
    }

    /// Delete the thread, the agent, and uploaded files. Cleanup failures are
    /// logged only.
    pub async fn close(self) {
        cleanup(
            self.service.as_ref(),
            Some(&self.thread_id),
            Some(&self.agent_id),
            &self.file_ids,
        )
        .await;
        info!("conversation closed (agent={})", self.agent.id);
    }
}

async fn cleanup(
    service: &dyn AgentService,
    thread_id: Option<&str>,
    agent_id: Option<&str>,
    file_ids: &[FileId],
) {
    if let Some(thread_id) = thread_id
        && let Err(err) = service.delete_thread(thread_id).await
    {
        warn!("failed to delete thread (thread_id={thread_id}, error={err})");
    }
    if let Some(agent_id) = agent_id
        && let Err(err) = service.delete_agent(agent_id).await
    {
        warn!("failed to delete agent (agent_id={agent_id}, error={err})");
    }
    for file_id in file_ids {
        if let Err(err) = service.delete_file(file_id).await {
            warn!("failed to delete file (file_id={file_id}, error={err})");
        }
    }
}
