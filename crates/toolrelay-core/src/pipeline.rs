//! Sequential multi-agent pipeline: each agent's reply is the next agent's input.

use crate::conversation::{Conversation, ConversationSettings, TurnReply};
use crate::error::CoreError;
use crate::service::AgentService;
use log::{info, warn};
use std::sync::Arc;
use toolrelay_config::{AgentConfig, ToolrelayConfig};
use toolrelay_tools::ToolRegistry;

/// One agent's turn in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStep {
    pub agent_id: String,
    pub agent_name: String,
    pub input: String,
    pub reply: TurnReply,
}

/// Runs a task through an ordered list of agents, each on a fresh conversation.
pub struct SequentialPipeline {
    service: Arc<dyn AgentService>,
    agents: Vec<AgentConfig>,
    tools: ToolRegistry,
    settings: ConversationSettings,
}

impl SequentialPipeline {
    pub fn new(
        service: Arc<dyn AgentService>,
        agents: Vec<AgentConfig>,
        tools: ToolRegistry,
        settings: ConversationSettings,
    ) -> Result<Self, CoreError> {
        if agents.is_empty() {
            return Err(CoreError::EmptyPipeline);
        }
        Ok(Self {
            service,
            agents,
            tools,
            settings,
        })
    }

    /// Build a pipeline from agent ids defined in the config.
    pub fn from_config(
        service: Arc<dyn AgentService>,
        config: &ToolrelayConfig,
        agent_ids: &[String],
        tools: ToolRegistry,
    ) -> Result<Self, CoreError> {
        let agents = agent_ids
            .iter()
            .map(|id| config.agent(id))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(
            service,
            agents,
            tools,
            ConversationSettings::from_config(config),
        )
    }

    pub fn agents(&self) -> &[AgentConfig] {
        &self.agents
    }

    /// Run the task through every agent in order.
    ///
    /// Stops early when an agent's run does not complete or yields no reply;
    /// the last returned step then shows why.
    pub async fn run<F>(&self, task: &str, mut on_step: F) -> Result<Vec<PipelineStep>, CoreError>
    where
        F: FnMut(&PipelineStep),
    {
        let mut steps = Vec::with_capacity(self.agents.len());
        let mut input = task.to_string();

        for agent in &self.agents {
            info!("pipeline step (agent={}, input_len={})", agent.id, input.len());
            let mut conversation = Conversation::start(
                self.service.clone(),
                agent,
                &self.tools,
                self.settings.clone(),
            )
            .await?;
            let result = conversation.send(&input).await;
            conversation.close().await;
            let reply = result?;

            let next = reply.text().map(str::to_string);
            let step = PipelineStep {
                agent_id: agent.id.clone(),
                agent_name: agent.display_name().to_string(),
                input,
                reply,
            };
            on_step(&step);
            steps.push(step);

            match next {
                Some(text) => input = text,
                None => {
                    warn!("pipeline stopped without a reply (agent={})", agent.id);
                    break;
                }
            }
        }
        Ok(steps)
    }
}
