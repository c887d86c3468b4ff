//! Configuration schema for toolrelay.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root config for toolrelay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolrelayConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl ToolrelayConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> ToolrelayConfigBuilder {
        ToolrelayConfigBuilder::new()
    }

    /// Look up an agent profile by id.
    ///
    /// With no profiles configured, the id `assistant` resolves to
    /// [`AgentConfig::default_assistant`].
    pub fn agent(&self, id: &str) -> Result<AgentConfig, ConfigError> {
        if let Some(agent) = self.agents.iter().find(|agent| agent.id == id) {
            return Ok(agent.clone());
        }
        if self.agents.is_empty() && id == DEFAULT_AGENT_ID {
            return Ok(AgentConfig::default_assistant());
        }
        Err(ConfigError::UnknownAgent(id.to_string()))
    }

    /// Id of the agent used when none is requested.
    pub fn default_agent_id(&self) -> &str {
        self.agents
            .first()
            .map(|agent| agent.id.as_str())
            .unwrap_or(DEFAULT_AGENT_ID)
    }
}

/// Builder for assembling a `ToolrelayConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct ToolrelayConfigBuilder {
    config: ToolrelayConfig,
}

impl ToolrelayConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ToolrelayConfig::default(),
        }
    }

    pub fn service(mut self, service: ServiceConfig) -> Self {
        self.config.service = service;
        self
    }

    pub fn polling(mut self, polling: PollingConfig) -> Self {
        self.config.polling = polling;
        self
    }

    pub fn conversation(mut self, conversation: ConversationConfig) -> Self {
        self.config.conversation = conversation;
        self
    }

    pub fn tools(mut self, tools: ToolsConfig) -> Self {
        self.config.tools = tools;
        self
    }

    /// Append an agent profile.
    pub fn agent(mut self, agent: AgentConfig) -> Self {
        self.config.agents.push(agent);
        self
    }

    pub fn build(self) -> ToolrelayConfig {
        self.config
    }
}

/// Id of the fallback agent profile.
pub const DEFAULT_AGENT_ID: &str = "assistant";

/// How requests authenticate against the agent service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `api-key: <key>` header.
    #[default]
    ApiKey,
    /// `Authorization: Bearer <key>` header.
    Bearer,
}

/// Connection settings for the remote agent service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Literal endpoint; takes precedence over `endpoint_env`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_endpoint_env")]
    pub endpoint_env: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub auth: AuthScheme,
    /// Optional `api-version` query parameter appended to every request.
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            endpoint_env: default_endpoint_env(),
            api_key_env: default_api_key_env(),
            auth: AuthScheme::default(),
            api_version: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    /// Resolve the service endpoint from the config or its environment variable.
    pub fn resolve_endpoint(&self) -> Result<String, ConfigError> {
        match &self.endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => Ok(endpoint.clone()),
            _ => read_env(&self.endpoint_env, "service endpoint"),
        }
    }

    /// Resolve the service API key from its environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        read_env(&self.api_key_env, "service API key")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_endpoint_env() -> String {
    "TOOLRELAY_ENDPOINT".to_string()
}

fn default_api_key_env() -> String {
    "TOOLRELAY_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Poll cadence for run status checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    /// Multiplier applied to the delay after each pending tick; 1.0 keeps it fixed.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    /// Maximum poll ticks per run; `None` polls until a terminal state.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            backoff_factor: default_backoff_factor(),
            max_interval_ms: default_max_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_interval_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> Option<u32> {
    Some(300)
}

/// What the chat loop does after a run ends failed or cancelled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailedRunPolicy {
    /// Report the failure and wait for the next input.
    #[default]
    Continue,
    /// Report the failure and end the conversation.
    Stop,
}

/// Chat loop behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    #[serde(default)]
    pub on_failed_run: FailedRunPolicy,
    /// Inputs that end the chat loop (compared case-insensitively).
    #[serde(default = "default_exit_commands")]
    pub exit_commands: Vec<String>,
    /// Execute the tool calls of one run concurrently.
    #[serde(default)]
    pub concurrent_tools: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            on_failed_run: FailedRunPolicy::default(),
            exit_commands: default_exit_commands(),
            concurrent_tools: false,
        }
    }
}

impl ConversationConfig {
    /// Whether the given input ends the chat loop.
    pub fn is_exit_command(&self, input: &str) -> bool {
        let input = input.trim();
        self.exit_commands
            .iter()
            .any(|command| command.eq_ignore_ascii_case(input))
    }
}

fn default_exit_commands() -> Vec<String> {
    ["exit", "quit", "bye", "end"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Tool allow/deny policy for a single agent.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ToolPolicy {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

impl ToolPolicy {
    /// Build a policy that allows all tools.
    pub fn allow_all() -> Self {
        Self {
            allow: vec!["*".to_string()],
            deny: Vec::new(),
        }
    }

    /// Build a policy that allows nothing.
    pub fn deny_all() -> Self {
        Self {
            allow: Vec::new(),
            deny: vec!["*".to_string()],
        }
    }

    /// Whether a tool name passes the policy. Deny wins over allow; an empty
    /// allow list allows everything.
    pub fn permits(&self, name: &str) -> bool {
        if self.deny.iter().any(|entry| entry == name || entry == "*") {
            return false;
        }
        if self.allow.is_empty() || self.allow.iter().any(|entry| entry == "*") {
            return true;
        }
        self.allow.iter().any(|entry| entry == name)
    }
}

/// Global tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub output_policy: ToolOutputPolicyConfig,
    #[serde(default)]
    pub weather: Option<WeatherToolConfig>,
    #[serde(default)]
    pub email: Option<EmailToolConfig>,
    #[serde(default)]
    pub freshdesk: Option<FreshdeskToolConfig>,
}

/// Output policy for tool results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutputPolicyConfig {
    #[serde(default = "default_max_string_bytes")]
    pub max_string_bytes: usize,
    #[serde(default = "default_max_array_len")]
    pub max_array_len: usize,
    #[serde(default = "default_max_object_entries")]
    pub max_object_entries: usize,
    #[serde(default)]
    pub redact_keys: Vec<String>,
    #[serde(default = "default_redaction_replacement")]
    pub replacement: String,
}

impl Default for ToolOutputPolicyConfig {
    fn default() -> Self {
        Self {
            max_string_bytes: default_max_string_bytes(),
            max_array_len: default_max_array_len(),
            max_object_entries: default_max_object_entries(),
            redact_keys: Vec::new(),
            replacement: default_redaction_replacement(),
        }
    }
}

fn default_max_string_bytes() -> usize {
    32 * 1024
}

fn default_max_array_len() -> usize {
    256
}

fn default_max_object_entries() -> usize {
    256
}

fn default_redaction_replacement() -> String {
    "[REDACTED]".to_string()
}

/// Settings for the `get_weather` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherToolConfig {
    #[serde(default = "default_weather_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
}

impl Default for WeatherToolConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_weather_api_key_env(),
            base_url: default_weather_base_url(),
        }
    }
}

impl WeatherToolConfig {
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        read_env(&self.api_key_env, "weather API key")
    }
}

fn default_weather_api_key_env() -> String {
    "OPENWEATHER_MAP_API_KEY".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

/// Settings for the `send_email` tool, which posts to a workflow webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailToolConfig {
    /// Environment variable holding the full webhook URL, including its signature query.
    #[serde(default = "default_webhook_url_env")]
    pub webhook_url_env: String,
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmailToolConfig {
    fn default() -> Self {
        Self {
            webhook_url_env: default_webhook_url_env(),
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl EmailToolConfig {
    pub fn resolve_webhook_url(&self) -> Result<String, ConfigError> {
        read_env(&self.webhook_url_env, "email webhook URL")
    }
}

fn default_webhook_url_env() -> String {
    "LOGIC_APPS_FULL_URL".to_string()
}

fn default_webhook_timeout_secs() -> u64 {
    30
}

/// Settings for the `create_freshdesk_ticket` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshdeskToolConfig {
    #[serde(default = "default_freshdesk_domain_env")]
    pub domain_env: String,
    #[serde(default = "default_freshdesk_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_ticket_description")]
    pub description: String,
}

impl Default for FreshdeskToolConfig {
    fn default() -> Self {
        Self {
            domain_env: default_freshdesk_domain_env(),
            api_key_env: default_freshdesk_api_key_env(),
            description: default_ticket_description(),
        }
    }
}

impl FreshdeskToolConfig {
    pub fn resolve_domain(&self) -> Result<String, ConfigError> {
        read_env(&self.domain_env, "helpdesk domain")
    }

    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        read_env(&self.api_key_env, "helpdesk API key")
    }
}

fn default_freshdesk_domain_env() -> String {
    "FRESHDESK_DOMAIN".to_string()
}

fn default_freshdesk_api_key_env() -> String {
    "FRESHDESK_API_KEY".to_string()
}

fn default_ticket_description() -> String {
    "This ticket was created via an AI agent.".to_string()
}

/// A tool executed by the remote service itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostedToolConfig {
    /// Sandboxed code execution, optionally with uploaded files.
    CodeInterpreter {
        #[serde(default)]
        file_ids: Vec<String>,
    },
    /// Retrieval over vector stores.
    FileSearch {
        #[serde(default)]
        vector_store_ids: Vec<String>,
    },
    /// Retrieval over a connected search index.
    AzureAiSearch {
        connection_id: String,
        index_name: String,
    },
    /// Remote HTTP API described by an OpenAPI document.
    Openapi {
        name: String,
        #[serde(default)]
        description: Option<String>,
        spec_path: PathBuf,
        #[serde(default)]
        connection_id: Option<String>,
    },
}

/// Definition of one remote agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub id: String,
    /// Display name sent to the service; defaults to the id.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_instructions")]
    pub instructions: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Which local function tools are advertised to and resolvable for this agent.
    #[serde(default)]
    pub tools: ToolPolicy,
    #[serde(default)]
    pub hosted_tools: Vec<HostedToolConfig>,
    /// Uploaded file ids attached to every user message.
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Local files uploaded when a conversation starts, attached to every
    /// user message, and deleted when it closes.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// File whose contents are appended to every user message.
    #[serde(default)]
    pub context_file: Option<PathBuf>,
}

impl AgentConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            model: default_model(),
            instructions: default_instructions(),
            temperature: None,
            tools: ToolPolicy::default(),
            hosted_tools: Vec::new(),
            attachments: Vec::new(),
            files: Vec::new(),
            context_file: None,
        }
    }

    /// Profile used when the config defines no agents.
    pub fn default_assistant() -> Self {
        Self::new(DEFAULT_AGENT_ID)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_tools(mut self, tools: ToolPolicy) -> Self {
        self.tools = tools;
        self
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_instructions() -> String {
    "You are a helpful agent.".to_string()
}

/// Sequential multi-agent pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Agent ids in execution order.
    #[serde(default)]
    pub agents: Vec<String>,
}

/// Read a non-empty environment variable.
fn read_env(var: &str, purpose: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv {
            var: var.to_string(),
            purpose: purpose.to_string(),
        }),
    }
}
