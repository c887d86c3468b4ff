//! Tool trait definition and metadata spec.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use toolrelay_protocol::ToolError;

/// Tool metadata advertised to the remote agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    /// Function name the agent calls.
    pub name: String,
    pub description: String,
    /// JSON schema for the argument payload.
    pub args_schema: Value,
}

/// A named local function the remote agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema for tool arguments.
    fn args_schema(&self) -> Value;

    /// Invoke the tool with a decoded argument payload.
    async fn call(&self, args: Value) -> Result<Value, ToolError>;

    /// Build a `ToolSpec` describing this tool.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            args_schema: self.args_schema(),
        }
    }
}

type Handler = dyn Fn(Value) -> Result<Value, ToolError> + Send + Sync;

/// Adapts a synchronous closure into a [`Tool`].
#[derive(Clone)]
pub struct FnTool {
    spec: ToolSpec,
    handler: Arc<Handler>,
}

impl FnTool {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            spec: ToolSpec {
                name: name.into(),
                description: String::new(),
                args_schema: serde_json::json!({ "type": "object", "properties": {} }),
            },
            handler: Arc::new(handler),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = description.into();
        self
    }

    pub fn with_args_schema(mut self, schema: Value) -> Self {
        self.spec.args_schema = schema;
        self
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnTool({})", self.spec.name)
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn args_schema(&self) -> Value {
        self.spec.args_schema.clone()
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        (self.handler)(args)
    }
}
