//! Registry mapping function names to tool handlers.

use crate::tool::{Tool, ToolSpec};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;
use toolrelay_config::ToolPolicy;

/// Name-to-handler map. Populated at startup, then shared read-only.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its name, replacing any previous tool of that name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        debug!("registering tool (name={})", tool.name());
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Builder-style variant of [`ToolRegistry::register`].
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool specs for all registered tools, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|tool| tool.spec()).collect()
    }

    /// Sub-registry holding only the tools the policy permits.
    pub fn filtered(&self, policy: &ToolPolicy) -> ToolRegistry {
        let tools = self
            .tools
            .iter()
            .filter(|(name, _)| policy.permits(name))
            .map(|(name, tool)| (name.clone(), tool.clone()))
            .collect::<BTreeMap<_, _>>();
        debug!(
            "tool selection resolved (allowed={}, denied={}, selected={})",
            policy.allow.len(),
            policy.deny.len(),
            tools.len()
        );
        ToolRegistry { tools }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}
