//! Tool handlers, the handler registry, and the tool-call resolver.

pub mod builtins;
pub mod output_policy;
pub mod registry;
pub mod resolver;
pub mod tool;

/// Built-in tools and their registration helper.
pub use builtins::{
    EmailSettings, EmailTool, FreshdeskSettings, FreshdeskTool, WeatherSettings, WeatherTool,
    register_builtin_tools,
};
/// Tool output policy.
pub use output_policy::ToolOutputPolicy;
/// Tool registry type.
pub use registry::ToolRegistry;
/// Resolver for pending tool calls.
pub use resolver::{ExecutionMode, Resolution, ResolveError, ToolCallResolver, resolve_once};
/// Tool trait, closure adaptor, and spec type.
pub use tool::{FnTool, Tool, ToolSpec};
