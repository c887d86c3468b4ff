//! Test helpers shared across toolrelay crates.

pub mod service;
pub mod tools;

pub use service::{ScriptedAgentService, Submission};
pub use tools::{CountingTool, DummyTool, FailingTool, PanickingTool, SlowTool};
