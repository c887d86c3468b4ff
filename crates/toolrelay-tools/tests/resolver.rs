//! Resolver behaviour against fixture tools.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use toolrelay_protocol::{RunSnapshot, RunState, TerminalState, ToolCallRequest, ToolOutput};
use toolrelay_test_utils::{CountingTool, DummyTool, FailingTool, PanickingTool, SlowTool};
use toolrelay_tools::{ExecutionMode, Resolution, ToolCallResolver, ToolRegistry, resolve_once};

fn outputs(resolution: Resolution) -> Vec<ToolOutput> {
    match resolution {
        Resolution::SubmitOutputs(outputs) => outputs,
        other => panic!("expected outputs, got {other:?}"),
    }
}

fn mixed_registry(counter: &CountingTool) -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(Arc::new(
            DummyTool::new("get_weather").with_result(json!({ "temp": 20 })),
        ))
        .with_tool(Arc::new(counter.clone()))
        .with_tool(Arc::new(FailingTool::new("send_email", "smtp down")))
}

#[tokio::test]
async fn one_output_per_request_with_matching_ids() {
    let counter = CountingTool::new("echo");
    let registry = mixed_registry(&counter);
    let calls = vec![
        ToolCallRequest::new("a", "get_weather", json!({})),
        ToolCallRequest::new("b", "echo", json!({ "x": 1 })),
        ToolCallRequest::new("c", "send_email", json!({})),
        ToolCallRequest::new("d", "missing", json!({})),
    ];

    let result = outputs(
        resolve_once(RunState::RequiresToolOutput, &calls, &registry)
            .await
            .expect("resolve"),
    );

    let ids = result
        .iter()
        .map(|output| output.tool_call_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert_eq!(result[1].as_json(), Some(json!({ "echo": { "x": 1 } })));
    assert_eq!(counter.calls(), 1);
}

#[tokio::test]
async fn concurrent_execution_keeps_request_order() {
    let registry = ToolRegistry::new()
        .with_tool(Arc::new(SlowTool::new("slow", Duration::from_millis(60))))
        .with_tool(Arc::new(SlowTool::new("fast", Duration::from_millis(1))));
    let resolver =
        ToolCallResolver::new(Arc::new(registry)).with_mode(ExecutionMode::Concurrent);
    let calls = vec![
        ToolCallRequest::new("c1", "slow", json!({})),
        ToolCallRequest::new("c2", "fast", json!({})),
    ];

    let result = outputs(
        resolver
            .resolve_once(RunState::RequiresToolOutput, &calls)
            .await
            .expect("resolve"),
    );
    assert_eq!(
        result,
        vec![ToolOutput::new("c1", "slow"), ToolOutput::new("c2", "fast")]
    );
}

#[tokio::test]
async fn unknown_tool_never_invokes_handlers() {
    let counter = CountingTool::new("echo");
    let registry = ToolRegistry::new().with_tool(Arc::new(counter.clone()));
    let calls = vec![ToolCallRequest::new("c1", "nope", json!({}))];

    let result = outputs(
        resolve_once(RunState::RequiresToolOutput, &calls, &registry)
            .await
            .expect("resolve"),
    );
    assert_eq!(
        result[0].as_json(),
        Some(json!({ "error": "unknown tool: nope" }))
    );
    assert_eq!(counter.calls(), 0);
}

#[tokio::test]
async fn handler_errors_and_panics_become_error_outputs() {
    let registry = ToolRegistry::new()
        .with_tool(Arc::new(FailingTool::new("send_email", "smtp down")))
        .with_tool(Arc::new(PanickingTool::new("create_freshdesk_ticket")));
    let calls = vec![
        ToolCallRequest::new("c1", "send_email", json!({})),
        ToolCallRequest::new("c2", "create_freshdesk_ticket", json!({})),
    ];

    let result = outputs(
        resolve_once(RunState::RequiresToolOutput, &calls, &registry)
            .await
            .expect("resolve"),
    );
    assert_eq!(
        result[0].as_json(),
        Some(json!({ "error": "execution failed: smtp down" }))
    );
    let panicked = result[1].as_json().expect("json");
    let message = panicked["error"].as_str().expect("error text");
    assert!(message.starts_with("tool panicked"), "{message}");
    assert!(message.contains("create_freshdesk_ticket exploded"), "{message}");
}

#[tokio::test]
async fn completed_run_returns_without_invoking_handlers() {
    let counter = CountingTool::new("echo");
    let registry = ToolRegistry::new().with_tool(Arc::new(counter.clone()));

    let resolution = resolve_once(RunState::Completed, &[], &registry)
        .await
        .expect("resolve");
    assert_eq!(resolution, Resolution::Terminal(TerminalState::Completed));
    assert_eq!(counter.calls(), 0);
}

#[tokio::test]
async fn failed_snapshot_is_terminal() {
    let resolver = ToolCallResolver::new(Arc::new(ToolRegistry::new()));
    let snapshot = RunSnapshot::failed("run_1", "server_error", "boom");
    let resolution = resolver.resolve_snapshot(&snapshot).await.expect("resolve");
    assert_eq!(resolution, Resolution::Terminal(TerminalState::Failed));
}

#[tokio::test]
async fn repeated_resolution_yields_identical_ids() {
    let counter = CountingTool::new("echo");
    let registry = mixed_registry(&counter);
    let calls = vec![
        ToolCallRequest::new("x1", "echo", json!({})),
        ToolCallRequest::new("x2", "get_weather", json!({})),
        ToolCallRequest::new("x3", "unknown", json!({})),
    ];

    let first = outputs(
        resolve_once(RunState::RequiresToolOutput, &calls, &registry)
            .await
            .expect("first"),
    );
    let second = outputs(
        resolve_once(RunState::RequiresToolOutput, &calls, &registry)
            .await
            .expect("second"),
    );

    let ids = |outputs: &[ToolOutput]| {
        outputs
            .iter()
            .map(|output| output.tool_call_id.clone())
            .collect::<BTreeSet<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(
        ids(&first),
        ["x1", "x2", "x3"].into_iter().map(str::to_string).collect()
    );
}

#[tokio::test]
async fn string_values_are_sent_verbatim() {
    let registry = ToolRegistry::new()
        .with_tool(Arc::new(DummyTool::new("status").with_result(json!("all clear"))));
    let calls = vec![ToolCallRequest::new("c1", "status", json!({}))];
    let result = outputs(
        resolve_once(RunState::RequiresToolOutput, &calls, &registry)
            .await
            .expect("resolve"),
    );
    assert_eq!(result, vec![ToolOutput::new("c1", "all clear")]);
}
