//! Chat loop behaviour against a scripted agent service.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use toolrelay::builtin_registry;
use toolrelay::chat::{ChatEnd, run_chat};
use toolrelay::config::{AgentConfig, ConversationConfig, FailedRunPolicy, ToolsConfig};
use toolrelay::core::{Conversation, ConversationSettings, PollPolicy};
use toolrelay::protocol::{RunSnapshot, RunState, TerminalState, ToolCallRequest};
use toolrelay::tools::ToolRegistry;
use toolrelay_test_utils::{DummyTool, ScriptedAgentService};

fn settings() -> ConversationSettings {
    ConversationSettings {
        poll: PollPolicy::fixed(Duration::ZERO).with_max_attempts(20),
        ..ConversationSettings::default()
    }
}

async fn start(service: Arc<ScriptedAgentService>) -> Conversation {
    start_with(service, settings()).await
}

async fn start_with(
    service: Arc<ScriptedAgentService>,
    settings: ConversationSettings,
) -> Conversation {
    let registry = ToolRegistry::new().with_tool(Arc::new(
        DummyTool::new("get_weather").with_result(json!({ "temp": 20 })),
    ));
    Conversation::start(service, &AgentConfig::new("weather"), &registry, settings)
        .await
        .expect("start")
}

fn pending_service() -> Arc<ScriptedAgentService> {
    Arc::new(
        ScriptedAgentService::new()
            .with_snapshots((0..2).map(|_| RunSnapshot::new("run_3", RunState::Pending)))
            .with_replies(["never read", "Second answer."]),
    )
}

fn bounded_settings() -> ConversationSettings {
    ConversationSettings {
        poll: PollPolicy::fixed(Duration::ZERO).with_max_attempts(2),
        ..ConversationSettings::default()
    }
}

async fn chat(
    conversation: &mut Conversation,
    config: &ConversationConfig,
    input: &str,
) -> (ChatEnd, String) {
    let mut output = Vec::new();
    let end = run_chat(conversation, config, Cursor::new(input.to_string()), &mut output)
        .await
        .expect("chat");
    (end, String::from_utf8(output).expect("utf8"))
}

#[tokio::test]
async fn exit_command_ends_chat_after_replies() {
    let service = Arc::new(
        ScriptedAgentService::new()
            .with_snapshots([RunSnapshot::requires_tools(
                "run_3",
                vec![ToolCallRequest::new(
                    "call_1",
                    "get_weather",
                    json!({ "latitude": 51.5, "longitude": -0.12 }),
                )],
            )])
            .with_replies(["It is 20 degrees."]),
    );
    let mut conversation = start(service.clone()).await;

    let (end, output) = chat(
        &mut conversation,
        &ConversationConfig::default(),
        "Weather in London?\nQUIT\nnever sent\n",
    )
    .await;

    assert_eq!(end, ChatEnd::ExitCommand);
    assert_eq!(
        output,
        "User: Agent: It is 20 degrees.\nUser: Ending the conversation.\n"
    );
    assert_eq!(service.messages().len(), 1);
    assert_eq!(service.submissions().len(), 1);
}

#[tokio::test]
async fn blank_lines_are_skipped_and_eof_ends_chat() {
    let service = Arc::new(ScriptedAgentService::new());
    let mut conversation = start(service.clone()).await;

    let (end, output) = chat(&mut conversation, &ConversationConfig::default(), "\n   \n").await;

    assert_eq!(end, ChatEnd::EndOfInput);
    assert_eq!(output, "User: User: User: ");
    assert!(service.messages().is_empty());
}

#[tokio::test]
async fn completed_run_without_message_reports_no_response() {
    let service = Arc::new(ScriptedAgentService::new());
    let mut conversation = start(service).await;

    let (end, output) = chat(&mut conversation, &ConversationConfig::default(), "hello\n").await;

    assert_eq!(end, ChatEnd::EndOfInput);
    assert_eq!(
        output,
        "User: Agent: No valid response received.\nUser: "
    );
}

#[tokio::test]
async fn failed_run_continues_by_default() {
    let service = Arc::new(
        ScriptedAgentService::new()
            .with_snapshots([RunSnapshot::failed("run_3", "server_error", "boom")])
            .with_replies(["unused", "Second answer."]),
    );
    let mut conversation = start(service).await;

    let (end, output) = chat(
        &mut conversation,
        &ConversationConfig::default(),
        "first\nsecond\nexit\n",
    )
    .await;

    assert_eq!(end, ChatEnd::ExitCommand);
    assert_eq!(
        output,
        "User: Run failed: server_error: boom\nUser: Agent: Second answer.\nUser: Ending the conversation.\n"
    );
}

#[tokio::test]
async fn failed_run_stops_chat_under_stop_policy() {
    let service = Arc::new(
        ScriptedAgentService::new()
            .with_snapshots([RunSnapshot::failed("run_3", "server_error", "boom")]),
    );
    let mut conversation = start(service.clone()).await;
    let config = ConversationConfig {
        on_failed_run: FailedRunPolicy::Stop,
        ..ConversationConfig::default()
    };

    let (end, output) = chat(&mut conversation, &config, "first\nsecond\n").await;

    match end {
        ChatEnd::RunFailed(outcome) => {
            assert_eq!(outcome.state, TerminalState::Failed);
            assert_eq!(outcome.run_id, "run_3");
        }
        other => panic!("expected failed run, got {other:?}"),
    }
    assert_eq!(output, "User: Run failed: server_error: boom\n");
    assert_eq!(service.messages().len(), 1);
}

#[tokio::test]
async fn turn_errors_are_reported_and_chat_continues_by_default() {
    let service = pending_service();
    let mut conversation = start_with(service.clone(), bounded_settings()).await;

    let (end, output) = chat(
        &mut conversation,
        &ConversationConfig::default(),
        "first\nsecond\nbye\n",
    )
    .await;

    assert_eq!(end, ChatEnd::ExitCommand);
    assert_eq!(
        output,
        "User: Error: run run_3 still active after 2 polls\nUser: Agent: Second answer.\nUser: Ending the conversation.\n"
    );
    assert_eq!(service.cancelled().len(), 1);
}

#[tokio::test]
async fn turn_errors_stop_chat_under_stop_policy() {
    let service = pending_service();
    let mut conversation = start_with(service.clone(), bounded_settings()).await;
    let config = ConversationConfig {
        on_failed_run: FailedRunPolicy::Stop,
        ..ConversationConfig::default()
    };

    let (end, output) = chat(&mut conversation, &config, "first\nsecond\n").await;

    assert_eq!(
        end,
        ChatEnd::TurnFailed("run run_3 still active after 2 polls".to_string())
    );
    assert_eq!(output, "User: Error: run run_3 still active after 2 polls\n");
    assert_eq!(service.messages().len(), 1);
}

#[test]
fn builtin_registry_is_empty_without_tool_blocks() {
    let registry = builtin_registry(&ToolsConfig::default()).expect("registry");
    assert!(registry.is_empty());
}
