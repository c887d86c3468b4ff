//! Tests for layered configuration loading.

use super::*;
use crate::{FailedRunPolicy, HostedToolConfig};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

#[test]
fn parse_minimal_config() {
    let config = ToolrelayConfig::load_from_str("{}").expect("config");
    assert_eq!(config.polling.interval_ms, 1_000);
    assert_eq!(config.conversation.on_failed_run, FailedRunPolicy::Continue);
    assert_eq!(config.tools.output_policy.replacement, "[REDACTED]");
    assert!(config.tools.weather.is_none());
}

#[test]
fn parses_agents_with_hosted_tools() {
    let json5 = r#"{
        // comments are allowed
        agents: [
            {
                id: "search",
                model: "gpt-4o-mini",
                instructions: "Use the index.",
                tools: { deny: ["*"] },
                hosted_tools: [
                    { type: "azure_ai_search", connection_id: "conn-1", index_name: "docs" },
                    { type: "code_interpreter" },
                ],
            },
        ],
        conversation: { on_failed_run: "stop" },
    }"#;
    let config = ToolrelayConfig::load_from_str(json5).expect("config");
    let agent = config.agent("search").expect("agent");
    assert_eq!(agent.model, "gpt-4o-mini");
    assert_eq!(
        agent.hosted_tools,
        vec![
            HostedToolConfig::AzureAiSearch {
                connection_id: "conn-1".to_string(),
                index_name: "docs".to_string(),
            },
            HostedToolConfig::CodeInterpreter {
                file_ids: Vec::new()
            },
        ]
    );
    assert!(!agent.tools.permits("get_weather"));
    assert_eq!(config.conversation.on_failed_run, FailedRunPolicy::Stop);
}

#[test]
fn parses_agent_files_and_rejects_non_string_entries() {
    let json5 = r#"{ agents: [{ id: "docs", files: ["data/product_info.md"], attachments: ["file-9"] }] }"#;
    let config = ToolrelayConfig::load_from_str(json5).expect("config");
    let agent = config.agent("docs").expect("agent");
    assert_eq!(agent.files, vec![std::path::PathBuf::from("data/product_info.md")]);
    assert_eq!(agent.attachments, vec!["file-9".to_string()]);

    let err = ToolrelayConfig::load_from_str(r#"{ agents: [{ id: "docs", files: [1] }] }"#)
        .unwrap_err();
    assert!(format!("{err}").contains("agents[0].files"));
}

#[test]
fn rejects_unknown_top_level_key() {
    let err = ToolrelayConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

#[test]
fn rejects_invalid_failed_run_policy() {
    let json5 = r#"{ conversation: { on_failed_run: "retry" } }"#;
    let err = ToolrelayConfig::load_from_str(json5).unwrap_err();
    assert!(format!("{err}").contains("conversation.on_failed_run"));
}

#[test]
fn rejects_hosted_tool_without_required_fields() {
    let json5 = r#"{ agents: [{ id: "a", hosted_tools: [{ type: "azure_ai_search", index_name: "x" }] }] }"#;
    let err = ToolrelayConfig::load_from_str(json5).unwrap_err();
    assert!(format!("{err}").contains("agents[0].hosted_tools[0].connection_id"));
}

#[test]
fn rejects_pipeline_referencing_unknown_agent() {
    let json5 = r#"{ agents: [{ id: "analyzer" }], pipeline: { agents: ["analyzer", "reviewer"] } }"#;
    let err = ToolrelayConfig::load_from_str(json5).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownAgent(id) if id == "reviewer"));
}

#[test]
fn rejects_shrinking_backoff() {
    let json5 = r#"{ polling: { backoff_factor: 0.5 } }"#;
    let err = ToolrelayConfig::load_from_str(json5).unwrap_err();
    assert!(format!("{err}").contains("backoff_factor"));
}

#[test]
fn layered_config_applies_precedence() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("user.json5");
    write_json5(
        &user_config,
        r#"{ polling: { interval_ms: 100, max_interval_ms: 400 }, service: { api_version: "v1" } }"#,
    );
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        r#"{ polling: { interval_ms: 200 }, agents: [{ id: "weather", model: "gpt-4o" }] }"#,
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        r#"{ polling: { interval_ms: 300 } }"#,
    );
    let runtime_config = root.join("runtime.json5");
    write_json5(
        &runtime_config,
        r#"{ agents: [{ id: "weather", model: "gpt-4o-mini" }] }"#,
    );

    let mut options = LayeredConfigOptions::new(&cwd).with_runtime_path(&runtime_config);
    options.user_config_path = Some(user_config);

    let layered = ToolrelayConfig::load_layered_with_options(options).expect("layered");
    let sources = layered
        .layers
        .iter()
        .map(|layer| layer.source)
        .collect::<Vec<_>>();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Runtime,
        ]
    );
    assert_eq!(layered.config.polling.interval_ms, 300);
    assert_eq!(layered.config.polling.max_interval_ms, 400);
    assert_eq!(layered.config.service.api_version.as_deref(), Some("v1"));
    assert_eq!(
        layered.config.agent("weather").expect("agent").model,
        "gpt-4o-mini"
    );
}

#[test]
fn layered_config_skips_missing_layers_and_reports_bad_ones() {
    let temp = TempDir::new().expect("tmp");
    let cwd = temp.path().join("work");
    fs::create_dir_all(&cwd).expect("cwd");

    let mut options = LayeredConfigOptions::new(&cwd);
    options.user_config_path = Some(temp.path().join("missing.json5"));
    let layered = ToolrelayConfig::load_layered_with_options(options.clone()).expect("layered");
    assert!(layered.layers.is_empty());

    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), r#"{ polling: { interval_ms: "fast" } }"#);
    let err = ToolrelayConfig::load_layered_with_options(options).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("cwd("));
    assert!(msg.contains("polling.interval_ms"));
}

#[test]
fn runtime_layer_must_exist() {
    let temp = TempDir::new().expect("tmp");
    let mut options =
        LayeredConfigOptions::new(temp.path()).with_runtime_path(temp.path().join("nope.json5"));
    options.user_config_path = None;
    let err = ToolrelayConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}
