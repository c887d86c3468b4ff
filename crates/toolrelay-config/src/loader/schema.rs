//! Schema validation for toolrelay JSON5 configuration.
//!
//! Runs on every layer before merging so that a typo is reported against the
//! file that contains it rather than the merged result.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = [
        "$schema",
        "service",
        "polling",
        "conversation",
        "tools",
        "agents",
        "pipeline",
    ];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("service") {
        validate_service(value, layer, "service")?;
    }
    if let Some(value) = map.get("polling") {
        validate_polling(value, layer, "polling")?;
    }
    if let Some(value) = map.get("conversation") {
        validate_conversation(value, layer, "conversation")?;
    }
    if let Some(value) = map.get("tools") {
        validate_tools(value, layer, "tools")?;
    }
    if let Some(value) = map.get("agents") {
        let list = expect_array(value, layer, "agents")?;
        for (idx, entry) in list.iter().enumerate() {
            validate_agent(entry, layer, &format!("agents[{idx}]"))?;
        }
    }
    if let Some(value) = map.get("pipeline") {
        let map = expect_object(value, layer, "pipeline")?;
        ensure_allowed_keys(map, &["agents"], layer, "pipeline")?;
        if let Some(value) = map.get("agents") {
            validate_string_array(value, layer, "pipeline.agents")?;
        }
    }
    Ok(())
}

fn validate_service(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &[
            "endpoint",
            "endpoint_env",
            "api_key_env",
            "auth",
            "api_version",
            "request_timeout_secs",
        ],
        layer,
        path,
    )?;
    for key in ["endpoint", "endpoint_env", "api_key_env", "api_version"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("auth") {
        expect_one_of(value, &["api_key", "bearer"], layer, &join_path(path, "auth"))?;
    }
    if let Some(value) = map.get("request_timeout_secs") {
        expect_u64(value, layer, &join_path(path, "request_timeout_secs"))?;
    }
    Ok(())
}

fn validate_polling(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["interval_ms", "backoff_factor", "max_interval_ms", "max_attempts"],
        layer,
        path,
    )?;
    for key in ["interval_ms", "max_interval_ms"] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("backoff_factor") {
        expect_f64(value, layer, &join_path(path, "backoff_factor"))?;
    }
    if let Some(value) = map.get("max_attempts") {
        if !value.is_null() {
            expect_u64(value, layer, &join_path(path, "max_attempts"))?;
        }
    }
    Ok(())
}

fn validate_conversation(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["on_failed_run", "exit_commands", "concurrent_tools"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("on_failed_run") {
        expect_one_of(
            value,
            &["continue", "stop"],
            layer,
            &join_path(path, "on_failed_run"),
        )?;
    }
    if let Some(value) = map.get("exit_commands") {
        validate_string_array(value, layer, &join_path(path, "exit_commands"))?;
    }
    if let Some(value) = map.get("concurrent_tools") {
        expect_bool(value, layer, &join_path(path, "concurrent_tools"))?;
    }
    Ok(())
}

fn validate_tools(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["output_policy", "weather", "email", "freshdesk"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("output_policy") {
        let path = join_path(path, "output_policy");
        let map = expect_object(value, layer, &path)?;
        ensure_allowed_keys(
            map,
            &[
                "max_string_bytes",
                "max_array_len",
                "max_object_entries",
                "redact_keys",
                "replacement",
            ],
            layer,
            &path,
        )?;
        for key in ["max_string_bytes", "max_array_len", "max_object_entries"] {
            if let Some(value) = map.get(key) {
                expect_u64(value, layer, &join_path(&path, key))?;
            }
        }
        if let Some(value) = map.get("redact_keys") {
            validate_string_array(value, layer, &join_path(&path, "redact_keys"))?;
        }
        if let Some(value) = map.get("replacement") {
            expect_string(value, layer, &join_path(&path, "replacement"))?;
        }
    }
    if let Some(value) = map.get("weather") {
        validate_string_block(value, &["api_key_env", "base_url"], layer, &join_path(path, "weather"))?;
    }
    if let Some(value) = map.get("email") {
        let path = join_path(path, "email");
        let map = expect_object(value, layer, &path)?;
        ensure_allowed_keys(map, &["webhook_url_env", "timeout_secs"], layer, &path)?;
        if let Some(value) = map.get("webhook_url_env") {
            expect_string(value, layer, &join_path(&path, "webhook_url_env"))?;
        }
        if let Some(value) = map.get("timeout_secs") {
            expect_u64(value, layer, &join_path(&path, "timeout_secs"))?;
        }
    }
    if let Some(value) = map.get("freshdesk") {
        validate_string_block(
            value,
            &["domain_env", "api_key_env", "description"],
            layer,
            &join_path(path, "freshdesk"),
        )?;
    }
    Ok(())
}

fn validate_agent(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = [
        "id",
        "name",
        "model",
        "instructions",
        "temperature",
        "tools",
        "hosted_tools",
        "attachments",
        "files",
        "context_file",
    ];
    ensure_allowed_keys(map, &allowed, layer, path)?;

    let id_path = join_path(path, "id");
    let Some(id_value) = map.get("id") else {
        return Err(invalid_field(layer, &id_path, "missing required field"));
    };
    expect_string(id_value, layer, &id_path)?;

    for key in ["name", "model", "instructions", "context_file"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("temperature") {
        expect_f64(value, layer, &join_path(path, "temperature"))?;
    }
    if let Some(value) = map.get("tools") {
        let tools_path = join_path(path, "tools");
        let tools = expect_object(value, layer, &tools_path)?;
        ensure_allowed_keys(tools, &["allow", "deny"], layer, &tools_path)?;
        for key in ["allow", "deny"] {
            if let Some(value) = tools.get(key) {
                validate_string_array(value, layer, &join_path(&tools_path, key))?;
            }
        }
    }
    if let Some(value) = map.get("hosted_tools") {
        let list = expect_array(value, layer, &join_path(path, "hosted_tools"))?;
        for (idx, entry) in list.iter().enumerate() {
            validate_hosted_tool(entry, layer, &format!("{path}.hosted_tools[{idx}]"))?;
        }
    }
    for key in ["attachments", "files"] {
        if let Some(value) = map.get(key) {
            validate_string_array(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

fn validate_hosted_tool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let type_path = join_path(path, "type");
    let Some(kind) = map.get("type").and_then(Value::as_str) else {
        return Err(invalid_field(layer, &type_path, "missing required field"));
    };
    let (allowed, required): (&[&str], &[&str]) = match kind {
        "code_interpreter" => (&["type", "file_ids"], &[]),
        "file_search" => (&["type", "vector_store_ids"], &[]),
        "azure_ai_search" => (
            &["type", "connection_id", "index_name"],
            &["connection_id", "index_name"],
        ),
        "openapi" => (
            &["type", "name", "description", "spec_path", "connection_id"],
            &["name", "spec_path"],
        ),
        _ => {
            return Err(invalid_field(
                layer,
                &type_path,
                "expected one of code_interpreter, file_search, azure_ai_search, openapi",
            ));
        }
    };
    ensure_allowed_keys(map, allowed, layer, path)?;
    for key in required {
        if !map.contains_key(*key) {
            return Err(invalid_field(
                layer,
                &join_path(path, key),
                "missing required field",
            ));
        }
    }
    for (key, value) in map {
        match key.as_str() {
            "file_ids" | "vector_store_ids" => {
                validate_string_array(value, layer, &join_path(path, key))?
            }
            _ => expect_string(value, layer, &join_path(path, key))?,
        }
    }
    Ok(())
}

/// Validate an object whose allowed keys all hold strings.
fn validate_string_block(
    value: &Value,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, allowed, layer, path)?;
    for (key, value) in map {
        expect_string(value, layer, &join_path(path, key))?;
    }
    Ok(())
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

fn expect_array<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Vec<Value>, ConfigError> {
    match value {
        Value::Array(arr) => Ok(arr),
        _ => Err(invalid_field(layer, path, "expected array")),
    }
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::String(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected string")),
    }
}

fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::Bool(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected bool")),
    }
}

fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

fn expect_one_of(
    value: &Value,
    options: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match value.as_str() {
        Some(text) if options.contains(&text) => Ok(()),
        _ => Err(invalid_field(
            layer,
            path,
            &format!("expected one of {}", options.join(", ")),
        )),
    }
}

fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let arr = expect_array(value, layer, path)?;
    for (idx, entry) in arr.iter().enumerate() {
        if entry.as_str().is_none() {
            return Err(invalid_field(
                layer,
                &format!("{path}[{idx}]"),
                "expected string",
            ));
        }
    }
    Ok(())
}

fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(invalid_field(layer, &join_path(path, key), "unknown key")),
        None => Ok(()),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
