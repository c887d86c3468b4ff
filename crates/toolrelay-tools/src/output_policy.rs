//! Redaction and size limits applied to tool values before submission.

use serde_json::{Map, Value};
use toolrelay_config::ToolOutputPolicyConfig;

/// Caps the size of tool values and masks fields by key name.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutputPolicy {
    /// Maximum size of string fields in bytes.
    pub max_string_bytes: usize,
    pub max_array_len: usize,
    pub max_object_entries: usize,
    /// Keys (case-insensitive) whose values are replaced.
    pub redact_keys: Vec<String>,
    pub replacement: String,
}

impl Default for ToolOutputPolicy {
    fn default() -> Self {
        Self::from(&ToolOutputPolicyConfig::default())
    }
}

impl From<&ToolOutputPolicyConfig> for ToolOutputPolicy {
    fn from(config: &ToolOutputPolicyConfig) -> Self {
        Self {
            max_string_bytes: config.max_string_bytes,
            max_array_len: config.max_array_len,
            max_object_entries: config.max_object_entries,
            redact_keys: config.redact_keys.clone(),
            replacement: config.replacement.clone(),
        }
    }
}

impl ToolOutputPolicy {
    /// Apply the policy to a JSON value.
    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.truncate(text)),
            Value::Array(values) => Value::Array(
                values
                    .into_iter()
                    .take(self.max_array_len)
                    .map(|value| self.apply(value))
                    .collect(),
            ),
            Value::Object(entries) => {
                let mut limited = Map::with_capacity(entries.len().min(self.max_object_entries));
                for (key, value) in entries.into_iter().take(self.max_object_entries) {
                    let value = if self.is_redacted(&key) {
                        Value::String(self.replacement.clone())
                    } else {
                        self.apply(value)
                    };
                    limited.insert(key, value);
                }
                Value::Object(limited)
            }
            other => other,
        }
    }

    fn is_redacted(&self, key: &str) -> bool {
        self.redact_keys
            .iter()
            .any(|entry| entry.eq_ignore_ascii_case(key))
    }

    /// Cut a string at the last char boundary within the byte limit.
    fn truncate(&self, mut text: String) -> String {
        if text.len() <= self.max_string_bytes {
            return text;
        }
        let mut end = self.max_string_bytes;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::ToolOutputPolicy;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn policy() -> ToolOutputPolicy {
        ToolOutputPolicy {
            max_string_bytes: 4,
            max_array_len: 2,
            max_object_entries: 8,
            redact_keys: vec!["api_key".to_string()],
            replacement: "[X]".to_string(),
        }
    }

    #[test]
    fn redacts_keys_and_truncates_strings() {
        let output = policy().apply(json!({
            "API_KEY": "secret-value",
            "city": "London",
        }));
        assert_eq!(output, json!({ "API_KEY": "[X]", "city": "Lond" }));
    }

    #[test]
    fn truncates_arrays_and_respects_char_boundaries() {
        let output = policy().apply(json!({ "list": ["aéé", "b", "c"] }));
        assert_eq!(output, json!({ "list": ["aé", "b"] }));
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(policy().apply(json!(20.5)), json!(20.5));
        assert_eq!(policy().apply(json!(null)), json!(null));
    }
}
