//! Email delivery through a workflow webhook.

use crate::Tool;
use crate::builtins::utils::{parse_args, request_failed, require_non_empty, response_body};
use async_trait::async_trait;
use log::info;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use toolrelay_config::{ConfigError, EmailToolConfig};
use toolrelay_protocol::ToolError;

/// Resolved settings for [`EmailTool`].
#[derive(Debug, Clone)]
pub struct EmailSettings {
    /// Full webhook URL. Any query string (e.g. a signature) is sent unchanged.
    pub webhook_url: String,
    pub timeout: Duration,
}

impl EmailSettings {
    pub fn from_config(config: &EmailToolConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            webhook_url: config.resolve_webhook_url()?,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

/// `send_email`: hand a message to the webhook for delivery.
#[derive(Debug, Clone)]
pub struct EmailTool {
    client: Client,
    settings: EmailSettings,
}

impl EmailTool {
    pub fn new(client: Client, settings: EmailSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl Tool for EmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send an email to a recipient with a subject and body"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "email_to": { "type": "string", "description": "Recipient address." },
                "email_subject": { "type": "string", "description": "Subject line." },
                "email_body": { "type": "string", "description": "Message body." },
            },
            "required": ["email_to", "email_subject", "email_body"],
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let input: EmailArgs = parse_args(args)?;
        require_non_empty("email_to", &input.email_to)?;
        info!(
            "sending email (subject_len={}, body_len={})",
            input.email_subject.len(),
            input.email_body.len()
        );
        let response = self
            .client
            .post(&self.settings.webhook_url)
            .timeout(self.settings.timeout)
            .json(&input)
            .send()
            .await
            .map_err(|err| request_failed("email webhook", err))?;

        let status = response.status();
        if matches!(status, StatusCode::OK | StatusCode::ACCEPTED) {
            return Ok(json!({ "status": "sent" }));
        }
        let body = response_body(response).await;
        Err(ToolError::ExecutionFailed(format!(
            "email webhook returned {status}: {body}"
        )))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EmailArgs {
    email_to: String,
    email_subject: String,
    email_body: String,
}
