//! Helpdesk ticket creation through the Freshdesk REST API.

use crate::Tool;
use crate::builtins::utils::{parse_args, request_failed, require_non_empty, response_body};
use async_trait::async_trait;
use log::info;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use toolrelay_config::{ConfigError, FreshdeskToolConfig};
use toolrelay_protocol::ToolError;

const TICKET_PRIORITY: u8 = 2;
const TICKET_STATUS: u8 = 2;
const TICKET_TAGS: [&str; 2] = ["AI-Agent", "Automation"];

/// Resolved settings for [`FreshdeskTool`].
#[derive(Debug, Clone)]
pub struct FreshdeskSettings {
    /// Scheme and host, e.g. `https://acme.freshdesk.com`.
    pub base_url: String,
    pub api_key: String,
    /// Description attached to every ticket.
    pub description: String,
}

impl FreshdeskSettings {
    pub fn from_config(config: &FreshdeskToolConfig) -> Result<Self, ConfigError> {
        let domain = config.resolve_domain()?;
        Ok(Self {
            base_url: format!("https://{}", domain.trim_end_matches('/')),
            api_key: config.resolve_api_key()?,
            description: config.description.clone(),
        })
    }

    fn tickets_url(&self) -> String {
        format!("{}/api/v2/tickets", self.base_url.trim_end_matches('/'))
    }
}

/// `create_freshdesk_ticket`: open a support ticket for a requester.
#[derive(Debug, Clone)]
pub struct FreshdeskTool {
    client: Client,
    settings: FreshdeskSettings,
}

impl FreshdeskTool {
    pub fn new(client: Client, settings: FreshdeskSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl Tool for FreshdeskTool {
    fn name(&self) -> &str {
        "create_freshdesk_ticket"
    }

    fn description(&self) -> &str {
        "Create a support ticket for a requester email with the given subject"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "Email": { "type": "string", "description": "Requester email address." },
                "Subject": { "type": "string", "description": "Ticket subject." },
            },
            "required": ["Email", "Subject"],
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let input: TicketArgs = parse_args(args)?;
        require_non_empty("Email", &input.email)?;
        require_non_empty("Subject", &input.subject)?;
        info!("creating ticket (subject_len={})", input.subject.len());

        let payload = json!({
            "description": self.settings.description,
            "subject": input.subject,
            "email": input.email,
            "priority": TICKET_PRIORITY,
            "status": TICKET_STATUS,
            "tags": TICKET_TAGS,
        });
        let response = self
            .client
            .post(self.settings.tickets_url())
            .basic_auth(&self.settings.api_key, Some("X"))
            .json(&payload)
            .send()
            .await
            .map_err(|err| request_failed("helpdesk", err))?;

        let status = response.status();
        let body = response_body(response).await;
        if status == StatusCode::CREATED {
            return Ok(body);
        }
        Err(ToolError::ExecutionFailed(
            json!({ "status_code": status.as_u16(), "error": body }).to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct TicketArgs {
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Subject")]
    subject: String,
}
