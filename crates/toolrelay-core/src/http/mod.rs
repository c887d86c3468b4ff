//! reqwest implementation of the agent service seams.

mod wire;

use crate::error::{CoreError, ServiceError};
use crate::service::{AgentDefinition, AgentService, OutputSubmitter, RunPoller};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::Path;
use toolrelay_config::{AuthScheme, ServiceConfig};
use toolrelay_protocol::{
    AgentId, FileId, RunRef, RunSnapshot, ThreadId, ThreadMessage, ToolOutput,
};
use wire::{IdResponse, MessageList, SubmitToolOutputsBody, WireRun};

/// Number of recent messages scanned for the latest assistant reply.
const MESSAGE_SCAN_LIMIT: u32 = 20;

/// Client for an assistants-style REST service.
#[derive(Debug, Clone)]
pub struct HttpAgentService {
    client: Client,
    endpoint: String,
    api_key: String,
    auth: AuthScheme,
    api_version: Option<String>,
}

impl HttpAgentService {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            auth: AuthScheme::default(),
            api_version: None,
        }
    }

    /// Build a client from config, resolving the endpoint and key from the environment.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, CoreError> {
        let endpoint = config.resolve_endpoint()?;
        let api_key = config.resolve_api_key()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| {
                ServiceError::Request(format!("failed to create HTTP client: {err}"))
            })?;
        info!(
            "agent service configured (endpoint={}, auth={:?})",
            endpoint, config.auth
        );
        Ok(Self::new(client, endpoint, api_key)
            .with_auth(config.auth)
            .with_api_version(config.api_version.clone()))
    }

    pub fn with_auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_api_version(mut self, api_version: Option<String>) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut builder = self.client.request(method, url);
        if let Some(version) = &self.api_version {
            builder = builder.query(&[("api-version", version)]);
        }
        match self.auth {
            AuthScheme::ApiKey => builder.header("api-key", &self.api_key),
            AuthScheme::Bearer => builder.bearer_auth(&self.api_key),
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ServiceError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ServiceError> {
        let response = Self::send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| ServiceError::Decode(err.to_string()))
    }

    async fn fetch_run(&self, run: &RunRef) -> Result<RunSnapshot, ServiceError> {
        let path = format!("threads/{}/runs/{}", run.thread_id, run.run_id);
        let wire: WireRun = Self::send_json(self.request(Method::GET, &path)).await?;
        wire.into_snapshot()
            .map_err(|err| ServiceError::Decode(err.to_string()))
    }
}

#[async_trait]
impl RunPoller for HttpAgentService {
    async fn poll(&self, run: &RunRef) -> RunSnapshot {
        match self.fetch_run(run).await {
            Ok(snapshot) => {
                debug!(
                    "polled run (run_id={}, state={}, pending_calls={})",
                    snapshot.run_id,
                    snapshot.state,
                    snapshot.pending_calls.len()
                );
                snapshot
            }
            Err(err) => {
                warn!("run poll failed (run_id={}, error={})", run.run_id, err);
                RunSnapshot::failed(run.run_id.clone(), "poll_failed", err.to_string())
            }
        }
    }
}

#[async_trait]
impl OutputSubmitter for HttpAgentService {
    async fn submit(
        &self,
        run: &RunRef,
        outputs: &[ToolOutput],
    ) -> Result<RunSnapshot, ServiceError> {
        let path = format!(
            "threads/{}/runs/{}/submit_tool_outputs",
            run.thread_id, run.run_id
        );
        debug!(
            "submitting tool outputs (run_id={}, count={})",
            run.run_id,
            outputs.len()
        );
        let body = SubmitToolOutputsBody {
            tool_outputs: outputs,
        };
        let wire: WireRun = Self::send_json(self.request(Method::POST, &path).json(&body)).await?;
        wire.into_snapshot()
            .map_err(|err| ServiceError::Decode(err.to_string()))
    }
}

#[async_trait]
impl AgentService for HttpAgentService {
    async fn create_agent(&self, definition: &AgentDefinition) -> Result<AgentId, ServiceError> {
        let body = wire::agent_body(definition)?;
        let created: IdResponse =
            Self::send_json(self.request(Method::POST, "assistants").json(&body)).await?;
        info!(
            "created agent (agent_id={}, name={}, tools={}, hosted_tools={})",
            created.id,
            definition.name,
            definition.tools.len(),
            definition.hosted_tools.len()
        );
        Ok(created.id)
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<(), ServiceError> {
        Self::send(self.request(Method::DELETE, &format!("assistants/{agent_id}"))).await?;
        info!("deleted agent (agent_id={agent_id})");
        Ok(())
    }

    async fn create_thread(&self) -> Result<ThreadId, ServiceError> {
        let created: IdResponse =
            Self::send_json(self.request(Method::POST, "threads").json(&json!({}))).await?;
        info!("created thread (thread_id={})", created.id);
        Ok(created.id)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), ServiceError> {
        Self::send(self.request(Method::DELETE, &format!("threads/{thread_id}"))).await?;
        info!("deleted thread (thread_id={thread_id})");
        Ok(())
    }

    async fn upload_file(&self, path: &Path) -> Result<FileId, ServiceError> {
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            ServiceError::InvalidRequest(format!("failed to read {}: {err}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let size = bytes.len();
        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", Part::bytes(bytes).file_name(file_name.clone()));
        let created: IdResponse =
            Self::send_json(self.request(Method::POST, "files").multipart(form)).await?;
        info!(
            "uploaded file (file_id={}, name={}, bytes={})",
            created.id, file_name, size
        );
        Ok(created.id)
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError> {
        Self::send(self.request(Method::DELETE, &format!("files/{file_id}"))).await?;
        info!("deleted file (file_id={file_id})");
        Ok(())
    }

    async fn add_message(
        &self,
        thread_id: &str,
        content: &str,
        attachments: &[String],
    ) -> Result<(), ServiceError> {
        let body = wire::message_body(content, attachments);
        let path = format!("threads/{thread_id}/messages");
        Self::send(self.request(Method::POST, &path).json(&body)).await?;
        debug!(
            "added message (thread_id={}, len={}, attachments={})",
            thread_id,
            content.len(),
            attachments.len()
        );
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<RunRef, ServiceError> {
        let path = format!("threads/{thread_id}/runs");
        let body = json!({ "assistant_id": agent_id });
        let created: IdResponse =
            Self::send_json(self.request(Method::POST, &path).json(&body)).await?;
        info!("created run (thread_id={}, run_id={})", thread_id, created.id);
        Ok(RunRef::new(thread_id, created.id))
    }

    async fn cancel_run(&self, run: &RunRef) -> Result<(), ServiceError> {
        let path = format!("threads/{}/runs/{}/cancel", run.thread_id, run.run_id);
        Self::send(self.request(Method::POST, &path)).await?;
        info!("cancelled run (run_id={})", run.run_id);
        Ok(())
    }

    async fn latest_assistant_message(
        &self,
        run: &RunRef,
    ) -> Result<Option<ThreadMessage>, ServiceError> {
        let path = format!("threads/{}/messages", run.thread_id);
        let limit = MESSAGE_SCAN_LIMIT.to_string();
        let list: MessageList = Self::send_json(
            self.request(Method::GET, &path)
                .query(&[("order", "desc"), ("limit", limit.as_str())]),
        )
        .await?;
        Ok(list.latest_assistant(&run.run_id))
    }
}
