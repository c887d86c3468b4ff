//! Error types for the core crate.

use thiserror::Error;
use toolrelay_config::ConfigError;
use toolrelay_protocol::RunId;
use toolrelay_tools::ResolveError;

/// Errors returned by the remote agent service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),
    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
    /// The request could not be built locally.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Request(err.to_string())
        }
    }
}

/// Errors returned by run, conversation, and pipeline operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// The service surfaced tool calls the resolver cannot answer.
    #[error("invalid tool calls: {0}")]
    Resolve(#[from] ResolveError),
    /// The run was still active after the configured number of polls.
    #[error("run {run_id} still active after {attempts} polls")]
    PollAttemptsExhausted { run_id: RunId, attempts: u32 },
    /// A pipeline was started without agents.
    #[error("pipeline has no agents")]
    EmptyPipeline,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
