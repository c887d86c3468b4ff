//! Poll-resolve-submit loop for a single run.
//!
//! The resolver only reacts to one observed state. [`RunDriver`] owns the
//! cadence around it: it polls, hands the snapshot to the resolver, submits
//! outputs, and tells the caller how long to wait before the next tick.

use crate::error::CoreError;
use crate::service::{OutputSubmitter, RunPoller};
use log::{debug, info, warn};
use std::time::Duration;
use toolrelay_config::PollingConfig;
use toolrelay_protocol::{RunError, RunId, RunRef, RunSnapshot, TerminalState};
use toolrelay_tools::{Resolution, ToolCallResolver};

/// Wait and backoff settings for a run's poll loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Multiplier applied after each consecutive pending tick.
    pub backoff_factor: f64,
    pub max_interval: Duration,
    /// Upper bound on poll ticks; `None` is unbounded.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            backoff_factor: config.backoff_factor,
            max_interval: Duration::from_millis(config.max_interval_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy with no attempt bound.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff_factor: 1.0,
            max_interval: interval,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay after `idle_ticks` consecutive pending observations.
    pub fn delay_for(&self, idle_ticks: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(idle_ticks.min(64) as i32);
        let nanos = (self.interval.as_nanos() as f64 * factor).min(u64::MAX as f64) as u64;
        Duration::from_nanos(nanos).min(self.max_interval.max(self.interval))
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub state: TerminalState,
    /// Remote error attached to a failed run.
    pub last_error: Option<RunError>,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == TerminalState::Completed
    }
}

/// Result of one driver tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run still active; wait this long before the next step.
    Wait(Duration),
    Finished(RunOutcome),
}

/// Drives one run to a terminal state.
pub struct RunDriver<'a, S: ?Sized> {
    service: &'a S,
    resolver: &'a ToolCallResolver,
    policy: PollPolicy,
    run: RunRef,
    polls: u32,
    idle_ticks: u32,
}

impl<'a, S> RunDriver<'a, S>
where
    S: RunPoller + OutputSubmitter + ?Sized,
{
    pub fn new(
        service: &'a S,
        resolver: &'a ToolCallResolver,
        policy: PollPolicy,
        run: RunRef,
    ) -> Self {
        Self {
            service,
            resolver,
            policy,
            run,
            polls: 0,
            idle_ticks: 0,
        }
    }

    pub fn run(&self) -> &RunRef {
        &self.run
    }

    /// Number of poll ticks performed so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Poll once, resolve, and submit outputs when the run asks for them.
    pub async fn step(&mut self) -> Result<Step, CoreError> {
        if let Some(max_attempts) = self.policy.max_attempts
            && self.polls >= max_attempts
        {
            warn!(
                "run poll attempts exhausted (run_id={}, attempts={})",
                self.run.run_id, self.polls
            );
            return Err(CoreError::PollAttemptsExhausted {
                run_id: self.run.run_id.clone(),
                attempts: self.polls,
            });
        }
        let snapshot = self.service.poll(&self.run).await;
        self.polls += 1;
        self.advance(snapshot).await
    }

    async fn advance(&mut self, snapshot: RunSnapshot) -> Result<Step, CoreError> {
        match self.resolver.resolve_snapshot(&snapshot).await? {
            Resolution::Terminal(state) => {
                info!(
                    "run finished (run_id={}, state={}, polls={})",
                    self.run.run_id, state, self.polls
                );
                Ok(Step::Finished(RunOutcome {
                    run_id: self.run.run_id.clone(),
                    state,
                    last_error: snapshot.last_error,
                }))
            }
            Resolution::ContinuePolling => {
                let delay = self.policy.delay_for(self.idle_ticks);
                self.idle_ticks = self.idle_ticks.saturating_add(1);
                debug!(
                    "run pending (run_id={}, wait_ms={})",
                    self.run.run_id,
                    delay.as_millis()
                );
                Ok(Step::Wait(delay))
            }
            Resolution::SubmitOutputs(outputs) => {
                let after = self.service.submit(&self.run, &outputs).await?;
                info!(
                    "submitted tool outputs (run_id={}, count={}, state={})",
                    self.run.run_id,
                    outputs.len(),
                    after.state
                );
                self.idle_ticks = 0;
                Ok(Step::Wait(self.policy.interval))
            }
        }
    }

    /// Step until the run finishes, sleeping between ticks.
    pub async fn drive(mut self) -> Result<RunOutcome, CoreError> {
        loop {
            match self.step().await? {
                Step::Wait(delay) => tokio::time::sleep(delay).await,
                Step::Finished(outcome) => return Ok(outcome),
            }
        }
    }
}
