//! Line-oriented chat loop over a [`Conversation`].

use anyhow::Context;
use log::{debug, info, warn};
use std::io::{BufRead, Write};
use toolrelay_config::{ConversationConfig, FailedRunPolicy};
use toolrelay_core::{Conversation, RunOutcome};
use toolrelay_protocol::TerminalState;

/// Why the chat loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEnd {
    /// The user typed an exit command.
    ExitCommand,
    /// Input was exhausted.
    EndOfInput,
    /// A run failed or was cancelled and the policy says stop.
    RunFailed(RunOutcome),
    /// A turn could not be carried out and the policy says stop.
    TurnFailed(String),
}

/// Read user lines, send them, and print replies until an exit condition.
///
/// Failed or cancelled runs and turns that error out are reported and then
/// handled by `on_failed_run`.
pub async fn run_chat<R, W>(
    conversation: &mut Conversation,
    config: &ConversationConfig,
    mut input: R,
    mut output: W,
) -> anyhow::Result<ChatEnd>
where
    R: BufRead,
    W: Write,
{
    loop {
        write!(output, "User: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).context("failed to read input")? == 0 {
            debug!("chat input closed");
            return Ok(ChatEnd::EndOfInput);
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if config.is_exit_command(text) {
            writeln!(output, "Ending the conversation.")?;
            return Ok(ChatEnd::ExitCommand);
        }

        let reply = match conversation.send(text).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("turn failed (error={err})");
                writeln!(output, "Error: {err}")?;
                if config.on_failed_run == FailedRunPolicy::Stop {
                    return Ok(ChatEnd::TurnFailed(err.to_string()));
                }
                continue;
            }
        };
        match reply.outcome.state {
            TerminalState::Completed => match reply.text() {
                Some(text) => writeln!(output, "Agent: {text}")?,
                None => writeln!(output, "Agent: No valid response received.")?,
            },
            state => {
                match &reply.outcome.last_error {
                    Some(error) => writeln!(output, "Run {state}: {error}")?,
                    None => writeln!(output, "Run {state}.")?,
                }
                if config.on_failed_run == FailedRunPolicy::Stop {
                    info!("stopping chat after unsuccessful run (state={state})");
                    return Ok(ChatEnd::RunFailed(reply.outcome));
                }
            }
        }
    }
}
