//! Sequential command collection on a landed device session.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use memchr::memmem;
use regex::bytes::Regex;

use super::plan::CommandSpec;
use super::response::CommandOutput;
use crate::cancel::CancelToken;
use crate::channel::{Channel, PatternBuffer};
use crate::extract::{CaptureStatus, RawOutputBundle};
use crate::platform::PlatformDefinition;

/// How far back from the end of the output the prompt is looked for.
const SEARCH_DEPTH: usize = 1000;

/// Timing knobs for the command driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Sleep between empty reads.
    pub poll_interval: Duration,

    /// Bound on prompt syncs and terminal preparation commands.
    pub sync_timeout: Duration,

    /// Pause after `exit` so the previous shell can print its prompt.
    pub exit_pause: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            sync_timeout: Duration::from_secs(10),
            exit_pause: Duration::from_millis(600),
        }
    }
}

/// Sends commands over a shared channel and captures their responses.
///
/// Holds no session state: the channel, the platform and the cancellation
/// token are passed into every call.
#[derive(Debug, Clone, Default)]
pub struct CommandDriver {
    config: DriverConfig,
}

impl CommandDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Send one command and wait for the platform prompt to come back.
    ///
    /// Never fails: a timeout yields [`CaptureStatus::TimedOut`] with the
    /// partial output, and a channel error yields [`CaptureStatus::Failed`]
    /// with whatever arrived before it.
    pub async fn send_command<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        platform: &PlatformDefinition,
        spec: &CommandSpec,
        cancel: &CancelToken,
    ) -> CommandOutput {
        let start = Instant::now();

        // Output left over from the previous command would end in a prompt.
        if let Err(e) = channel.read().await {
            return CommandOutput::failed(&spec.name, &spec.command, e.to_string(), start.elapsed());
        }

        debug!("Sending command: {}", spec.command);
        if let Err(e) = channel.write_line(&spec.command).await {
            warn!("Failed to send '{}': {}", spec.command, e);
            return CommandOutput::failed(&spec.name, &spec.command, e.to_string(), start.elapsed());
        }

        let deadline = tokio::time::Instant::now() + spec.timeout;
        let mut buffer = PatternBuffer::new(SEARCH_DEPTH);

        let status = loop {
            let chunk = match channel.read().await {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Channel failed during '{}': {}", spec.command, e);
                    break CaptureStatus::Failed {
                        reason: e.to_string(),
                    };
                }
            };

            if !chunk.is_empty() {
                buffer.extend(&chunk);
                if prompt_after_echo(buffer.as_slice(), &spec.command, &platform.prompt_pattern) {
                    break CaptureStatus::Complete;
                }
            }

            if cancel.is_cancelled() {
                break CaptureStatus::Failed {
                    reason: "cancelled".to_string(),
                };
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("'{}' timed out after {:?}", spec.command, spec.timeout);
                break CaptureStatus::TimedOut;
            }

            if chunk.is_empty() {
                cancel.sleep(self.config.poll_interval).await;
            }
        };

        let raw = buffer.as_str_lossy().into_owned();
        let behavior = platform.behavior();
        let prompt_seen = status == CaptureStatus::Complete;
        let text = behavior.post_process_output(&behavior.normalize_output(
            &raw,
            &spec.command,
            prompt_seen,
        ));

        let status = match (status, platform.failure_in(&text)) {
            (CaptureStatus::Complete, Some(pattern)) => {
                warn!("'{}' reported failure: {}", spec.command, pattern);
                CaptureStatus::Failed {
                    reason: format!("output contains '{}'", pattern),
                }
            }
            (status, _) => status,
        };

        CommandOutput {
            name: spec.name.clone(),
            command: spec.command.clone(),
            text,
            raw,
            status,
            elapsed: start.elapsed(),
        }
    }

    /// Send every command in order and collect the raw responses.
    ///
    /// A failed or timed-out command does not stop the ones after it; its
    /// block is stored with whatever text was captured. Nothing more is
    /// sent once `cancel` fires.
    pub async fn run_commands<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        platform: &PlatformDefinition,
        commands: &[CommandSpec],
        cancel: &CancelToken,
    ) -> RawOutputBundle {
        let mut bundle = RawOutputBundle::new();
        for spec in commands {
            if cancel.is_cancelled() {
                info!("Cancelled, skipping '{}'", spec.command);
                break;
            }
            let output = self.send_command(channel, platform, spec, cancel).await;
            match &output.status {
                CaptureStatus::Complete => {
                    debug!("'{}' complete in {:?}", output.command, output.elapsed)
                }
                CaptureStatus::TimedOut => {
                    info!("'{}' timed out, keeping {} bytes", output.command, output.raw.len())
                }
                CaptureStatus::Failed { reason } => {
                    info!("'{}' failed: {}", output.command, reason)
                }
            }
            bundle.push(output.into_block());
        }
        bundle
    }

    /// Leave the device shell and return to the previous hop.
    ///
    /// Best effort: a failed write is logged and otherwise ignored.
    pub async fn exit_device<C: Channel + ?Sized>(&self, channel: &mut C, cancel: &CancelToken) {
        if let Err(e) = channel.write_line("exit").await {
            debug!("exit not sent: {}", e);
            return;
        }
        cancel.sleep(self.config.exit_pause).await;
        if let Err(e) = channel.read().await {
            debug!("read after exit failed: {}", e);
        }
    }
}

/// True when `prompt` matches the end of the output that follows the
/// command echo. Without an echo the whole output is searched.
fn prompt_after_echo(data: &[u8], command: &str, prompt: &Regex) -> bool {
    let start = if command.is_empty() {
        0
    } else {
        memmem::find(data, command.as_bytes())
            .map(|pos| pos + command.len())
            .unwrap_or(0)
    };
    let tail_start = start.max(data.len().saturating_sub(SEARCH_DEPTH));
    prompt.is_match(&data[tail_start..])
}
