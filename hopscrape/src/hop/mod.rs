//! Multi-hop login negotiation over a raw interactive channel.
//!
//! A hop types an `ssh` command into the shell the channel is currently
//! sitting in, then watches the output for the events an interactive login
//! produces (host-key question, username and password prompts, a landing
//! prompt, a permission failure) and answers them until the new shell is
//! reached or the hop fails.
//!
//! # Example
//!
//! ```rust,no_run
//! use hopscrape::{CancelToken, HopTarget, Negotiator};
//! use hopscrape::channel::Channel;
//!
//! # async fn example(channel: &mut impl Channel) -> Result<(), hopscrape::Error> {
//! let target = HopTarget::new("10.1.1.1", "secret")?.with_username("admin");
//! let outcome = Negotiator::default()
//!     .negotiate(channel, &target, &CancelToken::new())
//!     .await?;
//! if let Some(miss) = &outcome.resync_miss {
//!     println!("landed without seeing the prompt: {miss}");
//! }
//! # Ok(())
//! # }
//! ```

mod recognizer;
mod target;

pub use recognizer::{RECOGNIZER_ORDER, Recognizer, Recognizers, SessionState};
pub use target::{HopCommand, HopTarget};

use std::time::Duration;

use log::{debug, info, trace, warn};
use regex::bytes::Regex;

use crate::cancel::CancelToken;
use crate::channel::{Channel, PatternBuffer};
use crate::error::HopError;
use crate::resync::{ResyncMiss, ResyncStage};

/// How the hop reached its end state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// The landing prompt appeared without a password being asked for.
    Prompt,
    /// A password was sent; success is declared from that point on.
    PasswordSent,
}

/// Successful hop negotiation.
#[derive(Debug, Clone)]
pub struct HopOutcome {
    pub host: String,
    pub landing: Landing,
    pub host_key_confirmed: bool,
    pub username_sent: bool,
    pub password_sent: bool,

    /// Set when the post-password prompt sync did not see the landing
    /// prompt. The hop still counts as successful.
    pub resync_miss: Option<ResyncMiss>,

    pub elapsed: Duration,
}

/// Timing knobs for the negotiator.
#[derive(Debug, Clone)]
pub struct NegotiatorConfig {
    /// Sleep between reads while waiting for a recognizer.
    pub poll_interval: Duration,

    /// Blank lines sent after the password to push past banners and MOTD
    /// paging.
    pub resync_blank_lines: usize,

    /// Pause before each blank line.
    pub resync_interval: Duration,

    /// Bounded wait for the landing prompt after the blank-line burst.
    pub resync_timeout: Duration,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(400),
            resync_blank_lines: 4,
            resync_interval: Duration::from_millis(600),
            resync_timeout: Duration::from_secs(12),
        }
    }
}

/// Drives one hop at a time over a shared channel.
#[derive(Debug, Clone, Default)]
pub struct Negotiator {
    command: HopCommand,
    recognizers: Recognizers,
    config: NegotiatorConfig,
}

impl Negotiator {
    pub fn new(command: HopCommand, recognizers: Recognizers, config: NegotiatorConfig) -> Self {
        Self {
            command,
            recognizers,
            config,
        }
    }

    pub fn with_command(mut self, command: HopCommand) -> Self {
        self.command = command;
        self
    }

    pub fn with_config(mut self, config: NegotiatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    /// Start a hop to `target` and drive it to an authenticated shell.
    ///
    /// Does not retry. On `AuthenticationFailed` nothing further is written
    /// to the channel.
    pub async fn negotiate<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        target: &HopTarget,
        cancel: &CancelToken,
    ) -> Result<HopOutcome, HopError> {
        let mut state = SessionState::new(target.timeout());
        let landing = target.prompt();

        let command = self.command.render(target);
        info!("Hopping to {}", target.host());
        debug!("hop command: {}", command);
        channel.write_line(&command).await?;

        loop {
            if cancel.is_cancelled() {
                return Err(HopError::Cancelled {
                    host: target.host().to_string(),
                });
            }
            if state.is_expired() {
                warn!("Hop to {} timed out after {:?}", target.host(), target.timeout());
                return Err(HopError::NegotiationTimeout {
                    host: target.host().to_string(),
                    timeout: target.timeout(),
                });
            }

            cancel.sleep(self.config.poll_interval).await;

            let chunk = channel.read().await?;
            if !chunk.is_empty() {
                trace!("hop {}: read {} bytes", target.host(), chunk.len());
                state.append(&chunk);
            }

            let Some(event) = state.classify(&self.recognizers, landing) else {
                continue;
            };
            debug!("hop {}: recognized {:?}", target.host(), event);

            match event {
                Recognizer::HostKeyConfirmation => {
                    channel.write_line("yes").await?;
                    state.mark_host_key_confirmed();
                    state.reset_buffer();
                }
                Recognizer::UsernamePrompt => {
                    channel.write_line(target.username()).await?;
                    state.mark_username_sent();
                    state.reset_buffer();
                }
                Recognizer::PasswordPrompt => {
                    debug!("hop {}: sending password <hidden>", target.host());
                    channel.write_line(target.password()).await?;
                    state.mark_password_sent();
                    let resync_miss = self.resync(channel, target, cancel).await?;
                    return Ok(outcome(target, &state, Landing::PasswordSent, resync_miss));
                }
                Recognizer::LandingPrompt => {
                    return Ok(outcome(target, &state, Landing::Prompt, None));
                }
                Recognizer::PermissionDenied => {
                    warn!("Permission denied on hop to {}", target.host());
                    return Err(HopError::AuthenticationFailed {
                        host: target.host().to_string(),
                    });
                }
            }
        }
    }

    /// Best-effort sync after the password: a burst of blank lines, then a
    /// bounded wait for the landing prompt.
    ///
    /// The output is checked before each blank line, so the burst stops as
    /// soon as the landing prompt shows up and a device that is already
    /// sitting at its prompt gets no blank lines at all.
    ///
    /// Missing the prompt is reported as a [`ResyncMiss`], not an error.
    /// An explicit permission failure seen here is still fatal, and stops
    /// the burst before anything else is written.
    async fn resync<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        target: &HopTarget,
        cancel: &CancelToken,
    ) -> Result<Option<ResyncMiss>, HopError> {
        let landing = target.prompt();
        let denied = self.recognizers.permission_denied();
        let mut buffer = PatternBuffer::new(2048);

        for _ in 0..self.config.resync_blank_lines {
            cancel.sleep(self.config.resync_interval).await;
            match self.scan(channel, &mut buffer, landing, denied).await {
                Ok(Scan::Landed) => return Ok(None),
                Ok(Scan::Denied) => {
                    return Err(HopError::AuthenticationFailed {
                        host: target.host().to_string(),
                    });
                }
                Ok(Scan::Pending) => {}
                Err(e) => return Ok(Some(ResyncMiss::channel_failed(ResyncStage::PostPassword, e))),
            }
            channel.write_line("").await?;
        }

        let deadline = tokio::time::Instant::now() + self.config.resync_timeout;
        loop {
            match self.scan(channel, &mut buffer, landing, denied).await {
                Ok(Scan::Landed) => return Ok(None),
                Ok(Scan::Denied) => {
                    return Err(HopError::AuthenticationFailed {
                        host: target.host().to_string(),
                    });
                }
                Ok(Scan::Pending) => {}
                Err(e) => return Ok(Some(ResyncMiss::channel_failed(ResyncStage::PostPassword, e))),
            }
            if cancel.is_cancelled() || tokio::time::Instant::now() >= deadline {
                let miss = ResyncMiss::not_seen(ResyncStage::PostPassword, self.config.resync_timeout);
                warn!("Hop to {}: {} (continuing)", target.host(), miss);
                return Ok(Some(miss));
            }
            cancel.sleep(self.config.poll_interval).await;
        }
    }

    async fn scan<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        buffer: &mut PatternBuffer,
        landing: &Regex,
        denied: &Regex,
    ) -> Result<Scan, crate::error::ChannelError> {
        let chunk = channel.read().await?;
        buffer.extend(&chunk);
        if buffer.tail_contains(landing) {
            Ok(Scan::Landed)
        } else if buffer.tail_contains(denied) {
            Ok(Scan::Denied)
        } else {
            Ok(Scan::Pending)
        }
    }
}

enum Scan {
    Landed,
    Denied,
    Pending,
}

fn outcome(
    target: &HopTarget,
    state: &SessionState,
    landing: Landing,
    resync_miss: Option<ResyncMiss>,
) -> HopOutcome {
    HopOutcome {
        host: target.host().to_string(),
        landing,
        host_key_confirmed: state.host_key_confirmed(),
        username_sent: state.username_sent(),
        password_sent: state.password_sent(),
        resync_miss,
        elapsed: state.elapsed(),
    }
}
