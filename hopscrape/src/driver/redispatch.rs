//! Switching a freshly landed session to its device platform.

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

use super::command::CommandDriver;
use super::plan::CommandSpec;
use crate::cancel::CancelToken;
use crate::channel::{Channel, DEFAULT_LANDING_PROMPT, SHELL_PROMPT, read_until_pattern};
use crate::error::ConfigError;
use crate::extract::CaptureStatus;
use crate::platform::{PlatformDefinition, PlatformRegistry};
use crate::resync::{ResyncMiss, ResyncStage};

static LANDING_PROMPT: Lazy<Regex> = Lazy::new(|| Regex::new(DEFAULT_LANDING_PROMPT).unwrap());
static JUMP_SHELL_PROMPT: Lazy<Regex> = Lazy::new(|| Regex::new(SHELL_PROMPT).unwrap());

/// A session after redispatch.
#[derive(Debug)]
pub struct Redispatch<'r> {
    /// Platform the session now runs as.
    pub platform: &'r PlatformDefinition,

    /// Last prompt line seen, empty if none was.
    pub prompt: String,

    /// Steps that did not go as expected. None of them stop collection.
    pub misses: Vec<ResyncMiss>,
}

impl CommandDriver {
    /// Sync on the device prompt, pick the platform and prepare the
    /// terminal.
    ///
    /// `device_type` is the roster's hint; an XR prompt overrides it. Only
    /// a registry with no usable platform is an error.
    pub async fn redispatch<'r, C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        registry: &'r PlatformRegistry,
        device_type: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Redispatch<'r>, ConfigError> {
        let mut misses = Vec::new();
        let prompt = match self
            .wait_for_prompt(channel, &LANDING_PROMPT, ResyncStage::Redispatch, cancel)
            .await
        {
            Ok(prompt) => prompt,
            Err(miss) => {
                warn!("{}", miss);
                misses.push(miss);
                String::new()
            }
        };

        let platform = registry.detect(&prompt, device_type).ok_or_else(|| ConfigError::Invalid {
            message: format!(
                "no platform available for device type {:?}",
                device_type.unwrap_or("<none>")
            ),
        })?;
        info!("Redispatching session to {} (prompt {:?})", platform.name, prompt);

        for command in &platform.session_commands {
            let spec = CommandSpec::new(command.as_str(), command.as_str(), self.config().sync_timeout);
            let output = self.send_command(channel, platform, &spec, cancel).await;
            let miss = match output.status {
                CaptureStatus::Complete => continue,
                CaptureStatus::TimedOut => {
                    ResyncMiss::not_seen(ResyncStage::Redispatch, self.config().sync_timeout)
                }
                CaptureStatus::Failed { reason } => {
                    ResyncMiss::channel_failed(ResyncStage::Redispatch, format!("{command}: {reason}"))
                }
            };
            warn!("{}", miss);
            misses.push(miss);
        }

        Ok(Redispatch {
            platform,
            prompt,
            misses,
        })
    }

    /// Best-effort resync after the SSH transport lands on the jump host.
    ///
    /// Waits for the optional welcome banner, then nudges the shell with a
    /// newline and waits for a generic shell prompt. Each wait that does not
    /// succeed is returned as a [`ResyncMiss`].
    pub async fn sync_jump_login<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        welcome: Option<&Regex>,
        cancel: &CancelToken,
    ) -> Vec<ResyncMiss> {
        let mut misses = Vec::new();

        if let Some(welcome) = welcome {
            match read_until_pattern(
                channel,
                welcome,
                self.config().sync_timeout,
                self.config().poll_interval,
                cancel,
            )
            .await
            {
                Ok(result) if result.pattern_matched => debug!("Welcome banner seen"),
                Ok(_) => misses.push(ResyncMiss::not_seen(
                    ResyncStage::JumpWelcome,
                    self.config().sync_timeout,
                )),
                Err(e) => misses.push(ResyncMiss::channel_failed(ResyncStage::JumpWelcome, e)),
            }
        }

        if let Err(miss) = self
            .wait_for_prompt(channel, &JUMP_SHELL_PROMPT, ResyncStage::JumpPrompt, cancel)
            .await
        {
            misses.push(miss);
        }

        for miss in &misses {
            warn!("{}", miss);
        }
        misses
    }

    /// Send a newline and wait for `prompt`. Returns the last line seen.
    async fn wait_for_prompt<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        prompt: &Regex,
        stage: ResyncStage,
        cancel: &CancelToken,
    ) -> Result<String, ResyncMiss> {
        channel
            .write_line("")
            .await
            .map_err(|e| ResyncMiss::channel_failed(stage, e))?;

        let result = read_until_pattern(
            channel,
            prompt,
            self.config().sync_timeout,
            self.config().poll_interval,
            cancel,
        )
        .await
        .map_err(|e| ResyncMiss::channel_failed(stage, e))?;

        if !result.pattern_matched {
            return Err(ResyncMiss::not_seen(stage, self.config().sync_timeout));
        }

        let text = result.as_str();
        Ok(text
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ScriptedChannel;
    use crate::resync::ResyncReason;

    fn xr_landing() -> ScriptedChannel {
        ScriptedChannel::new()
            .after_writes(1, "\r\nRP/0/RSP0/CPU0:R3-STA#")
            .idle(1)
            .after_writes(2, "terminal length 0\r\nRP/0/RSP0/CPU0:R3-STA#")
            .idle(1)
            .after_writes(3, "terminal width 511\r\nRP/0/RSP0/CPU0:R3-STA#")
    }

    #[tokio::test(start_paused = true)]
    async fn test_redispatch_detects_xr_and_prepares_terminal() {
        let registry = PlatformRegistry::with_builtins();
        let mut channel = xr_landing();

        let redispatch = CommandDriver::default()
            .redispatch(&mut channel, &registry, Some("cisco_ios"), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(redispatch.platform.name, "cisco_xr");
        assert_eq!(redispatch.prompt, "RP/0/RSP0/CPU0:R3-STA#");
        assert!(redispatch.misses.is_empty(), "{:?}", redispatch.misses);
        assert_eq!(
            channel.written_lines(),
            ["", "terminal length 0", "terminal width 511"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_redispatch_miss_is_not_fatal() {
        let registry = PlatformRegistry::with_builtins();
        let mut channel = ScriptedChannel::new();

        let redispatch = CommandDriver::default()
            .redispatch(&mut channel, &registry, Some("cisco_ios"), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(redispatch.platform.name, "cisco_ios");
        assert_eq!(redispatch.prompt, "");
        // Prompt sync plus both terminal commands.
        assert_eq!(redispatch.misses.len(), 3);
        assert!(redispatch
            .misses
            .iter()
            .all(|m| m.stage == ResyncStage::Redispatch));
        assert!(matches!(redispatch.misses[0].reason, ResyncReason::NotSeen { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_redispatch_empty_registry() {
        let registry = PlatformRegistry::new();
        let mut channel = ScriptedChannel::new().output("R1#");
        let err = CommandDriver::default()
            .redispatch(&mut channel, &registry, None, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_login_sync() {
        let welcome = Regex::new(r"(?i)welcome").unwrap();
        let mut channel = ScriptedChannel::new()
            .output("Welcome to jump1\r\n")
            .after_writes(1, "\r\n[ops@jump1 ~]$ ");

        let misses = CommandDriver::default()
            .sync_jump_login(&mut channel, Some(&welcome), &CancelToken::new())
            .await;

        assert!(misses.is_empty(), "{misses:?}");
        assert_eq!(channel.written_lines(), [""]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_login_sync_misses() {
        let welcome = Regex::new(r"(?i)welcome").unwrap();
        let mut channel = ScriptedChannel::new().output("Last login: yesterday\r\n");

        let misses = CommandDriver::default()
            .sync_jump_login(&mut channel, Some(&welcome), &CancelToken::new())
            .await;

        let stages: Vec<ResyncStage> = misses.iter().map(|m| m.stage).collect();
        assert_eq!(stages, [ResyncStage::JumpWelcome, ResyncStage::JumpPrompt]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_login_sync_channel_failure() {
        let mut channel = ScriptedChannel::new().failing_writes();
        let misses = CommandDriver::default()
            .sync_jump_login(&mut channel, None, &CancelToken::new())
            .await;
        assert_eq!(misses.len(), 1);
        assert!(matches!(misses[0].reason, ResyncReason::ChannelFailed(_)));
    }
}
