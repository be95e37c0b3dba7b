//! Channel layer: the duplex text stream every hop and command runs over.
//!
//! A [`Channel`] is one interactive shell session. Hops do not create new
//! channels; the same stream is redispatched as each nested login lands
//! (operator → jump host → device), so everything here works on
//! `&mut impl Channel`.

mod buffer;
mod patterns;
mod scripted;

pub use buffer::PatternBuffer;
pub use patterns::{DEFAULT_LANDING_PROMPT, SHELL_PROMPT};
pub use scripted::ScriptedChannel;

use std::future::Future;
use std::time::Duration;

use log::trace;
use regex::bytes::Regex;

use crate::cancel::CancelToken;
use crate::error::ChannelError;

/// Minimal read/write contract over an established interactive session.
pub trait Channel: Send {
    /// Return whatever output arrived since the last call.
    ///
    /// Must not wait for more than a short drain window; an empty vector
    /// means nothing new has arrived yet.
    fn read(&mut self) -> impl Future<Output = Result<Vec<u8>, ChannelError>> + Send;

    /// Send raw text.
    fn write(&mut self, data: &str) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Send a line terminated with `\n`.
    fn write_line(&mut self, line: &str) -> impl Future<Output = Result<(), ChannelError>> + Send {
        async move { self.write(&format!("{line}\n")).await }
    }
}

/// Result of a read operation.
#[derive(Debug)]
pub struct ReadResult {
    /// The data that was read, ANSI-stripped.
    pub data: Vec<u8>,

    /// Whether the pattern was matched.
    pub pattern_matched: bool,
}

impl ReadResult {
    /// Get the data as a string (lossy UTF-8).
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Poll `channel` until `pattern` shows up in the tail of the accumulated
/// output, `timeout` elapses, or `cancel` fires.
///
/// A miss is not an error: the caller gets everything read so far with
/// `pattern_matched == false`. Only transport failures are returned as `Err`.
pub async fn read_until_pattern<C: Channel + ?Sized>(
    channel: &mut C,
    pattern: &Regex,
    timeout: Duration,
    poll_interval: Duration,
    cancel: &CancelToken,
) -> Result<ReadResult, ChannelError> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut buffer = PatternBuffer::default();

    loop {
        let chunk = channel.read().await?;
        if !chunk.is_empty() {
            trace!("read {} bytes", chunk.len());
            buffer.extend(&chunk);
            if buffer.tail_contains(pattern) {
                return Ok(ReadResult {
                    data: buffer.take(),
                    pattern_matched: true,
                });
            }
        }

        if cancel.is_cancelled() || tokio::time::Instant::now() >= deadline {
            return Ok(ReadResult {
                data: buffer.take(),
                pattern_matched: false,
            });
        }

        if chunk.is_empty() {
            cancel.sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_read_until_pattern_matches() {
        let mut channel = ScriptedChannel::new()
            .idle(2)
            .output("Building configuration...\r\n")
            .output("R3-STA#");
        let pattern = Regex::new(r"[>#]\s*$").unwrap();

        let result = read_until_pattern(
            &mut channel,
            &pattern,
            Duration::from_secs(5),
            Duration::from_millis(100),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert!(result.pattern_matched);
        assert!(result.as_str().ends_with("R3-STA#"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_until_pattern_miss_keeps_partial_output() {
        let mut channel = ScriptedChannel::new().output("--More--");
        let pattern = Regex::new(r"[>#]\s*$").unwrap();

        let result = read_until_pattern(
            &mut channel,
            &pattern,
            Duration::from_secs(2),
            Duration::from_millis(100),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert!(!result.pattern_matched);
        assert_eq!(result.as_str(), "--More--");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_until_pattern_stops_on_cancel() {
        let mut channel = ScriptedChannel::new();
        let pattern = Regex::new(r"#\s*$").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let start = tokio::time::Instant::now();
        let result = read_until_pattern(
            &mut channel,
            &pattern,
            Duration::from_secs(60),
            Duration::from_millis(100),
            &cancel,
        )
        .await
        .unwrap();

        assert!(!result.pattern_matched);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_read_until_pattern_propagates_channel_failure() {
        let mut channel = ScriptedChannel::new().output("partial").close();
        let pattern = Regex::new(r"#\s*$").unwrap();

        let err = read_until_pattern(
            &mut channel,
            &pattern,
            Duration::from_secs(5),
            Duration::from_millis(10),
            &CancelToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ChannelError::Closed));
    }
}
