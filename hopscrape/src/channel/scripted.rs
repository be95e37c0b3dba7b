//! In-memory channel that replays a prescripted conversation.
//!
//! Used by the unit and integration tests to drive hop negotiation and
//! command collection without a network. Each `read()` releases at most one
//! scripted segment; a segment can be held back until the client has made a
//! given number of writes, which is how "print the password prompt only
//! after the username was sent" is expressed.

use std::collections::VecDeque;

use super::Channel;
use crate::error::ChannelError;

#[derive(Debug)]
enum Step {
    Output { data: Vec<u8>, min_writes: usize },
    Close { min_writes: usize },
}

impl Step {
    fn min_writes(&self) -> usize {
        match self {
            Step::Output { min_writes, .. } | Step::Close { min_writes } => *min_writes,
        }
    }
}

/// Fake [`Channel`] backed by a queue of scripted reads.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    steps: VecDeque<Step>,
    writes: Vec<String>,
    reads: usize,
    closed: bool,
    fail_writes: bool,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a segment released on the next read.
    pub fn output(self, data: impl AsRef<[u8]>) -> Self {
        self.after_writes(0, data)
    }

    /// Queue a segment released only once at least `writes` writes were made.
    pub fn after_writes(mut self, writes: usize, data: impl AsRef<[u8]>) -> Self {
        self.steps.push_back(Step::Output {
            data: data.as_ref().to_vec(),
            min_writes: writes,
        });
        self
    }

    /// Queue `polls` empty reads.
    pub fn idle(mut self, polls: usize) -> Self {
        for _ in 0..polls {
            self.steps.push_back(Step::Output {
                data: Vec::new(),
                min_writes: 0,
            });
        }
        self
    }

    /// Close the channel once everything queued before this is consumed.
    pub fn close(mut self) -> Self {
        self.steps.push_back(Step::Close { min_writes: 0 });
        self
    }

    /// Close the channel once at least `writes` writes were made.
    pub fn close_after_writes(mut self, writes: usize) -> Self {
        self.steps.push_back(Step::Close { min_writes: writes });
        self
    }

    /// Make every write fail with [`ChannelError::Closed`].
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Everything written so far, in order.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    /// Written lines with the trailing newline removed.
    pub fn written_lines(&self) -> Vec<&str> {
        self.writes
            .iter()
            .map(|w| w.strip_suffix('\n').unwrap_or(w))
            .collect()
    }

    /// Number of `read()` calls made.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Whether every scripted step has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Channel for ScriptedChannel {
    async fn read(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.reads += 1;
        if self.closed {
            return Err(ChannelError::Closed);
        }

        let ready = self
            .steps
            .front()
            .is_some_and(|step| step.min_writes() <= self.writes.len());
        if !ready {
            return Ok(Vec::new());
        }

        match self.steps.pop_front() {
            Some(Step::Output { data, .. }) => Ok(data),
            Some(Step::Close { .. }) => {
                self.closed = true;
                Err(ChannelError::Closed)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn write(&mut self, data: &str) -> Result<(), ChannelError> {
        if self.fail_writes || self.closed {
            return Err(ChannelError::Closed);
        }
        self.writes.push(data.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_segments_released_in_order() {
        let mut channel = ScriptedChannel::new().output("a").idle(1).output("b");
        assert_eq!(channel.read().await.unwrap(), b"a");
        assert!(channel.read().await.unwrap().is_empty());
        assert_eq!(channel.read().await.unwrap(), b"b");
        assert!(channel.read().await.unwrap().is_empty());
        assert!(channel.is_exhausted());
    }

    #[tokio::test]
    async fn test_gated_segment_waits_for_writes() {
        let mut channel = ScriptedChannel::new().after_writes(1, "Password: ");
        assert!(channel.read().await.unwrap().is_empty());
        channel.write_line("admin").await.unwrap();
        assert_eq!(channel.read().await.unwrap(), b"Password: ");
        assert_eq!(channel.written_lines(), vec!["admin"]);
    }

    #[tokio::test]
    async fn test_close_fails_reads_and_writes() {
        let mut channel = ScriptedChannel::new().close();
        assert!(matches!(channel.read().await, Err(ChannelError::Closed)));
        assert!(matches!(channel.write("x").await, Err(ChannelError::Closed)));
        assert!(matches!(channel.read().await, Err(ChannelError::Closed)));
    }
}
