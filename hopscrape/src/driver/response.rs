//! Result of one captured command.

use std::time::Duration;

use crate::extract::{CaptureStatus, RawBlock};

/// Output of one command sent to a device.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Block name the output is stored under.
    pub name: String,

    /// The command that was sent.
    pub command: String,

    /// Output with the command echo and trailing prompt removed.
    pub text: String,

    /// Everything read for this command, ANSI-stripped but otherwise as
    /// received.
    pub raw: String,

    pub status: CaptureStatus,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl CommandOutput {
    /// Output for a command that never produced anything.
    pub(crate) fn failed(
        name: impl Into<String>,
        command: impl Into<String>,
        reason: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            text: String::new(),
            raw: String::new(),
            status: CaptureStatus::Failed {
                reason: reason.into(),
            },
            elapsed,
        }
    }

    /// Whether the response ended with a prompt and no failure text.
    pub fn is_complete(&self) -> bool {
        self.status == CaptureStatus::Complete
    }

    /// Failure reason, if the command failed.
    pub fn failure(&self) -> Option<&str> {
        match &self.status {
            CaptureStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Raw block stored in the device's bundle and saved to its log file.
    pub fn into_block(self) -> RawBlock {
        RawBlock {
            name: self.name,
            text: self.raw,
            status: self.status,
        }
    }
}

impl std::fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
