//! Non-fatal resynchronisation misses.
//!
//! Several steps only try to line the session up with a prompt: the banner
//! wait after logging into the jump host, the blank-line burst after a
//! device password, the terminal preparation done on redispatch. When one
//! of them does not see what it waited for, the session carries on. The
//! miss is still returned as a value so callers and tests can see it
//! happened.

use std::fmt;
use std::time::Duration;

/// Which best-effort step missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncStage {
    /// Waiting for the jump host's welcome banner.
    JumpWelcome,
    /// Waiting for the jump host's shell prompt.
    JumpPrompt,
    /// Waiting for the landing prompt after a password was sent.
    PostPassword,
    /// Preparing the terminal after the session was redispatched.
    Redispatch,
}

impl fmt::Display for ResyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResyncStage::JumpWelcome => "jump host welcome banner",
            ResyncStage::JumpPrompt => "jump host prompt",
            ResyncStage::PostPassword => "post-password prompt",
            ResyncStage::Redispatch => "redispatch",
        };
        f.write_str(name)
    }
}

/// Why the step missed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResyncReason {
    /// The pattern did not show up within the bounded wait.
    NotSeen { waited: Duration },
    /// The channel failed while waiting; the failure is swallowed here.
    ChannelFailed(String),
}

/// A tolerated failure of a best-effort resynchronisation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncMiss {
    pub stage: ResyncStage,
    pub reason: ResyncReason,
}

impl ResyncMiss {
    pub fn not_seen(stage: ResyncStage, waited: Duration) -> Self {
        Self {
            stage,
            reason: ResyncReason::NotSeen { waited },
        }
    }

    pub fn channel_failed(stage: ResyncStage, error: impl fmt::Display) -> Self {
        Self {
            stage,
            reason: ResyncReason::ChannelFailed(error.to_string()),
        }
    }
}

impl fmt::Display for ResyncMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ResyncReason::NotSeen { waited } => {
                write!(f, "{} not seen within {:?}", self.stage, waited)
            }
            ResyncReason::ChannelFailed(e) => write!(f, "{} failed: {}", self.stage, e),
        }
    }
}
