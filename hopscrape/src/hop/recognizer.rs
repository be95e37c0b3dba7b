//! Recognizers and the per-hop session state they classify.
//!
//! Classification is a pure function of the accumulated buffer and the two
//! "already sent" flags, so the priority rules can be tested without any
//! channel.

use std::time::Duration;

use regex::bytes::Regex;
use tokio::time::Instant;

use crate::channel::PatternBuffer;

/// A negotiation event detected in the accumulated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognizer {
    /// "Are you sure you want to continue connecting"
    HostKeyConfirmation,
    /// Trailing `username:`
    UsernamePrompt,
    /// Trailing `password:`
    PasswordPrompt,
    /// The hop's landing prompt
    LandingPrompt,
    /// "Permission denied"
    PermissionDenied,
}

/// Evaluation order. The first recognizer that fires wins.
///
/// Host-key confirmation can show up interleaved with later prompts, so it
/// goes first. Permission denied goes last among content matches.
pub const RECOGNIZER_ORDER: [Recognizer; 5] = [
    Recognizer::HostKeyConfirmation,
    Recognizer::UsernamePrompt,
    Recognizer::PasswordPrompt,
    Recognizer::LandingPrompt,
    Recognizer::PermissionDenied,
];

/// Compiled patterns for every recognizer except the landing prompt, which
/// belongs to the hop target.
#[derive(Debug, Clone)]
pub struct Recognizers {
    host_key: Regex,
    username: Regex,
    password: Regex,
    denied: Regex,
}

impl Recognizers {
    pub fn new(host_key: &str, username: &str, password: &str, denied: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            host_key: Regex::new(host_key)?,
            username: Regex::new(username)?,
            password: Regex::new(password)?,
            denied: Regex::new(denied)?,
        })
    }

    /// The pattern backing `recognizer`.
    pub fn pattern<'a>(&'a self, recognizer: Recognizer, landing: &'a Regex) -> &'a Regex {
        match recognizer {
            Recognizer::HostKeyConfirmation => &self.host_key,
            Recognizer::UsernamePrompt => &self.username,
            Recognizer::PasswordPrompt => &self.password,
            Recognizer::LandingPrompt => landing,
            Recognizer::PermissionDenied => &self.denied,
        }
    }

    pub fn permission_denied(&self) -> &Regex {
        &self.denied
    }
}

impl Default for Recognizers {
    fn default() -> Self {
        Self::new(
            r"(?i)are you sure you want to continue connecting",
            r"(?i)username:\s*$",
            r"(?i)password:\s*$",
            r"(?i)permission denied",
        )
        .expect("built-in recognizer patterns are valid")
    }
}

/// Working state of one hop attempt. Discarded when the hop ends.
#[derive(Debug)]
pub struct SessionState {
    buffer: PatternBuffer,
    username_sent: bool,
    password_sent: bool,
    host_key_confirmed: bool,
    started: Instant,
    deadline: Instant,
}

impl SessionState {
    pub fn new(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            buffer: PatternBuffer::new(2048),
            username_sent: false,
            password_sent: false,
            host_key_confirmed: false,
            started,
            deadline: started + timeout,
        }
    }

    /// Append newly read output.
    pub fn append(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Forget everything accumulated so far.
    pub fn reset_buffer(&mut self) {
        self.buffer.clear();
    }

    pub fn buffer(&self) -> &PatternBuffer {
        &self.buffer
    }

    /// Run the recognizers in [`RECOGNIZER_ORDER`] against the buffer.
    ///
    /// Username and password prompts are skipped once answered.
    pub fn classify(&self, recognizers: &Recognizers, landing: &Regex) -> Option<Recognizer> {
        RECOGNIZER_ORDER.into_iter().find(|&recognizer| {
            let answered = match recognizer {
                Recognizer::UsernamePrompt => self.username_sent,
                Recognizer::PasswordPrompt => self.password_sent,
                _ => false,
            };
            !answered
                && self
                    .buffer
                    .tail_contains(recognizers.pattern(recognizer, landing))
        })
    }

    pub fn mark_username_sent(&mut self) {
        debug_assert!(!self.username_sent, "username answered twice in one hop");
        self.username_sent = true;
    }

    pub fn mark_password_sent(&mut self) {
        debug_assert!(!self.password_sent, "password answered twice in one hop");
        self.password_sent = true;
    }

    pub fn mark_host_key_confirmed(&mut self) {
        self.host_key_confirmed = true;
    }

    pub fn username_sent(&self) -> bool {
        self.username_sent
    }

    pub fn password_sent(&self) -> bool {
        self.password_sent
    }

    pub fn host_key_confirmed(&self) -> bool {
        self.host_key_confirmed
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
