//! Platform definition for vendor-specific configurations.

use std::fmt;
use std::sync::Arc;

use regex::bytes::Regex;

use super::{DefaultBehavior, VendorBehavior};

/// Everything the command driver needs to know about a device's CLI.
#[derive(Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "cisco_xr", "linux").
    pub name: String,

    /// Pattern for the prompt that ends every command response. Anchored to
    /// the end of the buffer, so output lines ending in `#` do not count.
    pub prompt_pattern: Regex,

    /// Terminal preparation run on redispatch (paging off, wide lines).
    pub session_commands: Vec<String>,

    /// Substrings that mark a command as failed.
    pub failed_when_contains: Vec<String>,

    /// Optional vendor-specific behavior.
    pub behavior: Option<Arc<dyn VendorBehavior>>,
}

impl PlatformDefinition {
    /// Create a new platform definition from a name and prompt pattern.
    pub fn new(name: impl Into<String>, prompt_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            prompt_pattern: Regex::new(prompt_pattern)?,
            session_commands: vec![],
            failed_when_contains: vec![],
            behavior: None,
        })
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add a terminal preparation command.
    pub fn with_session_command(mut self, command: impl Into<String>) -> Self {
        self.session_commands.push(command.into());
        self
    }

    /// Set vendor behavior.
    pub fn with_behavior(mut self, behavior: Arc<dyn VendorBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    /// Vendor behavior, falling back to [`DefaultBehavior`].
    pub fn behavior(&self) -> &dyn VendorBehavior {
        match &self.behavior {
            Some(behavior) => behavior.as_ref(),
            None => &DefaultBehavior,
        }
    }

    /// First failure substring contained in `output`.
    pub fn failure_in(&self, output: &str) -> Option<String> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .cloned()
            .or_else(|| self.behavior().detect_failure(output))
    }
}

impl fmt::Debug for PlatformDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformDefinition")
            .field("name", &self.name)
            .field("prompt_pattern", &self.prompt_pattern.as_str())
            .field("session_commands", &self.session_commands)
            .field("failed_when_contains", &self.failed_when_contains)
            .field(
                "behavior",
                &self.behavior.as_ref().map(|_| "<VendorBehavior>"),
            )
            .finish()
    }
}
