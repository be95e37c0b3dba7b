//! Cisco IOS XR platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! RP/0/RSP0/CPU0:R3-STA#        # route processor, exec
//! RP/0/RP0/CPU0:ncs5500#        # NCS 5500
//! ```
//!
//! XR stamps every `show` output with the current time on its first line;
//! [`CiscoXrBehavior`] removes it so saved logs only hold the response.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::platform::{PlatformDefinition, VendorBehavior};

/// Platform name for Cisco IOS XR.
pub const PLATFORM_NAME: &str = "cisco_xr";

static TIMESTAMP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun) (?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) +\d{1,2} \d{2}:\d{2}:\d{2}(?:\.\d+)? \S+\s*$")
        .unwrap()
});

/// Create the Cisco IOS XR platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new(PLATFORM_NAME, r"[\w.\-@/:]{1,63}[>#]\s*$")
        .unwrap()
        .with_session_command("terminal length 0")
        .with_session_command("terminal width 511")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% This command is not authorized")
        .with_behavior(Arc::new(CiscoXrBehavior))
}

/// Whether a landing prompt looks like an XR node prompt (`RP/0/RSP0/CPU0:host#`).
pub fn is_xr_prompt(prompt: &str) -> bool {
    static XR_PROMPT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^(?:RP|LC)/\d+/[\w]+/CPU\d+:[\w.\-]+[>#]\s*$").unwrap());
    XR_PROMPT.is_match(prompt)
}

/// Cisco IOS XR-specific behavior.
pub struct CiscoXrBehavior;

impl VendorBehavior for CiscoXrBehavior {
    fn post_process_output(&self, output: &str) -> String {
        let mut lines = output.lines();
        match lines.clone().next() {
            Some(first) if TIMESTAMP_LINE.is_match(first) => {
                lines.next();
                lines.collect::<Vec<_>>().join("\n")
            }
            _ => output.to_string(),
        }
    }
}
