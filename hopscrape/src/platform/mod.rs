//! Platform definitions used when a landed session is redispatched.
//!
//! The roster's `device_type` is only a hint. Once a hop lands, the prompt
//! is inspected and the session is switched to the matching platform: its
//! prompt pattern, the terminal preparation commands it needs and how its
//! command output is cleaned up.

mod definition;
mod registry;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use registry::PlatformRegistry;

/// Trait for vendor-specific output handling.
pub trait VendorBehavior: Send + Sync {
    /// Normalize command output: drop everything up to and including the
    /// echoed command, and the trailing prompt line when one was seen.
    fn normalize_output(&self, raw: &str, command: &str, prompt_seen: bool) -> String {
        default_normalize(raw, command, prompt_seen)
    }

    /// Vendor clean-up applied after normalization.
    fn post_process_output(&self, output: &str) -> String {
        output.to_string()
    }

    /// Detect command failure from output beyond the plain substring list.
    fn detect_failure(&self, _output: &str) -> Option<String> {
        None
    }
}

/// Default vendor behavior implementation.
pub struct DefaultBehavior;

impl VendorBehavior for DefaultBehavior {}

fn default_normalize(raw: &str, command: &str, prompt_seen: bool) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "");

    // Strip command echo from the beginning
    let output = if command.is_empty() {
        text.as_str()
    } else {
        match text.find(command) {
            Some(pos) => &text[pos + command.len()..],
            None => text.as_str(),
        }
    };
    let output = output.trim_start_matches('\n');

    if !prompt_seen {
        return output.to_string();
    }

    // Strip trailing prompt (last line)
    match output.rfind('\n') {
        Some(pos) => output[..pos].to_string(),
        None => String::new(),
    }
}
