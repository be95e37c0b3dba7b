//! Cisco IOS / IOS-XE platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! R1>                  # user exec
//! R1#                  # privileged exec
//! ```

use crate::platform::PlatformDefinition;

/// Platform name for Cisco IOS.
pub const PLATFORM_NAME: &str = "cisco_ios";

/// Create the Cisco IOS platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new(
        PLATFORM_NAME,
        r"[\w.\-@/:]{1,63}(?:\(config[\w.\-@/:+]{0,32}\))?[>#]\s*$",
    )
    .unwrap()
    .with_session_command("terminal length 0")
    .with_session_command("terminal width 511")
    .with_failure_pattern("% Invalid input detected")
    .with_failure_pattern("% Incomplete command")
    .with_failure_pattern("% Ambiguous command")
    .with_failure_pattern("% Unknown command")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cisco_ios_platform() {
        let platform = platform();
        assert_eq!(platform.name, "cisco_ios");
        assert_eq!(platform.session_commands.len(), 2);
    }

    #[test]
    fn test_prompt_match() {
        let platform = platform();
        assert!(platform.prompt_pattern.is_match(b"R1>"));
        assert!(platform.prompt_pattern.is_match(b"R1#"));
        assert!(platform.prompt_pattern.is_match(b"R1(config-if)#"));
        assert!(!platform.prompt_pattern.is_match(b"R1# show version"));
    }
}
