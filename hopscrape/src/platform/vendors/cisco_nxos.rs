//! Cisco NX-OS platform definition.

use crate::platform::PlatformDefinition;

/// Platform name for Cisco NX-OS.
pub const PLATFORM_NAME: &str = "cisco_nxos";

/// Create the Cisco NX-OS platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new(
        PLATFORM_NAME,
        r"[\w.\-@/:]{1,63}(?:\(config[\w.\-@/:+]{0,32}\))?[>#]\s*$",
    )
    .unwrap()
    .with_session_command("terminal length 0")
    .with_session_command("terminal width 511")
    .with_failure_pattern("% Invalid command")
    .with_failure_pattern("% Incomplete command")
    .with_failure_pattern("% Permission denied")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cisco_nxos_platform() {
        let platform = platform();
        assert_eq!(platform.name, "cisco_nxos");
        assert!(platform.prompt_pattern.is_match(b"n9k-leaf1# "));
        assert_eq!(
            platform.failure_in("% Invalid command at '^' marker."),
            Some("% Invalid command".to_string())
        );
    }
}
