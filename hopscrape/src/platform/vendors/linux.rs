//! Linux platform definition.
//!
//! Used for jump hosts reached by a typed hop, where the landing shell is a
//! plain Unix shell with a `$` (user) or `#` (root) prompt.

use crate::platform::PlatformDefinition;

/// Platform name for Linux shells.
pub const PLATFORM_NAME: &str = "linux";

/// Create the Linux platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new(PLATFORM_NAME, r"[\w.\-@/:~\[\] ]{0,128}[$#>]\s*$")
        .unwrap()
        .with_failure_pattern("command not found")
        .with_failure_pattern("No such file or directory")
        .with_failure_pattern("Permission denied")
}
