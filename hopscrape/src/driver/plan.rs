//! Commands sent to each device.

use std::time::Duration;

use crate::extract::{
    CDP_BLOCK, HOSTNAME_BLOCK, LLDP_BLOCK, LOOPBACK_BLOCK, PLATFORM_BLOCK, VERSION_BLOCK,
};

/// One command and how long to wait for its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Block name the output is stored under.
    pub name: String,
    pub command: String,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            timeout,
        }
    }
}

/// Identity and neighbor commands, in the order they are sent.
pub fn standard_plan() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new(
            HOSTNAME_BLOCK,
            "show running-config | include ^hostname",
            Duration::from_secs(30),
        ),
        CommandSpec::new(VERSION_BLOCK, "show version", Duration::from_secs(60)),
        CommandSpec::new(PLATFORM_BLOCK, "show platform", Duration::from_secs(60)),
        CommandSpec::new(
            LOOPBACK_BLOCK,
            "show ipv4 interface brief | include Loopback0",
            Duration::from_secs(30),
        ),
        CommandSpec::new(CDP_BLOCK, "show cdp neighbors", Duration::from_secs(30)),
        CommandSpec::new(LLDP_BLOCK, "show lldp neighbors", Duration::from_secs(30)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_plan_order() {
        let names: Vec<String> = standard_plan().into_iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            ["hostname", "version", "platform", "loopback", "cdp", "lldp"]
        );
    }

    #[test]
    fn test_standard_plan_timeouts() {
        for spec in standard_plan() {
            assert!(spec.timeout >= Duration::from_secs(30));
            assert!(spec.timeout <= Duration::from_secs(60));
        }
    }
}
