//! Ordered pattern chains for each record field.
//!
//! Each field owns a list of alternatives. The first alternative that
//! matches anywhere in the text wins; later alternatives are only tried
//! when earlier ones find nothing.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// A field of [`DeviceInfoRecord`](super::DeviceInfoRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Hostname,
    Loopback0Ip,
    Platform,
    Version,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Hostname,
        Field::Loopback0Ip,
        Field::Platform,
        Field::Version,
    ];

    /// Column name used in tabular output.
    pub fn column(self) -> &'static str {
        match self {
            Field::Hostname => "hostname",
            Field::Loopback0Ip => "loopback0_ip",
            Field::Platform => "platform",
            Field::Version => "version",
        }
    }
}

type Render = fn(&Captures<'_>) -> String;

/// One pattern alternative and how its captures become a field value.
pub struct Alternative {
    pub name: &'static str,
    pub pattern: Regex,
    render: Render,
}

impl Alternative {
    fn new(name: &'static str, pattern: &str, render: Render) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            render,
        }
    }

    fn apply(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let value = (self.render)(&caps);
        if value.is_empty() { None } else { Some(value) }
    }
}

/// The alternatives for one field, in priority order.
pub struct FieldRule {
    pub field: Field,
    pub alternatives: Vec<Alternative>,
}

impl FieldRule {
    /// Value from the first matching alternative.
    pub fn apply(&self, text: &str) -> Option<String> {
        self.alternatives.iter().find_map(|alt| alt.apply(text))
    }
}

const DOTTED_QUAD: &str = r"\d{1,3}(?:\.\d{1,3}){3}";

fn group(caps: &Captures<'_>, index: usize) -> String {
    caps.get(index)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn first_group(caps: &Captures<'_>) -> String {
    group(caps, 1)
}

fn ios_version(caps: &Captures<'_>) -> String {
    format!("{} v{}", group(caps, 1), group(caps, 2))
}

fn xr_version(caps: &Captures<'_>) -> String {
    format!("IOS XR {}", group(caps, 1))
}

fn linux_version(caps: &Captures<'_>) -> String {
    format!("Linux Software ({}), Version {}", group(caps, 1), group(caps, 2))
}

/// Field rules in record column order.
pub static FIELD_RULES: Lazy<[FieldRule; 4]> = Lazy::new(|| {
    [
        FieldRule {
            field: Field::Hostname,
            alternatives: vec![
                Alternative::new("hostname-line", r"(?mi)^[ \t]*hostname\s+(\S+)", first_group),
                // Bare prompt, optionally behind an XR node path or user@.
                Alternative::new(
                    "prompt",
                    r"(?m)^(?:\S*[:@])?([A-Za-z0-9_-]+)[>#(]",
                    first_group,
                ),
            ],
        },
        FieldRule {
            field: Field::Loopback0Ip,
            alternatives: vec![
                Alternative::new(
                    "interface-brief",
                    &format!(r"(?i)Loopback0\b[^\n]*?\b({DOTTED_QUAD})\b"),
                    first_group,
                ),
                Alternative::new(
                    "internet-address",
                    &format!(r"(?i)Internet address is\s+({DOTTED_QUAD})/\d{{1,2}}"),
                    first_group,
                ),
                Alternative::new(
                    "interface-config",
                    &format!(
                        r"(?mi)interface Loopback0\b[^\n]*\n[^\n]*ip address\s+({DOTTED_QUAD})"
                    ),
                    first_group,
                ),
            ],
        },
        FieldRule {
            field: Field::Platform,
            alternatives: vec![
                Alternative::new("platform", r"(?i)Cisco\s+(\S[^\n]*?)\s+platform", first_group),
                Alternative::new("chassis", r"(?i)Cisco\s+(\S[^\n]*?)\s+chassis", first_group),
            ],
        },
        FieldRule {
            field: Field::Version,
            alternatives: vec![
                Alternative::new(
                    "ios",
                    r"(?i)Cisco IOS Software,\s*([^\n]+?),\s*Version\s+([^\n,]+),",
                    ios_version,
                ),
                Alternative::new(
                    "ios-xr",
                    r"(?i)Cisco IOS XR Software,\s*Version\s*([^\s\[]+)\[",
                    xr_version,
                ),
                Alternative::new(
                    "linux",
                    r"(?i)Linux Software\s*\(([^\n)]+)\),\s*Version\s+([^\n,]+),",
                    linux_version,
                ),
            ],
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(field: Field, text: &str) -> Option<String> {
        FIELD_RULES
            .iter()
            .find(|rule| rule.field == field)
            .and_then(|rule| rule.apply(text))
    }

    #[test]
    fn test_rules_cover_every_field_in_order() {
        let fields: Vec<Field> = FIELD_RULES.iter().map(|r| r.field).collect();
        assert_eq!(fields, Field::ALL.to_vec());
    }

    #[test]
    fn test_hostname_line_beats_prompt() {
        let text = "RP/0/RSP0/CPU0:ignored#show running-config | include ^hostname\nhostname R3-STA\n";
        assert_eq!(apply(Field::Hostname, text).as_deref(), Some("R3-STA"));
    }

    #[test]
    fn test_hostname_from_prompt() {
        assert_eq!(
            apply(Field::Hostname, "RP/0/RSP0/CPU0:R3-STA#show version\n").as_deref(),
            Some("R3-STA")
        );
        assert_eq!(apply(Field::Hostname, "core-sw1>enable\n").as_deref(), Some("core-sw1"));
        assert_eq!(apply(Field::Hostname, "R1(config)#\n").as_deref(), Some("R1"));
    }

    #[test]
    fn test_hostname_case_insensitive_keyword() {
        assert_eq!(apply(Field::Hostname, "HOSTNAME edge-01\n").as_deref(), Some("edge-01"));
    }

    #[test]
    fn test_loopback_interface_brief() {
        let text = "Loopback0                      10.10.10.10     Up              Up       default";
        assert_eq!(apply(Field::Loopback0Ip, text).as_deref(), Some("10.10.10.10"));
    }

    #[test]
    fn test_loopback_brief_skips_other_interfaces() {
        let text = "Loopback1   192.0.2.1   Up   Up\nLoopback0   10.0.0.3   Up   Up\n";
        assert_eq!(apply(Field::Loopback0Ip, text).as_deref(), Some("10.0.0.3"));
    }

    #[test]
    fn test_loopback_internet_address() {
        let text = "Loopback0 is up, line protocol is up\n  Internet address is 10.1.2.3/32\n";
        assert_eq!(apply(Field::Loopback0Ip, text).as_deref(), Some("10.1.2.3"));
    }

    #[test]
    fn test_loopback_interface_config() {
        let text = "interface Loopback0\n ip address 172.16.0.9 255.255.255.255\n!";
        assert_eq!(apply(Field::Loopback0Ip, text).as_deref(), Some("172.16.0.9"));
    }

    #[test]
    fn test_loopback_accepts_lenient_octets() {
        let text = "Loopback0   999.1.1.1   Up   Up";
        assert_eq!(apply(Field::Loopback0Ip, text).as_deref(), Some("999.1.1.1"));
    }

    #[test]
    fn test_platform_then_chassis() {
        assert_eq!(
            apply(Field::Platform, "Cisco NCS-5500 platform").as_deref(),
            Some("NCS-5500")
        );
        assert_eq!(
            apply(Field::Platform, "cisco ASR9K Series chassis").as_deref(),
            Some("ASR9K Series")
        );
        assert_eq!(apply(Field::Platform, "no match here"), None);
    }

    #[test]
    fn test_version_dialects() {
        assert_eq!(
            apply(
                Field::Version,
                "Cisco IOS Software, C2960 Software (C2960-LANBASEK9-M), Version 15.0(2)SE11, RELEASE SOFTWARE (fc3)"
            )
            .as_deref(),
            Some("C2960 Software (C2960-LANBASEK9-M) v15.0(2)SE11")
        );
        assert_eq!(
            apply(Field::Version, "Cisco IOS XR Software, Version 6.5.3[Default]").as_deref(),
            Some("IOS XR 6.5.3")
        );
        assert_eq!(
            apply(Field::Version, "Linux Software (ubuntu), Version 22.04, build 7").as_deref(),
            Some("Linux Software (ubuntu), Version 22.04")
        );
        assert_eq!(apply(Field::Version, "uptime is 3 weeks"), None);
    }
}
