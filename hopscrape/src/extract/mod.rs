//! Field extraction from raw command output.
//!
//! [`extract`] turns a [`RawOutputBundle`] into a [`DeviceInfoRecord`]. It
//! is a pure function of the text: no I/O, no shared state, and the same
//! bundle always produces the same record. Each field is derived on its
//! own, so a field that cannot be found is reported as [`NOT_AVAILABLE`]
//! without affecting the others.
//!
//! # Example
//!
//! ```
//! use hopscrape::extract::{extract, RawOutputBundle};
//!
//! let mut bundle = RawOutputBundle::new();
//! bundle.insert("hostname", "hostname R3-STA\n");
//! bundle.insert("version", "Cisco IOS XR Software, Version 6.5.3[Default]\n");
//!
//! let record = extract(&bundle);
//! assert_eq!(record.hostname, "R3-STA");
//! assert_eq!(record.version, "IOS XR 6.5.3");
//! assert_eq!(record.platform, "N/A");
//! ```

mod bundle;
pub mod rules;

use std::path::Path;

use log::debug;

pub use bundle::{
    CaptureStatus, RawBlock, RawOutputBundle, CDP_BLOCK, EXTRACTION_BLOCKS, HOSTNAME_BLOCK,
    LLDP_BLOCK, LOOPBACK_BLOCK, PLATFORM_BLOCK, VERSION_BLOCK,
};
pub use rules::Field;

/// Value of a field no pattern matched.
pub const NOT_AVAILABLE: &str = "N/A";

/// Marker placed in `loopback0_ip` when the raw text could not be read.
pub const FILE_NOT_FOUND: &str = "File not found";

/// Value of every data field in a failed device's row.
pub const ERROR_MARK: &str = "ERROR";

/// Structured identity of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfoRecord {
    pub hostname: String,
    pub loopback0_ip: String,
    pub platform: String,
    pub version: String,
}

impl DeviceInfoRecord {
    /// Column names in output order.
    pub const COLUMNS: [&'static str; 4] = ["hostname", "loopback0_ip", "platform", "version"];

    /// Record with every field set to [`NOT_AVAILABLE`].
    pub fn not_available() -> Self {
        Self {
            hostname: NOT_AVAILABLE.to_string(),
            loopback0_ip: NOT_AVAILABLE.to_string(),
            platform: NOT_AVAILABLE.to_string(),
            version: NOT_AVAILABLE.to_string(),
        }
    }

    /// Sentinel for raw text that could not be read.
    pub fn file_not_found() -> Self {
        Self {
            loopback0_ip: FILE_NOT_FOUND.to_string(),
            ..Self::not_available()
        }
    }

    /// Row recorded for a device whose collection failed.
    pub fn error_row(host: impl Into<String>) -> Self {
        Self {
            hostname: host.into(),
            loopback0_ip: ERROR_MARK.to_string(),
            platform: ERROR_MARK.to_string(),
            version: ERROR_MARK.to_string(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Hostname => &self.hostname,
            Field::Loopback0Ip => &self.loopback0_ip,
            Field::Platform => &self.platform,
            Field::Version => &self.version,
        }
    }

    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Hostname => self.hostname = value,
            Field::Loopback0Ip => self.loopback0_ip = value,
            Field::Platform => self.platform = value,
            Field::Version => self.version = value,
        }
    }

    /// Field values in column order.
    pub fn values(&self) -> [&str; 4] {
        Field::ALL.map(|field| self.get(field))
    }

    /// True when the record is the unreadable-input sentinel.
    pub fn is_file_not_found(&self) -> bool {
        self.loopback0_ip == FILE_NOT_FOUND
    }
}

/// Extract a record from a bundle.
///
/// An unavailable bundle yields [`DeviceInfoRecord::file_not_found`].
pub fn extract(bundle: &RawOutputBundle) -> DeviceInfoRecord {
    if let Some(source) = bundle.unavailable_source() {
        debug!("Raw text unavailable ({}), returning sentinel record", source);
        return DeviceInfoRecord::file_not_found();
    }
    extract_text(&bundle.extraction_text())
}

/// Extract a record from one piece of text.
pub fn extract_text(text: &str) -> DeviceInfoRecord {
    let mut record = DeviceInfoRecord::not_available();
    for rule in rules::FIELD_RULES.iter() {
        if let Some(value) = rule.apply(text) {
            debug!("{} = {:?}", rule.field.column(), value);
            record.set(rule.field, value);
        }
    }
    record
}

/// Read a saved log file and extract a record from it.
///
/// A missing or unreadable file yields the sentinel record; this never
/// fails.
pub fn parse_log_file(path: impl AsRef<Path>) -> DeviceInfoRecord {
    extract(&RawOutputBundle::from_file(path))
}
