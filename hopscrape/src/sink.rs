//! Persistence of extracted records and raw command output.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SinkError;
use crate::extract::{DeviceInfoRecord, RawOutputBundle};

/// Where a sink writes. Passed in explicitly; nothing here is global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    csv_path: PathBuf,
    log_dir: PathBuf,
}

impl SinkConfig {
    pub fn new(csv_path: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            log_dir: log_dir.into(),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn with_csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = path.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }
}

/// Consumer of per-device results.
pub trait RecordSink {
    /// Persist one record.
    fn append(&mut self, record: &DeviceInfoRecord) -> Result<(), SinkError>;

    /// Persist the row for a device whose collection failed.
    fn append_error(&mut self, host: &str) -> Result<(), SinkError> {
        self.append(&DeviceInfoRecord::error_row(host))
    }

    /// Persist the raw blocks collected for `host`. Returns the files
    /// written.
    fn save_raw(&mut self, host: &str, bundle: &RawOutputBundle) -> Result<Vec<PathBuf>, SinkError>;
}

/// Sink writing a CSV file plus one text file per raw block.
pub struct CsvRecordSink {
    config: SinkConfig,
    writer: BufWriter<File>,
    rows: usize,
}

impl CsvRecordSink {
    /// Truncate the CSV and write its header row.
    pub fn create(config: SinkConfig) -> Result<Self, SinkError> {
        let path = config.csv_path.clone();
        let write_err = |source| SinkError::Write {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let file = File::create(&path).map_err(write_err)?;
        let mut sink = Self {
            config,
            writer: BufWriter::new(file),
            rows: 0,
        };
        sink.write_row(&DeviceInfoRecord::COLUMNS)?;
        info!("Writing records to {}", path.display());
        Ok(sink)
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn write_row(&mut self, fields: &[&str]) -> Result<(), SinkError> {
        let line = fields
            .iter()
            .map(|field| quote_field(field))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|source| SinkError::Write {
                path: self.config.csv_path.clone(),
                source,
            })
    }
}

impl RecordSink for CsvRecordSink {
    fn append(&mut self, record: &DeviceInfoRecord) -> Result<(), SinkError> {
        self.write_row(&record.values())?;
        self.rows += 1;
        Ok(())
    }

    fn save_raw(&mut self, host: &str, bundle: &RawOutputBundle) -> Result<Vec<PathBuf>, SinkError> {
        let dir = &self.config.log_dir;
        fs::create_dir_all(dir).map_err(|source| SinkError::Write {
            path: dir.clone(),
            source,
        })?;

        let tag = sanitize_tag(host);
        let mut written = Vec::with_capacity(bundle.len());
        for block in bundle.blocks() {
            let path = dir.join(format!("{}_{}.txt", tag, sanitize_tag(&block.name)));
            fs::write(&path, block.text.as_bytes()).map_err(|source| SinkError::Write {
                path: path.clone(),
                source,
            })?;
            debug!("Saved {} ({} bytes)", path.display(), block.text.len());
            written.push(path);
        }
        Ok(written)
    }
}

/// Replace every run of characters other than word characters, `.` and
/// `-` with `_`. Word characters include non-ASCII letters and digits.
pub fn sanitize_tag(host: &str) -> String {
    static UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w.\-]+").unwrap());
    UNSAFE.replace_all(host, "_").into_owned()
}

/// Quote a CSV field when it holds a comma, quote or line break.
fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hostname: &str, version: &str) -> DeviceInfoRecord {
        DeviceInfoRecord {
            hostname: hostname.to_string(),
            loopback0_ip: "10.0.0.3".to_string(),
            platform: "NCS-5500".to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_sanitize_tag() {
        assert_eq!(sanitize_tag("10.1.1.1"), "10.1.1.1");
        assert_eq!(sanitize_tag("core sw/01:22"), "core_sw_01_22");
        assert_eq!(sanitize_tag("a  //b"), "a_b");
        assert_eq!(sanitize_tag("R3-Überlingen"), "R3-Überlingen");
        assert_eq!(sanitize_tag("東京-core 1"), "東京-core_1");
    }

    #[test]
    fn test_quote_field() {
        assert_eq!(quote_field("R3-STA"), "R3-STA");
        assert_eq!(quote_field("a,b"), "\"a,b\"");
        assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_create_truncates_and_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("devices.csv");
        fs::write(&csv, "stale,data\n").unwrap();

        let sink = CsvRecordSink::create(SinkConfig::new(&csv, dir.path().join("logs"))).unwrap();
        assert_eq!(sink.rows(), 0);
        assert_eq!(
            fs::read_to_string(&csv).unwrap(),
            "hostname,loopback0_ip,platform,version\n"
        );
    }

    #[test]
    fn test_append_rows() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("nested/devices.csv");
        let mut sink = CsvRecordSink::create(SinkConfig::new(&csv, dir.path())).unwrap();

        sink.append(&record("R3-STA", "IOS XR 6.5.3")).unwrap();
        sink.append(&record("R4", "C2960 Software (C2960-LANBASEK9-M), v15.0")).unwrap();
        sink.append_error("10.1.1.9").unwrap();

        let text = fs::read_to_string(&csv).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "hostname,loopback0_ip,platform,version",
                "R3-STA,10.0.0.3,NCS-5500,IOS XR 6.5.3",
                "R4,10.0.0.3,NCS-5500,\"C2960 Software (C2960-LANBASEK9-M), v15.0\"",
                "10.1.1.9,ERROR,ERROR,ERROR",
            ]
        );
        assert_eq!(sink.rows(), 3);
    }

    #[test]
    fn test_save_raw_writes_one_file_per_block() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let mut sink =
            CsvRecordSink::create(SinkConfig::new(dir.path().join("d.csv"), &logs)).unwrap();

        let mut bundle = RawOutputBundle::new();
        bundle.insert("hostname", "show running-config | include ^hostname\r\nhostname R3-STA\r\nR3#");
        bundle.insert("version", "");

        let written = sink.save_raw("core sw/1", &bundle).unwrap();
        assert_eq!(
            written,
            [logs.join("core_sw_1_hostname.txt"), logs.join("core_sw_1_version.txt")]
        );
        assert_eq!(
            fs::read_to_string(&written[0]).unwrap(),
            "show running-config | include ^hostname\r\nhostname R3-STA\r\nR3#"
        );
        assert_eq!(fs::read_to_string(&written[1]).unwrap(), "");
    }
}
