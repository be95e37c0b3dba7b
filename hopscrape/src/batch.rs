//! Sequential collection across a device roster.
//!
//! Devices are processed one at a time over the same channel. A device
//! that fails to hop or collect gets an `ERROR` row and the batch moves on;
//! only a failing record sink stops it.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::cancel::CancelToken;
use crate::channel::Channel;
use crate::driver::{CommandDriver, CommandSpec, standard_plan};
use crate::error::{Error, HopError, Result, SinkError};
use crate::extract::{self, DeviceInfoRecord};
use crate::hop::{HopTarget, Negotiator};
use crate::platform::PlatformRegistry;
use crate::resync::ResyncMiss;
use crate::sink::RecordSink;

/// One roster entry: the hop into the device plus its platform hint.
#[derive(Debug)]
pub struct DeviceTarget {
    hop: HopTarget,
    device_type: Option<String>,
}

impl DeviceTarget {
    pub fn new(hop: HopTarget, device_type: Option<String>) -> Self {
        Self { hop, device_type }
    }

    pub fn host(&self) -> &str {
        self.hop.host()
    }

    pub fn hop(&self) -> &HopTarget {
        &self.hop
    }

    pub fn device_type(&self) -> Option<&str> {
        self.device_type.as_deref()
    }
}

/// Collaborators used for every device in a batch.
#[derive(Debug)]
pub struct BatchOptions {
    pub negotiator: Negotiator,
    pub driver: CommandDriver,
    pub registry: PlatformRegistry,
    pub commands: Vec<CommandSpec>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            negotiator: Negotiator::default(),
            driver: CommandDriver::default(),
            registry: PlatformRegistry::with_builtins(),
            commands: standard_plan(),
        }
    }
}

/// What happened to one device.
#[derive(Debug, Clone)]
pub enum DeviceOutcome {
    Collected {
        host: String,
        record: DeviceInfoRecord,
        /// Best-effort resyncs that missed along the way.
        resync_misses: Vec<ResyncMiss>,
    },
    Failed {
        host: String,
        reason: String,
    },
}

impl DeviceOutcome {
    pub fn host(&self) -> &str {
        match self {
            DeviceOutcome::Collected { host, .. } | DeviceOutcome::Failed { host, .. } => host,
        }
    }

    pub fn is_collected(&self) -> bool {
        matches!(self, DeviceOutcome::Collected { .. })
    }
}

/// Outcomes of a batch, in roster order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<DeviceOutcome>,
}

impl BatchReport {
    pub fn collected(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_collected()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.collected()
    }
}

/// Collect every device in `devices`, in order, from the shell `channel`
/// is currently sitting in.
///
/// After each device `exit` is written whether or not it succeeded. Once
/// `cancel` fires the channel is left alone: devices not yet reached fail
/// without a hop attempt and no further `exit` is sent.
pub async fn run_batch<C, S>(
    channel: &mut C,
    devices: &[DeviceTarget],
    options: &BatchOptions,
    sink: &mut S,
    cancel: &CancelToken,
) -> Result<BatchReport>
where
    C: Channel + ?Sized,
    S: RecordSink + ?Sized,
{
    let mut report = BatchReport::default();

    for (index, device) in devices.iter().enumerate() {
        info!("[{}/{}] Collecting {}", index + 1, devices.len(), device.host());

        let collected = if cancel.is_cancelled() {
            Err(cancelled(device))
        } else {
            collect_device(channel, device, options, sink, cancel).await
        };
        let outcome = match collected {
            Ok((record, resync_misses)) => {
                sink.append(&record)?;
                info!("OK: {} -> {:?}", device.host(), record);
                DeviceOutcome::Collected {
                    host: device.host().to_string(),
                    record,
                    resync_misses,
                }
            }
            Err(Error::Sink(e)) => return Err(e.into()),
            Err(e) => {
                warn!("Failed on {}: {}", device.host(), e);
                sink.append_error(device.host())?;
                DeviceOutcome::Failed {
                    host: device.host().to_string(),
                    reason: e.to_string(),
                }
            }
        };
        report.outcomes.push(outcome);

        if !cancel.is_cancelled() {
            options.driver.exit_device(channel, cancel).await;
        }
    }

    info!(
        "Batch finished: {} collected, {} failed",
        report.collected(),
        report.failed()
    );
    Ok(report)
}

async fn collect_device<C, S>(
    channel: &mut C,
    device: &DeviceTarget,
    options: &BatchOptions,
    sink: &mut S,
    cancel: &CancelToken,
) -> Result<(DeviceInfoRecord, Vec<ResyncMiss>)>
where
    C: Channel + ?Sized,
    S: RecordSink + ?Sized,
{
    let hop = options
        .negotiator
        .negotiate(channel, device.hop(), cancel)
        .await?;
    let mut misses: Vec<ResyncMiss> = hop.resync_miss.into_iter().collect();

    let redispatch = options
        .driver
        .redispatch(channel, &options.registry, device.device_type(), cancel)
        .await?;
    misses.extend(redispatch.misses);
    if cancel.is_cancelled() {
        return Err(cancelled(device));
    }

    let bundle = options
        .driver
        .run_commands(channel, redispatch.platform, &options.commands, cancel)
        .await;
    if cancel.is_cancelled() {
        return Err(cancelled(device));
    }
    sink.save_raw(device.host(), &bundle)?;

    Ok((extract::extract(&bundle), misses))
}

fn cancelled(device: &DeviceTarget) -> Error {
    HopError::Cancelled {
        host: device.host().to_string(),
    }
    .into()
}

/// Result of parsing one saved log file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Parsed { path: PathBuf, record: DeviceInfoRecord },
    NotFound { path: PathBuf },
}

/// Parse saved log files into records, one row per file.
///
/// Unreadable files still get a row holding the "File not found" sentinel.
pub fn parse_files<P, S>(paths: &[P], sink: &mut S) -> std::result::Result<Vec<FileOutcome>, SinkError>
where
    P: AsRef<Path>,
    S: RecordSink + ?Sized,
{
    let mut outcomes = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        info!("Parsing {}", path.display());
        let record = extract::parse_log_file(path);
        sink.append(&record)?;

        let outcome = if record.is_file_not_found() {
            warn!("File not found: {}", path.display());
            FileOutcome::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            FileOutcome::Parsed {
                path: path.to_path_buf(),
                record,
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ScriptedChannel;
    use crate::extract::RawOutputBundle;

    #[derive(Default)]
    struct MemorySink {
        rows: Vec<DeviceInfoRecord>,
        raw: Vec<(String, usize)>,
    }

    impl RecordSink for MemorySink {
        fn append(&mut self, record: &DeviceInfoRecord) -> std::result::Result<(), SinkError> {
            self.rows.push(record.clone());
            Ok(())
        }

        fn save_raw(
            &mut self,
            host: &str,
            bundle: &RawOutputBundle,
        ) -> std::result::Result<Vec<PathBuf>, SinkError> {
            self.raw.push((host.to_string(), bundle.len()));
            Ok(vec![])
        }
    }

    fn device(host: &str) -> DeviceTarget {
        DeviceTarget::new(
            HopTarget::new(host, "secret").unwrap().with_username("admin"),
            Some("cisco_xr".to_string()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_device_gets_error_row_and_exit() {
        let mut channel = ScriptedChannel::new()
            .after_writes(1, "admin@10.1.1.1's password: ")
            .after_writes(2, "Permission denied, please try again.\r\n");
        let mut sink = MemorySink::default();

        let report = run_batch(
            &mut channel,
            &[device("10.1.1.1")],
            &BatchOptions::default(),
            &mut sink,
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.failed(), 1);
        assert!(!report.outcomes[0].is_collected());
        assert_eq!(sink.rows, [DeviceInfoRecord::error_row("10.1.1.1")]);
        assert!(sink.raw.is_empty());
        assert_eq!(channel.written_lines().last(), Some(&"exit"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_fails_every_device() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut channel = ScriptedChannel::new();
        let mut sink = MemorySink::default();

        let report = run_batch(
            &mut channel,
            &[device("10.1.1.1"), device("10.1.1.2")],
            &BatchOptions::default(),
            &mut sink,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(report.failed(), 2);
        let hosts: Vec<&str> = report.outcomes.iter().map(|o| o.host()).collect();
        assert_eq!(hosts, ["10.1.1.1", "10.1.1.2"]);
        assert_eq!(sink.rows.len(), 2);
        assert!(channel.writes().is_empty());
    }

    /// Fires `cancel` when the given write goes out.
    struct CancelOnWrite {
        inner: ScriptedChannel,
        at_write: usize,
        writes: usize,
        cancel: CancelToken,
    }

    impl Channel for CancelOnWrite {
        async fn read(&mut self) -> std::result::Result<Vec<u8>, crate::error::ChannelError> {
            self.inner.read().await
        }

        async fn write(&mut self, data: &str) -> std::result::Result<(), crate::error::ChannelError> {
            self.writes += 1;
            if self.writes == self.at_write {
                self.cancel.cancel();
            }
            self.inner.write(data).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_collection_fails_the_device() {
        const PROMPT: &str = "RP/0/RSP0/CPU0:R3-STA#";
        let cancel = CancelToken::new();
        // 1 hop, 2 password, 3 redispatch newline, 4-5 terminal setup,
        // 6 first collection command.
        let inner = ScriptedChannel::new()
            .after_writes(1, "admin@10.1.1.1's password: ")
            .after_writes(2, format!("\r\n{PROMPT}"))
            .after_writes(3, format!("\r\n{PROMPT}"))
            .after_writes(4, format!("terminal length 0\r\n{PROMPT}"))
            .after_writes(5, format!("terminal width 511\r\n{PROMPT}"))
            .after_writes(
                6,
                format!("show running-config | include ^hostname\r\nhostname R3-STA\r\n{PROMPT}"),
            );
        let mut channel = CancelOnWrite {
            inner,
            at_write: 6,
            writes: 0,
            cancel: cancel.clone(),
        };
        let mut sink = MemorySink::default();

        let report = run_batch(
            &mut channel,
            &[device("10.1.1.1"), device("10.1.1.2")],
            &BatchOptions::default(),
            &mut sink,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(report.collected(), 0);
        assert!(matches!(
            &report.outcomes[0],
            DeviceOutcome::Failed { host, reason } if host == "10.1.1.1" && reason.contains("cancelled")
        ));
        assert_eq!(
            sink.rows,
            [
                DeviceInfoRecord::error_row("10.1.1.1"),
                DeviceInfoRecord::error_row("10.1.1.2"),
            ]
        );
        assert!(sink.raw.is_empty());

        let lines = channel.inner.written_lines();
        assert_eq!(lines.len(), 6);
        assert!(!lines.contains(&"exit"));
        assert!(!lines.iter().any(|line| line.ends_with("10.1.1.2")));
    }

    #[test]
    fn test_parse_files_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("R3_hostname.txt");
        std::fs::write(&present, "hostname R3-STA\n").unwrap();
        let missing = dir.path().join("R4_hostname.txt");

        let mut sink = MemorySink::default();
        let outcomes = parse_files(&[present.clone(), missing.clone()], &mut sink).unwrap();

        assert!(matches!(&outcomes[0], FileOutcome::Parsed { record, .. } if record.hostname == "R3-STA"));
        assert!(matches!(&outcomes[1], FileOutcome::NotFound { path } if *path == missing));
        assert_eq!(sink.rows.len(), 2);
        assert_eq!(sink.rows[1], DeviceInfoRecord::file_not_found());
    }
}
