//! hopscrape command line.
//!
//! ```bash
//! # Connect through the jump hosts and collect every device
//! hopscrape collect --inventory devices.toml
//!
//! # Re-parse saved logs into a fresh CSV
//! hopscrape parse logs/*_version.txt --csv parsed.csv
//!
//! # Interactive connect / collect / exit menu
//! hopscrape menu --inventory devices.toml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use hopscrape::batch::{self, BatchOptions, BatchReport, DeviceOutcome, FileOutcome};
use hopscrape::config::{DEFAULT_CSV_PATH, DEFAULT_LOG_DIR, Inventory};
use hopscrape::driver::{JumpSession, SessionBuilder};
use hopscrape::sink::{CsvRecordSink, SinkConfig};
use hopscrape::{CancelToken, ScopedCancel};

/// Collect device facts through SSH jump hosts.
#[derive(Parser)]
#[command(name = "hopscrape", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// CSV file to write (overrides the inventory).
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Directory for raw per-device logs (overrides the inventory).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to the jump host, walk the hops and collect every device.
    Collect {
        /// Inventory file.
        #[arg(long, short)]
        inventory: PathBuf,
    },

    /// Parse saved log files into records.
    Parse {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Interactive connect / collect / exit menu.
    Menu {
        /// Inventory file.
        #[arg(long, short)]
        inventory: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Collect { inventory } => collect(&cli, inventory).await,
        Command::Parse { files } => parse(&cli, files),
        Command::Menu { inventory } => menu(&cli, inventory).await,
    }
}

/// Cancellation for one action, fired by Ctrl-C.
fn on_interrupt() -> ScopedCancel {
    ScopedCancel::arm(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => eprintln!("[!] Interrupted, abandoning the current device"),
            Err(e) => {
                log::warn!("Ctrl-C handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    })
}

/// Sink configuration from the inventory (if any) with CLI overrides.
fn sink_config(cli: &Cli, inventory: Option<&Inventory>) -> SinkConfig {
    let mut config = inventory
        .map(Inventory::sink_config)
        .unwrap_or_else(|| SinkConfig::new(DEFAULT_CSV_PATH, DEFAULT_LOG_DIR));
    if let Some(csv) = &cli.csv {
        config = config.with_csv_path(csv);
    }
    if let Some(dir) = &cli.log_dir {
        config = config.with_log_dir(dir);
    }
    config
}

fn load_inventory(path: &Path) -> Result<Inventory> {
    Inventory::load(path).with_context(|| format!("loading inventory {}", path.display()))
}

async fn connect(inventory: &Inventory, cancel: &CancelToken) -> Result<JumpSession> {
    println!("[*] Connecting to jump host {}", inventory.jump_host.host);
    let session = SessionBuilder::from_inventory(inventory)?
        .connect(cancel)
        .await
        .context("connecting to the jump host")?;
    for miss in &session.misses {
        println!("[!] {}", miss);
    }
    println!("[+] Connected after {} hop(s)", session.hops.len());
    Ok(session)
}

async fn collect_devices(
    session: &mut JumpSession,
    inventory: &Inventory,
    config: SinkConfig,
    cancel: &CancelToken,
) -> Result<BatchReport> {
    let devices = inventory.device_targets()?;
    let csv_path = config.csv_path().to_path_buf();
    let log_dir = config.log_dir().to_path_buf();
    let mut sink = CsvRecordSink::create(config)?;

    let report = batch::run_batch(
        session.channel_mut(),
        &devices,
        &BatchOptions::default(),
        &mut sink,
        cancel,
    )
    .await?;

    for outcome in &report.outcomes {
        match outcome {
            DeviceOutcome::Collected { host, record, .. } => println!(
                "[+] OK: {} -> {}, {}, {}, {}",
                host, record.hostname, record.loopback0_ip, record.platform, record.version
            ),
            DeviceOutcome::Failed { host, reason } => println!("[-] Failed on {}: {}", host, reason),
        }
    }
    println!(
        "\n[+] Done: {} collected, {} failed. See {} and {}/",
        report.collected(),
        report.failed(),
        csv_path.display(),
        log_dir.display()
    );
    Ok(report)
}

async fn collect(cli: &Cli, path: &Path) -> Result<()> {
    let inventory = load_inventory(path)?;
    let config = sink_config(cli, Some(&inventory));

    let interrupt = on_interrupt();
    let mut session = connect(&inventory, interrupt.token()).await?;
    collect_devices(&mut session, &inventory, config, interrupt.token()).await?;
    session.close().await?;
    Ok(())
}

fn parse(cli: &Cli, files: &[PathBuf]) -> Result<()> {
    let config = sink_config(cli, None);
    let csv_path = config.csv_path().to_path_buf();
    let mut sink = CsvRecordSink::create(config)?;

    for outcome in batch::parse_files(files, &mut sink)? {
        match outcome {
            FileOutcome::Parsed { path, record } => {
                println!("[*] Parsed {}: {:?}", path.display(), record)
            }
            FileOutcome::NotFound { path } => println!("[-] File not found: {}", path.display()),
        }
    }
    println!("\n[+] Parsing finished. See {}", csv_path.display());
    Ok(())
}

async fn menu(cli: &Cli, path: &Path) -> Result<()> {
    let inventory = load_inventory(path)?;
    let mut session: Option<JumpSession> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!();
        println!("1. Connect to the jump host");
        println!("2. Collect device information");
        println!("3. Exit");
        println!("-------------------------------------------------");
        println!("Choose (1/2/3):");

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        match line.trim() {
            "1" => {
                if session.is_some() {
                    println!("[!] Already connected.");
                    continue;
                }
                let interrupt = on_interrupt();
                match connect(&inventory, interrupt.token()).await {
                    Ok(connected) => session = Some(connected),
                    Err(e) => println!("[-] Could not connect: {:#}", e),
                }
            }
            "2" => {
                let Some(active) = session.as_mut() else {
                    println!("[-] Not connected yet (choose 1 first).");
                    continue;
                };
                let config = sink_config(cli, Some(&inventory));
                let interrupt = on_interrupt();
                if let Err(e) = collect_devices(active, &inventory, config, interrupt.token()).await {
                    println!("[-] Collection stopped: {:#}", e);
                }
                if interrupt.token().is_cancelled() {
                    // The shell may still be inside a device.
                    println!("[!] Collection interrupted, disconnecting (choose 1 to reconnect).");
                    if let Some(stale) = session.take() {
                        if let Err(e) = stale.close().await {
                            println!("[-] Disconnect failed: {:#}", e);
                        }
                    }
                }
            }
            "3" => break,
            other => println!("[!] Unknown choice '{}'", other),
        }
    }

    if let Some(active) = session {
        active.close().await?;
    }
    Ok(())
}
