//! # Hopscrape
//!
//! Collect identity and topology facts from network devices that are only
//! reachable through a chain of SSH jump hosts.
//!
//! Hopscrape opens one SSH connection to the first jump host and types
//! every further login into that shell. Each nested login is driven by a
//! prompt negotiation automaton that answers host-key, username and
//! password prompts. Once a device is reached, a fixed set of `show`
//! commands is collected and turned into a small record by ordered
//! pattern chains.
//!
//! ## Features
//!
//! - Async SSH connection to the first hop via russh
//! - Nested hops over a single interactive channel, with typed
//!   non-fatal resync misses
//! - Platform redispatch (Cisco IOS XR, IOS, NX-OS, Linux)
//! - Field extraction that also works on saved log files
//! - CSV records and per-device raw logs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hopscrape::batch::{run_batch, BatchOptions};
//! use hopscrape::config::Inventory;
//! use hopscrape::driver::SessionBuilder;
//! use hopscrape::sink::CsvRecordSink;
//! use hopscrape::CancelToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hopscrape::Error> {
//!     let inventory = Inventory::load("devices.toml")?;
//!     let cancel = CancelToken::new();
//!
//!     let mut session = SessionBuilder::from_inventory(&inventory)?
//!         .connect(&cancel)
//!         .await?;
//!     let mut sink = CsvRecordSink::create(inventory.sink_config())?;
//!
//!     let report = run_batch(
//!         session.channel_mut(),
//!         &inventory.device_targets()?,
//!         &BatchOptions::default(),
//!         &mut sink,
//!         &cancel,
//!     )
//!     .await?;
//!     println!("{} collected, {} failed", report.collected(), report.failed());
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod batch;
mod cancel;
pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod hop;
pub mod platform;
pub mod resync;
pub mod sink;
pub mod transport;

// Re-export main types for convenience
pub use cancel::{CancelToken, ScopedCancel};
pub use error::Error;
pub use extract::{DeviceInfoRecord, RawOutputBundle, extract};
pub use hop::{HopOutcome, HopTarget, Negotiator};
pub use platform::{PlatformDefinition, PlatformRegistry};
pub use resync::{ResyncMiss, ResyncStage};
pub use transport::SshConfig;
