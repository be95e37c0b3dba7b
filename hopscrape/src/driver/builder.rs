//! Builder for the jump-host session a batch runs in.

use log::info;
use regex::bytes::Regex;

use super::command::CommandDriver;
use crate::cancel::CancelToken;
use crate::config::Inventory;
use crate::error::{ConfigError, Result};
use crate::hop::{HopOutcome, HopTarget, Negotiator};
use crate::resync::ResyncMiss;
use crate::transport::{SshChannel, SshConfig, SshTransport};

/// Builder for connecting to the first jump host and walking the
/// intermediate hops.
///
/// # Example
///
/// ```rust,no_run
/// use hopscrape::driver::SessionBuilder;
/// use hopscrape::transport::SshConfig;
/// use hopscrape::{CancelToken, HopTarget};
///
/// # async fn example() -> Result<(), hopscrape::Error> {
/// let session = SessionBuilder::new(SshConfig::new("jump1.example.net", "ops", "secret"))
///     .hop(HopTarget::new("jump2.example.net", "secret")?)
///     .connect(&CancelToken::new())
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    ssh: SshConfig,
    welcome: Option<Regex>,
    hops: Vec<HopTarget>,
    negotiator: Negotiator,
    driver: CommandDriver,
}

impl SessionBuilder {
    pub fn new(ssh: SshConfig) -> Self {
        Self {
            ssh,
            welcome: None,
            hops: Vec::new(),
            negotiator: Negotiator::default(),
            driver: CommandDriver::default(),
        }
    }

    /// Jump host connection and hop chain from an inventory.
    pub fn from_inventory(inventory: &Inventory) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(inventory.jump_host.ssh_config())
            .welcome_pattern(inventory.jump_host.welcome_regex()?)
            .hops(inventory.hop_targets()?))
    }

    /// Banner to wait for after logging in.
    pub fn welcome_pattern(mut self, pattern: Option<Regex>) -> Self {
        self.welcome = pattern;
        self
    }

    /// Add an intermediate hop. Hops are taken in the order added.
    pub fn hop(mut self, target: HopTarget) -> Self {
        self.hops.push(target);
        self
    }

    pub fn hops(mut self, targets: impl IntoIterator<Item = HopTarget>) -> Self {
        self.hops.extend(targets);
        self
    }

    pub fn negotiator(mut self, negotiator: Negotiator) -> Self {
        self.negotiator = negotiator;
        self
    }

    pub fn driver(mut self, driver: CommandDriver) -> Self {
        self.driver = driver;
        self
    }

    /// Connect, sync on the jump host's shell and negotiate every hop.
    pub async fn connect(self, cancel: &CancelToken) -> Result<JumpSession> {
        info!("Connecting to jump host {}", self.ssh.host);
        let transport = SshTransport::connect(self.ssh).await?;
        let mut channel = transport.open_channel().await?;

        let mut misses = self
            .driver
            .sync_jump_login(&mut channel, self.welcome.as_ref(), cancel)
            .await;

        let mut hops = Vec::with_capacity(self.hops.len());
        for target in &self.hops {
            let outcome = self.negotiator.negotiate(&mut channel, target, cancel).await?;
            misses.extend(outcome.resync_miss.clone());
            hops.push(outcome);
        }
        info!("Session ready after {} hop(s)", hops.len());

        Ok(JumpSession {
            transport,
            channel,
            misses,
            hops,
        })
    }
}

/// A connected shell sitting at the last configured hop.
pub struct JumpSession {
    transport: SshTransport,
    channel: SshChannel,

    /// Resyncs that missed while setting the session up.
    pub misses: Vec<ResyncMiss>,

    pub hops: Vec<HopOutcome>,
}

impl JumpSession {
    pub fn channel_mut(&mut self) -> &mut SshChannel {
        &mut self.channel
    }

    /// Disconnect from the jump host.
    pub async fn close(self) -> Result<()> {
        self.transport.close().await
    }
}
