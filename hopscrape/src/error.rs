//! Error types for hopscrape.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for hopscrape operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Hop negotiation errors
    #[error("Hop error: {0}")]
    Hop(#[from] HopError),

    /// Inventory / configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Record sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Transport layer errors (SSH connection to the first jump host).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key is not in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Channel closed by the remote end
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(#[from] russh::Error),
}

/// Failures of one hop negotiation. Every variant aborts the current device.
#[derive(Error, Debug)]
pub enum HopError {
    /// The remote printed "permission denied"
    #[error("Permission denied during hop to {host}")]
    AuthenticationFailed { host: String },

    /// No recognizer fired before the hop deadline
    #[error("Timed out after {timeout:?} waiting for a prompt or credential request from {host}")]
    NegotiationTimeout { host: String, timeout: Duration },

    /// The hop was cancelled through its [`CancelToken`](crate::CancelToken)
    #[error("Hop to {host} cancelled")]
    Cancelled { host: String },

    /// Transport failure while negotiating
    #[error("Channel failure during hop: {0}")]
    Channel(#[from] ChannelError),
}

/// Inventory and option validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The inventory file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The inventory file is not valid TOML for the expected schema
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value failed validation
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// A configured prompt pattern does not compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Record sink I/O errors.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Writing the tabular output failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using hopscrape's Error.
pub type Result<T> = std::result::Result<T, Error>;
