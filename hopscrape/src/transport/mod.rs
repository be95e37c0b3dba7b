//! SSH transport to the first jump host, wrapping russh.
//!
//! Only the first hop is a real SSH client connection. Every hop after it
//! is typed into the shell this transport opens, so the rest of the crate
//! only sees the [`SshChannel`] through the [`Channel`](crate::channel::Channel)
//! trait.

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::{SshChannel, SshTransport};
