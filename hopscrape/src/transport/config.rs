//! SSH connection configuration for the first jump host.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. The nested hops run with
    /// `StrictHostKeyChecking=no` as well, so lab inventories use this.
    Disabled,
}

impl fmt::Display for HostKeyVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostKeyVerification::Strict => "strict",
            HostKeyVerification::AcceptNew => "accept_new",
            HostKeyVerification::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

/// How to authenticate to the jump host.
#[derive(Debug)]
pub enum AuthMethod {
    /// No authentication. Only useful against lab servers.
    None,

    Password(SecretString),

    /// Private key from a file, optionally encrypted.
    PrivateKey {
        path: PathBuf,
        passphrase: Option<SecretString>,
    },
}

/// SSH connection configuration.
#[derive(Debug)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    pub username: String,

    pub auth: AuthMethod,

    /// Connection and inactivity timeout.
    pub timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// How long a channel read waits for the first chunk.
    pub drain_window: Duration,

    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file. `None` uses the user's default.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Configuration using password authentication.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth: AuthMethod::Password(SecretString::from(password.into())),
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            drain_window: Duration::from_millis(50),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let config = SshConfig::new("jump1.example.net", "ops", "hunter2");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert_eq!(config.socket_addr(), "jump1.example.net:22");
    }

    #[test]
    fn test_key_auth_hides_passphrase() {
        let config = SshConfig::new("jump1.example.net", "ops", "").with_auth(AuthMethod::PrivateKey {
            path: PathBuf::from("/home/ops/.ssh/id_ed25519"),
            passphrase: Some(SecretString::from("unlock-me".to_string())),
        });
        let debug = format!("{:?}", config);
        assert!(debug.contains("id_ed25519"));
        assert!(!debug.contains("unlock-me"));
    }

    #[test]
    fn test_host_key_verification_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: HostKeyVerification,
        }
        let w: Wrapper = toml::from_str("mode = \"accept_new\"").unwrap();
        assert_eq!(w.mode, HostKeyVerification::AcceptNew);
        let w: Wrapper = toml::from_str("mode = \"disabled\"").unwrap();
        assert_eq!(w.mode, HostKeyVerification::Disabled);
    }
}
