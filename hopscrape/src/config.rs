//! Device inventory loaded from TOML.
//!
//! ```toml
//! [output]
//! csv_path = "cisco_device_info.csv"
//! log_dir = "logs"
//!
//! [jump_host]
//! host = "jump1.example.net"
//! username = "ops"
//! password = "..."                 # or private_key = "/home/ops/.ssh/id_ed25519"
//! welcome_pattern = "(?i)welcome"
//! host_key_verification = "accept_new"
//!
//! [[hops]]
//! host = "jump2.example.net"
//! password = "..."
//!
//! [[devices]]
//! device_type = "cisco_xr"
//! host = "10.1.1.1"
//! username = "admin"
//! password = "..."
//! ```
//!
//! Passwords are held as [`SecretString`] from the moment they are parsed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::batch::DeviceTarget;
use crate::error::ConfigError;
use crate::hop::HopTarget;
use crate::sink::SinkConfig;
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig};

/// Default CSV written by a batch run.
pub const DEFAULT_CSV_PATH: &str = "cisco_device_info.csv";

/// Default directory for per-device raw logs.
pub const DEFAULT_LOG_DIR: &str = "logs";

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Option::<String>::deserialize(deserializer).map(|value| value.map(SecretString::from))
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    30
}

/// The whole inventory file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inventory {
    #[serde(default)]
    pub output: OutputConfig,

    pub jump_host: JumpHostConfig,

    /// Intermediate hops typed into the jump host's shell, in order.
    #[serde(default)]
    pub hops: Vec<HopConfig>,

    /// Devices reached from the last hop, in roster order.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Where records and raw logs are written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_csv_path")]
    pub csv_path: PathBuf,
    #[serde(default = "OutputConfig::default_log_dir")]
    pub log_dir: PathBuf,
}

impl OutputConfig {
    fn default_csv_path() -> PathBuf {
        PathBuf::from(DEFAULT_CSV_PATH)
    }

    fn default_log_dir() -> PathBuf {
        PathBuf::from(DEFAULT_LOG_DIR)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: Self::default_csv_path(),
            log_dir: Self::default_log_dir(),
        }
    }
}

/// The first hop, reached with a real SSH connection.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JumpHostConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,

    /// Password authentication, used when no `private_key` is given.
    #[serde(default, deserialize_with = "optional_secret")]
    pub password: Option<SecretString>,

    #[serde(default)]
    pub private_key: Option<PathBuf>,

    #[serde(default, deserialize_with = "optional_secret")]
    pub passphrase: Option<SecretString>,

    /// Banner to wait for after logging in. Skipped when absent.
    #[serde(default)]
    pub welcome_pattern: Option<String>,

    #[serde(default)]
    pub host_key_verification: HostKeyVerification,

    #[serde(default)]
    pub known_hosts_path: Option<PathBuf>,

    #[serde(default = "default_connect_timeout")]
    pub timeout_secs: u64,
}

impl JumpHostConfig {
    /// SSH configuration for the transport.
    pub fn ssh_config(&self) -> SshConfig {
        let mut config = SshConfig::new(self.host.clone(), self.username.clone(), "")
            .with_auth(self.auth_method());
        config.port = self.port;
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.host_key_verification = self.host_key_verification;
        config.known_hosts_path = self.known_hosts_path.clone();
        config
    }

    /// A private key wins over a password; with neither, `none` is tried.
    pub fn auth_method(&self) -> AuthMethod {
        let copy = |value: &SecretString| SecretString::from(value.expose_secret().to_string());
        match (&self.private_key, &self.password) {
            (Some(path), _) => AuthMethod::PrivateKey {
                path: path.clone(),
                passphrase: self.passphrase.as_ref().map(copy),
            },
            (None, Some(password)) => AuthMethod::Password(copy(password)),
            (None, None) => AuthMethod::None,
        }
    }

    /// Compiled welcome banner pattern.
    pub fn welcome_regex(&self) -> Result<Option<Regex>, ConfigError> {
        self.welcome_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()
    }
}

/// A nested login typed into the current shell.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HopConfig {
    pub host: String,
    #[serde(default)]
    pub username: String,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,

    /// Landing prompt override.
    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl HopConfig {
    pub fn target(&self) -> Result<HopTarget, ConfigError> {
        build_target(
            &self.host,
            &self.username,
            &self.password,
            self.prompt.as_deref(),
            self.timeout_secs,
        )
    }
}

/// One roster entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Platform hint such as `cisco_xr`. Unknown values fall back at
    /// redispatch time.
    #[serde(default)]
    pub device_type: Option<String>,
    pub host: String,
    #[serde(default)]
    pub username: String,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl DeviceConfig {
    pub fn target(&self) -> Result<DeviceTarget, ConfigError> {
        let hop = build_target(
            &self.host,
            &self.username,
            &self.password,
            self.prompt.as_deref(),
            self.timeout_secs,
        )?;
        Ok(DeviceTarget::new(hop, self.device_type.clone()))
    }
}

fn build_target(
    host: &str,
    username: &str,
    password: &SecretString,
    prompt: Option<&str>,
    timeout_secs: Option<u64>,
) -> Result<HopTarget, ConfigError> {
    let mut target = HopTarget::new(host, password.expose_secret())?.with_username(username);
    if let Some(prompt) = prompt {
        target = target.with_prompt(prompt)?;
    }
    if let Some(secs) = timeout_secs {
        target = target.with_timeout(Duration::from_secs(secs));
    }
    Ok(target)
}

impl Inventory {
    /// Read and validate an inventory file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let inventory = Self::parse(&text, path)?;
        debug!(
            "Loaded inventory {}: {} hop(s), {} device(s)",
            path.display(),
            inventory.hops.len(),
            inventory.devices.len()
        );
        Ok(inventory)
    }

    /// Parse and validate inventory text. `origin` is only used in errors.
    pub fn parse(text: &str, origin: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let inventory: Inventory = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.as_ref().to_path_buf(),
            source,
        })?;
        inventory.validate()?;
        Ok(inventory)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jump_host.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "jump_host.host must not be empty".to_string(),
            });
        }
        self.jump_host.welcome_regex()?;
        self.hop_targets()?;
        self.device_targets()?;
        if self.devices.is_empty() {
            warn!("Inventory has no devices");
        }
        Ok(())
    }

    /// Targets for the intermediate hops, in order.
    pub fn hop_targets(&self) -> Result<Vec<HopTarget>, ConfigError> {
        self.hops.iter().map(HopConfig::target).collect()
    }

    /// Targets for the roster, in order.
    pub fn device_targets(&self) -> Result<Vec<DeviceTarget>, ConfigError> {
        self.devices.iter().map(DeviceConfig::target).collect()
    }

    /// Record sink configuration.
    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig::new(&self.output.csv_path, &self.output.log_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INVENTORY: &str = r#"
[output]
csv_path = "out/devices.csv"

[jump_host]
host = "jump1.example.net"
username = "ops"
password = "jump-secret"
welcome_pattern = "(?i)welcome"
host_key_verification = "disabled"

[[hops]]
host = "jump2.example.net"
password = "hop-secret"

[[devices]]
device_type = "cisco_xr"
host = "10.1.1.1"
username = "admin"
password = "dev-secret"

[[devices]]
host = "10.1.1.2"
username = "admin"
password = "dev-secret"
timeout_secs = 20
"#;

    #[test]
    fn test_parse_inventory() {
        let inventory = Inventory::parse(INVENTORY, "devices.toml").unwrap();

        assert_eq!(inventory.output.csv_path, PathBuf::from("out/devices.csv"));
        assert_eq!(inventory.output.log_dir, PathBuf::from(DEFAULT_LOG_DIR));
        assert_eq!(inventory.jump_host.port, 22);
        assert_eq!(
            inventory.jump_host.host_key_verification,
            HostKeyVerification::Disabled
        );
        assert!(inventory.jump_host.welcome_regex().unwrap().is_some());

        let hops = inventory.hop_targets().unwrap();
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].host(), "jump2.example.net");
        assert_eq!(hops[0].username(), "");

        let devices = inventory.device_targets().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].device_type(), Some("cisco_xr"));
        assert_eq!(devices[1].device_type(), None);
        assert_eq!(devices[1].hop().timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_output_defaults() {
        let output = OutputConfig::default();
        assert_eq!(output.csv_path, PathBuf::from("cisco_device_info.csv"));
        assert_eq!(output.log_dir, PathBuf::from(DEFAULT_LOG_DIR));
    }

    #[test]
    fn test_passwords_not_in_debug() {
        let inventory = Inventory::parse(INVENTORY, "devices.toml").unwrap();
        let debug = format!("{:?}", inventory);
        assert!(!debug.contains("jump-secret"));
        assert!(!debug.contains("dev-secret"));
    }

    #[test]
    fn test_ssh_config() {
        let inventory = Inventory::parse(INVENTORY, "devices.toml").unwrap();
        let ssh = inventory.jump_host.ssh_config();
        assert_eq!(ssh.socket_addr(), "jump1.example.net:22");
        assert_eq!(ssh.username, "ops");
        assert!(matches!(&ssh.auth, AuthMethod::Password(p) if p.expose_secret() == "jump-secret"));
    }

    #[test]
    fn test_private_key_preferred_over_password() {
        let text = INVENTORY.replace(
            "password = \"jump-secret\"",
            "password = \"jump-secret\"\nprivate_key = \"/home/ops/.ssh/id_ed25519\"",
        );
        let inventory = Inventory::parse(&text, "devices.toml").unwrap();
        assert!(matches!(
            inventory.jump_host.auth_method(),
            AuthMethod::PrivateKey { ref path, passphrase: None } if path == Path::new("/home/ops/.ssh/id_ed25519")
        ));
    }

    #[test]
    fn test_no_credentials_means_none_auth() {
        let text = INVENTORY.replace("password = \"jump-secret\"\n", "");
        let inventory = Inventory::parse(&text, "devices.toml").unwrap();
        assert!(matches!(inventory.jump_host.auth_method(), AuthMethod::None));
    }

    #[test]
    fn test_empty_device_host_rejected() {
        let text = INVENTORY.replace("host = \"10.1.1.2\"", "host = \"\"");
        let err = Inventory::parse(&text, "devices.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_bad_welcome_pattern_rejected() {
        let text = INVENTORY.replace("(?i)welcome", "(unclosed");
        let err = Inventory::parse(&text, "devices.toml").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let text = format!("{INVENTORY}\nunexpected = true\n");
        let err = Inventory::parse(&text, "devices.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Inventory::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INVENTORY.as_bytes()).unwrap();
        let inventory = Inventory::load(file.path()).unwrap();
        assert_eq!(inventory.devices.len(), 2);
        assert_eq!(
            inventory.sink_config().csv_path(),
            Path::new("out/devices.csv")
        );
    }
}
