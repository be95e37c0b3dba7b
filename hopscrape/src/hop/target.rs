//! Hop targets and the command line that starts a hop.

use std::fmt;
use std::time::Duration;

use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::channel::DEFAULT_LANDING_PROMPT;
use crate::error::ConfigError;

/// Connection parameters for one nested SSH login.
///
/// Built once and borrowed by the negotiator for the duration of the hop.
pub struct HopTarget {
    host: String,
    username: String,
    password: SecretString,
    prompt: Regex,
    timeout: Duration,
}

impl HopTarget {
    /// Default bound on a whole hop negotiation.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

    /// Create a hop target with no username, the default landing prompt and
    /// the default timeout.
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "hop host must not be empty".to_string(),
            });
        }

        Ok(Self {
            host,
            username: String::new(),
            password: SecretString::from(password.into()),
            prompt: default_prompt(),
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    /// Set the username. An empty username answers a username prompt with
    /// an empty line and omits `-l` from the hop command.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Override the landing prompt pattern.
    pub fn with_prompt(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.prompt = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(self)
    }

    /// Override the hop deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }

    pub fn prompt(&self) -> &Regex {
        &self.prompt
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for HopTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HopTarget")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .field("prompt", &self.prompt.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn default_prompt() -> Regex {
    Regex::new(DEFAULT_LANDING_PROMPT).expect("default landing prompt is a valid regex")
}

/// OpenSSH invocation typed into the current shell to start a hop.
///
/// The defaults force password authentication with a single attempt and
/// re-enable the legacy key exchange and host key algorithms older network
/// gear still needs.
#[derive(Debug, Clone)]
pub struct HopCommand {
    program: String,
    options: Vec<String>,
}

impl HopCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            options: Vec::new(),
        }
    }

    /// Append an `-o` option such as `ConnectTimeout=8`.
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    /// Render the command line for `target`.
    pub fn render(&self, target: &HopTarget) -> String {
        let mut line = format!("{} -tt", self.program);
        for option in &self.options {
            line.push_str(" -o ");
            line.push_str(option);
        }
        if !target.username().is_empty() {
            line.push_str(" -l ");
            line.push_str(target.username());
        }
        line.push(' ');
        line.push_str(target.host());
        line
    }
}

impl Default for HopCommand {
    fn default() -> Self {
        Self::new("ssh")
            .with_option("StrictHostKeyChecking=no")
            .with_option("UserKnownHostsFile=/dev/null")
            .with_option("PreferredAuthentications=password")
            .with_option("PubkeyAuthentication=no")
            .with_option("NumberOfPasswordPrompts=1")
            .with_option("ConnectTimeout=8")
            .with_option(
                "KexAlgorithms=+diffie-hellman-group14-sha1,diffie-hellman-group-exchange-sha1,diffie-hellman-group1-sha1",
            )
            .with_option("HostkeyAlgorithms=+ssh-rsa")
            .with_option("PubkeyAcceptedKeyTypes=+ssh-rsa")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_host_rejected() {
        assert!(matches!(
            HopTarget::new("  ", "secret"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_invalid_prompt_rejected() {
        let err = HopTarget::new("10.1.1.1", "secret")
            .unwrap()
            .with_prompt("([")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_render_with_username() {
        let target = HopTarget::new("10.1.1.1", "secret")
            .unwrap()
            .with_username("admin");
        let line = HopCommand::new("ssh")
            .with_option("ConnectTimeout=8")
            .render(&target);
        assert_eq!(line, "ssh -tt -o ConnectTimeout=8 -l admin 10.1.1.1");
    }

    #[test]
    fn test_render_without_username_omits_login_flag() {
        let target = HopTarget::new("10.1.1.1", "secret").unwrap();
        let line = HopCommand::default().render(&target);
        assert!(line.starts_with("ssh -tt -o StrictHostKeyChecking=no"));
        assert!(line.contains("-o NumberOfPasswordPrompts=1"));
        assert!(!line.contains(" -l "));
        assert!(line.ends_with(" 10.1.1.1"));
    }

    #[test]
    fn test_debug_hides_password() {
        let target = HopTarget::new("10.1.1.1", "hunter2").unwrap();
        let debug = format!("{:?}", target);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<hidden>"));
    }
}
