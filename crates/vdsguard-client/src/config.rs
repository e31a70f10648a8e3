//! Client configuration
//!
//! Connection settings for the Dremio REST SQL surface.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

fn default_port() -> u16 {
    9047
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    500
}

fn default_poll_budget() -> u64 {
    120
}

/// Configuration for a [`crate::DremioClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Hostname of the coordinator (no scheme, no port).
    pub host: String,

    /// Principal the tool connects and issues DDL as.
    pub username: String,

    /// Password for `username`. Never logged; see [`ClientConfig::redacted`].
    pub password: String,

    /// REST API port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Use HTTPS instead of HTTP.
    #[serde(default)]
    pub tls: bool,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-request read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Interval between job-state polls, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Total time budget for a single job to complete, in seconds.
    #[serde(default = "default_poll_budget")]
    pub poll_budget_secs: u64,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the credentials.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            port: default_port(),
            tls: false,
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            poll_interval_ms: default_poll_interval(),
            poll_budget_secs: default_poll_budget(),
        }
    }

    /// Set the REST port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable HTTPS.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Set the job poll interval in milliseconds.
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the job completion budget in seconds.
    pub fn with_poll_budget_secs(mut self, secs: u64) -> Self {
        self.poll_budget_secs = secs;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::InvalidConfiguration {
                message: "host must not be empty".to_string(),
            });
        }
        if self.username.trim().is_empty() {
            return Err(ClientError::InvalidConfiguration {
                message: "username must not be empty".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ClientError::InvalidConfiguration {
                message: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Base URL for REST requests.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// A copy safe to log: the password is masked.
    pub fn redacted(&self) -> Self {
        Self {
            password: "***".to_string(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_scheme_and_port() {
        let config = ClientConfig::new("dremio.example.com", "admin", "secret");
        assert_eq!(config.base_url(), "http://dremio.example.com:9047");

        let config = config.with_tls(true).with_port(443);
        assert_eq!(config.base_url(), "https://dremio.example.com:443");
    }

    #[test]
    fn validate_rejects_empty_host() {
        let config = ClientConfig::new("", "admin", "secret");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let config = ClientConfig::new("h", "admin", "secret").with_poll_interval_ms(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn redacted_masks_password() {
        let config = ClientConfig::new("h", "admin", "secret");
        let redacted = config.redacted();
        assert_eq!(redacted.password, "***");
        assert_eq!(redacted.username, "admin");
    }
}
