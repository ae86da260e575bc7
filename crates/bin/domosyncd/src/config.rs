//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `domosync.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::time::Duration;

use domosync_app::ports::Credentials;
use domosync_app::reconciler::MissingPolicy;
use domosync_app::services::hub::HubOptions;
use domosync_app::services::session_manager::SessionOptions;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hub connection settings.
    pub hub: HubConfig,
    /// Reconciliation settings.
    pub sync: SyncConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Which [`HubTransport`](domosync_app::ports::HubTransport) to wire in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// A real hub over HTTP.
    Http,
    /// The in-memory demo hub.
    Virtual,
}

impl std::str::FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "virtual" => Ok(Self::Virtual),
            other => Err(ConfigError::Validation(format!(
                "unknown transport {other:?}, expected \"http\" or \"virtual\""
            ))),
        }
    }
}

/// Hub connection configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub transport: TransportKind,
    /// Hub address, `host[:port]`.
    pub host: String,
    pub username: String,
    pub password: String,
    /// Upper bound for a single request, in seconds.
    pub timeout_secs: u64,
}

/// Reconciliation configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_secs: u64,
    /// What happens to a device absent from a fetch.
    pub missing_policy: MissingPolicy,
    /// Log in again once when the hub drops the session.
    pub reauth_on_expiry: bool,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `domosync.toml` (if present), apply
    /// environment-variable overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("domosync.toml")?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("DOMOSYNC_TRANSPORT") {
            self.hub.transport = val.parse()?;
        }
        if let Ok(val) = std::env::var("DOMOSYNC_HOST") {
            self.hub.host = val;
        }
        if let Ok(val) = std::env::var("DOMOSYNC_USERNAME") {
            self.hub.username = val;
        }
        if let Ok(val) = std::env::var("DOMOSYNC_PASSWORD") {
            self.hub.password = val;
        }
        if let Ok(val) = std::env::var("DOMOSYNC_POLL_INTERVAL_SECS")
            && let Ok(secs) = val.parse()
        {
            self.sync.poll_interval_secs = secs;
        }
        if let Ok(val) = std::env::var("DOMOSYNC_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.transport == TransportKind::Http {
            if self.hub.host.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "hub.host is required for the http transport".to_string(),
                ));
            }
            if self.hub.username.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "hub.username is required for the http transport".to_string(),
                ));
            }
        }
        if self.hub.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "hub.timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.sync.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sync.poll_interval_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.hub.username, &self.hub.password)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.hub.timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs)
    }

    #[must_use]
    pub fn hub_options(&self) -> HubOptions {
        HubOptions {
            session: SessionOptions {
                timeout: self.timeout(),
                reauth_on_expiry: self.sync.reauth_on_expiry,
            },
            missing_policy: self.sync.missing_policy,
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Virtual,
            host: String::new(),
            username: "admin".to_string(),
            password: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            missing_policy: MissingPolicy::default(),
            reauth_on_expiry: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "domosyncd=info,domosync_app=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
