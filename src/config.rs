//! Monitor configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via BABELHELPER_CONFIG)
//! 3. Environment variables

use babelhelper_client::ConnectionConfig;
use babelhelper_protocol::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Monitor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Daemon connection settings.
    pub daemon: DaemonConfig,
    /// Reconnect settings.
    pub reconnect: ReconnectConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("BABELHELPER_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.daemon.apply_env_overrides();
        self.reconnect.apply_env_overrides();
    }

    /// Rejects settings the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.port == 0 {
            return Err(ConfigError::ValidationError(
                "daemon.port must not be 0".to_string(),
            ));
        }
        if self.reconnect.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "reconnect.interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Daemon connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Address the daemon listens on.
    pub host: IpAddr,
    /// Control port.
    pub port: u16,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds. Unset means wait for events indefinitely.
    pub read_timeout_secs: Option<u64>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V6(Ipv6Addr::LOCALHOST),
            port: DEFAULT_PORT,
            connect_timeout_secs: 10,
            read_timeout_secs: None,
        }
    }
}

impl DaemonConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("BABELHELPER_HOST") {
            if let Ok(parsed) = host.parse() {
                self.host = parsed;
            }
        }

        if let Ok(port) = std::env::var("BABELHELPER_PORT") {
            if let Ok(parsed) = port.parse() {
                self.port = parsed;
            }
        }

        if let Ok(timeout) = std::env::var("BABELHELPER_CONNECT_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.connect_timeout_secs = secs;
            }
        }
    }

    /// Returns the daemon's socket address.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Builds the client connection configuration.
    pub fn connection_config(&self) -> ConnectionConfig {
        let config = ConnectionConfig::new(self.addr())
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs));
        match self.read_timeout_secs {
            Some(secs) => config.with_read_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }
}

/// Reconnect settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay between a lost connection and the next attempt, in seconds.
    pub interval_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl ReconnectConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(interval) = std::env::var("BABELHELPER_RETRY_SECS") {
            if let Ok(secs) = interval.parse() {
                self.interval_secs = secs;
            }
        }
    }

    /// Returns the reconnect delay as Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.daemon.addr(), "[::1]:33123".parse().unwrap());
        assert_eq!(config.reconnect.interval(), Duration::from_secs(5));
        assert!(config.validate().is_ok());

        let conn = config.daemon.connection_config();
        assert_eq!(conn.connect_timeout, Duration::from_secs(10));
        assert_eq!(conn.read_timeout, None);
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "daemon:\n  host: 127.0.0.1\n  port: 33124\n  read_timeout_secs: 30\nreconnect:\n  interval_secs: 2"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.daemon.addr(), "127.0.0.1:33124".parse().unwrap());
        assert_eq!(config.daemon.connect_timeout_secs, 10);
        assert_eq!(config.reconnect.interval_secs, 2);
        assert_eq!(
            config.daemon.connection_config().read_timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_from_file_errors() {
        let missing = Config::from_file("/nonexistent/babelhelper.yaml");
        assert!(matches!(missing, Err(ConfigError::IoError(..))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "daemon: [not, a, map]").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.reconnect.interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = Config::default();
        config.daemon.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.daemon.addr(), config.daemon.addr());
    }
}
