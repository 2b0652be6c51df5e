//! Configuration loading for scan-relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`).
//! Every section and field has a default, so a partial file is fine.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for scan-relay.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener and upgrade endpoint configuration.
    pub server: ServerConfig,
    /// Heartbeat monitor configuration.
    pub heartbeat: HeartbeatConfig,
    /// Session reaper configuration.
    pub cleanup: CleanupConfig,
    /// Upstream LLM credential configuration.
    pub llm: LlmConfig,
}

/// Listener and upgrade endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Addresses to listen on. Every listener serves the same router
    /// (default: `["0.0.0.0:3001"]`).
    pub bind_addresses: Vec<String>,
    /// Path accepted for WebSocket upgrades (default: `/ws`).
    pub ws_path: String,
    /// Outbound queue depth per connection (default: 256).
    pub send_queue: usize,
    /// Largest inbound frame accepted, in bytes (default: 1MB).
    pub max_frame_size: usize,
}

/// Heartbeat monitor configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Probe interval in seconds (default: 15).
    pub interval_secs: u64,
    /// Enable the heartbeat monitor (default: true).
    pub enabled: bool,
}

/// Session reaper configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Sweep interval in seconds (default: 300 = 5 minutes).
    pub interval_secs: u64,
    /// Maximum session age in seconds (default: 1800 = 30 minutes).
    pub session_ttl_secs: u64,
    /// Enable the reaper (default: true).
    pub enabled: bool,
}

/// Upstream LLM credential configuration.
///
/// The relay never talks to the LLM itself; this only drives the
/// `llm` flag reported by `/api/health`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key given directly in the file.
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset
    /// (default: `GEMINI_API_KEY`).
    pub api_key_env: String,
}

// Default value functions
fn default_bind_addresses() -> Vec<String> {
    vec!["0.0.0.0:3001".to_string()]
}

fn default_ws_path() -> String {
    crate::protocol::WS_PATH.to_string()
}

fn default_send_queue() -> usize {
    256
}

fn default_max_frame_size() -> usize {
    1024 * 1024 // 1MB
}

fn default_heartbeat_interval() -> u64 {
    15
}

fn default_cleanup_interval() -> u64 {
    5 * 60 // 5 minutes
}

fn default_session_ttl() -> u64 {
    30 * 60 // 30 minutes
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addresses: default_bind_addresses(),
            ws_path: default_ws_path(),
            send_queue: default_send_queue(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_heartbeat_interval(),
            enabled: true,
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
            session_ttl_secs: default_session_ttl(),
            enabled: true,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl HeartbeatConfig {
    /// Probe interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl CleanupConfig {
    /// Sweep interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Session time-to-live as a `Duration`.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl LlmConfig {
    /// Whether an upstream credential is available, from the file or the
    /// environment.
    pub fn credential_configured(&self) -> bool {
        if self.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
            return true;
        }
        std::env::var(&self.api_key_env).is_ok_and(|k| !k.is_empty())
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the relay unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_addresses.is_empty() {
            return Err(ConfigError::Invalid("server.bind_addresses is empty".into()));
        }
        if !self.server.ws_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.ws_path must start with '/': {:?}",
                self.server.ws_path
            )));
        }
        if self.server.send_queue == 0 {
            return Err(ConfigError::Invalid("server.send_queue must be > 0".into()));
        }
        if self.heartbeat.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat.interval_secs must be > 0".into(),
            ));
        }
        if self.cleanup.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "cleanup.interval_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.server.bind_addresses, vec!["0.0.0.0:3001"]);
        assert_eq!(config.server.ws_path, "/ws");
        assert_eq!(config.heartbeat.interval(), Duration::from_secs(15));
        assert_eq!(config.cleanup.interval(), Duration::from_secs(300));
        assert_eq!(config.cleanup.session_ttl(), Duration::from_secs(1800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
bind_addresses = ["127.0.0.1:3001", "127.0.0.1:3002"]
ws_path = "/relay"

[heartbeat]
interval_secs = 5

[cleanup]
interval_secs = 60
session_ttl_secs = 600
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_addresses.len(), 2);
        assert_eq!(config.server.ws_path, "/relay");
        assert_eq!(config.heartbeat.interval_secs, 5);
        assert_eq!(config.cleanup.session_ttl_secs, 600);
        assert_eq!(config.server.send_queue, 256);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.max_frame_size, 1024 * 1024);
        assert!(config.heartbeat.enabled);
        assert!(config.cleanup.enabled);
        assert_eq!(config.llm.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn validate_rejects_bad_ws_path() {
        let mut config = Config::default();
        config.server.ws_path = "ws".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_no_listeners() {
        let mut config = Config::default();
        config.server.bind_addresses.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut config = Config::default();
        config.heartbeat.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cleanup.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nws_path = \"/pair\"").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.ws_path, "/pair");

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "[server]\nws_path = \"pair\"").unwrap();
        assert!(Config::from_file(bad.path()).is_err());
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/relay.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn llm_credential_from_file() {
        let config = LlmConfig {
            api_key: Some("secret".into()),
            api_key_env: "SCAN_RELAY_TEST_UNSET_VAR".into(),
        };
        assert!(config.credential_configured());

        let config = LlmConfig {
            api_key: Some(String::new()),
            api_key_env: "SCAN_RELAY_TEST_UNSET_VAR".into(),
        };
        assert!(!config.credential_configured());
    }
}
