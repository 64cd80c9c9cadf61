//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the `send` mediator's outbound HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendConfig {
    /// Whole-request timeout in seconds, including reading the body.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// User agent sent when the inbound message carried none.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> f64 {
    30.0
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("minisynapse/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

impl SendConfig {
    /// Creates a new send configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Gets timeout as Duration.
    ///
    /// Non-finite or negative values fall back to the default.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_timeout()))
    }

    /// Builds the shared HTTP client used by every `send` mediator.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects))
            .build()
    }
}

/// Process-wide logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `minisynapse=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding sequence definitions.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    /// Sequence used for every inbound message.
    #[serde(default = "default_sequence")]
    pub default_sequence: String,
    /// Outbound client settings.
    #[serde(default)]
    pub send: SendConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("config")
}

fn default_sequence() -> String {
    "main".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            default_sequence: default_sequence(),
            send: SendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration rooted at a definitions directory.
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the default sequence name.
    #[must_use]
    pub fn with_default_sequence(mut self, name: impl Into<String>) -> Self {
        self.default_sequence = name.into();
        self
    }

    /// Sets the outbound client settings.
    #[must_use]
    pub fn with_send(mut self, send: SendConfig) -> Self {
        self.send = send;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_defaults() {
        let config = SendConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_redirects, 10);
        assert!(config.user_agent.starts_with("minisynapse/"));
    }

    #[test]
    fn test_send_timeout_guards_bad_values() {
        assert_eq!(SendConfig::new().with_timeout(-1.0).timeout(), Duration::from_secs(30));
        assert_eq!(SendConfig::new().with_timeout(0.25).timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_engine_config_from_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"default_sequence": "proxy", "send": {"timeout_seconds": 5}}"#).unwrap();

        assert_eq!(config.default_sequence, "proxy");
        assert_eq!(config.config_dir, PathBuf::from("config"));
        assert_eq!(config.send.timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_build_client() {
        assert!(SendConfig::default().build_client().is_ok());
    }
}
