//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use dingbot_client::{DEFAULT_BASE_URL, TokenStrategy};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DingbotConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Outbound group robot settings.
    #[serde(default)]
    pub robot: RobotConfig,

    /// Inbound outgoing-robot server settings.
    #[serde(default)]
    pub outgoing: OutgoingConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Newline-delimited JSON (requires the `json-log` feature).
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Write to `file_path`.
    File,
}

/// How often the log file is rotated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global level; `RUST_LOG` takes precedence when set.
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Log file for [`LogOutput::File`].
    pub file_path: Option<PathBuf>,
    pub rotation: LogRotation,
    /// Rotated files to keep; `0` keeps all.
    pub max_files: usize,
    /// Per-module levels, e.g. `dingbot_client = "debug"`.
    pub filters: HashMap<String, LogLevel>,
    pub span_events: SpanEventConfig,
    pub thread_ids: bool,
    /// Include file and line in each record.
    pub file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            max_files: 5,
            filters: HashMap::new(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
        }
    }
}

// =============================================================================
// Robot
// =============================================================================

/// Outbound group robot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Access tokens; empty disables the client.
    pub tokens: Vec<String>,

    /// Signing secret (`SEC...`) when signature security is enabled.
    pub secret: Option<String>,

    /// Informational working directory.
    pub work_dir: String,

    /// Platform API host.
    pub base_url: String,

    /// Request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Token selection when several are configured.
    pub token_strategy: TokenStrategy,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            secret: None,
            work_dir: ".".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: default_timeout_ms(),
            token_strategy: TokenStrategy::First,
        }
    }
}

impl RobotConfig {
    /// Returns `true` if at least one token is configured.
    pub fn is_configured(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

// =============================================================================
// Outgoing
// =============================================================================

/// Outgoing-robot callback server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingConfig {
    /// Whether the runtime serves callbacks.
    pub enabled: bool,

    /// Host address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Path for the callback endpoint.
    pub path: String,

    /// App secret for `timestamp`/`sign` verification.
    pub app_secret: Option<String>,

    /// Shared token compared against the `token` header.
    pub token: Option<String>,

    /// Allowed clock skew for signed callbacks, in milliseconds.
    pub timestamp_tolerance_ms: u64,
}

impl Default for OutgoingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "0.0.0.0".to_string(),
            port: 8000,
            path: "/outgoing".to_string(),
            app_secret: None,
            token: None,
            timestamp_tolerance_ms: 60 * 60 * 1000,
        }
    }
}

impl OutgoingConfig {
    /// `host:port` to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timestamp_tolerance(&self) -> Duration {
        Duration::from_millis(self.timestamp_tolerance_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DingbotConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(!config.robot.is_configured());
        assert_eq!(config.robot.base_url, "https://oapi.dingtalk.com");
        assert_eq!(config.robot.timeout(), Duration::from_secs(30));
        assert!(!config.outgoing.enabled);
        assert_eq!(config.outgoing.addr(), "0.0.0.0:8000");
        assert_eq!(config.outgoing.timestamp_tolerance(), Duration::from_secs(3600));
    }

    #[test]
    fn test_deserialize_yaml() {
        let yaml = r#"
logging:
  level: debug
  format: pretty
  filters:
    dingbot_client: trace
robot:
  tokens: [a, b]
  secret: SECabc
  token_strategy: round-robin
outgoing:
  enabled: true
  port: 9000
  token: shared
"#;
        let config: DingbotConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(
            config.logging.filters.get("dingbot_client"),
            Some(&LogLevel::Trace)
        );
        assert_eq!(config.robot.tokens, vec!["a", "b"]);
        assert_eq!(config.robot.secret.as_deref(), Some("SECabc"));
        assert_eq!(config.robot.token_strategy, TokenStrategy::RoundRobin);
        assert_eq!(config.robot.work_dir, ".");
        assert!(config.outgoing.enabled);
        assert_eq!(config.outgoing.port, 9000);
        assert_eq!(config.outgoing.path, "/outgoing");
        assert_eq!(config.outgoing.token.as_deref(), Some("shared"));
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let result: Result<LoggingConfig, _> = serde_yaml::from_str("level: loud");
        assert!(result.is_err());
    }
}
