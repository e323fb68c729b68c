//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file extension has no enabled format feature.
    #[error("Unsupported configuration format .{extension}: {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Figment could not merge or extract the layered sources.
    #[error("Failed to extract configuration: {0}")]
    Extract(String),

    /// A value is out of range for its section.
    #[error("Invalid [{section}] configuration: {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid port number: {0}")]
    InvalidPort(u16),
}

impl ConfigError {
    pub fn invalid(section: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            section,
            message: message.into(),
        }
    }

    /// The dotted section the error belongs to, if known.
    pub fn section(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { section, .. } => Some(section),
            Self::MissingField { field } => field.split('.').next(),
            Self::InvalidUrl { .. } => Some("robot"),
            Self::InvalidPort(_) => Some("outgoing"),
            _ => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
