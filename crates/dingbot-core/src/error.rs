//! Unified error types for the dingbot toolkit.
//!
//! Every fallible operation in the client and the outgoing dispatcher returns
//! [`Error`]. The variants are grouped by where the failure is detected:
//! locally before any I/O (`Configuration`, `Validation`), on the wire
//! (`Transport`, `Http`, `Platform`), or on the inbound side
//! (`Authentication`, `Usage`).

use thiserror::Error;

// =============================================================================
// Error
// =============================================================================

/// Errors produced while building, sending or receiving robot messages.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The client or dispatcher was set up inconsistently.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A message or option failed validation before being sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// The HTTP call itself failed (DNS, connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The platform answered with a non-2xx HTTP status.
    #[error("HTTP {status} error: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body, if any.
        body: String,
    },

    /// The platform answered with a non-zero `errcode`.
    #[error("platform error ({code}): {message}")]
    Platform {
        /// The `errcode` field of the response.
        code: i64,
        /// The `errmsg` field of the response.
        message: String,
    },

    /// An inbound request carried a missing or wrong signature/token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// An inbound command was found but invoked incorrectly.
    #[error("usage error: {0}")]
    Usage(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates an authentication error.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Creates a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result type for dingbot operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_display() {
        let err = Error::Platform {
            code: 300001,
            message: "token is not exist".into(),
        };
        assert_eq!(err.to_string(), "platform error (300001): token is not exist");
    }
}
