//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The robot client could not be built.
    #[error("Robot client error: {0}")]
    Client(#[from] dingbot_core::Error),

    /// No robot tokens are configured.
    #[error("Robot is not configured: set robot.tokens")]
    RobotNotConfigured,

    /// The outgoing server failed to bind or serve.
    #[error("Outgoing server error: {0}")]
    Server(#[from] std::io::Error),

    /// The outgoing server task panicked or was aborted.
    #[error("Outgoing server task failed: {0}")]
    Join(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
