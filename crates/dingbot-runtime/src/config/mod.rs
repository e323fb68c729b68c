//! Configuration loading and validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    ConfigFormat, ConfigLoader, ENV_PREFIX, Profile, load_config, load_config_from_file,
};
pub use schema::{
    DingbotConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, OutgoingConfig,
    RobotConfig, SpanEventConfig,
};
pub use validation::validate_config;
