//! # dingbot-runtime
//!
//! Process-level glue for dingbot:
//!
//! - [`config`]: figment-based layered configuration (`dingbot.toml`,
//!   `DINGBOT_*` environment variables)
//! - [`logging`]: `tracing-subscriber` initialization from configuration
//! - [`DingbotRuntime`]: builds the robot client and serves the outgoing
//!   endpoint until shutdown
//!
//! ```rust,ignore
//! use dingbot_runtime::DingbotRuntime;
//! use dingbot_framework::register_command;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     register_command("ping", |_| br#"{"msgtype":"text","text":{"content":"pong"}}"#.to_vec(), 0, false);
//!     DingbotRuntime::new()?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, DingbotConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{FmtSpan, LoggingBuilder};
pub use runtime::{DingbotRuntime, RuntimeBuilder};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
