//! # dingbot-framework
//!
//! Server side of the outgoing-robot callback contract.
//!
//! ```rust,ignore
//! use dingbot_core::Message;
//! use dingbot_framework::{OutgoingDispatcher, listen, register_command};
//!
//! register_command("hello", |args| {
//!     Message::text(format!("hello, {}", args[0])).to_bytes().unwrap_or_default()
//! }, 1, true);
//!
//! let dispatcher = OutgoingDispatcher::global().with_secret("app-secret");
//! listen("0.0.0.0:8000", "/outgoing", dispatcher, shutdown).await?;
//! ```

pub mod dispatcher;
pub mod payload;
pub mod registry;
pub mod server;

pub use dispatcher::{
    Credentials, DEFAULT_TIMESTAMP_TOLERANCE, DispatchOutcome, OutgoingAuth, OutgoingDispatcher,
};
pub use payload::{AtUser, OutgoingMessage, OutgoingText};
pub use registry::{Command, CommandHandler, CommandRegistry, register_command};
pub use server::{DEFAULT_PATH, listen, router};
