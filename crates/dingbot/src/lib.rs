//! # dingbot
//!
//! Client and server for DingTalk group robots.
//!
//! ```text
//!  application ── send_*_message ──▶ DingTalk ── POST /robot/send ──▶ platform
//!                                      (sign)
//!  platform ── POST /outgoing ──▶ OutgoingDispatcher ──▶ CommandRegistry ──▶ handler
//!                                   (verify)                                 │
//!  platform ◀──────────────── reply bytes (200) ◀────────────────────────────┘
//! ```
//!
//! - [`core`]: message envelope, options, markdown helpers, signing, errors
//! - [`client`]: the async [`DingTalk`](client::DingTalk) webhook client
//! - [`framework`]: command registry, dispatcher and axum endpoint
//! - [`runtime`]: configuration, logging and process lifecycle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dingbot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = DingTalk::with_secret("access-token", "SEC...")?;
//!
//!     let report = DingMap::new()
//!         .with("Nightly build", MarkdownStyle::H3)
//!         .with("tests: $$ passed $$", MarkdownStyle::Green);
//!     bot.send_markdown_message_by_slice("Nightly", &report.render_lines(), [with_at_all()])
//!         .await?;
//!
//!     register_command("hello", |args| {
//!         Message::text(format!("hello, {}", args[0])).to_bytes().unwrap_or_default()
//!     }, 1, true);
//!     DingbotRuntime::new()?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log format

pub use dingbot_client as client;
pub use dingbot_core as core;
pub use dingbot_framework as framework;
pub use dingbot_runtime as runtime;

/// Commonly used types.
pub mod prelude {
    pub use dingbot_runtime::DingbotRuntime;

    pub use dingbot_client::{DingTalk, TokenStrategy};

    pub use dingbot_core::{
        ActionButton, BtnOrientation, DingMap, FeedCardLink, MarkdownStyle, Message,
        MessageOption, with_at_all, with_at_mobiles, with_card_btn_vertical,
        with_card_btns, with_card_single_title, with_card_single_url,
    };

    pub use dingbot_framework::{
        CommandRegistry, OutgoingDispatcher, OutgoingMessage, register_command,
    };

    pub use dingbot_runtime::prelude::*;
}
