//! # dingbot-client
//!
//! Async client for group robot webhooks.
//!
//! ```rust,ignore
//! use dingbot_client::DingTalk;
//! use dingbot_core::with_at_all;
//!
//! let bot = DingTalk::with_secret("access-token", "SEC...")?;
//! bot.send_text_message("release 1.4 is out", [with_at_all()]).await?;
//! ```

pub mod client;

pub use client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DingTalk, DingTalkBuilder, TokenStrategy};
