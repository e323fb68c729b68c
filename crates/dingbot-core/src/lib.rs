//! # dingbot-core
//!
//! Protocol types shared by the dingbot client and the outgoing-robot server.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`message`] | [`Message`] envelope, one variant per `msgtype` |
//! | [`options`] | [`MessageOption`] values and the [`OptionSet`] they fold into |
//! | [`markdown`] | [`DingMap`] ordered lines and [`MarkdownStyle`] rendering |
//! | [`sign`] | [`Signer`] for `timestamp`/`sign` authentication |
//! | [`error`] | [`Error`] and [`Result`] |
//!
//! ## Example
//!
//! ```rust,ignore
//! use dingbot_core::{Message, with_at_mobiles};
//!
//! let msg = Message::text_with("deploy finished", [with_at_mobiles(["10086"])])?;
//! let body = msg.to_bytes()?;
//! ```

pub mod error;
pub mod markdown;
pub mod message;
pub mod options;
pub mod sign;

pub use error::{Error, Result};
pub use markdown::{DingMap, MarkdownStyle};
pub use message::{
    ActionButton, ActionCardButtons, AtSpec, BtnOrientation, FeedCardLink, Message, MessageKind,
};
pub use options::{
    MessageOption, OptionSet, with_at_all, with_at_mobiles, with_card_btn_vertical,
    with_card_btns, with_card_single_title, with_card_single_url,
};
pub use sign::{Signature, Signer, now_millis};
