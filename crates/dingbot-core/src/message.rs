//! Robot message envelope.
//!
//! [`Message`] is a closed set of the message kinds a group robot can post.
//! It serialises to the platform's JSON envelope: the `msgtype` field names
//! the kind and the body sits under a key of the same name, with an optional
//! `at` block next to it for kinds that support mentions.
//!
//! ```text
//! {"msgtype":"text","text":{"content":"hi"},"at":{"atMobiles":["10086"],"isAtAll":false}}
//! ```
//!
//! Kinds that take [`MessageOption`]s have a `*_with` constructor which folds
//! and validates the options for that kind.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::markdown::DingMap;
use crate::options::{MessageOption, OptionSet};

// ============================================================================
// MessageKind
// ============================================================================

/// The kind of a [`Message`], matching its `msgtype` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Text,
    Link,
    Markdown,
    ActionCard,
    FeedCard,
}

impl MessageKind {
    /// Returns the `msgtype` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Link => "link",
            Self::Markdown => "markdown",
            Self::ActionCard => "actionCard",
            Self::FeedCard => "feedCard",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Shared Types
// ============================================================================

/// Mention directive attached to text and markdown messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtSpec {
    /// Phone numbers of members to mention. Kept unique, in insertion order.
    #[serde(rename = "atMobiles", default)]
    pub at_mobiles: Vec<String>,
    /// Mention everyone in the group.
    #[serde(rename = "isAtAll", default)]
    pub is_at_all: bool,
}

impl AtSpec {
    /// Adds phone numbers, skipping ones already present.
    pub fn extend_mobiles<I, S>(&mut self, mobiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for mobile in mobiles {
            let mobile = mobile.into();
            if !self.at_mobiles.contains(&mobile) {
                self.at_mobiles.push(mobile);
            }
        }
    }

    /// Returns `true` if nobody is mentioned.
    pub fn is_empty(&self) -> bool {
        self.at_mobiles.is_empty() && !self.is_at_all
    }
}

// ============================================================================
// Message
// ============================================================================

/// A robot message, one variant per `msgtype`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msgtype")]
pub enum Message {
    #[serde(rename = "text")]
    Text(TextMessage),
    #[serde(rename = "link")]
    Link(LinkMessage),
    #[serde(rename = "markdown")]
    Markdown(MarkdownMessage),
    #[serde(rename = "actionCard")]
    ActionCard(ActionCardMessage),
    #[serde(rename = "feedCard")]
    FeedCard(FeedCardMessage),
}

/// `msgtype = "text"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
    pub text: TextContent,
    #[serde(default)]
    pub at: AtSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
}

/// `msgtype = "link"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkMessage {
    pub link: LinkContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkContent {
    pub title: String,
    pub text: String,
    #[serde(rename = "picUrl")]
    pub pic_url: String,
    #[serde(rename = "messageUrl")]
    pub message_url: String,
}

/// `msgtype = "markdown"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownMessage {
    pub markdown: MarkdownContent,
    #[serde(default)]
    pub at: AtSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownContent {
    pub title: String,
    pub text: String,
}

/// `msgtype = "actionCard"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCardMessage {
    #[serde(rename = "actionCard")]
    pub action_card: ActionCardContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCardContent {
    pub title: String,
    pub text: String,
    #[serde(rename = "btnOrientation", default)]
    pub btn_orientation: BtnOrientation,
    #[serde(flatten)]
    pub buttons: ActionCardButtons,
}

/// Either one full-width button or a list of buttons, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionCardButtons {
    Single {
        #[serde(rename = "singleTitle")]
        title: String,
        #[serde(rename = "singleURL")]
        url: String,
    },
    Multi {
        btns: Vec<ActionButton>,
    },
}

/// One button of a multi-button action card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub title: String,
    #[serde(rename = "actionURL")]
    pub action_url: String,
}

impl ActionButton {
    /// Creates a button.
    pub fn new(title: impl Into<String>, action_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            action_url: action_url.into(),
        }
    }
}

/// Button layout of an action card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BtnOrientation {
    #[serde(rename = "0")]
    Vertical,
    #[default]
    #[serde(rename = "1")]
    Horizontal,
}

/// `msgtype = "feedCard"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedCardMessage {
    #[serde(rename = "feedCard")]
    pub feed_card: FeedCardContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedCardContent {
    pub links: Vec<FeedCardLink>,
}

/// One entry of a feed card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCardLink {
    pub title: String,
    #[serde(rename = "messageURL")]
    pub message_url: String,
    #[serde(rename = "picURL")]
    pub pic_url: String,
}

impl FeedCardLink {
    /// Creates a feed card entry.
    pub fn new(
        title: impl Into<String>,
        message_url: impl Into<String>,
        pic_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message_url: message_url.into(),
            pic_url: pic_url.into(),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Message {
    /// A text message without mentions.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(TextMessage {
            text: TextContent {
                content: content.into(),
            },
            at: AtSpec::default(),
        })
    }

    /// A text message with options applied.
    pub fn text_with<I>(content: impl Into<String>, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        let at = OptionSet::collect(options).into_at(MessageKind::Text)?;
        Ok(Self::Text(TextMessage {
            text: TextContent {
                content: content.into(),
            },
            at,
        }))
    }

    /// A link card.
    pub fn link(
        title: impl Into<String>,
        text: impl Into<String>,
        pic_url: impl Into<String>,
        message_url: impl Into<String>,
    ) -> Self {
        Self::Link(LinkMessage {
            link: LinkContent {
                title: title.into(),
                text: text.into(),
                pic_url: pic_url.into(),
                message_url: message_url.into(),
            },
        })
    }

    /// A markdown message without mentions.
    pub fn markdown(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Markdown(MarkdownMessage {
            markdown: MarkdownContent {
                title: title.into(),
                text: text.into(),
            },
            at: AtSpec::default(),
        })
    }

    /// A markdown message with options applied.
    pub fn markdown_with<I>(
        title: impl Into<String>,
        text: impl Into<String>,
        options: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        let at = OptionSet::collect(options).into_at(MessageKind::Markdown)?;
        Ok(Self::Markdown(MarkdownMessage {
            markdown: MarkdownContent {
                title: title.into(),
                text: text.into(),
            },
            at,
        }))
    }

    /// A markdown message whose body is `lines` joined by newlines.
    pub fn markdown_lines<I>(title: impl Into<String>, lines: &[String], options: I) -> Result<Self>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        Self::markdown_with(title, lines.join("\n"), options)
    }

    /// A markdown message of tappable `dtmd://` links, one per map entry.
    pub fn dtmd<I>(title: impl Into<String>, map: &DingMap, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        if map.is_empty() {
            return Err(Error::validation("dtmd message requires at least one entry"));
        }
        Self::markdown_lines(title, &map.render_dtmd_lines(), options)
    }

    /// An action card with its buttons already chosen.
    pub fn action_card(
        title: impl Into<String>,
        text: impl Into<String>,
        buttons: ActionCardButtons,
        btn_orientation: BtnOrientation,
    ) -> Result<Self> {
        let message = Self::ActionCard(ActionCardMessage {
            action_card: ActionCardContent {
                title: title.into(),
                text: text.into(),
                btn_orientation,
                buttons,
            },
        });
        message.validate()?;
        Ok(message)
    }

    /// An action card whose buttons and layout come from options.
    pub fn action_card_with<I>(
        title: impl Into<String>,
        text: impl Into<String>,
        options: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        let (buttons, orientation) = OptionSet::collect(options).into_action_card()?;
        Self::action_card(title, text, buttons, orientation)
    }

    /// A feed card. Fails on an empty link list.
    pub fn feed_card(links: Vec<FeedCardLink>) -> Result<Self> {
        let message = Self::FeedCard(FeedCardMessage {
            feed_card: FeedCardContent { links },
        });
        message.validate()?;
        Ok(message)
    }

    /// Checks the invariants the constructors enforce, for messages built
    /// from public fields or parsed with [`Message::from_bytes`].
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::ActionCard(m) => match &m.action_card.buttons {
                ActionCardButtons::Multi { btns } if btns.is_empty() => {
                    Err(Error::validation("action card button list is empty"))
                }
                _ => Ok(()),
            },
            Self::FeedCard(m) if m.feed_card.links.is_empty() => {
                Err(Error::validation("feed card requires at least one link"))
            }
            _ => Ok(()),
        }
    }

    // --------------------------------
    // Accessors
    // --------------------------------

    /// Returns the kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text(_) => MessageKind::Text,
            Self::Link(_) => MessageKind::Link,
            Self::Markdown(_) => MessageKind::Markdown,
            Self::ActionCard(_) => MessageKind::ActionCard,
            Self::FeedCard(_) => MessageKind::FeedCard,
        }
    }

    /// Returns the mention block, for kinds that have one.
    pub fn at(&self) -> Option<&AtSpec> {
        match self {
            Self::Text(m) => Some(&m.at),
            Self::Markdown(m) => Some(&m.at),
            _ => None,
        }
    }

    /// Serialises to a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serialises to JSON bytes, the form sent on the wire and returned by
    /// command handlers.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a message from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{
        with_at_all, with_at_mobiles, with_card_btn_vertical, with_card_btns,
        with_card_single_title, with_card_single_url,
    };
    use serde_json::json;

    #[test]
    fn test_text_with_mobiles_serialises_at_block() {
        let msg = Message::text_with("hello", [with_at_mobiles(["10086"])]).unwrap();
        let raw = String::from_utf8(msg.to_bytes().unwrap()).unwrap();
        assert!(raw.contains(r#""atMobiles":["10086"]"#));
        assert!(raw.contains(r#""isAtAll":false"#));
        assert!(raw.contains(r#""msgtype":"text""#));
    }

    #[test]
    fn test_link_envelope() {
        let msg = Message::link("title", "text", "https://img", "https://go");
        assert_eq!(
            msg.to_json().unwrap(),
            json!({
                "msgtype": "link",
                "link": {
                    "title": "title",
                    "text": "text",
                    "picUrl": "https://img",
                    "messageUrl": "https://go"
                }
            })
        );
    }

    #[test]
    fn test_markdown_envelope_with_at_all() {
        let msg = Message::markdown_with("t", "### body", [with_at_all()]).unwrap();
        assert_eq!(
            msg.to_json().unwrap(),
            json!({
                "msgtype": "markdown",
                "markdown": {"title": "t", "text": "### body"},
                "at": {"atMobiles": [], "isAtAll": true}
            })
        );
    }

    #[test]
    fn test_markdown_lines_joined() {
        let lines = vec!["### head".to_string(), "---".to_string(), "- item".to_string()];
        let msg = Message::markdown_lines("t", &lines, []).unwrap();
        match msg {
            Message::Markdown(m) => assert_eq!(m.markdown.text, "### head\n---\n- item"),
            other => panic!("expected markdown, got {other:?}"),
        }
    }

    #[test]
    fn test_single_button_action_card() {
        let msg = Message::action_card_with(
            "card",
            "body",
            [
                with_card_single_title("Read more"),
                with_card_single_url("https://example.com"),
            ],
        )
        .unwrap();
        assert_eq!(
            msg.to_json().unwrap(),
            json!({
                "msgtype": "actionCard",
                "actionCard": {
                    "title": "card",
                    "text": "body",
                    "btnOrientation": "1",
                    "singleTitle": "Read more",
                    "singleURL": "https://example.com"
                }
            })
        );
    }

    #[test]
    fn test_multi_button_action_card_vertical() {
        let msg = Message::action_card_with(
            "card",
            "body",
            [
                with_card_btns(vec![
                    ActionButton::new("yes", "https://y"),
                    ActionButton::new("no", "https://n"),
                ]),
                with_card_btn_vertical(),
            ],
        )
        .unwrap();
        let value = msg.to_json().unwrap();
        assert_eq!(value["actionCard"]["btnOrientation"], "0");
        assert_eq!(
            value["actionCard"]["btns"],
            json!([
                {"title": "yes", "actionURL": "https://y"},
                {"title": "no", "actionURL": "https://n"}
            ])
        );
        assert!(value["actionCard"].get("singleTitle").is_none());
    }

    #[test]
    fn test_feed_card_requires_links() {
        let err = Message::feed_card(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let msg = Message::feed_card(vec![FeedCardLink::new("a", "https://a", "https://a.png")])
            .unwrap();
        assert_eq!(
            msg.to_json().unwrap()["feedCard"]["links"][0],
            json!({"title": "a", "messageURL": "https://a", "picURL": "https://a.png"})
        );
    }

    #[test]
    fn test_validate_catches_hand_built_envelopes() {
        let empty_feed = Message::FeedCard(FeedCardMessage {
            feed_card: FeedCardContent { links: Vec::new() },
        });
        assert!(matches!(empty_feed.validate(), Err(Error::Validation(_))));

        let raw = br#"{"msgtype":"actionCard","actionCard":{"title":"t","text":"x","btns":[]}}"#;
        let parsed = Message::from_bytes(raw).unwrap();
        assert!(matches!(parsed.validate(), Err(Error::Validation(_))));

        assert!(Message::text("ok").validate().is_ok());
    }

    #[test]
    fn test_dtmd_rejects_empty_map() {
        assert!(matches!(
            Message::dtmd("t", &DingMap::new(), []),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_parse_reply_bytes() {
        let bytes = Message::text("pong").to_bytes().unwrap();
        let parsed = Message::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.kind(), MessageKind::Text);
        assert_eq!(parsed, Message::text("pong"));
    }

    #[test]
    fn test_parse_action_card_variants() {
        let single = json!({
            "msgtype": "actionCard",
            "actionCard": {"title": "t", "text": "x", "singleTitle": "go", "singleURL": "https://u"}
        });
        let msg: Message = serde_json::from_value(single).unwrap();
        match msg {
            Message::ActionCard(card) => {
                assert_eq!(card.action_card.btn_orientation, BtnOrientation::Horizontal);
                assert!(matches!(card.action_card.buttons, ActionCardButtons::Single { .. }));
            }
            other => panic!("expected action card, got {other:?}"),
        }
    }
}
