//! Message options.
//!
//! Options are small values passed alongside the required fields of a
//! message. They are folded, in order, into an [`OptionSet`]:
//!
//! - scalar options (single-button title/url, vertical layout): last one wins
//! - [`with_card_btns`]: replaces the whole button list
//! - [`with_at_mobiles`]: appends, so repeated calls accumulate mentions
//!
//! The set is then validated against the message kind. Mention options only
//! apply to text and markdown messages, card options only to action cards;
//! anything else is a [`Error::Validation`] rather than a silent no-op.

use crate::error::{Error, Result};
use crate::message::{ActionButton, ActionCardButtons, AtSpec, BtnOrientation, MessageKind};

// ============================================================================
// MessageOption
// ============================================================================

/// A single option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOption {
    /// Mention members by phone number.
    AtMobiles(Vec<String>),
    /// Mention everyone.
    AtAll,
    /// Title of the single action-card button.
    CardSingleTitle(String),
    /// URL of the single action-card button.
    CardSingleUrl(String),
    /// Full button list of a multi-button action card.
    CardButtons(Vec<ActionButton>),
    /// Stack action-card buttons vertically.
    CardBtnVertical,
}

impl MessageOption {
    /// The constructor name, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AtMobiles(_) => "with_at_mobiles",
            Self::AtAll => "with_at_all",
            Self::CardSingleTitle(_) => "with_card_single_title",
            Self::CardSingleUrl(_) => "with_card_single_url",
            Self::CardButtons(_) => "with_card_btns",
            Self::CardBtnVertical => "with_card_btn_vertical",
        }
    }

    fn is_mention(&self) -> bool {
        matches!(self, Self::AtMobiles(_) | Self::AtAll)
    }
}

/// Mentions the given phone numbers.
pub fn with_at_mobiles<I, S>(mobiles: I) -> MessageOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    MessageOption::AtMobiles(mobiles.into_iter().map(Into::into).collect())
}

/// Mentions everyone in the group.
pub fn with_at_all() -> MessageOption {
    MessageOption::AtAll
}

/// Sets the single button's title.
pub fn with_card_single_title(title: impl Into<String>) -> MessageOption {
    MessageOption::CardSingleTitle(title.into())
}

/// Sets the single button's URL.
pub fn with_card_single_url(url: impl Into<String>) -> MessageOption {
    MessageOption::CardSingleUrl(url.into())
}

/// Sets the button list, replacing any earlier list.
pub fn with_card_btns(buttons: Vec<ActionButton>) -> MessageOption {
    MessageOption::CardButtons(buttons)
}

/// Lays buttons out vertically.
pub fn with_card_btn_vertical() -> MessageOption {
    MessageOption::CardBtnVertical
}

// ============================================================================
// OptionSet
// ============================================================================

/// Every recognised option, folded from a sequence of [`MessageOption`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    pub at: AtSpec,
    pub single_title: Option<String>,
    pub single_url: Option<String>,
    pub buttons: Option<Vec<ActionButton>>,
    pub btn_orientation: Option<BtnOrientation>,
    first_mention: Option<&'static str>,
    first_card: Option<&'static str>,
}

impl OptionSet {
    /// Folds options in order.
    pub fn collect<I>(options: I) -> Self
    where
        I: IntoIterator<Item = MessageOption>,
    {
        let mut set = Self::default();
        set.extend(options);
        set
    }

    /// Applies one option.
    pub fn apply(&mut self, option: MessageOption) {
        let slot = if option.is_mention() {
            &mut self.first_mention
        } else {
            &mut self.first_card
        };
        slot.get_or_insert(option.name());

        match option {
            MessageOption::AtMobiles(mobiles) => self.at.extend_mobiles(mobiles),
            MessageOption::AtAll => self.at.is_at_all = true,
            MessageOption::CardSingleTitle(title) => self.single_title = Some(title),
            MessageOption::CardSingleUrl(url) => self.single_url = Some(url),
            MessageOption::CardButtons(buttons) => self.buttons = Some(buttons),
            MessageOption::CardBtnVertical => {
                self.btn_orientation = Some(BtnOrientation::Vertical);
            }
        }
    }

    /// Resolves the mention block for a text or markdown message.
    pub fn into_at(self, kind: MessageKind) -> Result<AtSpec> {
        if let Some(name) = self.first_card {
            return Err(unsupported(name, kind));
        }
        Ok(self.at)
    }

    /// Resolves buttons and layout for an action card.
    pub fn into_action_card(self) -> Result<(ActionCardButtons, BtnOrientation)> {
        if let Some(name) = self.first_mention {
            return Err(unsupported(name, MessageKind::ActionCard));
        }

        let orientation = self.btn_orientation.unwrap_or_default();
        let has_single = self.single_title.is_some() || self.single_url.is_some();

        let buttons = match (has_single, self.buttons) {
            (true, Some(_)) => {
                return Err(Error::validation(
                    "action card cannot have both a single button and a button list",
                ));
            }
            (false, None) => {
                return Err(Error::validation(
                    "action card requires a single button or a button list",
                ));
            }
            (false, Some(btns)) if btns.is_empty() => {
                return Err(Error::validation("action card button list is empty"));
            }
            (false, Some(btns)) => ActionCardButtons::Multi { btns },
            (true, None) => match (self.single_title, self.single_url) {
                (Some(title), Some(url)) => ActionCardButtons::Single { title, url },
                _ => {
                    return Err(Error::validation(
                        "single button requires both a title and a URL",
                    ));
                }
            },
        };

        Ok((buttons, orientation))
    }
}

impl Extend<MessageOption> for OptionSet {
    fn extend<I: IntoIterator<Item = MessageOption>>(&mut self, iter: I) {
        for option in iter {
            self.apply(option);
        }
    }
}

impl FromIterator<MessageOption> for OptionSet {
    fn from_iter<I: IntoIterator<Item = MessageOption>>(iter: I) -> Self {
        Self::collect(iter)
    }
}

fn unsupported(option: &str, kind: MessageKind) -> Error {
    Error::validation(format!("option {option} is not supported by {kind} messages"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobiles_accumulate_without_duplicates() {
        let set = OptionSet::collect([
            with_at_mobiles(["10086", "10010"]),
            with_at_mobiles(["10086", "10000"]),
        ]);
        assert_eq!(set.at.at_mobiles, vec!["10086", "10010", "10000"]);
        assert!(!set.at.is_at_all);
    }

    #[test]
    fn test_buttons_replace_wholesale() {
        let set = OptionSet::collect([
            with_card_btns(vec![ActionButton::new("a", "https://a")]),
            with_card_btns(vec![ActionButton::new("b", "https://b")]),
        ]);
        let (buttons, _) = set.into_action_card().unwrap();
        assert_eq!(
            buttons,
            ActionCardButtons::Multi {
                btns: vec![ActionButton::new("b", "https://b")]
            }
        );
    }

    #[test]
    fn test_last_scalar_wins() {
        let set = OptionSet::collect([
            with_card_single_title("first"),
            with_card_single_url("https://x"),
            with_card_single_title("second"),
        ]);
        let (buttons, orientation) = set.into_action_card().unwrap();
        assert_eq!(orientation, BtnOrientation::Horizontal);
        assert_eq!(
            buttons,
            ActionCardButtons::Single {
                title: "second".into(),
                url: "https://x".into()
            }
        );
    }

    #[test]
    fn test_single_and_multi_conflict() {
        let set = OptionSet::collect([
            with_card_single_title("t"),
            with_card_single_url("https://x"),
            with_card_btns(vec![ActionButton::new("a", "https://a")]),
        ]);
        assert!(matches!(set.into_action_card(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_action_card_needs_buttons() {
        assert!(matches!(
            OptionSet::default().into_action_card(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            OptionSet::collect([with_card_single_title("only title")]).into_action_card(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            OptionSet::collect([with_card_btns(Vec::new())]).into_action_card(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_card_option_on_text_is_rejected() {
        let set = OptionSet::collect([with_at_all(), with_card_btn_vertical()]);
        let err = set.into_at(MessageKind::Text).unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: option with_card_btn_vertical is not supported by text messages"
        );
    }

    #[test]
    fn test_mention_option_on_action_card_is_rejected() {
        let set = OptionSet::collect([
            with_card_single_title("t"),
            with_card_single_url("https://x"),
            with_at_mobiles(["10086"]),
        ]);
        assert!(matches!(set.into_action_card(), Err(Error::Validation(_))));
    }
}
