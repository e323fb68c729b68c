//! Ordered key/value lines for building markdown bodies.
//!
//! [`DingMap`] keeps `(key, value)` pairs in insertion order so a message
//! renders line by line exactly as it was assembled. Keys may repeat: a second
//! `set` with the same key adds another line rather than replacing the first.
//!
//! When rendered with [`DingMap::render_lines`], each value is read as a
//! [`MarkdownStyle`] name applied to its key:
//!
//! ```rust,ignore
//! use dingbot_core::markdown::{DingMap, MarkdownStyle};
//!
//! let map = DingMap::new()
//!     .with("Deploy report", MarkdownStyle::H2)
//!     .with("failed: $$ api-gateway $$", MarkdownStyle::Red)
//!     .with("---", "")
//!     .with("all other services healthy", MarkdownStyle::Green);
//!
//! let lines = map.render_lines();
//! ```

use url::form_urlencoded;

/// Delimiter marking the styled part of a key.
pub const STYLE_DELIMITER: &str = "$$";

// ============================================================================
// MarkdownStyle
// ============================================================================

/// Styles understood by the markdown renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownStyle {
    /// Plain text.
    Normal,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Red,
    Blue,
    Green,
    Gold,
}

impl MarkdownStyle {
    /// Returns the style name used as a map value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "n",
            Self::H1 => "h1",
            Self::H2 => "h2",
            Self::H3 => "h3",
            Self::H4 => "h4",
            Self::H5 => "h5",
            Self::H6 => "h6",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Gold => "gold",
        }
    }

    /// Parses a style name; unknown names render as plain text.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "h1" => Self::H1,
            "h2" => Self::H2,
            "h3" => Self::H3,
            "h4" => Self::H4,
            "h5" => Self::H5,
            "h6" => Self::H6,
            "red" => Self::Red,
            "blue" => Self::Blue,
            "green" => Self::Green,
            "gold" => Self::Gold,
            _ => Self::Normal,
        }
    }

    /// Applies the style to a piece of text.
    pub fn apply(&self, text: &str) -> String {
        let color = match self {
            Self::Normal => return text.to_string(),
            Self::H1 => return format!("# {text}"),
            Self::H2 => return format!("## {text}"),
            Self::H3 => return format!("### {text}"),
            Self::H4 => return format!("#### {text}"),
            Self::H5 => return format!("##### {text}"),
            Self::H6 => return format!("###### {text}"),
            Self::Red => "#FF0000",
            Self::Blue => "#1E90FF",
            Self::Green => "#008000",
            Self::Gold => "#FFD700",
        };
        format!("<font color={color}>{text}</font>")
    }

    fn is_heading(&self) -> bool {
        matches!(
            self,
            Self::H1 | Self::H2 | Self::H3 | Self::H4 | Self::H5 | Self::H6
        )
    }
}

impl From<MarkdownStyle> for String {
    fn from(style: MarkdownStyle) -> Self {
        style.as_str().to_string()
    }
}

// ============================================================================
// DingMap
// ============================================================================

/// An insertion-ordered list of `(key, value)` string pairs.
///
/// Each instance is meant to be built and consumed by a single caller; it is
/// a plain owned value with no interior synchronisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DingMap {
    entries: Vec<(String, String)>,
}

impl DingMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair. Never overwrites an existing key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Appends a pair (by-value builder form of [`set`](Self::set)).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Returns the pairs in insertion order.
    pub fn slice(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Iterates over `(key, value)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders every pair into a markdown line, treating values as styles.
    pub fn render_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(key, value)| render_line(key, MarkdownStyle::parse(value)))
            .collect()
    }

    /// Renders every pair as a tappable `dtmd://` link that sends `value`
    /// back into the conversation when clicked.
    pub fn render_dtmd_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(key, value)| {
                let content: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
                format!("- [{key}](dtmd://dingtalkclient/sendMessage?content={content})")
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DingMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn render_line(key: &str, style: MarkdownStyle) -> String {
    let parts: Vec<&str> = key.split(STYLE_DELIMITER).collect();
    let line = if parts.len() == 3 && !style.is_heading() {
        format!("{}{}{}", parts[0], style.apply(parts[1].trim()), parts[2])
    } else {
        style.apply(key)
    };

    if line.starts_with('#') || line.starts_with("- ") || line == "---" {
        line
    } else {
        format!("- {line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_preserves_order_with_duplicates() {
        let mut map = DingMap::new();
        map.set("a", "1").set("b", "2").set("a", "3");
        assert_eq!(
            map.slice(),
            &[
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "3".to_string()),
            ]
        );
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_render_styles() {
        let map = DingMap::new()
            .with("title", MarkdownStyle::H2)
            .with("bad", MarkdownStyle::Red)
            .with("---", "")
            .with("plain", MarkdownStyle::Normal)
            .with("custom", "no-such-style");

        assert_eq!(
            map.render_lines(),
            vec![
                "## title",
                "- <font color=#FF0000>bad</font>",
                "---",
                "- plain",
                "- custom",
            ]
        );
    }

    #[test]
    fn test_render_partial_style() {
        let map = DingMap::new().with("failed: $$ api $$ (3 times)", "gold");
        assert_eq!(
            map.render_lines(),
            vec!["- failed: <font color=#FFD700>api</font> (3 times)"]
        );
    }

    #[test]
    fn test_render_keeps_list_prefix() {
        let map = DingMap::new().with("- already a bullet", "n");
        assert_eq!(map.render_lines(), vec!["- already a bullet"]);
    }

    #[test]
    fn test_render_dtmd_lines() {
        let map = DingMap::new().with("Check status", "status all");
        assert_eq!(
            map.render_dtmd_lines(),
            vec!["- [Check status](dtmd://dingtalkclient/sendMessage?content=status+all)"]
        );
    }

    #[test]
    fn test_style_names_round_trip() {
        for style in [
            MarkdownStyle::Normal,
            MarkdownStyle::H1,
            MarkdownStyle::H6,
            MarkdownStyle::Red,
            MarkdownStyle::Blue,
            MarkdownStyle::Green,
            MarkdownStyle::Gold,
        ] {
            assert_eq!(MarkdownStyle::parse(style.as_str()), style);
        }
    }

    #[test]
    fn test_from_iterator() {
        let map: DingMap = [("x", "h1"), ("y", "n")].into_iter().collect();
        assert_eq!(map.render_lines(), vec!["# x", "- y"]);
    }
}
