//! Normalized chat message and platform tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Username color used when a platform does not supply one.
pub const DEFAULT_USER_COLOR: &str = "#FFFFFF";

// ============================================================================
// Platform
// ============================================================================

/// A chat platform a session can ingest from.
///
/// The declaration order is the canonical platform order used when deriving
/// session keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Twitch chat, read over anonymous IRC.
    Twitch,
    /// YouTube live chat, read through the relay worker.
    #[serde(rename = "youtube")]
    YouTube,
}

impl Platform {
    /// All platforms in canonical order.
    pub const ALL: [Platform; 2] = [Platform::Twitch, Platform::YouTube];

    /// Query parameter name and wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitch => "twitch",
            Platform::YouTube => "youtube",
        }
    }

    /// Badge color shown next to messages from this platform.
    pub fn badge_color(&self) -> &'static str {
        match self {
            Platform::Twitch => "#9045FF",
            Platform::YouTube => "#FF0000",
        }
    }

    /// Nerd Font glyph the widget renders as the platform badge.
    pub fn icon(&self) -> &'static str {
        match self {
            Platform::Twitch => "\u{f1e8}",
            Platform::YouTube => "\u{f16a}",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ChatMessage
// ============================================================================

/// A single chat event, identical in shape regardless of source platform.
///
/// This is also the viewer wire record: each broadcast is one WebSocket text
/// frame holding this struct as JSON.
///
/// ```json
/// {"platform":"twitch","username":"Alice","content":"hi","timestamp":"2024-05-01T12:00:00Z",
///  "color":"#1E90FF","platformColor":"#9045FF"}
/// ```
///
/// Fields are private: a message is immutable once built, and transformations
/// produce a new value through [`ChatMessage::with_content`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    platform: Platform,
    username: String,
    content: String,
    timestamp: String,
    color: String,
    platform_color: String,
}

impl ChatMessage {
    pub fn new(
        platform: Platform,
        username: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        let color = color.into();
        let color = if color.trim().is_empty() {
            DEFAULT_USER_COLOR.to_string()
        } else {
            color
        };
        Self {
            platform,
            username: username.into(),
            content: content.into(),
            timestamp: timestamp.into(),
            color,
            platform_color: platform.badge_color().to_string(),
        }
    }

    /// Return a copy of this message carrying different text.
    pub fn with_content(self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// RFC 3339 timestamp of the original chat event.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn platform_color(&self) -> &str {
        &self.platform_color
    }
}
