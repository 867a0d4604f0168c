//! Frames received from the YouTube chat relay worker.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::{ChatMessage, DEFAULT_USER_COLOR, Platform};

/// Author block of a relay frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAuthor {
    #[serde(default)]
    pub name: String,
}

/// One inbound relay frame.
///
/// ```json
/// { "author": { "name": "Dave" }, "message": "hello", "timestamp": "2024-05-01T12:00:00Z" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayFrame {
    #[serde(default)]
    pub author: RelayAuthor,
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

impl RelayFrame {
    /// Normalize into a [`ChatMessage`].
    ///
    /// The relay carries no author color, so every YouTube user is rendered in
    /// the default color.
    pub fn into_message(self) -> ChatMessage {
        let timestamp = if self.timestamp.trim().is_empty() {
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        } else {
            self.timestamp
        };
        ChatMessage::new(
            Platform::YouTube,
            self.author.name,
            self.message,
            timestamp,
            DEFAULT_USER_COLOR,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_relay_frame() {
        let frame: RelayFrame = serde_json::from_str(
            r#"{"author":{"name":"Dave"},"message":"hello there","timestamp":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        let msg = frame.into_message();
        assert_eq!(msg.platform(), Platform::YouTube);
        assert_eq!(msg.username(), "Dave");
        assert_eq!(msg.content(), "hello there");
        assert_eq!(msg.timestamp(), "2024-05-01T12:00:00Z");
        assert_eq!(msg.color(), "#FFFFFF");
        assert_eq!(msg.platform_color(), "#FF0000");
    }

    #[test]
    fn test_missing_timestamp_is_filled_in() {
        let frame: RelayFrame =
            serde_json::from_str(r#"{"author":{"name":"x"},"message":"m"}"#).unwrap();
        let msg = frame.into_message();
        assert!(chrono::DateTime::parse_from_rfc3339(msg.timestamp()).is_ok());
    }

    #[test]
    fn test_frame_without_message_is_rejected() {
        let result = serde_json::from_str::<RelayFrame>(r#"{"author":{"name":"x"}}"#);
        assert!(result.is_err());
    }
}
