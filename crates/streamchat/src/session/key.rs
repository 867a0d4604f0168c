//! Session keys derived from requested source channels.

use std::fmt;

use serde::{Deserialize, Serialize};
use streamchat_protocol::Platform;

/// Source channels requested by a client, one optional channel per platform.
///
/// Deserialized straight from the `?twitch=...&youtube=...` query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceChannels {
    pub twitch: Option<String>,
    pub youtube: Option<String>,
}

impl SourceChannels {
    pub fn new(twitch: Option<&str>, youtube: Option<&str>) -> Self {
        Self {
            twitch: twitch.map(str::to_string),
            youtube: youtube.map(str::to_string),
        }
        .normalized()
    }

    /// Trim values and drop empty ones.
    ///
    /// Twitch channel names are case-insensitive and may be given with a
    /// leading `#`; both are canonicalized. YouTube ids are case-sensitive and
    /// kept as given.
    pub fn normalized(self) -> Self {
        let twitch = self
            .twitch
            .map(|c| c.trim().trim_start_matches('#').to_ascii_lowercase())
            .filter(|c| !c.is_empty());
        let youtube = self
            .youtube
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Self { twitch, youtube }
    }

    pub fn get(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Twitch => self.twitch.as_deref(),
            Platform::YouTube => self.youtube.as_deref(),
        }
    }

    /// Non-empty channels in canonical platform order.
    pub fn iter(&self) -> impl Iterator<Item = (Platform, &str)> + '_ {
        Platform::ALL
            .into_iter()
            .filter_map(move |p| self.get(p).filter(|c| !c.is_empty()).map(|c| (p, c)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Canonical identifier of a session: `twitch:<channel>,youtube:<id>`.
///
/// Only constructible from at least one channel, so an empty key cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Derive the key for a channel set. `None` when no channel was supplied.
    pub fn from_channels(channels: &SourceChannels) -> Option<Self> {
        let channels = channels.clone().normalized();
        let parts: Vec<String> = channels
            .iter()
            .map(|(platform, channel)| format!("{}:{}", platform, channel))
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(Self(parts.join(",")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
