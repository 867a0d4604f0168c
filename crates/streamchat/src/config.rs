//! Application configuration.
//!
//! Loaded by the binary from defaults, an optional TOML file and
//! `STREAMCHAT__SECTION__KEY` environment variables. Every section falls back
//! to its `Default` so a partial file is always valid.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::HubConfig;
use crate::sources::BackoffConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub sources: SourcesConfig,
    pub backoff: BackoffConfig,
    pub sessions: SessionsConfig,
    pub moderation: ModerationConfig,
    pub emotes: EmotesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// HTTP server and viewer socket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Overlay page served by `GET /chat`.
    pub widget_path: String,
    /// Upper bound on a single write to a viewer socket.
    pub write_timeout_secs: u64,
    /// Interval between WebSocket pings sent to viewers.
    pub ping_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1776,
            widget_path: "./widgets/chat/chat.html".to_string(),
            write_timeout_secs: 10,
            ping_interval_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs.max(1))
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }
}

/// Upstream chat endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Twitch IRC-over-WebSocket endpoint.
    pub twitch_irc_url: String,
    /// Base URL of the YouTube chat relay; sessions connect to `<relay_url>/c/<id>`.
    pub relay_url: String,
    /// A source with no inbound frame for this long is treated as dead.
    pub read_timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            twitch_irc_url: "wss://irc-ws.chat.twitch.tv:443".to_string(),
            relay_url: "ws://localhost:8787".to_string(),
            // Twitch pings roughly every five minutes.
            read_timeout_secs: 360,
        }
    }
}

impl SourcesConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Evict a session after it has had no viewers for this long. 0 disables eviction.
    pub idle_timeout_secs: u64,
    /// Capacity of each hub's command queue.
    pub queue_capacity: usize,
    /// Messages buffered per viewer before it is dropped as too slow.
    pub viewer_buffer: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            queue_capacity: 1024,
            viewer_buffer: 64,
        }
    }
}

impl SessionsConfig {
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            idle_timeout: (self.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.idle_timeout_secs)),
            queue_capacity: self.queue_capacity.max(1),
            viewer_buffer: self.viewer_buffer.max(1),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Newline-delimited, case-insensitive regex patterns. Unset means no filtering.
    pub patterns_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotesConfig {
    pub enabled: bool,
    /// Per-request timeout for emote directory lookups.
    pub timeout_secs: u64,
    /// Resolves the Twitch login to its numeric user id for `{channel_id}` sources.
    pub channel_id: Option<ChannelIdLookup>,
    /// Emote directories, fetched in order. Later entries win on code collisions.
    pub sources: Vec<EmoteSourceConfig>,
}

impl Default for EmotesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 10,
            channel_id: Some(ChannelIdLookup {
                url: "https://api.ivr.fi/v2/twitch/user?login={channel}".to_string(),
                headers: HashMap::new(),
            }),
            sources: vec![
                EmoteSourceConfig {
                    name: "bttv-global".to_string(),
                    url: "https://api.betterttv.net/3/cached/emotes/global".to_string(),
                    cdn_url: "https://cdn.betterttv.net/emote/{id}/1x".to_string(),
                    headers: HashMap::new(),
                    enabled: true,
                },
                EmoteSourceConfig {
                    name: "bttv-channel".to_string(),
                    url: "https://api.betterttv.net/3/cached/users/twitch/{channel_id}".to_string(),
                    cdn_url: "https://cdn.betterttv.net/emote/{id}/1x".to_string(),
                    headers: HashMap::new(),
                    enabled: true,
                },
                EmoteSourceConfig {
                    name: "twitch-global".to_string(),
                    url: "https://api.twitch.tv/helix/chat/emotes/global".to_string(),
                    cdn_url: "https://static-cdn.jtvnw.net/emoticons/v2/{id}/default/dark/1.0"
                        .to_string(),
                    // Helix needs `Client-Id` and `Authorization: Bearer ...`.
                    headers: HashMap::new(),
                    enabled: false,
                },
            ],
        }
    }
}

impl EmotesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// User lookup returning `[{"id": ...}]`, `{"data": [{"id": ...}]}` or `{"id": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelIdLookup {
    /// `{channel}` is replaced with the session's Twitch login.
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// One emote directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmoteSourceConfig {
    pub name: String,
    /// Lookup URL. `{channel}` is replaced with the session's Twitch channel,
    /// `{channel_id}` with its numeric user id.
    pub url: String,
    /// Image URL template. `{id}` is replaced with the emote id.
    pub cdn_url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl EmoteSourceConfig {
    /// Whether this directory is per channel.
    pub fn is_channel_scoped(&self) -> bool {
        self.url.contains("{channel}") || self.needs_channel_id()
    }

    pub fn needs_channel_id(&self) -> bool {
        self.url.contains("{channel_id}")
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [sessions]
            idle_timeout_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.sources.relay_url, "ws://localhost:8787");
        assert!(cfg.sessions.hub_config().idle_timeout.is_none());
        assert_eq!(cfg.emotes.sources.len(), 3);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&AppConfig::default()).unwrap();
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.server.port, 1776);
        assert_eq!(back.emotes.sources[1].name, "bttv-channel");
        assert!(back.emotes.sources[1].is_channel_scoped());
        assert!(back.emotes.sources[1].needs_channel_id());
        assert!(back.emotes.channel_id.is_some());
        assert!(!back.emotes.sources[2].enabled);
    }
}
