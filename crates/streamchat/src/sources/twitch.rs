//! Anonymous Twitch chat over WebSocket IRC.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use rand::Rng;
use streamchat_protocol::{ChatMessage, Platform};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::ChatSource;
use super::irc::IrcMessage;
use crate::session::HubHandle;

/// Password accepted by Twitch for read-only `justinfan` logins.
const ANONYMOUS_PASS: &str = "SCHMOOPIIE";

const ACTION_PREFIX: &str = "\u{1}ACTION ";

pub struct TwitchIrcSource {
    url: String,
    channel: String,
    read_timeout: Duration,
}

impl TwitchIrcSource {
    pub fn new(url: impl Into<String>, channel: impl Into<String>, read_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            channel: channel.into(),
            read_timeout,
        }
    }

    fn login_lines(&self) -> Vec<String> {
        let nick = format!("justinfan{}", rand::rng().random_range(10_000..100_000u32));
        vec![
            "CAP REQ :twitch.tv/tags twitch.tv/commands".to_string(),
            format!("PASS {}", ANONYMOUS_PASS),
            format!("NICK {}", nick),
            format!("JOIN #{}", self.channel),
        ]
    }
}

#[async_trait]
impl ChatSource for TwitchIrcSource {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    fn channel(&self) -> &str {
        &self.channel
    }

    async fn stream(&self, hub: &HubHandle, frames: &mut u64) -> Result<()> {
        let (socket, _) = timeout(self.read_timeout, connect_async(self.url.as_str()))
            .await
            .with_context(|| format!("Timed out connecting to {}", self.url))?
            .with_context(|| format!("Failed to connect to {}", self.url))?;
        let (mut tx, mut rx) = socket.split();

        for line in self.login_lines() {
            tx.send(Message::Text(line.into()))
                .await
                .context("Failed to send IRC login")?;
        }
        info!("[{}] Joined Twitch channel #{}", hub.key(), self.channel);

        loop {
            let frame = match timeout(self.read_timeout, rx.next()).await {
                Err(_) => bail!("No data from Twitch for {:?}", self.read_timeout),
                Ok(None) => return Ok(()),
                Ok(Some(frame)) => frame.context("Twitch IRC read failed")?,
            };

            let text = match frame {
                Message::Text(text) => text,
                Message::Ping(data) => {
                    tx.send(Message::Pong(data)).await?;
                    continue;
                }
                Message::Close(_) => return Ok(()),
                _ => continue,
            };

            for line in text.as_str().split("\r\n").filter(|l| !l.is_empty()) {
                let Some(irc) = IrcMessage::parse(line) else {
                    debug!("[{}] Unparseable IRC line: {}", hub.key(), line);
                    continue;
                };
                match irc.command.as_str() {
                    "PING" => {
                        let server = irc.trailing().unwrap_or("tmi.twitch.tv");
                        tx.send(Message::Text(format!("PONG :{}", server).into()))
                            .await?;
                    }
                    "RECONNECT" => {
                        info!("[{}] Twitch requested reconnect", hub.key());
                        return Ok(());
                    }
                    "NOTICE" if is_login_failure(&irc) => {
                        bail!(
                            "Twitch rejected login: {}",
                            irc.trailing().unwrap_or_default()
                        );
                    }
                    "PRIVMSG" => {
                        *frames += 1;
                        if let Some(message) = chat_message(&irc) {
                            hub.deliver(message).await?;
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

fn is_login_failure(irc: &IrcMessage) -> bool {
    irc.trailing().is_some_and(|text| {
        text.contains("Login authentication failed") || text.contains("Improperly formatted auth")
    })
}

/// Map a PRIVMSG to a chat message.
pub fn chat_message(irc: &IrcMessage) -> Option<ChatMessage> {
    let text = irc.trailing()?;
    let username = irc.tag("display-name").or_else(|| irc.nick())?;
    let timestamp = irc
        .tag("tmi-sent-ts")
        .and_then(|ts| ts.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    Some(ChatMessage::new(
        Platform::Twitch,
        username,
        unwrap_action(text),
        timestamp,
        irc.tag("color").unwrap_or_default(),
    ))
}

/// `/me` messages arrive as `\x01ACTION text\x01`.
fn unwrap_action(text: &str) -> &str {
    match text.strip_prefix(ACTION_PREFIX) {
        Some(action) => action.strip_suffix('\u{1}').unwrap_or(action),
        None => text,
    }
}
