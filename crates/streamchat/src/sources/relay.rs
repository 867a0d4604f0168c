//! YouTube chat through the relay worker's WebSocket.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use log::{info, warn};
use streamchat_protocol::{Platform, RelayFrame};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::ChatSource;
use crate::session::HubHandle;

pub struct RelaySource {
    url: String,
    channel: String,
    read_timeout: Duration,
}

impl RelaySource {
    /// Source for `channel` on the relay at `base_url` (`<base_url>/c/<channel>`).
    pub fn new(base_url: &str, channel: impl Into<String>, read_timeout: Duration) -> Self {
        let channel = channel.into();
        let url = format!(
            "{}/c/{}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&channel)
        );
        Self {
            url,
            channel,
            read_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatSource for RelaySource {
    fn platform(&self) -> Platform {
        Platform::YouTube
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
        info!("[{}] Connected to relay {}", hub.key(), self.url);

        loop {
            let frame = match timeout(self.read_timeout, rx.next()).await {
                Err(_) => bail!("No data from relay for {:?}", self.read_timeout),
                Ok(None) => return Ok(()),
                Ok(Some(frame)) => frame.context("Relay read failed")?,
            };

            let decoded = match &frame {
                Message::Text(text) => serde_json::from_str::<RelayFrame>(text.as_str()),
                Message::Binary(data) => serde_json::from_slice::<RelayFrame>(data),
                Message::Ping(data) => {
                    tx.send(Message::Pong(data.clone())).await?;
                    continue;
                }
                Message::Close(_) => return Ok(()),
                _ => continue,
            };

            *frames += 1;
            match decoded {
                Ok(relay_frame) => hub.deliver(relay_frame.into_message()).await?,
                Err(e) => warn!("[{}] Skipping malformed relay frame: {}", hub.key(), e),
            }
        }
    }
}
