//! Chat source adapters with automatic reconnection.
//!
//! Every platform adapter implements [`ChatSource`], a single connect-and-read
//! cycle. [`run_source`] turns that cycle into a long-running task that
//! reconnects with exponential backoff until the session is cancelled.

mod backoff;
pub mod irc;
pub mod relay;
pub mod twitch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use streamchat_protocol::Platform;
use tokio_util::sync::CancellationToken;

pub use backoff::{Backoff, BackoffConfig};
pub use relay::RelaySource;
pub use twitch::TwitchIrcSource;

use crate::config::SourcesConfig;
use crate::session::{HubHandle, SourceChannels};

/// One upstream chat connection.
#[async_trait]
pub trait ChatSource: Send + Sync {
    fn platform(&self) -> Platform;

    fn channel(&self) -> &str;

    /// Connect once and forward messages to `hub` until the stream ends.
    ///
    /// `frames` is incremented for every chat payload read: relay data
    /// frames and Twitch `PRIVMSG` lines. Control frames and server chatter
    /// do not count. `Ok(())` is a clean end of stream; `Err` a connect or
    /// read failure.
    async fn stream(&self, hub: &HubHandle, frames: &mut u64) -> Result<()>;
}

/// Builds the sources for a session's channels.
pub trait SourceFactory: Send + Sync {
    fn sources_for(&self, channels: &SourceChannels) -> Vec<Arc<dyn ChatSource>>;
}

/// Default factory: Twitch IRC for `twitch`, the relay for `youtube`.
#[derive(Debug, Clone)]
pub struct PlatformSources {
    twitch_irc_url: String,
    relay_url: String,
    read_timeout: Duration,
}

impl PlatformSources {
    pub fn new(config: &SourcesConfig) -> Self {
        Self {
            twitch_irc_url: config.twitch_irc_url.clone(),
            relay_url: config.relay_url.clone(),
            read_timeout: config.read_timeout(),
        }
    }
}

impl SourceFactory for PlatformSources {
    fn sources_for(&self, channels: &SourceChannels) -> Vec<Arc<dyn ChatSource>> {
        channels
            .iter()
            .map(|(platform, channel)| -> Arc<dyn ChatSource> {
                match platform {
                    Platform::Twitch => Arc::new(TwitchIrcSource::new(
                        self.twitch_irc_url.as_str(),
                        channel,
                        self.read_timeout,
                    )),
                    Platform::YouTube => {
                        Arc::new(RelaySource::new(&self.relay_url, channel, self.read_timeout))
                    }
                }
            })
            .collect()
    }
}

/// Drive `source` until `cancel` fires or the hub stops.
///
/// A cycle that read at least one chat payload resets the backoff. If it
/// also ended cleanly, the source reconnects immediately. Failures and clean
/// ends without chat payloads wait for the next backoff delay.
pub async fn run_source(
    source: Arc<dyn ChatSource>,
    hub: HubHandle,
    config: BackoffConfig,
    cancel: CancellationToken,
) {
    let platform = source.platform();
    let channel = source.channel().to_string();
    let mut backoff = Backoff::new(config);

    loop {
        if cancel.is_cancelled() || hub.is_closed() {
            break;
        }

        let mut frames = 0u64;
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = source.stream(&hub, &mut frames) => result,
        };

        if hub.is_closed() {
            break;
        }
        if frames > 0 {
            backoff.reset();
        }

        match result {
            Ok(()) if frames > 0 => {
                info!(
                    "[{}] {} stream for {} ended after {} frames, reconnecting",
                    hub.key(),
                    platform,
                    channel,
                    frames
                );
                continue;
            }
            Ok(()) => warn!(
                "[{}] {} stream for {} closed without data",
                hub.key(),
                platform,
                channel
            ),
            Err(e) => warn!(
                "[{}] {} source for {} failed: {:#}",
                hub.key(),
                platform,
                channel,
                e
            ),
        }

        let delay = backoff.next_delay();
        info!(
            "[{}] Reconnecting {} source for {} in {:?} (attempt {})",
            hub.key(),
            platform,
            channel,
            delay,
            backoff.attempt()
        );
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    debug!("[{}] {} source for {} stopped", hub.key(), platform, channel);
}
