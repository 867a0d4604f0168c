//! HTTP emote directory client.

use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::error::{EmoteError, EmoteResult};
use super::types::{EmoteListing, UserLookup};
use super::{EmoteCache, EmoteProvider};
use crate::config::{ChannelIdLookup, EmoteSourceConfig, EmotesConfig};
use crate::session::SourceChannels;

/// Loads emotes from the configured HTTP directories.
#[derive(Debug, Clone)]
pub struct HttpEmoteProvider {
    client: Client,
    sources: Vec<EmoteSourceConfig>,
    channel_id: Option<ChannelIdLookup>,
}

impl HttpEmoteProvider {
    pub fn new(config: &EmotesConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("streamchat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, config.sources.clone())
            .with_channel_id_lookup(config.channel_id.clone()))
    }

    pub fn with_client(client: Client, sources: Vec<EmoteSourceConfig>) -> Self {
        Self {
            client,
            sources,
            channel_id: None,
        }
    }

    pub fn with_channel_id_lookup(mut self, lookup: Option<ChannelIdLookup>) -> Self {
        self.channel_id = lookup;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> EmoteResult<T> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmoteError::UnexpectedStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| EmoteError::ParseError {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Resolve a Twitch login to its numeric user id.
    pub async fn resolve_channel_id(&self, channel: &str) -> EmoteResult<String> {
        let lookup = self
            .channel_id
            .as_ref()
            .ok_or(EmoteError::NoChannelIdLookup)?;
        let url = lookup
            .url
            .replace("{channel}", &urlencoding::encode(channel));

        debug!("Resolving Twitch id for {} ({})", channel, url);
        let users: UserLookup = self.get_json(&url, &lookup.headers).await?;
        users
            .into_id()
            .ok_or_else(|| EmoteError::UnknownChannel(channel.to_string()))
    }

    /// Fetch one directory and resolve each entry to its image URL.
    pub async fn fetch_source(
        &self,
        source: &EmoteSourceConfig,
        channel: Option<&str>,
        channel_id: Option<&str>,
    ) -> EmoteResult<Vec<(String, String)>> {
        let mut url = source.url.clone();
        if let Some(channel) = channel {
            url = url.replace("{channel}", &urlencoding::encode(channel));
        }
        if let Some(id) = channel_id {
            url = url.replace("{channel_id}", &urlencoding::encode(id));
        }

        debug!("Fetching emotes from {} ({})", source.name, url);
        let listing: EmoteListing = self.get_json(&url, &source.headers).await?;

        Ok(listing
            .into_emotes()
            .into_iter()
            .filter_map(|emote| {
                let id = emote.id_str()?;
                Some((emote.code, source.cdn_url.replace("{id}", &id)))
            })
            .collect())
    }
}

#[async_trait]
impl EmoteProvider for HttpEmoteProvider {
    async fn load(&self, channels: &SourceChannels) -> EmoteCache {
        let mut cache = EmoteCache::default();
        // Resolved at most once per load.
        let mut resolved_id: Option<Option<String>> = None;

        for source in self.sources.iter().filter(|s| s.enabled) {
            let channel = channels.twitch.as_deref();
            if source.is_channel_scoped() && channel.is_none() {
                continue;
            }

            if source.needs_channel_id() && resolved_id.is_none() {
                let login = channel.unwrap_or_default();
                resolved_id = Some(match self.resolve_channel_id(login).await {
                    Ok(id) => Some(id),
                    Err(e) => {
                        warn!("Failed to resolve Twitch id for {}: {}", login, e);
                        None
                    }
                });
            }
            let channel_id = resolved_id.as_ref().and_then(|id| id.as_deref());
            if source.needs_channel_id() && channel_id.is_none() {
                debug!("Skipping {}: channel id unavailable", source.name);
                continue;
            }

            match self.fetch_source(source, channel, channel_id).await {
                Ok(emotes) => {
                    debug!("{} emote(s) from {}", emotes.len(), source.name);
                    cache.extend(emotes);
                }
                Err(e) => warn!("Failed to load emotes from {}: {}", source.name, e),
            }
        }

        info!("Loaded {} emote(s)", cache.len());
        cache
    }
}
