//! Chat sessions.
//!
//! A session is the isolation unit for one combination of source channels.
//! It owns a [`Hub`] task, the source tasks feeding it, and the emote cache
//! its content pipeline uses. Sessions are created lazily by the
//! [`SessionRegistry`] and stop when their hub goes idle or on shutdown.

mod error;
pub mod hub;
pub mod key;
pub mod registry;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub use error::SessionError;
pub use hub::{Hub, HubConfig, HubHandle, HubStats, ViewerId, ViewerReceiver, ViewerSender};
pub use key::{SessionKey, SourceChannels};
pub use registry::SessionRegistry;

use crate::emotes::EmoteProvider;
use crate::moderation::ModerationFilter;
use crate::pipeline::ContentPipeline;
use crate::sources::{BackoffConfig, SourceFactory, run_source};

/// Collaborators every new session is built from.
#[derive(Clone)]
pub struct SessionDeps {
    pub moderation: Arc<dyn ModerationFilter>,
    pub emotes: Arc<dyn EmoteProvider>,
    pub sources: Arc<dyn SourceFactory>,
    pub hub: HubConfig,
    pub backoff: BackoffConfig,
}

/// Point-in-time view of a session for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub key: SessionKey,
    pub channels: SourceChannels,
    pub created_at: DateTime<Utc>,
    /// `None` once the hub has stopped.
    pub stats: Option<HubStats>,
}

pub struct Session {
    id: u64,
    key: SessionKey,
    channels: SourceChannels,
    hub: HubHandle,
    cancel: CancellationToken,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Spawn the hub and source tasks for a new session.
    ///
    /// The hub task first loads the emote cache, then runs the control loop.
    /// `on_exit` is called with the session id once the hub has stopped.
    pub(crate) fn start<F>(
        key: SessionKey,
        channels: SourceChannels,
        deps: &SessionDeps,
        on_exit: F,
    ) -> Arc<Self>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);

        let cancel = CancellationToken::new();
        let (hub, handle) = Hub::new(key.clone(), deps.hub.clone(), cancel.clone());

        info!("[{}] Creating session", key);

        let emotes = deps.emotes.clone();
        let moderation = deps.moderation.clone();
        let hub_channels = channels.clone();
        let hub_cancel = cancel.clone();
        let hub_key = key.clone();
        tokio::spawn(async move {
            let cache = tokio::select! {
                _ = hub_cancel.cancelled() => None,
                cache = emotes.load(&hub_channels) => Some(cache),
            };
            match cache {
                Some(cache) => {
                    hub.run(ContentPipeline::new(moderation, Arc::new(cache)))
                        .await
                }
                None => debug!("[{}] Session closed while loading emotes", hub_key),
            }
            hub_cancel.cancel();
            on_exit(id);
        });

        for source in deps.sources.sources_for(&channels) {
            info!(
                "[{}] Starting {} source for {}",
                key,
                source.platform(),
                source.channel()
            );
            tokio::spawn(run_source(
                source,
                handle.clone(),
                deps.backoff.clone(),
                cancel.clone(),
            ));
        }

        Arc::new(Self {
            id,
            key,
            channels,
            hub: handle,
            cancel,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn channels(&self) -> &SourceChannels {
        &self.channels
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.hub.is_closed()
    }

    /// Stop the hub and every source of this session.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub async fn summary(&self) -> SessionSummary {
        SessionSummary {
            key: self.key.clone(),
            channels: self.channels.clone(),
            created_at: self.created_at,
            stats: self.hub.stats().await.ok(),
        }
    }
}
