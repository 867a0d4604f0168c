//! Session hub: the single owner of a session's viewer set.
//!
//! Register, unregister and deliver requests all go through one command queue
//! consumed by [`Hub::run`], so the viewer set is only ever touched from that
//! task and needs no lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use streamchat_protocol::ChatMessage;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::SessionError;
use super::key::SessionKey;
use crate::pipeline::{ContentPipeline, Verdict};

/// Serialized message frames on their way to one viewer socket.
pub type ViewerSender = mpsc::Sender<Arc<str>>;

/// Receiving end of a viewer channel, drained by the socket writer.
pub type ViewerReceiver = mpsc::Receiver<Arc<str>>;

/// Process-unique viewer connection id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(u64);

impl ViewerId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Close the session after it has had no viewers for this long.
    pub idle_timeout: Option<Duration>,
    pub queue_capacity: usize,
    pub viewer_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(300)),
            queue_capacity: 1024,
            viewer_buffer: 64,
        }
    }
}

/// Counters reported by a running hub.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub viewers: usize,
    pub delivered: u64,
    pub filtered: u64,
    pub dropped_viewers: u64,
}

enum HubCommand {
    Register { id: ViewerId, sender: ViewerSender },
    Unregister { id: ViewerId },
    Deliver(ChatMessage),
    Stats(oneshot::Sender<HubStats>),
}

/// Cloneable handle used by viewers and sources to talk to a hub.
#[derive(Clone)]
pub struct HubHandle {
    key: SessionKey,
    commands: mpsc::Sender<HubCommand>,
    viewer_buffer: usize,
}

impl HubHandle {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Create a viewer channel sized for this hub.
    pub fn viewer_channel(&self) -> (ViewerSender, ViewerReceiver) {
        mpsc::channel(self.viewer_buffer)
    }

    /// Add a viewer. It receives every message delivered after this call.
    pub async fn register(&self, id: ViewerId, sender: ViewerSender) -> Result<(), SessionError> {
        self.commands
            .send(HubCommand::Register { id, sender })
            .await
            .map_err(|_| SessionError::HubClosed)
    }

    /// Remove a viewer. Unknown ids and closed hubs are ignored.
    pub async fn unregister(&self, id: ViewerId) {
        let _ = self.commands.send(HubCommand::Unregister { id }).await;
    }

    /// Submit a message for moderation, emote substitution and broadcast.
    pub async fn deliver(&self, message: ChatMessage) -> Result<(), SessionError> {
        self.commands
            .send(HubCommand::Deliver(message))
            .await
            .map_err(|_| SessionError::HubClosed)
    }

    pub async fn stats(&self) -> Result<HubStats, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(HubCommand::Stats(tx))
            .await
            .map_err(|_| SessionError::HubClosed)?;
        rx.await.map_err(|_| SessionError::HubClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

pub struct Hub {
    key: SessionKey,
    config: HubConfig,
    commands: mpsc::Receiver<HubCommand>,
    viewers: HashMap<ViewerId, ViewerSender>,
    cancel: CancellationToken,
    idle_since: Option<Instant>,
    delivered: u64,
    filtered: u64,
    dropped_viewers: u64,
}

impl Hub {
    pub fn new(key: SessionKey, config: HubConfig, cancel: CancellationToken) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let handle = HubHandle {
            key: key.clone(),
            commands: tx,
            viewer_buffer: config.viewer_buffer,
        };
        let hub = Self {
            key,
            config,
            commands: rx,
            viewers: HashMap::new(),
            cancel,
            idle_since: None,
            delivered: 0,
            filtered: 0,
            dropped_viewers: 0,
        };
        (hub, handle)
    }

    /// Run the control loop until cancelled or evicted for idleness.
    ///
    /// On exit the session's cancellation token is triggered, which stops its
    /// sources, and all viewer channels are dropped, which closes their sockets.
    pub async fn run(mut self, pipeline: ContentPipeline) {
        info!(
            "[{}] Hub started ({} emote(s) cached)",
            self.key,
            pipeline.emote_count()
        );
        self.mark_idle_if_empty();

        loop {
            let idle_deadline = self.idle_deadline();
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("[{}] Hub cancelled", self.key);
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command, &pipeline),
                    None => break,
                },
                _ = sleep_until(idle_deadline) => {
                    info!(
                        "[{}] No viewers for {:?}, closing session",
                        self.key,
                        self.config.idle_timeout.unwrap_or_default()
                    );
                    break;
                }
            }
        }

        self.commands.close();
        self.cancel.cancel();
        self.viewers.clear();
        info!(
            "[{}] Hub stopped (delivered {}, filtered {})",
            self.key, self.delivered, self.filtered
        );
    }

    fn handle(&mut self, command: HubCommand, pipeline: &ContentPipeline) {
        match command {
            HubCommand::Register { id, sender } => {
                self.viewers.insert(id, sender);
                self.idle_since = None;
                info!(
                    "[{}] Viewer {} connected. Total viewers: {}",
                    self.key,
                    id,
                    self.viewers.len()
                );
            }
            HubCommand::Unregister { id } => {
                if self.viewers.remove(&id).is_some() {
                    info!(
                        "[{}] Viewer {} disconnected. Total viewers: {}",
                        self.key,
                        id,
                        self.viewers.len()
                    );
                    self.mark_idle_if_empty();
                }
            }
            HubCommand::Deliver(message) => self.broadcast(message, pipeline),
            HubCommand::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn broadcast(&mut self, message: ChatMessage, pipeline: &ContentPipeline) {
        let message = match pipeline.process(message) {
            Verdict::Filtered(original) => {
                self.filtered += 1;
                info!(
                    "[{}] BANNED MESSAGE from {} ({}): {}",
                    self.key,
                    original.username(),
                    original.platform(),
                    original.content()
                );
                return;
            }
            Verdict::Deliver(message) => message,
        };

        let payload: Arc<str> = match serde_json::to_string(&message) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!("[{}] Failed to serialize message: {}", self.key, e);
                return;
            }
        };
        self.delivered += 1;

        let key = &self.key;
        let before = self.viewers.len();
        self.viewers
            .retain(|id, sender| match sender.try_send(payload.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!("[{}] Viewer {} is not keeping up, disconnecting", key, id);
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("[{}] Viewer {} connection already closed", key, id);
                    false
                }
            });

        let removed = before - self.viewers.len();
        if removed > 0 {
            self.dropped_viewers += removed as u64;
            info!(
                "[{}] Dropped {} viewer(s). Total viewers: {}",
                self.key,
                removed,
                self.viewers.len()
            );
            self.mark_idle_if_empty();
        }
    }

    fn mark_idle_if_empty(&mut self) {
        if self.viewers.is_empty() && self.idle_since.is_none() {
            self.idle_since = Some(Instant::now());
        }
    }

    fn idle_deadline(&self) -> Option<Instant> {
        let timeout = self.config.idle_timeout?;
        self.idle_since.map(|since| since + timeout)
    }

    fn stats(&self) -> HubStats {
        HubStats {
            viewers: self.viewers.len(),
            delivered: self.delivered,
            filtered: self.filtered,
            dropped_viewers: self.dropped_viewers,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
