//! Viewer WebSocket endpoint.
//!
//! Each connection gets a writer task that drains the viewer's hub channel
//! into the socket, while the handler itself only watches for disconnect.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::error::ApiResult;
use super::state::AppState;
use crate::session::{HubHandle, Session, SessionError, SourceChannels, ViewerId, ViewerSender};

/// WebSocket endpoint streaming chat messages of one session.
///
/// GET /ws/chat?twitch=&youtube=
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(channels): Query<SourceChannels>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let session = state.registry.resolve(&channels)?;
    info!(session = %session.key(), "Viewer connection request");

    Ok(ws.on_upgrade(move |socket| handle_viewer(socket, state, session, channels)))
}

/// Register `sender` with the session's hub.
///
/// The session may have closed between resolve and register; in that case the
/// channel set is resolved once more.
async fn register_viewer(
    state: &AppState,
    session: &Session,
    channels: &SourceChannels,
    viewer: ViewerId,
    sender: ViewerSender,
) -> Result<HubHandle, SessionError> {
    match session.hub().register(viewer, sender.clone()).await {
        Ok(()) => Ok(session.hub().clone()),
        Err(SessionError::HubClosed) => {
            debug!(session = %session.key(), "Session closed before register, resolving again");
            let session = state.registry.resolve(channels)?;
            session.hub().register(viewer, sender).await?;
            Ok(session.hub().clone())
        }
        Err(e) => Err(e),
    }
}

async fn handle_viewer(
    socket: WebSocket,
    state: AppState,
    session: Arc<Session>,
    channels: SourceChannels,
) {
    let viewer = ViewerId::next();
    let (sender, mut payloads) = session.hub().viewer_channel();

    let hub = match register_viewer(&state, &session, &channels, viewer, sender).await {
        Ok(hub) => hub,
        Err(e) => {
            warn!(session = %session.key(), "Failed to register viewer: {}", e);
            return;
        }
    };
    info!(session = %hub.key(), %viewer, "Viewer connected");

    let (mut sink, mut stream) = socket.split();
    let settings = state.viewer;
    let writer_key = hub.key().clone();

    let mut writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(settings.ping_interval);
        ping.tick().await;

        loop {
            let frame = tokio::select! {
                payload = payloads.recv() => match payload {
                    Some(payload) => Message::Text(payload.to_string().into()),
                    None => break,
                },
                _ = ping.tick() => Message::Ping(Bytes::new()),
            };

            match timeout(settings.write_timeout, sink.send(frame)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(session = %writer_key, %viewer, "Viewer write failed: {}", e);
                    break;
                }
                Err(_) => {
                    warn!(session = %writer_key, %viewer, "Viewer write timed out");
                    break;
                }
            }
        }

        let _ = timeout(settings.write_timeout, sink.close()).await;
    });

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut writer => break,
        }
    }

    writer.abort();
    hub.unregister(viewer).await;
    info!(session = %hub.key(), %viewer, "Viewer disconnected");
}
