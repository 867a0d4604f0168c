//! Test utilities and common setup.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures::{Stream, StreamExt};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use streamchat::api::{self, AppState, ViewerSettings};
use streamchat::emotes::{EmoteCache, StaticEmotes};
use streamchat::moderation::PatternFilter;
use streamchat::pipeline::ContentPipeline;
use streamchat::session::{
    Hub, HubConfig, HubHandle, SessionDeps, SessionKey, SessionRegistry, SourceChannels,
};
use streamchat::sources::{BackoffConfig, ChatSource, SourceFactory};

pub const WIDGET_HTML: &str = "<!DOCTYPE html><html><body>streamchat test widget</body></html>";
pub const KAPPA_URL: &str = "https://cdn.example/kappa.png";

/// Factory that starts no upstream connections; tests feed hubs directly.
pub struct NoSources;

impl SourceFactory for NoSources {
    fn sources_for(&self, _channels: &SourceChannels) -> Vec<Arc<dyn ChatSource>> {
        Vec::new()
    }
}

pub fn kappa_cache() -> EmoteCache {
    [("Kappa".to_string(), KAPPA_URL.to_string())]
        .into_iter()
        .collect()
}

pub fn test_deps() -> SessionDeps {
    SessionDeps {
        moderation: Arc::new(PatternFilter::from_patterns("badword\n")),
        emotes: Arc::new(StaticEmotes(kappa_cache())),
        sources: Arc::new(NoSources),
        hub: HubConfig::default(),
        backoff: BackoffConfig::default(),
    }
}

/// A router plus handles the tests need to reach behind it.
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<SessionRegistry>,
    _widget_dir: TempDir,
}

/// Create a test application with a temporary widget file.
pub fn test_app() -> TestApp {
    build_app(true)
}

/// Create a test application whose widget file does not exist.
pub fn test_app_without_widget() -> TestApp {
    build_app(false)
}

fn build_app(with_widget: bool) -> TestApp {
    let widget_dir = tempfile::tempdir().unwrap();
    let widget_path = widget_dir.path().join("chat.html");
    if with_widget {
        std::fs::write(&widget_path, WIDGET_HTML).unwrap();
    }

    let registry = Arc::new(SessionRegistry::new(test_deps()));
    let state = AppState {
        registry: registry.clone(),
        widget_path,
        viewer: ViewerSettings::default(),
    };

    TestApp {
        router: api::create_router(state),
        registry,
        _widget_dir: widget_dir,
    }
}

/// Serve `app` on an ephemeral local port.
pub async fn spawn_server(app: &TestApp) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A running hub with the Kappa emote and no moderation patterns.
pub fn running_hub(channels: &SourceChannels) -> (HubHandle, CancellationToken) {
    let key = SessionKey::from_channels(channels).unwrap();
    let cancel = CancellationToken::new();
    let (hub, handle) = Hub::new(key, HubConfig::default(), cancel.clone());
    let pipeline = ContentPipeline::new(
        Arc::new(PatternFilter::default()),
        Arc::new(kappa_cache()),
    );
    tokio::spawn(hub.run(pipeline));
    (handle, cancel)
}

/// Poll `hub` until it reports `viewers` registered viewers.
pub async fn wait_for_viewers(hub: &HubHandle, viewers: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if hub.stats().await.map(|s| s.viewers).ok() == Some(viewers) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("hub never reached expected viewer count");
}

/// Next text frame from a client socket, skipping control frames.
pub async fn next_text<S>(socket: &mut S) -> String
where
    S: Stream<
            Item = Result<
                tokio_tungstenite::tungstenite::Message,
                tokio_tungstenite::tungstenite::Error,
            >,
        > + Unpin,
{
    use tokio_tungstenite::tungstenite::Message;

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(_)) => continue,
                other => panic!("socket ended before a text frame: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a text frame")
}
