//! Application state shared across handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::session::SessionRegistry;

/// Viewer socket settings.
#[derive(Debug, Clone, Copy)]
pub struct ViewerSettings {
    /// Upper bound on a single frame write.
    pub write_timeout: Duration,
    /// Interval between WebSocket pings.
    pub ping_interval: Duration,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub widget_path: PathBuf,
    pub viewer: ViewerSettings,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>, server: &ServerConfig) -> Self {
        let widget_path = shellexpand::tilde(&server.widget_path).into_owned();
        Self {
            registry,
            widget_path: PathBuf::from(widget_path),
            viewer: ViewerSettings {
                write_timeout: server.write_timeout(),
                ping_interval: server.ping_interval(),
            },
        }
    }
}
