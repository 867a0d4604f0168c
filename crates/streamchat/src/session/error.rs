//! Session error types.

use thiserror::Error;

/// Errors surfaced by the session hub and registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No source channel was supplied, so there is no session to join.
    #[error("at least one source channel (twitch or youtube) is required")]
    EmptyKey,

    /// The hub has stopped (idle eviction or shutdown).
    #[error("session hub is closed")]
    HubClosed,
}
