//! Wire types for streamchat.
//!
//! ```text
//! Twitch IRC ──┐
//!              ├──> [session hub] ──[WS: ChatMessage JSON]──> overlay widgets
//! YouTube relay┘
//!   (RelayFrame)
//! ```
//!
//! Every source platform is normalized into a single [`ChatMessage`] before it
//! reaches a session hub. Viewers only ever see that one record shape, whichever
//! platform the message came from.

pub mod messages;
pub mod relay;

pub use messages::{ChatMessage, DEFAULT_USER_COLOR, Platform};
pub use relay::{RelayAuthor, RelayFrame};
