//! Multi-platform live chat aggregator.
//!
//! Viewers subscribe to a session identified by a set of source channels
//! (a Twitch channel and/or a YouTube video id). Each session pulls chat from
//! its sources, runs every message through moderation and emote substitution,
//! and fans the result out to its WebSocket viewers.

pub mod api;
pub mod config;
pub mod emotes;
pub mod moderation;
pub mod pipeline;
pub mod session;
pub mod sources;

pub use streamchat_protocol as protocol;
