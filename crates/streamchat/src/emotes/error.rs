//! Emote directory error types.

use thiserror::Error;

/// Result type for emote directory lookups.
pub type EmoteResult<T> = Result<T, EmoteError>;

/// Errors that can occur while fetching an emote directory.
#[derive(Debug, Error)]
pub enum EmoteError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Directory answered with a non-success status.
    #[error("{url} returned {status}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// User lookup returned no id for the channel.
    #[error("No user id found for channel {0}")]
    UnknownChannel(String),

    /// A `{channel_id}` source is configured without a user lookup.
    #[error("No channel id lookup configured")]
    NoChannelIdLookup,

    /// Failed to parse response.
    #[error("Failed to parse response from {url}: {message}")]
    ParseError { url: String, message: String },
}
