//! Emote cache and directory loading.
//!
//! Each session loads its cache once, when it is created. After that the
//! cache is read-only and shared with the session's content pipeline.

mod client;
mod error;
mod types;

use std::collections::HashMap;

use async_trait::async_trait;

pub use client::HttpEmoteProvider;
pub use error::{EmoteError, EmoteResult};
pub use types::{EmoteListing, RawEmote, UserLookup};

use crate::session::SourceChannels;

/// Mapping from emote code to image URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmoteCache {
    emotes: HashMap<String, String>,
}

impl EmoteCache {
    pub fn get(&self, code: &str) -> Option<&str> {
        self.emotes.get(code).map(String::as_str)
    }

    pub fn insert(&mut self, code: impl Into<String>, url: impl Into<String>) {
        self.emotes.insert(code.into(), url.into());
    }

    /// Add entries, overwriting codes that are already present.
    pub fn extend<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.emotes.extend(entries);
    }

    pub fn len(&self) -> usize {
        self.emotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emotes.is_empty()
    }

    /// Render chat text as overlay markup.
    ///
    /// Whole whitespace-separated tokens that are emote codes become image
    /// tags; every other token is HTML-escaped. Tokens are re-joined with
    /// single spaces.
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for (i, token) in text.split_whitespace().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            match self.get(token) {
                Some(url) => {
                    out.push_str("<img class=\"emote\" src=\"");
                    push_escaped(&mut out, url);
                    out.push_str("\" alt=\"");
                    push_escaped(&mut out, token);
                    out.push_str("\">");
                }
                None => push_escaped(&mut out, token),
            }
        }
        out
    }
}

impl FromIterator<(String, String)> for EmoteCache {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            emotes: iter.into_iter().collect(),
        }
    }
}

fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

/// Source of a session's emote cache.
#[async_trait]
pub trait EmoteProvider: Send + Sync {
    /// Build the cache for a session. Never fails; unavailable directories are skipped.
    async fn load(&self, channels: &SourceChannels) -> EmoteCache;
}

/// Provider that hands every session the same fixed cache.
#[derive(Debug, Clone, Default)]
pub struct StaticEmotes(pub EmoteCache);

#[async_trait]
impl EmoteProvider for StaticEmotes {
    async fn load(&self, _channels: &SourceChannels) -> EmoteCache {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> EmoteCache {
        [("Kappa".to_string(), "https://cdn.example/kappa.png".to_string())]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_substitutes_matching_token() {
        assert_eq!(
            cache().substitute("hello Kappa world"),
            r#"hello <img class="emote" src="https://cdn.example/kappa.png" alt="Kappa"> world"#
        );
    }

    #[test]
    fn test_whole_token_only() {
        let out = cache().substitute("Kappa, KappaPride kappa xKappa");
        assert_eq!(out, "Kappa, KappaPride kappa xKappa");
    }

    #[test]
    fn test_whitespace_collapses_to_single_spaces() {
        let out = cache().substitute("  a \t b\n\nKappa  ");
        assert_eq!(
            out,
            r#"a b <img class="emote" src="https://cdn.example/kappa.png" alt="Kappa">"#
        );
    }

    #[test]
    fn test_emote_attributes_are_escaped() {
        let mut cache = EmoteCache::default();
        cache.insert("<3", "https://cdn.example/heart.png?a=1&b=2");
        assert_eq!(
            cache.substitute("<3"),
            r#"<img class="emote" src="https://cdn.example/heart.png?a=1&amp;b=2" alt="&lt;3">"#
        );
    }

    #[test]
    fn test_plain_tokens_are_escaped() {
        let out = cache().substitute("<img src=x onerror=alert(1)> Kappa <script>alert('x')</script>");
        assert_eq!(
            out,
            "&lt;img src=x onerror=alert(1)&gt; \
             <img class=\"emote\" src=\"https://cdn.example/kappa.png\" alt=\"Kappa\"> \
             &lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
        assert!(!out.contains("<script"));
        assert!(!out.contains("<img src"));
    }

    #[test]
    fn test_extend_last_writer_wins() {
        let mut cache = cache();
        cache.extend([("Kappa".to_string(), "https://other/kappa.png".to_string())]);
        assert_eq!(cache.get("Kappa"), Some("https://other/kappa.png"));
        assert_eq!(cache.len(), 1);
    }
}
