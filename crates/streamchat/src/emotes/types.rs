//! Response shapes returned by emote directories.

use serde::Deserialize;
use serde_json::Value;

/// One emote entry as listed by a directory.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEmote {
    #[serde(alias = "name")]
    pub code: String,
    pub id: Value,
}

impl RawEmote {
    /// Emote id as text; some directories use numeric ids.
    pub fn id_str(&self) -> Option<String> {
        id_text(&self.id)
    }
}

fn id_text(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct UserRecord {
    pub id: Value,
}

/// Known user lookup layouts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserLookup {
    /// `{ "data": [...] }` (Twitch Helix users).
    Data { data: Vec<UserRecord> },
    /// `[...]`
    List(Vec<UserRecord>),
    /// `{ "id": ... }`
    Single(UserRecord),
}

impl UserLookup {
    /// Id of the first user returned, if any.
    pub fn into_id(self) -> Option<String> {
        let first = match self {
            UserLookup::Data { data } => data.into_iter().next(),
            UserLookup::List(list) => list.into_iter().next(),
            UserLookup::Single(user) => Some(user),
        };
        first.and_then(|user| id_text(&user.id))
    }
}

/// Known listing layouts.
///
/// Variant order matters for untagged matching: the keyed object layouts are
/// tried before the bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EmoteListing {
    /// `{ "data": [...] }` (Twitch Helix).
    Data { data: Vec<RawEmote> },
    /// `{ "emotes": [...] }` (emote-set style).
    Set { emotes: Vec<RawEmote> },
    /// `{ "channelEmotes": [...], "sharedEmotes": [...] }` (BTTV user).
    Channel {
        #[serde(rename = "channelEmotes")]
        channel_emotes: Vec<RawEmote>,
        #[serde(rename = "sharedEmotes")]
        shared_emotes: Vec<RawEmote>,
    },
    /// `[...]` (BTTV global).
    Flat(Vec<RawEmote>),
}

impl EmoteListing {
    pub fn into_emotes(self) -> Vec<RawEmote> {
        match self {
            EmoteListing::Data { data } => data,
            EmoteListing::Set { emotes } => emotes,
            EmoteListing::Channel {
                mut channel_emotes,
                shared_emotes,
            } => {
                channel_emotes.extend(shared_emotes);
                channel_emotes
            }
            EmoteListing::Flat(list) => list,
        }
    }
}
