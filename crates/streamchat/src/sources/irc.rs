//! Minimal IRCv3 line parser for Twitch chat.
//!
//! Handles message tags (with value unescaping), the optional prefix, the
//! command and its parameters including a trailing parameter.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrcMessage {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse a single line. Returns `None` for blank or truncated lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        let mut message = Self::default();

        if let Some(tagged) = rest.strip_prefix('@') {
            let (tags, tail) = tagged.split_once(' ')?;
            for tag in tags.split(';').filter(|t| !t.is_empty()) {
                let (key, value) = tag.split_once('=').unwrap_or((tag, ""));
                message
                    .tags
                    .insert(key.to_string(), unescape_tag_value(value));
            }
            rest = tail.trim_start_matches(' ');
        }

        if let Some(prefixed) = rest.strip_prefix(':') {
            let (prefix, tail) = prefixed.split_once(' ')?;
            message.prefix = Some(prefix.to_string());
            rest = tail.trim_start_matches(' ');
        }

        let (command, mut params) = match rest.split_once(' ') {
            Some((command, params)) => (command, params),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }
        message.command = command.to_ascii_uppercase();

        loop {
            params = params.trim_start_matches(' ');
            if params.is_empty() {
                break;
            }
            if let Some(trailing) = params.strip_prefix(':') {
                message.params.push(trailing.to_string());
                break;
            }
            match params.split_once(' ') {
                Some((middle, tail)) => {
                    message.params.push(middle.to_string());
                    params = tail;
                }
                None => {
                    message.params.push(params.to_string());
                    break;
                }
            }
        }

        Some(message)
    }

    /// Tag value, treating empty values as absent.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Nickname part of the prefix (`nick!user@host`).
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        let nick = prefix.split(['!', '@']).next().unwrap_or(prefix);
        (!nick.is_empty()).then_some(nick)
    }

    /// Last parameter, which carries the message text for PRIVMSG and NOTICE.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_privmsg() {
        let line = "@badge-info=;color=#1E90FF;display-name=Some\\sUser;tmi-sent-ts=1700000000000 \
                    :someuser!someuser@someuser.tmi.twitch.tv PRIVMSG #channel :hello there Kappa\r\n";
        let msg = IrcMessage::parse(line).unwrap();
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.tag("color"), Some("#1E90FF"));
        assert_eq!(msg.tag("display-name"), Some("Some User"));
        assert_eq!(msg.tag("badge-info"), None);
        assert_eq!(msg.nick(), Some("someuser"));
        assert_eq!(msg.params, vec!["#channel", "hello there Kappa"]);
        assert_eq!(msg.trailing(), Some("hello there Kappa"));
    }

    #[test]
    fn test_parse_ping_without_prefix() {
        let msg = IrcMessage::parse("PING :tmi.twitch.tv").unwrap();
        assert_eq!(msg.command, "PING");
        assert!(msg.prefix.is_none());
        assert_eq!(msg.trailing(), Some("tmi.twitch.tv"));
    }

    #[test]
    fn test_parse_middle_params_only() {
        let msg = IrcMessage::parse(":tmi.twitch.tv 001 justinfan123 :Welcome, GLHF!").unwrap();
        assert_eq!(msg.command, "001");
        assert_eq!(msg.nick(), Some("tmi.twitch.tv"));
        assert_eq!(msg.params, vec!["justinfan123", "Welcome, GLHF!"]);

        let msg = IrcMessage::parse(":a!a@a JOIN #chan").unwrap();
        assert_eq!(msg.params, vec!["#chan"]);
    }

    #[test]
    fn test_trailing_keeps_colons_and_spaces() {
        let msg = IrcMessage::parse(":u!u@u PRIVMSG #c :a: b  c").unwrap();
        assert_eq!(msg.trailing(), Some("a: b  c"));
    }

    #[test]
    fn test_tag_unescaping() {
        assert_eq!(unescape_tag_value(r"a\sb\:c\\d"), "a b;c\\d");
        assert_eq!(unescape_tag_value(r"line\r\n"), "line\r\n");
        assert_eq!(unescape_tag_value(r"x\qy\"), "xqy");
    }

    #[test]
    fn test_rejects_blank_and_truncated() {
        assert!(IrcMessage::parse("").is_none());
        assert!(IrcMessage::parse("\r\n").is_none());
        assert!(IrcMessage::parse("@tags-only").is_none());
        assert!(IrcMessage::parse(":prefix-only").is_none());
    }
}
