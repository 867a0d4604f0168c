//! Content pipeline applied to every message before broadcast.
//!
//! Moderation runs first on the raw text; only unfiltered messages get emote
//! substitution.

use std::sync::Arc;

use streamchat_protocol::ChatMessage;

use crate::emotes::EmoteCache;
use crate::moderation::ModerationFilter;

/// Outcome of running a message through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Dropped by moderation. Carries the original message for audit logging.
    Filtered(ChatMessage),
    /// Transformed message, ready to broadcast.
    Deliver(ChatMessage),
}

#[derive(Clone)]
pub struct ContentPipeline {
    moderation: Arc<dyn ModerationFilter>,
    emotes: Arc<EmoteCache>,
}

impl ContentPipeline {
    pub fn new(moderation: Arc<dyn ModerationFilter>, emotes: Arc<EmoteCache>) -> Self {
        Self { moderation, emotes }
    }

    pub fn process(&self, message: ChatMessage) -> Verdict {
        if self.moderation.is_filtered(message.content()) {
            return Verdict::Filtered(message);
        }
        let content = self.emotes.substitute(message.content());
        Verdict::Deliver(message.with_content(content))
    }

    pub fn emote_count(&self) -> usize {
        self.emotes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::{AllowAll, PatternFilter};
    use streamchat_protocol::Platform;

    fn message(text: &str) -> ChatMessage {
        ChatMessage::new(Platform::Twitch, "viewer", text, "2024-05-01T12:00:00Z", "#00FF00")
    }

    fn kappa() -> Arc<EmoteCache> {
        Arc::new(
            [("Kappa".to_string(), "https://cdn.example/kappa.png".to_string())]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn test_moderated_message_is_filtered() {
        let pipeline = ContentPipeline::new(Arc::new(PatternFilter::from_patterns("badword")), kappa());
        match pipeline.process(message("this is a BADWORD here")) {
            Verdict::Filtered(original) => assert_eq!(original.content(), "this is a BADWORD here"),
            other => panic!("Expected filtered, got {:?}", other),
        }
    }

    #[test]
    fn test_emotes_substituted_on_delivery() {
        let pipeline = ContentPipeline::new(Arc::new(AllowAll), kappa());
        match pipeline.process(message("hello Kappa world")) {
            Verdict::Deliver(msg) => {
                assert_eq!(
                    msg.content(),
                    r#"hello <img class="emote" src="https://cdn.example/kappa.png" alt="Kappa"> world"#
                );
                assert_eq!(msg.username(), "viewer");
                assert_eq!(msg.color(), "#00FF00");
            }
            other => panic!("Expected delivery, got {:?}", other),
        }
    }

    #[test]
    fn test_chat_markup_is_delivered_inert() {
        let pipeline = ContentPipeline::new(Arc::new(AllowAll), kappa());
        match pipeline.process(message("<img src=x onerror=alert(1)>")) {
            Verdict::Deliver(msg) => {
                assert_eq!(msg.content(), "&lt;img src=x onerror=alert(1)&gt;")
            }
            other => panic!("Expected delivery, got {:?}", other),
        }
    }

    #[test]
    fn test_moderation_sees_raw_text_not_markup() {
        // "img" only appears after substitution, so it must not trigger the filter.
        let pipeline = ContentPipeline::new(Arc::new(PatternFilter::from_patterns("img")), kappa());
        assert!(matches!(pipeline.process(message("Kappa")), Verdict::Deliver(_)));
    }
}
