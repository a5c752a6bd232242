use serde::{Deserialize, Serialize};

use crate::{cache::ConversationCache, identity::MessageTimestamp};

/// Chat-list row built from the cached working set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatPreview<M> {
    /// Chat id.
    pub chat_id: String,
    /// Most recent stored message.
    pub latest: M,
    /// Number of messages currently held for the chat.
    pub message_count: usize,
}

impl<M: MessageTimestamp + Clone> ConversationCache<M> {
    /// Previews for every non-empty chat, newest activity first.
    ///
    /// Ties on timestamp are ordered by chat id.
    pub fn chat_previews(&self) -> Vec<ChatPreview<M>> {
        let mut previews: Vec<ChatPreview<M>> = self
            .chats()
            .filter_map(|(chat_id, messages)| {
                messages.last().map(|latest| ChatPreview {
                    chat_id: chat_id.to_owned(),
                    latest: latest.clone(),
                    message_count: messages.len(),
                })
            })
            .collect();

        previews.sort_by(|a, b| {
            b.latest
                .timestamp_ms()
                .cmp(&a.latest.timestamp_ms())
                .then_with(|| a.chat_id.cmp(&b.chat_id))
        });
        previews
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, DeliveryStatus};

    fn at(id: &str, timestamp_ms: u64) -> ChatMessage {
        ChatMessage {
            id: Some(id.to_owned()),
            sender: "@bob:example.org".to_owned(),
            body: id.to_owned(),
            status: DeliveryStatus::Read,
            timestamp_ms,
        }
    }

    #[test]
    fn sorts_by_latest_timestamp_descending() {
        let mut cache = ConversationCache::default();
        cache.set_messages("old", vec![at("o1", 10), at("o2", 20)]);
        cache.set_messages("new", vec![at("n1", 5), at("n2", 90)]);
        cache.append("mid", at("m1", 50));

        let previews = cache.chat_previews();
        let order: Vec<_> = previews.iter().map(|p| p.chat_id.as_str()).collect();
        assert_eq!(order, vec!["new", "mid", "old"]);
        assert_eq!(previews[0].latest.id.as_deref(), Some("n2"));
        assert_eq!(previews[0].message_count, 2);
        assert_eq!(previews[1].message_count, 1);
    }

    #[test]
    fn skips_empty_chats_and_breaks_ties_by_chat_id() {
        let mut cache = ConversationCache::default();
        cache.set_messages("empty", Vec::new());
        cache.append("b", at("b1", 7));
        cache.append("a", at("a1", 7));

        let previews = cache.chat_previews();
        let order: Vec<_> = previews.iter().map(|p| p.chat_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn reflects_switch_trim() {
        let mut cache = ConversationCache::default();
        cache.set_messages("a", vec![at("a1", 1), at("a2", 2), at("a3", 3)]);
        cache.set_active_chat("a");
        cache.set_active_chat("b");

        let previews = cache.chat_previews();
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].message_count, 1);
        assert_eq!(previews[0].latest.id.as_deref(), Some("a3"));
    }
}
