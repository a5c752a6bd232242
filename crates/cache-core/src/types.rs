use serde::{Deserialize, Serialize};

use crate::identity::{MessageIdentity, MessageTimestamp};

/// Delivery progress reported by the backend for one message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Queued locally, not yet acknowledged by the server.
    #[default]
    Pending,
    /// Accepted by the server.
    Sent,
    /// Delivered to the recipient device.
    Delivered,
    /// Read by the recipient.
    Read,
    /// Send failed.
    Failed,
}

/// Concrete message payload used by the smoke app and tests.
///
/// The cache itself only looks at `id` (and `timestamp_ms` for previews).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Message id when the backend assigned one.
    #[serde(default)]
    pub id: Option<String>,
    /// Sender user id.
    pub sender: String,
    /// Display-ready text body.
    pub body: String,
    /// Latest known delivery status.
    #[serde(default)]
    pub status: DeliveryStatus,
    /// Message timestamp in milliseconds since Unix epoch.
    pub timestamp_ms: u64,
}

impl MessageIdentity for ChatMessage {
    fn message_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl MessageTimestamp for ChatMessage {
    fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

/// One mutation applied to a single chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data", rename_all = "snake_case")]
pub enum CacheOp<M> {
    /// Replace the whole chat (initial load).
    SetMessages(Vec<M>),
    /// Add a new message at the tail.
    Append(M),
    /// Add older history, oldest first, at the head.
    Prepend(Vec<M>),
    /// Replace the message with the same id in place, or append it.
    Upsert(M),
    /// Drop the chat entirely.
    Clear,
}

/// Event delivered by the ingestion layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent<M> {
    /// The foreground chat changed.
    ActiveChatChanged {
        /// Newly active chat id.
        chat_id: String,
    },
    /// Ordered operations for one chat.
    ChatDelta {
        /// Target chat id.
        chat_id: String,
        /// Operations to apply in order.
        ops: Vec<CacheOp<M>>,
    },
}

impl<M> CacheEvent<M> {
    /// Chat touched by this event.
    pub fn chat_id(&self) -> &str {
        match self {
            Self::ActiveChatChanged { chat_id } | Self::ChatDelta { chat_id, .. } => chat_id,
        }
    }
}

/// Change notice broadcast after an event was applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheNotification {
    /// Chat whose stored messages or active state may have changed.
    pub chat_id: String,
    /// Whether the event switched the active chat.
    pub active_changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_delta_with_missing_optional_fields() {
        let raw = r#"{"type":"chat_delta","chat_id":"c1","ops":[
            {"op":"append","data":{"sender":"@bob","body":"hi","timestamp_ms":5}},
            {"op":"clear"}
        ]}"#;
        let event: CacheEvent<ChatMessage> =
            serde_json::from_str(raw).expect("delta should decode");

        match event {
            CacheEvent::ChatDelta { chat_id, ops } => {
                assert_eq!(chat_id, "c1");
                assert_eq!(ops.len(), 2);
                match &ops[0] {
                    CacheOp::Append(message) => {
                        assert_eq!(message.id, None);
                        assert_eq!(message.status, DeliveryStatus::Pending);
                    }
                    other => panic!("unexpected op: {other:?}"),
                }
                assert_eq!(ops[1], CacheOp::Clear);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn exposes_chat_id_for_every_event_kind() {
        let switch: CacheEvent<ChatMessage> = CacheEvent::ActiveChatChanged {
            chat_id: "c2".into(),
        };
        let delta: CacheEvent<ChatMessage> = CacheEvent::ChatDelta {
            chat_id: "c3".into(),
            ops: vec![],
        };
        assert_eq!(switch.chat_id(), "c2");
        assert_eq!(delta.chat_id(), "c3");
    }
}
