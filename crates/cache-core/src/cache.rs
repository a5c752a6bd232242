use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    identity::{MessageIdentity, same_id},
    types::{CacheEvent, CacheOp},
};

/// Default per-chat message cap.
pub const DEFAULT_MAX_MESSAGES_PER_CHAT: usize = 200;

/// Bounded in-memory message working set, keyed by chat id.
///
/// Every chat holds at most `max_per_chat` messages, oldest first. Switching
/// the active chat collapses the previously active chat to its latest
/// message. Both reductions are silent: they are retention policy, not
/// failures, and no operation on this type can fail.
#[derive(Debug, Clone)]
pub struct ConversationCache<M> {
    chats: HashMap<String, Vec<M>>,
    active_chat_id: Option<String>,
    max_per_chat: usize,
}

impl<M> Default for ConversationCache<M> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES_PER_CHAT)
    }
}

impl<M> ConversationCache<M> {
    /// Create an empty cache with a per-chat cap (`max_per_chat >= 1`).
    pub fn new(max_per_chat: usize) -> Self {
        Self {
            chats: HashMap::new(),
            active_chat_id: None,
            max_per_chat: max_per_chat.max(1),
        }
    }

    /// Per-chat message cap.
    pub fn max_per_chat(&self) -> usize {
        self.max_per_chat
    }

    /// Currently active chat, if any.
    pub fn active_chat_id(&self) -> Option<&str> {
        self.active_chat_id.as_deref()
    }

    /// Stored messages for `chat_id`, oldest first. Empty when the chat is unknown.
    pub fn messages(&self, chat_id: &str) -> &[M] {
        self.chats.get(chat_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `chat_id` currently has an entry (possibly empty).
    pub fn contains_chat(&self, chat_id: &str) -> bool {
        self.chats.contains_key(chat_id)
    }

    /// Ids of all chats with an entry, in no particular order.
    pub fn chat_ids(&self) -> impl Iterator<Item = &str> {
        self.chats.keys().map(String::as_str)
    }

    /// Number of chats with an entry.
    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }

    /// Number of messages stored across all chats.
    pub fn total_messages(&self) -> usize {
        self.chats.values().map(Vec::len).sum()
    }

    pub(crate) fn chats(&self) -> impl Iterator<Item = (&str, &[M])> {
        self.chats
            .iter()
            .map(|(chat_id, messages)| (chat_id.as_str(), messages.as_slice()))
    }

    /// Mark `chat_id` as the foreground chat.
    ///
    /// When this is a real switch, the previously active chat keeps only its
    /// most recent message.
    pub fn set_active_chat(&mut self, chat_id: &str) {
        if let Some(prev) = self.active_chat_id.as_deref()
            && prev != chat_id
            && let Some(messages) = self.chats.get_mut(prev)
            && messages.len() > 1
        {
            let dropped = messages.len() - 1;
            messages.drain(..dropped);
            debug!(prev_chat_id = %prev, %chat_id, dropped, "trimmed inactive chat on switch");
        }

        if self.active_chat_id.as_deref() != Some(chat_id) {
            trace!(%chat_id, "active chat changed");
            self.active_chat_id = Some(chat_id.to_owned());
        }
    }

    /// Replace the stored messages of `chat_id`, keeping the newest `max_per_chat`.
    pub fn set_messages(&mut self, chat_id: &str, mut messages: Vec<M>) {
        let dropped = keep_newest(&mut messages, self.max_per_chat);
        if dropped > 0 {
            debug!(%chat_id, dropped, "set_messages input exceeded cap");
        }
        trace!(%chat_id, count = messages.len(), "chat messages replaced");
        self.chats.insert(chat_id.to_owned(), messages);
    }

    /// Add `message` at the tail of `chat_id`, dropping the oldest when over cap.
    ///
    /// No id deduplication happens here; use [`Self::upsert`] for updates.
    pub fn append(&mut self, chat_id: &str, message: M) {
        let messages = self.chats.entry(chat_id.to_owned()).or_default();
        messages.push(message);
        let dropped = keep_newest(messages, self.max_per_chat);
        if dropped > 0 {
            trace!(%chat_id, dropped, "evicted oldest messages on append");
        }
    }

    /// Insert older history (oldest first) at the head of `chat_id`.
    ///
    /// When over cap the newest tail is dropped so the freshly loaded page survives.
    pub fn prepend(&mut self, chat_id: &str, older: Vec<M>) {
        let added = older.len();
        let messages = self.chats.entry(chat_id.to_owned()).or_default();
        messages.splice(0..0, older);
        let dropped = keep_oldest(messages, self.max_per_chat);
        trace!(%chat_id, added, dropped, "prepended older history");
    }

    /// Remove `chat_id` entirely. The active chat id is left untouched.
    pub fn clear(&mut self, chat_id: &str) {
        if let Some(messages) = self.chats.remove(chat_id) {
            debug!(%chat_id, dropped = messages.len(), "chat cleared");
        }
    }
}

impl<M: MessageIdentity> ConversationCache<M> {
    /// Replace the stored message sharing `message`'s id in place, or append it.
    ///
    /// A message without an id never matches and is always appended.
    pub fn upsert(&mut self, chat_id: &str, message: M) {
        let messages = self.chats.entry(chat_id.to_owned()).or_default();
        let wanted = message.message_id();
        if wanted.is_none() {
            trace!(%chat_id, "upsert without message id falls back to append");
        }

        let found = messages
            .iter()
            .position(|existing| same_id(existing, wanted));
        match found {
            Some(index) => {
                messages[index] = message;
                trace!(%chat_id, index, "message updated in place");
            }
            None => {
                messages.push(message);
                let dropped = keep_newest(messages, self.max_per_chat);
                if dropped > 0 {
                    trace!(%chat_id, dropped, "evicted oldest messages on upsert");
                }
            }
        }
    }

    /// Look up one stored message by id.
    pub fn message(&self, chat_id: &str, message_id: &str) -> Option<&M> {
        self.messages(chat_id)
            .iter()
            .find(|message| message.message_id() == Some(message_id))
    }

    /// Apply one operation to `chat_id`.
    pub fn apply_op(&mut self, chat_id: &str, op: CacheOp<M>) {
        match op {
            CacheOp::SetMessages(messages) => self.set_messages(chat_id, messages),
            CacheOp::Append(message) => self.append(chat_id, message),
            CacheOp::Prepend(older) => self.prepend(chat_id, older),
            CacheOp::Upsert(message) => self.upsert(chat_id, message),
            CacheOp::Clear => self.clear(chat_id),
        }
    }

    /// Apply operations to `chat_id` in order.
    pub fn apply_ops(&mut self, chat_id: &str, ops: impl IntoIterator<Item = CacheOp<M>>) {
        for op in ops {
            self.apply_op(chat_id, op);
        }
    }

    /// Feed one ingestion event into the cache.
    pub fn handle_event(&mut self, event: CacheEvent<M>) {
        match event {
            CacheEvent::ActiveChatChanged { chat_id } => self.set_active_chat(&chat_id),
            CacheEvent::ChatDelta { chat_id, ops } => {
                trace!(%chat_id, op_count = ops.len(), "applying chat delta");
                self.apply_ops(&chat_id, ops);
            }
        }
    }
}

fn keep_newest<M>(messages: &mut Vec<M>, max: usize) -> usize {
    if messages.len() <= max {
        return 0;
    }

    let excess = messages.len() - max;
    messages.drain(0..excess);
    excess
}

fn keep_oldest<M>(messages: &mut Vec<M>, max: usize) -> usize {
    let excess = messages.len().saturating_sub(max);
    messages.truncate(max);
    excess
}
