use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use crate::{
    cache::ConversationCache,
    identity::{MessageIdentity, MessageTimestamp},
    summary::ChatPreview,
    types::{CacheEvent, CacheOp},
};

/// Cloneable handle to one cache instance shared across threads.
///
/// Each call holds a single lock for its whole duration, so a chat switch and
/// its trim are never observed separately. Reads return owned snapshots.
#[derive(Debug)]
pub struct SharedConversationCache<M> {
    inner: Arc<RwLock<ConversationCache<M>>>,
}

impl<M> Clone for SharedConversationCache<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> Default for SharedConversationCache<M> {
    fn default() -> Self {
        Self::from_cache(ConversationCache::default())
    }
}

impl<M> SharedConversationCache<M> {
    /// Create a shared cache with a per-chat cap.
    pub fn new(max_per_chat: usize) -> Self {
        Self::from_cache(ConversationCache::new(max_per_chat))
    }

    /// Wrap an existing cache.
    pub fn from_cache(cache: ConversationCache<M>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cache)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ConversationCache<M>> {
        self.inner.read().unwrap_or_else(|poisoned| {
            warn!("conversation cache lock poisoned; continuing with inner state");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, ConversationCache<M>> {
        self.inner.write().unwrap_or_else(|poisoned| {
            warn!("conversation cache lock poisoned; continuing with inner state");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Run `f` against the cache under the read lock.
    pub fn with_read<R>(&self, f: impl FnOnce(&ConversationCache<M>) -> R) -> R {
        f(&self.read())
    }

    /// Per-chat message cap.
    pub fn max_per_chat(&self) -> usize {
        self.read().max_per_chat()
    }

    /// Currently active chat, if any.
    pub fn active_chat_id(&self) -> Option<String> {
        self.read().active_chat_id().map(str::to_owned)
    }

    /// Number of messages stored across all chats.
    pub fn total_messages(&self) -> usize {
        self.read().total_messages()
    }

    /// See [`ConversationCache::set_active_chat`].
    pub fn set_active_chat(&self, chat_id: &str) {
        self.write().set_active_chat(chat_id);
    }

    /// See [`ConversationCache::set_messages`].
    pub fn set_messages(&self, chat_id: &str, messages: Vec<M>) {
        self.write().set_messages(chat_id, messages);
    }

    /// See [`ConversationCache::append`].
    pub fn append(&self, chat_id: &str, message: M) {
        self.write().append(chat_id, message);
    }

    /// See [`ConversationCache::prepend`].
    pub fn prepend(&self, chat_id: &str, older: Vec<M>) {
        self.write().prepend(chat_id, older);
    }

    /// See [`ConversationCache::clear`].
    pub fn clear(&self, chat_id: &str) {
        self.write().clear(chat_id);
    }
}

impl<M: Clone> SharedConversationCache<M> {
    /// Detached copy of the stored messages for `chat_id`.
    pub fn messages(&self, chat_id: &str) -> Vec<M> {
        self.read().messages(chat_id).to_vec()
    }
}

impl<M: MessageIdentity> SharedConversationCache<M> {
    /// See [`ConversationCache::upsert`].
    pub fn upsert(&self, chat_id: &str, message: M) {
        self.write().upsert(chat_id, message);
    }

    /// Apply operations to `chat_id` under one write lock.
    pub fn apply_ops(&self, chat_id: &str, ops: impl IntoIterator<Item = CacheOp<M>>) {
        self.write().apply_ops(chat_id, ops);
    }

    /// See [`ConversationCache::handle_event`].
    pub fn handle_event(&self, event: CacheEvent<M>) {
        self.write().handle_event(event);
    }

    /// Apply `event` and return the chat it switched away from, if any.
    ///
    /// That chat may just have been trimmed to its latest message.
    pub fn handle_event_tracking_switch(&self, event: CacheEvent<M>) -> Option<String> {
        let mut cache = self.write();
        let previous = match &event {
            CacheEvent::ActiveChatChanged { chat_id } => cache
                .active_chat_id()
                .filter(|prev| *prev != chat_id.as_str())
                .map(str::to_owned),
            CacheEvent::ChatDelta { .. } => None,
        };
        cache.handle_event(event);
        previous
    }
}

impl<M: MessageIdentity + Clone> SharedConversationCache<M> {
    /// Detached copy of one stored message.
    pub fn message(&self, chat_id: &str, message_id: &str) -> Option<M> {
        self.read().message(chat_id, message_id).cloned()
    }
}

impl<M: MessageTimestamp + Clone> SharedConversationCache<M> {
    /// See [`ConversationCache::chat_previews`].
    pub fn chat_previews(&self) -> Vec<ChatPreview<M>> {
        self.read().chat_previews()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::types::{ChatMessage, DeliveryStatus};

    fn msg(id: &str) -> ChatMessage {
        ChatMessage {
            id: Some(id.to_owned()),
            sender: "@alice:example.org".to_owned(),
            body: "hello".to_owned(),
            status: DeliveryStatus::Sent,
            timestamp_ms: 1_731_000_000,
        }
    }

    #[test]
    fn snapshots_are_detached_from_later_mutations() {
        let cache = SharedConversationCache::new(10);
        cache.append("c1", msg("m1"));
        let snapshot = cache.messages("c1");

        cache.append("c1", msg("m2"));
        cache.clear("c1");

        assert_eq!(snapshot.len(), 1);
        assert!(cache.messages("c1").is_empty());
    }

    #[test]
    fn clones_share_one_cache() {
        let a = SharedConversationCache::default();
        let b = a.clone();
        a.set_messages("c1", vec![msg("m1"), msg("m2")]);
        a.set_active_chat("c1");
        b.set_active_chat("c2");

        assert_eq!(a.active_chat_id().as_deref(), Some("c2"));
        assert_eq!(a.messages("c1").len(), 1);
        assert_eq!(b.message("c1", "m2").and_then(|m| m.id), Some("m2".into()));
    }

    #[test]
    fn concurrent_writers_keep_cap_and_unique_ids() {
        let cache: SharedConversationCache<ChatMessage> = SharedConversationCache::new(50);
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for n in 0..200 {
                        cache.upsert("c1", msg(&format!("m{}", (worker * 7 + n) % 40)));
                        cache.append("c2", msg(&format!("w{worker}-{n}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread should finish");
        }

        let c1 = cache.messages("c1");
        let mut c1_ids: Vec<_> = c1.iter().filter_map(|m| m.id.clone()).collect();
        c1_ids.sort();
        c1_ids.dedup();
        assert_eq!(c1_ids.len(), c1.len());
        assert!(c1.len() <= 50);
        assert_eq!(cache.messages("c2").len(), 50);
        assert_eq!(cache.total_messages(), c1.len() + 50);
    }

    #[test]
    fn handles_events_and_previews_through_handle() {
        let cache = SharedConversationCache::new(5);
        cache.handle_event(CacheEvent::ChatDelta {
            chat_id: "c1".into(),
            ops: vec![CacheOp::Append(msg("m1")), CacheOp::Prepend(vec![msg("o1")])],
        });
        cache.apply_ops("c2", [CacheOp::Upsert(msg("x"))]);

        assert_eq!(cache.max_per_chat(), 5);
        assert_eq!(cache.chat_previews().len(), 2);
        assert_eq!(cache.with_read(|inner| inner.messages("c1").len()), 2);
        cache.prepend("c1", vec![msg("o0")]);
        assert_eq!(cache.messages("c1")[0].id.as_deref(), Some("o0"));
    }

    #[test]
    fn reports_chat_switched_away_from() {
        let cache: SharedConversationCache<ChatMessage> = SharedConversationCache::default();
        let switch = |chat_id: &str| CacheEvent::ActiveChatChanged {
            chat_id: chat_id.to_owned(),
        };

        assert_eq!(cache.handle_event_tracking_switch(switch("a")), None);
        assert_eq!(cache.handle_event_tracking_switch(switch("a")), None);
        assert_eq!(
            cache.handle_event_tracking_switch(switch("b")).as_deref(),
            Some("a")
        );
        let delta = CacheEvent::ChatDelta {
            chat_id: "b".into(),
            ops: vec![CacheOp::Append(msg("m1"))],
        };
        assert_eq!(cache.handle_event_tracking_switch(delta), None);
        assert_eq!(cache.messages("b").len(), 1);
    }
}
