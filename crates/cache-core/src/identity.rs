/// Minimal capability the cache needs from a message payload.
///
/// The id must stay stable across updates of the same logical message (edits,
/// delivery receipts). Messages without an id are accepted but can never be
/// matched by [`ConversationCache::upsert`](crate::ConversationCache::upsert).
pub trait MessageIdentity {
    /// Stable message id, if the payload carries one.
    fn message_id(&self) -> Option<&str>;
}

/// Ordering key used when building chat previews.
pub trait MessageTimestamp {
    /// Message timestamp in milliseconds since Unix epoch.
    fn timestamp_ms(&self) -> u64;
}

impl<T: MessageIdentity + ?Sized> MessageIdentity for &T {
    fn message_id(&self) -> Option<&str> {
        (**self).message_id()
    }
}

impl<T: MessageTimestamp + ?Sized> MessageTimestamp for &T {
    fn timestamp_ms(&self) -> u64 {
        (**self).timestamp_ms()
    }
}

pub(crate) fn same_id<M: MessageIdentity>(a: &M, id: Option<&str>) -> bool {
    match (a.message_id(), id) {
        (Some(existing), Some(wanted)) => existing == wanted,
        _ => false,
    }
}
