use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace};

use crate::{
    identity::MessageIdentity,
    shared::SharedConversationCache,
    types::{CacheEvent, CacheNotification},
};

/// Broadcast stream of change notices for rendering subscribers.
pub type NotificationStream = broadcast::Receiver<CacheNotification>;

/// Errors returned by ingestion channel operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestChannelError {
    /// The ingestion loop is gone.
    #[error("ingest event channel is closed")]
    EventChannelClosed,
}

/// Event/notification channel pair between the backend feed, the cache and the UI.
#[derive(Debug)]
pub struct IngestChannels<M> {
    event_tx: mpsc::Sender<CacheEvent<M>>,
    notify_tx: broadcast::Sender<CacheNotification>,
}

impl<M> Clone for IngestChannels<M> {
    fn clone(&self) -> Self {
        Self {
            event_tx: self.event_tx.clone(),
            notify_tx: self.notify_tx.clone(),
        }
    }
}

impl<M> IngestChannels<M> {
    /// Create a new channel set and return it with the event receiver.
    pub fn new(
        event_buffer: usize,
        notify_buffer: usize,
    ) -> (Self, mpsc::Receiver<CacheEvent<M>>) {
        let (event_tx, event_rx) = mpsc::channel(event_buffer.max(1));
        let (notify_tx, _) = broadcast::channel(notify_buffer.max(1));

        (
            Self {
                event_tx,
                notify_tx,
            },
            event_rx,
        )
    }

    /// Clone the notification sender used by the ingestion loop.
    pub fn notifier(&self) -> broadcast::Sender<CacheNotification> {
        self.notify_tx.clone()
    }

    /// Subscribe to change notices.
    pub fn subscribe(&self) -> NotificationStream {
        self.notify_tx.subscribe()
    }

    /// Queue one event for the ingestion loop.
    pub async fn send_event(&self, event: CacheEvent<M>) -> Result<(), IngestChannelError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| IngestChannelError::EventChannelClosed)
    }
}

/// Drain `events` into `cache`, one cache call per event.
///
/// Returns the number of applied events once every sender is dropped.
/// Notifications are best-effort; having no subscribers is fine.
pub async fn run_ingest_loop<M: MessageIdentity>(
    mut events: mpsc::Receiver<CacheEvent<M>>,
    cache: SharedConversationCache<M>,
    notifier: broadcast::Sender<CacheNotification>,
) -> usize {
    let mut applied = 0_usize;
    while let Some(event) = events.recv().await {
        let notification = CacheNotification {
            chat_id: event.chat_id().to_owned(),
            active_changed: matches!(event, CacheEvent::ActiveChatChanged { .. }),
        };
        trace!(chat_id = %notification.chat_id, "ingesting cache event");
        let switched_from = cache.handle_event_tracking_switch(event);
        applied += 1;
        if let Some(prev_chat_id) = switched_from {
            trace!(%prev_chat_id, "notifying chat left on switch");
            let _ = notifier.send(CacheNotification {
                chat_id: prev_chat_id,
                active_changed: true,
            });
        }
        let _ = notifier.send(notification);
    }

    debug!(applied, "ingest loop finished; event senders closed");
    applied
}
