//! Per-conversation message cache shared between event ingestion and rendering.
//!
//! This crate defines the bounded chat-keyed cache, the message identity
//! capability it relies on, the op/event protocol fed by the backend, a
//! thread-safe handle and the ingestion channel plumbing.

/// Bounded chat-keyed message cache.
pub mod cache;
/// Ingestion channel primitives and the ingest loop.
pub mod channel;
/// Message identity and ordering capabilities.
pub mod identity;
/// Lock-guarded cache handle.
pub mod shared;
/// Chat-list previews.
pub mod summary;
/// Protocol types (ops, events, notifications, message payload).
pub mod types;

pub use cache::{ConversationCache, DEFAULT_MAX_MESSAGES_PER_CHAT};
pub use channel::{IngestChannelError, IngestChannels, NotificationStream, run_ingest_loop};
pub use identity::{MessageIdentity, MessageTimestamp};
pub use shared::SharedConversationCache;
pub use summary::ChatPreview;
pub use types::{CacheEvent, CacheNotification, CacheOp, ChatMessage, DeliveryStatus};
