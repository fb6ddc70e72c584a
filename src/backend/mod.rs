pub mod sqlite;

pub use sqlite::SqliteBackend;

use crate::models::{Conversation, MessageRecord, SenderRole};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

/// A change on the conversation table, as delivered by the push channel.
#[derive(Debug, Clone)]
pub struct ConversationChange {
    pub conversation_id: String,
    pub kind: ConversationChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationChangeKind {
    Inserted,
    Updated,
}

/// The managed backend's query and push surface, as consumed by the sync
/// engine. Delivery on the feeds is at-least-once and not guaranteed to
/// match creation-time order; callers must reconcile.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Point lookup. `Ok(None)` when the conversation does not exist.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>>;

    /// Creates an `active` conversation with an assigned id and timestamps.
    async fn create_conversation(&self) -> Result<Conversation>;

    /// Bumps a conversation's `updated_at`.
    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Conversations ordered by `updated_at` descending, at most `limit`.
    async fn list_conversations(&self, limit: usize) -> Result<Vec<Conversation>>;

    /// All messages of one conversation, `created_at` ascending.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<MessageRecord>>;

    /// The single most recent message of a conversation, if any.
    async fn latest_message(&self, conversation_id: &str) -> Result<Option<MessageRecord>>;

    /// Persists one message and returns the stored record with its
    /// assigned id and creation time. Does not touch the conversation row.
    async fn insert_message(
        &self,
        conversation_id: &str,
        sender: SenderRole,
        content: &str,
    ) -> Result<MessageRecord>;

    /// Insert events for the message table, unfiltered; subscribers narrow
    /// to their conversation.
    fn message_feed(&self) -> broadcast::Receiver<MessageRecord>;

    /// All-event changes on the conversation table.
    fn conversation_feed(&self) -> broadcast::Receiver<ConversationChange>;
}
