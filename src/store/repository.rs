use crate::backend::Backend;
use crate::error::ChatError;
use crate::models::{MessageBody, MessageRecord, SenderRole};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

/// Stateless read/write access to one conversation's message rows.
pub struct MessageRepository {
    backend: Arc<dyn Backend>,
}

impl MessageRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// All messages for the conversation, oldest first. No messages is an
    /// empty vec, not an error.
    pub async fn load_history(&self, conversation_id: &str) -> Result<Vec<MessageRecord>, ChatError> {
        self.backend
            .list_messages(conversation_id)
            .await
            .map_err(|e| ChatError::LoadFailed {
                what: "message history",
                source: e,
            })
    }

    /// Inserts the message, then bumps the conversation's `updated_at`.
    /// The bump is a separate write: when it fails the insert stands and
    /// the failure is only logged — the two steps are not atomic on the
    /// backend.
    pub async fn append(
        &self,
        conversation_id: &str,
        sender: SenderRole,
        body: &MessageBody,
    ) -> Result<MessageRecord, ChatError> {
        let record = self
            .backend
            .insert_message(conversation_id, sender, &body.encode())
            .await
            .map_err(ChatError::SendFailed)?;
        if let Err(e) = self.backend.touch_conversation(conversation_id, Utc::now()).await {
            warn!("failed to bump updated_at for conversation {conversation_id}: {e:#}");
        }
        Ok(record)
    }
}
