use crate::backend::{Backend, ConversationChange};
use crate::constants::{CONVERSATION_LIST_LIMIT, NO_MESSAGES_PLACEHOLDER};
use crate::error::ChatError;
use crate::models::{recency_label, ConversationSummary};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// Console-side conversation list, re-derived from the conversation table
/// whenever its change feed fires.
pub struct SummaryList {
    backend: Arc<dyn Backend>,
    changes: broadcast::Receiver<ConversationChange>,
    summaries: Vec<ConversationSummary>,
}

impl SummaryList {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let changes = backend.conversation_feed();
        Self {
            backend,
            changes,
            summaries: Vec::new(),
        }
    }

    pub fn summaries(&self) -> &[ConversationSummary] {
        &self.summaries
    }

    /// Reloads the 50 most recently updated conversations and, for each,
    /// the single latest message for the preview. A failed preview lookup
    /// degrades to a placeholder; the conversation stays in the list.
    pub async fn refresh(&mut self) -> Result<(), ChatError> {
        let conversations = self
            .backend
            .list_conversations(CONVERSATION_LIST_LIMIT)
            .await
            .map_err(|e| ChatError::LoadFailed {
                what: "conversation list",
                source: e,
            })?;
        let now = Utc::now();
        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let preview = match self.backend.latest_message(&conversation.id).await {
                Ok(Some(message)) => message.body().preview().to_string(),
                Ok(None) => NO_MESSAGES_PLACEHOLDER.to_string(),
                Err(e) => {
                    warn!(
                        "latest-message lookup failed for conversation {}: {e:#}",
                        conversation.id
                    );
                    NO_MESSAGES_PLACEHOLDER.to_string()
                }
            };
            let short = &conversation.id[..8.min(conversation.id.len())];
            summaries.push(ConversationSummary {
                customer_label: format!("Customer {short}"),
                preview,
                status: conversation.status,
                updated_at: conversation.updated_at,
                recency: recency_label(conversation.updated_at, now),
                id: conversation.id,
            });
        }
        self.summaries = summaries;
        Ok(())
    }

    /// Drains pending change events and reloads once if any arrived.
    /// Returns whether the list changed.
    pub async fn poll(&mut self) -> Result<bool, ChatError> {
        let mut dirty = false;
        loop {
            match self.changes.try_recv() {
                Ok(_) => dirty = true,
                Err(broadcast::error::TryRecvError::Lagged(_)) => dirty = true,
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
        if dirty {
            self.refresh().await?;
        }
        Ok(dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use crate::models::{ConversationStatus, SenderRole};

    #[tokio::test]
    async fn test_refresh_builds_previews_and_placeholders() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        let quiet = backend.create_conversation().await.unwrap();
        let busy = backend.create_conversation().await.unwrap();
        backend
            .insert_message(&busy.id, SenderRole::Customer, "need help")
            .await
            .unwrap();
        backend
            .touch_conversation(&busy.id, Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();

        let mut list = SummaryList::new(backend.clone());
        list.refresh().await.unwrap();

        let summaries = list.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, busy.id);
        assert_eq!(summaries[0].preview, "need help");
        assert_eq!(summaries[0].status, ConversationStatus::Active);
        assert_eq!(summaries[0].recency, "just now");
        assert_eq!(summaries[1].id, quiet.id);
        assert_eq!(summaries[1].preview, NO_MESSAGES_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_image_preview_is_not_the_raw_payload() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        let conversation = backend.create_conversation().await.unwrap();
        backend
            .insert_message(
                &conversation.id,
                SenderRole::Customer,
                "[IMAGE:data:image/png;base64,AAAA]",
            )
            .await
            .unwrap();

        let mut list = SummaryList::new(backend);
        list.refresh().await.unwrap();
        assert_eq!(list.summaries()[0].preview, "[image]");
    }

    #[tokio::test]
    async fn test_poll_reloads_only_after_a_change() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        let mut list = SummaryList::new(backend.clone());
        list.refresh().await.unwrap();
        assert!(list.summaries().is_empty());

        assert!(!list.poll().await.unwrap());

        backend.create_conversation().await.unwrap();
        assert!(list.poll().await.unwrap());
        assert_eq!(list.summaries().len(), 1);

        assert!(!list.poll().await.unwrap());
    }
}
