use crate::backend::Backend;
use crate::constants::{FEED_RECONNECT_BASE_MS, FEED_RECONNECT_MAX_ATTEMPTS};
use crate::error::ChatError;
use crate::models::MessageRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

struct FeedHandle {
    conversation_id: String,
    task: JoinHandle<()>,
}

/// Maintains at most one live message subscription for the mounted
/// conversation view. The handle is owned explicitly and closed before any
/// replacement — never two subscriptions live at once.
pub struct ChangeFeedSubscriber {
    backend: Arc<dyn Backend>,
    runtime: tokio::runtime::Handle,
    active: Option<FeedHandle>,
}

impl ChangeFeedSubscriber {
    /// `runtime` hosts the forwarder tasks; the UI loop that calls
    /// `attach` runs outside the runtime.
    pub fn new(backend: Arc<dyn Backend>, runtime: tokio::runtime::Handle) -> Self {
        Self {
            backend,
            runtime,
            active: None,
        }
    }

    /// Opens the subscription for `conversation_id`, closing any previous
    /// one first. Inserts arrive on the returned channel in delivery
    /// order, which may not be creation-time order; final ordering is the
    /// timeline's job.
    pub fn attach(&mut self, conversation_id: &str) -> mpsc::UnboundedReceiver<MessageRecord> {
        self.detach();
        let (tx, rx) = mpsc::unbounded_channel();
        let feed = self.backend.message_feed();
        let backend = self.backend.clone();
        let id = conversation_id.to_string();
        debug!("attaching message feed for conversation {id}");
        let task = self.runtime.spawn(forward(backend, feed, id.clone(), tx));
        self.active = Some(FeedHandle {
            conversation_id: id,
            task,
        });
        rx
    }

    /// Closes the active subscription. Idempotent; called on view teardown
    /// and before every conversation switch.
    pub fn detach(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.task.abort();
            debug!(
                "detached message feed for conversation {}",
                handle.conversation_id
            );
        }
    }

    pub fn attached_to(&self) -> Option<&str> {
        self.active.as_ref().map(|h| h.conversation_id.as_str())
    }
}

/// Pumps backend insert events into the view's single-consumer channel,
/// narrowed to one conversation. A lagged broadcast is logged and skipped;
/// a closed feed is re-subscribed with bounded exponential backoff.
async fn forward(
    backend: Arc<dyn Backend>,
    mut feed: broadcast::Receiver<MessageRecord>,
    conversation_id: String,
    tx: mpsc::UnboundedSender<MessageRecord>,
) {
    let mut attempts = 0u32;
    loop {
        match feed.recv().await {
            Ok(record) => {
                attempts = 0;
                if record.conversation_id != conversation_id {
                    continue;
                }
                if tx.send(record).is_err() {
                    // View is gone; nothing left to deliver to.
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("message feed for {conversation_id} lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => {
                if attempts >= FEED_RECONNECT_MAX_ATTEMPTS {
                    let err = ChatError::Subscription {
                        conversation_id,
                        reason: "feed closed and reconnect budget exhausted".to_string(),
                    };
                    error!("{err}");
                    return;
                }
                let delay = FEED_RECONNECT_BASE_MS << attempts;
                attempts += 1;
                warn!(
                    "message feed for {conversation_id} closed, resubscribing in {delay}ms \
                     (attempt {attempts}/{FEED_RECONNECT_MAX_ATTEMPTS})"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
                feed = backend.message_feed();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use crate::models::SenderRole;

    async fn recv(
        rx: &mut mpsc::UnboundedReceiver<MessageRecord>,
    ) -> Option<MessageRecord> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for feed delivery")
    }

    #[tokio::test]
    async fn test_attach_delivers_inserts_for_the_conversation() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        let ours = backend.create_conversation().await.unwrap();
        let theirs = backend.create_conversation().await.unwrap();

        let mut subscriber =
            ChangeFeedSubscriber::new(backend.clone(), tokio::runtime::Handle::current());
        let mut rx = subscriber.attach(&ours.id);
        assert_eq!(subscriber.attached_to(), Some(ours.id.as_str()));

        backend
            .insert_message(&theirs.id, SenderRole::Customer, "not for us")
            .await
            .unwrap();
        let expected = backend
            .insert_message(&ours.id, SenderRole::Agent, "for us")
            .await
            .unwrap();

        let delivered = recv(&mut rx).await.unwrap();
        assert_eq!(delivered.id, expected.id);
        assert_eq!(delivered.conversation_id, ours.id);
    }

    #[tokio::test]
    async fn test_reattach_replaces_the_previous_subscription() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        let a = backend.create_conversation().await.unwrap();
        let b = backend.create_conversation().await.unwrap();

        let mut subscriber =
            ChangeFeedSubscriber::new(backend.clone(), tokio::runtime::Handle::current());
        let mut rx_a = subscriber.attach(&a.id);
        let mut rx_b = subscriber.attach(&b.id);
        assert_eq!(subscriber.attached_to(), Some(b.id.as_str()));

        // The old channel closes once its forwarder is gone.
        assert!(recv(&mut rx_a).await.is_none());

        let expected = backend
            .insert_message(&b.id, SenderRole::Customer, "hello")
            .await
            .unwrap();
        assert_eq!(recv(&mut rx_b).await.unwrap().id, expected.id);
    }

    #[tokio::test]
    async fn test_detach_is_idempotent_and_stops_delivery() {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        let conversation = backend.create_conversation().await.unwrap();

        let mut subscriber =
            ChangeFeedSubscriber::new(backend.clone(), tokio::runtime::Handle::current());
        let mut rx = subscriber.attach(&conversation.id);
        subscriber.detach();
        subscriber.detach();
        assert_eq!(subscriber.attached_to(), None);

        backend
            .insert_message(&conversation.id, SenderRole::Agent, "after detach")
            .await
            .unwrap();
        assert!(recv(&mut rx).await.is_none());
    }
}
