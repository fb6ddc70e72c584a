use crate::backend::Backend;
use crate::error::ChatError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Owns the durable "current conversation id" for the customer session.
///
/// The id lives in a single small file under the data dir, read at startup
/// and rewritten whenever a new conversation is created. A persisted id
/// whose conversation no longer exists is discarded and replaced.
pub struct IdentityStore {
    path: PathBuf,
    backend: Arc<dyn Backend>,
}

impl IdentityStore {
    pub fn new(path: PathBuf, backend: Arc<dyn Backend>) -> Self {
        Self { path, backend }
    }

    /// Returns a live conversation id. A cached id is validated with a
    /// point lookup; on not-found or lookup error it is cleared and a
    /// fresh conversation is created. Calling twice without an intervening
    /// failure returns the same id.
    pub async fn resolve(&self) -> Result<String, ChatError> {
        if let Some(id) = self.persisted_id() {
            match self.backend.get_conversation(&id).await {
                Ok(Some(_)) => return Ok(id),
                Ok(None) => {
                    warn!("persisted conversation {id} no longer exists, starting over");
                    self.clear();
                }
                Err(e) => {
                    warn!("conversation lookup for {id} failed: {e:#}");
                    self.clear();
                }
            }
        }
        self.create().await
    }

    /// Creates a new active conversation and persists its id.
    pub async fn create(&self) -> Result<String, ChatError> {
        let conversation = self
            .backend
            .create_conversation()
            .await
            .map_err(ChatError::ConversationUnavailable)?;
        self.persist(&conversation.id);
        info!("started conversation {}", conversation.id);
        Ok(conversation.id)
    }

    fn persisted_id(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let id = raw.trim().to_string();
        (!id.is_empty()).then_some(id)
    }

    fn persist(&self, id: &str) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&self.path, id) {
            warn!("failed to persist conversation id: {e}");
        }
    }

    fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use tempfile::tempdir;

    fn store(dir: &std::path::Path) -> (IdentityStore, Arc<SqliteBackend>) {
        let backend = Arc::new(SqliteBackend::in_memory().unwrap());
        let store = IdentityStore::new(dir.join("conversation_id"), backend.clone());
        (store, backend)
    }

    #[tokio::test]
    async fn test_resolve_creates_and_persists() {
        let dir = tempdir().unwrap();
        let (store, backend) = store(dir.path());

        let id = store.resolve().await.unwrap();
        assert!(backend.get_conversation(&id).await.unwrap().is_some());

        let persisted = std::fs::read_to_string(dir.path().join("conversation_id")).unwrap();
        assert_eq!(persisted, id);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let dir = tempdir().unwrap();
        let (store, _backend) = store(dir.path());

        let first = store.resolve().await.unwrap();
        let second = store.resolve().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stale_persisted_id_is_replaced() {
        let dir = tempdir().unwrap();
        let (store, backend) = store(dir.path());
        std::fs::write(dir.path().join("conversation_id"), "deleted-conversation").unwrap();

        let id = store.resolve().await.unwrap();
        assert_ne!(id, "deleted-conversation");
        assert!(backend.get_conversation(&id).await.unwrap().is_some());

        let persisted = std::fs::read_to_string(dir.path().join("conversation_id")).unwrap();
        assert_eq!(persisted, id);
    }
}
