use super::{Backend, ConversationChange, ConversationChangeKind};
use crate::models::{Conversation, ConversationStatus, MessageRecord, SenderRole};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

const FEED_CAPACITY: usize = 256;

/// SQLite-backed implementation of the backend surface. Change feeds are
/// broadcast channels fed by the write paths; a receiver that falls more
/// than `FEED_CAPACITY` events behind observes a lag, not a missed-forever
/// event stream.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    message_tx: broadcast::Sender<MessageRecord>,
    conversation_tx: broadcast::Sender<ConversationChange>,
}

impl SqliteBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        let (message_tx, _) = broadcast::channel(FEED_CAPACITY);
        let (conversation_tx, _) = broadcast::channel(FEED_CAPACITY);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            message_tx,
            conversation_tx,
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_updated_at
                ON conversations(updated_at);

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_conversation
                ON messages(conversation_id, created_at);
            "#,
        )?;
        Ok(())
    }

    fn notify_conversation(&self, conversation_id: &str, kind: ConversationChangeKind) {
        let _ = self.conversation_tx.send(ConversationChange {
            conversation_id: conversation_id.to_string(),
            kind,
        });
    }
}

fn timestamp(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn conversation_from_row(id: String, status: String, created: i64, updated: i64) -> Result<Conversation> {
    Ok(Conversation {
        id,
        status: ConversationStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown conversation status: {status}"))?,
        created_at: timestamp(created),
        updated_at: timestamp(updated),
    })
}

fn message_from_row(
    id: String,
    conversation_id: String,
    sender: String,
    content: String,
    created: i64,
) -> Result<MessageRecord> {
    Ok(MessageRecord {
        id,
        conversation_id,
        sender: SenderRole::parse(&sender).ok_or_else(|| anyhow!("unknown sender role: {sender}"))?,
        content,
        created_at: timestamp(created),
    })
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, status, created_at, updated_at FROM conversations WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, status, created, updated)| conversation_from_row(id, status, created, updated))
            .transpose()
    }

    async fn create_conversation(&self) -> Result<Conversation> {
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            status: ConversationStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO conversations (id, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    conversation.id,
                    conversation.status.as_str(),
                    conversation.created_at.timestamp_millis(),
                    conversation.updated_at.timestamp_millis(),
                ],
            )?;
        }
        debug!("created conversation {}", conversation.id);
        self.notify_conversation(&conversation.id, ConversationChangeKind::Inserted);
        Ok(conversation)
    }

    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let changed = {
            let conn = self.conn.lock();
            conn.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![at.timestamp_millis(), id],
            )?
        };
        if changed == 0 {
            return Err(anyhow!("conversation {id} not found"));
        }
        self.notify_conversation(id, ConversationChangeKind::Updated);
        Ok(())
    }

    async fn list_conversations(&self, limit: usize) -> Result<Vec<Conversation>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, status, created_at, updated_at FROM conversations
             ORDER BY updated_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;
        let mut conversations = Vec::new();
        for row in rows {
            let (id, status, created, updated) = row?;
            conversations.push(conversation_from_row(id, status, created, updated)?);
        }
        Ok(conversations)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<MessageRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, sender, content, created_at FROM messages
             WHERE conversation_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![conversation_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        let mut messages = Vec::new();
        for row in rows {
            let (id, conversation_id, sender, content, created) = row?;
            messages.push(message_from_row(id, conversation_id, sender, content, created)?);
        }
        Ok(messages)
    }

    async fn latest_message(&self, conversation_id: &str) -> Result<Option<MessageRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, conversation_id, sender, content, created_at FROM messages
                 WHERE conversation_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![conversation_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, conversation_id, sender, content, created)| {
            message_from_row(id, conversation_id, sender, content, created)
        })
        .transpose()
    }

    async fn insert_message(
        &self,
        conversation_id: &str,
        sender: SenderRole,
        content: &str,
    ) -> Result<MessageRecord> {
        let record = MessageRecord {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.conversation_id,
                    record.sender.as_str(),
                    record.content,
                    record.created_at.timestamp_millis(),
                ],
            )?;
        }
        debug!(
            "inserted message {} into conversation {}",
            record.id, record.conversation_id
        );
        let _ = self.message_tx.send(record.clone());
        Ok(record)
    }

    fn message_feed(&self) -> broadcast::Receiver<MessageRecord> {
        self.message_tx.subscribe()
    }

    fn conversation_feed(&self) -> broadcast::Receiver<ConversationChange> {
        self.conversation_tx.subscribe()
    }
}
