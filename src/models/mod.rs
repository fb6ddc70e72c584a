pub mod conversation;
pub mod message;
pub mod summary;

pub use conversation::{Conversation, ConversationStatus};
pub use message::{MessageBody, MessageRecord, SenderRole};
pub use summary::{recency_label, ConversationSummary};
