use crate::constants::{IMAGE_SENTINEL_PREFIX, IMAGE_SENTINEL_SUFFIX};
use chrono::{DateTime, Utc};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderRole {
    Customer,
    Agent,
    System,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Customer => "customer",
            SenderRole::Agent => "agent",
            SenderRole::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(SenderRole::Customer),
            "agent" => Some(SenderRole::Agent),
            "system" => Some(SenderRole::System),
            _ => None,
        }
    }
}

/// A server-confirmed message row. Immutable once persisted; ordering is
/// by `created_at`, ties broken by `id`.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub sender: SenderRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn body(&self) -> MessageBody {
        MessageBody::decode(&self.content)
    }
}

/// Decoded form of a message's wire content. Images travel as a data URI
/// wrapped in the `[IMAGE:...]` sentinel; everything else is plain text.
/// A sent emoji is wire-identical to text, so decoding cannot recover the
/// `Emoji` variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    Emoji(String),
    Image(String),
}

impl MessageBody {
    pub fn encode(&self) -> String {
        match self {
            MessageBody::Text(s) | MessageBody::Emoji(s) => s.clone(),
            MessageBody::Image(data) => {
                format!("{IMAGE_SENTINEL_PREFIX}{data}{IMAGE_SENTINEL_SUFFIX}")
            }
        }
    }

    /// A payload that does not match the sentinel exactly is always plain
    /// text, never an image.
    pub fn decode(content: &str) -> Self {
        if let Some(rest) = content.strip_prefix(IMAGE_SENTINEL_PREFIX) {
            if let Some(data) = rest.strip_suffix(IMAGE_SENTINEL_SUFFIX) {
                return MessageBody::Image(data.to_string());
            }
        }
        MessageBody::Text(content.to_string())
    }

    /// One-line rendering for list previews.
    pub fn preview(&self) -> &str {
        match self {
            MessageBody::Text(s) | MessageBody::Emoji(s) => s,
            MessageBody::Image(_) => "[image]",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_round_trip() {
        let data = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==";
        let body = MessageBody::Image(data.to_string());
        let wire = body.encode();
        assert_eq!(wire, format!("[IMAGE:{data}]"));
        assert_eq!(MessageBody::decode(&wire), body);
    }

    #[test]
    fn test_image_round_trip_with_embedded_bracket() {
        let data = "data:image/png;base64,ab]cd";
        let wire = MessageBody::Image(data.to_string()).encode();
        assert_eq!(
            MessageBody::decode(&wire),
            MessageBody::Image(data.to_string())
        );
    }

    #[test]
    fn test_plain_text_is_never_an_image() {
        for content in ["hello", "[IMAGE:unterminated", "IMAGE:not-wrapped]", ""] {
            assert_eq!(
                MessageBody::decode(content),
                MessageBody::Text(content.to_string())
            );
        }
    }

    #[test]
    fn test_emoji_encodes_as_bare_text() {
        let body = MessageBody::Emoji("🥰".to_string());
        assert_eq!(body.encode(), "🥰");
        assert_eq!(MessageBody::decode("🥰"), MessageBody::Text("🥰".to_string()));
    }

    #[test]
    fn test_sender_role_round_trip() {
        for role in [SenderRole::Customer, SenderRole::Agent, SenderRole::System] {
            assert_eq!(SenderRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(SenderRole::parse("bot"), None);
    }
}
