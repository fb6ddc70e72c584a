//! Application-wide constants
//!
//! Centralized location for magic strings and configuration values
//! that are used across multiple modules.

/// Wire framing for image messages: `[IMAGE:<data uri>]`
pub const IMAGE_SENTINEL_PREFIX: &str = "[IMAGE:";
pub const IMAGE_SENTINEL_SUFFIX: &str = "]";

/// Upper bound on the console's conversation list, most recently
/// updated first.
pub const CONVERSATION_LIST_LIMIT: usize = 50;

/// Shown in the list when a conversation's latest message cannot be
/// fetched (or none exists yet).
pub const NO_MESSAGES_PLACEHOLDER: &str = "No messages yet";

/// Local greeting shown in the customer widget when a conversation has
/// no history. Never persisted.
pub const WELCOME_MESSAGE: &str =
    "Hello! Welcome to support chat. I'm your support assistant - how can I help you today?";

// Message feed reconnection (bounded exponential backoff)
pub const FEED_RECONNECT_BASE_MS: u64 = 500;
pub const FEED_RECONNECT_MAX_ATTEMPTS: u32 = 5;
