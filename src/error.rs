use thiserror::Error;

/// Failure taxonomy for the sync engine. Backend errors are wrapped at the
/// store layer; none of these may leave the timeline in a partially-applied
/// state.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No conversation could be resolved or created. Fatal to the current
    /// view; the surface shows a blocking retry prompt.
    #[error("cannot start conversation: {0}")]
    ConversationUnavailable(anyhow::Error),

    /// One message's persist step failed. The optimistic entry is rolled
    /// back and a transient notice is shown; other messages are unaffected.
    #[error("message failed to send: {0}")]
    SendFailed(anyhow::Error),

    /// A history or list fetch failed. The affected view shows an empty or
    /// error state; the rest of the application keeps running.
    #[error("failed to load {what}: {source}")]
    LoadFailed {
        what: &'static str,
        source: anyhow::Error,
    },

    /// The push channel failed to establish or dropped past the retry
    /// budget. Logged; the view keeps last-known state.
    #[error("push subscription for conversation {conversation_id} failed: {reason}")]
    Subscription {
        conversation_id: String,
        reason: String,
    },
}
