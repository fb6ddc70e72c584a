use crate::models::{MessageBody, MessageRecord, SenderRole};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

/// Identity of a timeline entry. Confirmed rows carry the server id;
/// in-flight optimistic sends carry a locally assigned sequence number,
/// which can never collide with a server id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryId {
    Pending(u64),
    Confirmed(String),
}

/// Opaque handle to an in-flight optimistic send, resolved by
/// `confirm_send` or `fail_send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(u64);

#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub id: EntryId,
    pub sender: SenderRole,
    pub body: MessageBody,
    pub timestamp: DateTime<Utc>,
}

impl TimelineEntry {
    pub fn is_pending(&self) -> bool {
        matches!(self.id, EntryId::Pending(_))
    }

    fn from_record(record: &MessageRecord) -> Self {
        Self {
            id: EntryId::Confirmed(record.id.clone()),
            sender: record.sender,
            body: record.body(),
            timestamp: record.created_at,
        }
    }

    /// Order key: creation time, then confirmed before pending on a tie,
    /// then server id.
    fn sort_key(&self) -> (i64, u8, &str) {
        match &self.id {
            EntryId::Confirmed(id) => (self.timestamp.timestamp_millis(), 0, id.as_str()),
            EntryId::Pending(_) => (self.timestamp.timestamp_millis(), 1, ""),
        }
    }
}

/// The ordered, de-duplicated message view for the open conversation.
///
/// All three message sources — seeded history, optimistic local echoes and
/// push-delivered inserts — merge here and nowhere else. Callers run on one
/// thread and never re-enter a merge, so each operation observes the
/// previous one completed.
#[derive(Default)]
pub struct Timeline {
    conversation_id: Option<String>,
    entries: Vec<TimelineEntry>,
    confirmed_ids: HashSet<String>,
    pending_ids: HashSet<u64>,
    next_pending: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending_ids.len()
    }

    pub fn contains_message(&self, server_id: &str) -> bool {
        self.confirmed_ids.contains(server_id)
    }

    /// Replace the view with freshly loaded history (conversation switch).
    /// Optimistic entries belong to the previous conversation and are
    /// dropped, not merged.
    pub fn seed(&mut self, conversation_id: &str, history: Vec<MessageRecord>) {
        self.conversation_id = Some(conversation_id.to_string());
        self.entries.clear();
        self.confirmed_ids.clear();
        self.pending_ids.clear();
        for record in &history {
            if record.conversation_id != conversation_id {
                continue;
            }
            if !self.confirmed_ids.insert(record.id.clone()) {
                continue;
            }
            self.entries.push(TimelineEntry::from_record(record));
        }
        self.entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    /// Append the local echo for a send, visible immediately at the tail.
    /// The caller resolves it later with `confirm_send` or `fail_send`.
    pub fn stage_send(&mut self, sender: SenderRole, body: MessageBody) -> PendingId {
        let seq = self.next_pending;
        self.next_pending += 1;
        self.pending_ids.insert(seq);
        self.entries.push(TimelineEntry {
            id: EntryId::Pending(seq),
            sender,
            body,
            timestamp: Utc::now(),
        });
        PendingId(seq)
    }

    /// Resolve an optimistic entry with its server-confirmed record. If the
    /// push event for the same id already landed, the record is not
    /// inserted a second time.
    pub fn confirm_send(&mut self, pending: PendingId, record: MessageRecord) {
        self.remove_pending(pending);
        self.insert_confirmed(record);
    }

    /// Roll back a failed send; the view returns to the state it had
    /// before `stage_send`.
    pub fn fail_send(&mut self, pending: PendingId) {
        self.remove_pending(pending);
    }

    /// Merge a push-delivered insert. Events for another conversation
    /// (late arrivals after a switch) and ids already present are
    /// discarded.
    pub fn apply_push(&mut self, record: MessageRecord) {
        if self.conversation_id.as_deref() != Some(record.conversation_id.as_str()) {
            debug!(
                "discarding push for inactive conversation {}",
                record.conversation_id
            );
            return;
        }
        self.insert_confirmed(record);
    }

    fn insert_confirmed(&mut self, record: MessageRecord) {
        if self.conversation_id.as_deref() != Some(record.conversation_id.as_str()) {
            return;
        }
        if !self.confirmed_ids.insert(record.id.clone()) {
            debug!("duplicate message {} discarded", record.id);
            return;
        }
        let entry = TimelineEntry::from_record(&record);
        let pos = self
            .entries
            .partition_point(|existing| existing.sort_key() <= entry.sort_key());
        self.entries.insert(pos, entry);
    }

    fn remove_pending(&mut self, pending: PendingId) {
        if self.pending_ids.remove(&pending.0) {
            self.entries.retain(|e| e.id != EntryId::Pending(pending.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, conversation: &str, at_ms: i64, text: &str) -> MessageRecord {
        MessageRecord {
            id: id.to_string(),
            conversation_id: conversation.to_string(),
            sender: SenderRole::Agent,
            content: text.to_string(),
            created_at: DateTime::from_timestamp_millis(at_ms).unwrap(),
        }
    }

    fn texts(timeline: &Timeline) -> Vec<String> {
        timeline
            .entries()
            .iter()
            .map(|e| e.body.preview().to_string())
            .collect()
    }

    fn assert_no_duplicate_server_ids(timeline: &Timeline) {
        let mut seen = HashSet::new();
        for entry in timeline.entries() {
            if let EntryId::Confirmed(id) = &entry.id {
                assert!(seen.insert(id.clone()), "duplicate server id {id}");
            }
        }
    }

    #[test]
    fn test_optimistic_success() {
        let mut timeline = Timeline::new();
        timeline.seed("c1", vec![]);

        let pending = timeline.stage_send(SenderRole::Customer, MessageBody::Text("Hello".into()));
        assert_eq!(timeline.entries().len(), 1);
        assert!(timeline.entries()[0].is_pending());

        timeline.confirm_send(pending, record("m1", "c1", 1_000, "Hello"));
        assert_eq!(timeline.entries().len(), 1);
        assert_eq!(timeline.entries()[0].id, EntryId::Confirmed("m1".into()));
        assert_eq!(timeline.pending_count(), 0);

        // The push event for the same insert arrives afterwards.
        timeline.apply_push(record("m1", "c1", 1_000, "Hello"));
        assert_eq!(timeline.entries().len(), 1);
        assert_no_duplicate_server_ids(&timeline);
    }

    #[test]
    fn test_optimistic_failure_rolls_back() {
        let mut timeline = Timeline::new();
        timeline.seed("c1", vec![]);

        let pending = timeline.stage_send(SenderRole::Customer, MessageBody::Text("Hello".into()));
        timeline.fail_send(pending);

        assert!(timeline.is_empty());
        assert_eq!(timeline.pending_count(), 0);
    }

    #[test]
    fn test_push_wins_race_against_confirm() {
        let mut timeline = Timeline::new();
        timeline.seed("c1", vec![]);

        let pending = timeline.stage_send(SenderRole::Customer, MessageBody::Text("Hello".into()));
        timeline.apply_push(record("m1", "c1", 1_000, "Hello"));
        // Push landed first: one pending + one confirmed.
        assert_eq!(timeline.entries().len(), 2);

        timeline.confirm_send(pending, record("m1", "c1", 1_000, "Hello"));
        assert_eq!(timeline.entries().len(), 1);
        assert_eq!(timeline.entries()[0].id, EntryId::Confirmed("m1".into()));
        assert_no_duplicate_server_ids(&timeline);
    }

    #[test]
    fn test_duplicate_push_is_idempotent() {
        let mut timeline = Timeline::new();
        timeline.seed("c1", vec![]);

        timeline.apply_push(record("m1", "c1", 1_000, "hi"));
        timeline.apply_push(record("m1", "c1", 1_000, "hi"));

        assert_eq!(timeline.entries().len(), 1);
    }

    #[test]
    fn test_out_of_order_push_is_time_sorted() {
        let mut timeline = Timeline::new();
        timeline.seed("c1", vec![]);

        timeline.apply_push(record("m3", "c1", 3_000, "t3"));
        timeline.apply_push(record("m1", "c1", 1_000, "t1"));
        timeline.apply_push(record("m2", "c1", 2_000, "t2"));

        assert_eq!(texts(&timeline), vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_id() {
        let mut timeline = Timeline::new();
        timeline.seed("c1", vec![]);

        timeline.apply_push(record("b", "c1", 1_000, "second"));
        timeline.apply_push(record("a", "c1", 1_000, "first"));

        assert_eq!(texts(&timeline), vec!["first", "second"]);
    }

    #[test]
    fn test_seed_replaces_view_and_drops_pending() {
        let mut timeline = Timeline::new();
        timeline.seed("a", vec![record("m1", "a", 1_000, "one")]);
        timeline.stage_send(SenderRole::Customer, MessageBody::Text("draft".into()));

        timeline.seed("b", vec![record("m2", "b", 2_000, "two")]);

        assert_eq!(timeline.conversation_id(), Some("b"));
        assert_eq!(texts(&timeline), vec!["two"]);
        assert_eq!(timeline.pending_count(), 0);

        // A late push for the old conversation is discarded, not merged.
        timeline.apply_push(record("m3", "a", 3_000, "late"));
        assert_eq!(texts(&timeline), vec!["two"]);
    }

    #[test]
    fn test_confirm_after_switch_does_not_leak_old_conversation() {
        let mut timeline = Timeline::new();
        timeline.seed("a", vec![]);
        let pending = timeline.stage_send(SenderRole::Customer, MessageBody::Text("Hello".into()));

        timeline.seed("b", vec![]);
        timeline.confirm_send(pending, record("m1", "a", 1_000, "Hello"));

        assert!(timeline.is_empty());
        assert!(!timeline.contains_message("m1"));
    }

    #[test]
    fn test_seed_deduplicates_history() {
        let mut timeline = Timeline::new();
        timeline.seed(
            "c1",
            vec![
                record("m1", "c1", 1_000, "one"),
                record("m1", "c1", 1_000, "one"),
                record("m2", "other", 1_500, "stray"),
                record("m3", "c1", 2_000, "three"),
            ],
        );
        assert_eq!(texts(&timeline), vec!["one", "three"]);
    }

    #[test]
    fn test_mixed_sequence_never_duplicates_server_ids() {
        let mut timeline = Timeline::new();
        timeline.seed("c1", vec![record("m1", "c1", 1_000, "one")]);

        let p1 = timeline.stage_send(SenderRole::Customer, MessageBody::Text("two".into()));
        timeline.apply_push(record("m2", "c1", 2_000, "two"));
        timeline.confirm_send(p1, record("m2", "c1", 2_000, "two"));

        let p2 = timeline.stage_send(SenderRole::Customer, MessageBody::Text("three".into()));
        timeline.confirm_send(p2, record("m3", "c1", 3_000, "three"));
        timeline.apply_push(record("m3", "c1", 3_000, "three"));
        timeline.apply_push(record("m1", "c1", 1_000, "one"));

        assert_eq!(texts(&timeline), vec!["one", "two", "three"]);
        assert_eq!(timeline.pending_count(), 0);
        assert_no_duplicate_server_ids(&timeline);
    }

    #[test]
    fn test_pending_entry_stays_at_tail_until_confirmed() {
        let mut timeline = Timeline::new();
        timeline.seed("c1", vec![record("m1", "c1", 1_000, "one")]);

        timeline.stage_send(SenderRole::Customer, MessageBody::Text("draft".into()));
        // A push older than the pending entry lands before it.
        timeline.apply_push(record("m2", "c1", 1_500, "two"));

        assert_eq!(texts(&timeline), vec!["one", "two", "draft"]);
    }
}
