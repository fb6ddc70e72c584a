use crate::backend::Backend;
use crate::config::Config;
use crate::models::{ConversationSummary, MessageRecord};
use crate::store::{ChangeFeedSubscriber, IdentityStore, MessageRepository, SummaryList, Timeline};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Which of the two surfaces this process renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Customer,
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub running: bool,
    pub surface: Surface,
    pub input_mode: InputMode,
    pub input: String,
    pub cursor_position: usize,
    pub status_message: Option<String>,

    pub identity: IdentityStore,
    pub repository: MessageRepository,
    pub subscriber: ChangeFeedSubscriber,
    pub timeline: Timeline,
    pub feed_rx: Option<UnboundedReceiver<MessageRecord>>,

    // Console state
    pub summary_list: SummaryList,
    pub selected_conversation_index: usize,
    pub showing_quick_replies: bool,
    pub quick_reply_index: usize,

    // Customer state
    pub showing_emoji_picker: bool,
    pub emoji_index: usize,
    /// Set when no conversation can be resolved or created; blocks the
    /// customer surface behind a retry prompt.
    pub fatal_error: Option<String>,
}

impl App {
    pub fn new(
        surface: Surface,
        backend: Arc<dyn Backend>,
        runtime: tokio::runtime::Handle,
        config: &Config,
    ) -> Self {
        Self {
            running: true,
            surface,
            input_mode: InputMode::Normal,
            input: String::new(),
            cursor_position: 0,
            status_message: None,

            identity: IdentityStore::new(config.identity_path(), backend.clone()),
            repository: MessageRepository::new(backend.clone()),
            subscriber: ChangeFeedSubscriber::new(backend.clone(), runtime),
            timeline: Timeline::new(),
            feed_rx: None,

            summary_list: SummaryList::new(backend),
            selected_conversation_index: 0,
            showing_quick_replies: false,
            quick_reply_index: 0,

            showing_emoji_picker: false,
            emoji_index: 0,
            fatal_error: None,
        }
    }

    /// Pushes everything the live feed delivered since the last tick
    /// through the timeline, in arrival order.
    pub fn drain_feed(&mut self) {
        if let Some(rx) = self.feed_rx.as_mut() {
            while let Ok(record) = rx.try_recv() {
                self.timeline.apply_push(record);
            }
        }
    }

    pub fn selected_summary(&self) -> Option<&ConversationSummary> {
        self.summary_list.summaries().get(self.selected_conversation_index)
    }

    pub fn clamp_selection(&mut self) {
        let len = self.summary_list.summaries().len();
        if len == 0 {
            self.selected_conversation_index = 0;
        } else if self.selected_conversation_index >= len {
            self.selected_conversation_index = len - 1;
        }
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn move_cursor_left(&mut self) {
        if let Some(c) = self.input[..self.cursor_position].chars().next_back() {
            self.cursor_position -= c.len_utf8();
        }
    }

    pub fn move_cursor_right(&mut self) {
        if let Some(c) = self.input[self.cursor_position..].chars().next() {
            self.cursor_position += c.len_utf8();
        }
    }

    pub fn enter_char(&mut self, c: char) {
        self.input.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 && !self.input.is_empty() {
            let prev = self.input[..self.cursor_position]
                .chars()
                .next_back()
                .map(|c| c.len_utf8())
                .unwrap_or(0);
            self.cursor_position -= prev;
            self.input.remove(self.cursor_position);
        }
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
    }

    pub fn submit_input(&mut self) -> String {
        let input = self.input.clone();
        self.clear_input();
        input
    }
}
