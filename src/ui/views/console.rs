use crate::models::{ConversationStatus, SenderRole};
use crate::ui::views::chat::{centered, render_input, render_timeline};
use crate::ui::App;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

/// Canned agent responses, selectable from the quick-replies panel.
pub const QUICK_REPLIES: [(&str, &str); 5] = [
    (
        "Greeting",
        "Hello! Happy to help - what can I do for you today?",
    ),
    (
        "Order lookup",
        "Let me pull up your order details, one moment please.",
    ),
    (
        "Shipping update",
        "Your order has shipped and should arrive within 2-3 business days.",
    ),
    (
        "Refund policy",
        "We accept returns within 7 days; refunds are issued to the original payment method within 3-5 business days.",
    ),
    (
        "Thanks",
        "Thank you for your patience - have a great day!",
    ),
];

pub fn render_console(f: &mut Frame, app: &App) {
    let columns = Layout::horizontal([Constraint::Length(36), Constraint::Min(0)]).split(f.area());

    render_conversation_list(f, app, columns[0]);
    render_chat_panel(f, app, columns[1]);

    if app.showing_quick_replies {
        render_quick_replies(f, app);
    }
}

fn render_conversation_list(f: &mut Frame, app: &App, area: Rect) {
    let summaries = app.summary_list.summaries();

    if summaries.is_empty() {
        let empty = Paragraph::new("No conversations yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::RIGHT).title("Conversations"));
        f.render_widget(empty, area);
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = summaries
        .iter()
        .enumerate()
        .map(|(i, summary)| {
            let is_selected = i == app.selected_conversation_index;
            let prefix = if is_selected { "▶ " } else { "  " };
            let dot = match summary.status {
                ConversationStatus::Active => Span::styled("● ", Style::default().fg(Color::Green)),
                ConversationStatus::Closed => {
                    Span::styled("● ", Style::default().fg(Color::DarkGray))
                }
            };
            let name_style = if is_selected {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            ListItem::new(vec![
                Line::from(vec![
                    Span::raw(prefix),
                    dot,
                    Span::styled(summary.customer_label.clone(), name_style),
                    Span::styled(
                        format!("  {}", summary.recency),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("    {}", truncate(&summary.preview, width)),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::RIGHT)
                .title(format!("Conversations ({})", summaries.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    state.select(Some(app.selected_conversation_index));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_chat_panel(f: &mut Frame, app: &App, area: Rect) {
    let Some(conversation_id) = app.timeline.conversation_id() else {
        let hint = Paragraph::new("Select a conversation on the left (↑/↓, Enter).")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(hint, centered(area, 50, 1));
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .split(area);

    let short = &conversation_id[..8.min(conversation_id.len())];
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("Conversation {short}"),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "  'r' quick replies",
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, chunks[0]);

    render_timeline(f, app, chunks[1], SenderRole::Agent);
    render_input(f, app, chunks[2], "Reply (Enter to send)");
}

fn render_quick_replies(f: &mut Frame, app: &App) {
    let area = centered(f.area(), 70, QUICK_REPLIES.len() as u16 + 2);
    let items: Vec<ListItem> = QUICK_REPLIES
        .iter()
        .enumerate()
        .map(|(i, (title, content))| {
            let style = if i == app.quick_reply_index {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{title}: "), style),
                Span::styled(truncate(content, 60), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    f.render_widget(Clear, area);
    f.render_widget(
        List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Quick replies (↑/↓, Enter to send, Esc to close)"),
        ),
        area,
    );
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let cut: String = s.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
