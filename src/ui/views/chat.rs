use crate::constants::WELCOME_MESSAGE;
use crate::models::{MessageBody, SenderRole};
use crate::store::TimelineEntry;
use crate::ui::{App, InputMode};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub const QUICK_QUESTIONS: [&str; 4] = [
    "How do I check my order status?",
    "How long do refunds take?",
    "How do I reach a human agent?",
    "I have an account security question",
];

pub const EMOJI_PALETTE: [&str; 16] = [
    "😀", "😂", "🥰", "😍", "🤗", "🙄", "😅", "😊", "👍", "👏", "🙏", "💪", "❤️", "🎉", "🤔", "😭",
];

pub fn render_customer(f: &mut Frame, app: &App) {
    if let Some(ref error) = app.fatal_error {
        render_fatal(f, error);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(2),
        Constraint::Length(3),
    ])
    .split(f.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Support Chat", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled("  ● online", Style::default().fg(Color::Green)),
    ]))
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, chunks[0]);

    render_timeline(f, app, chunks[1], SenderRole::Customer);
    render_quick_questions(f, chunks[2]);
    render_input(f, app, chunks[3], "Message (Enter to send, /image <path> to attach)");

    if app.showing_emoji_picker {
        render_emoji_picker(f, app);
    }
}

fn render_fatal(f: &mut Frame, error: &str) {
    let area = centered(f.area(), 60, 5);
    let text = vec![
        Line::from(Span::styled(
            "Cannot start conversation",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(error.to_string()),
        Line::from(Span::styled(
            "Press 'r' to retry, 'q' to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

/// Renders the timeline shared by both surfaces. `local_role` is the role
/// whose messages read as "You".
pub fn render_timeline(f: &mut Frame, app: &App, area: Rect, local_role: SenderRole) {
    let mut lines: Vec<Line> = Vec::new();

    if app.timeline.is_empty() && local_role == SenderRole::Customer {
        lines.push(Line::from(vec![
            Span::styled("Agent: ", Style::default().fg(Color::Cyan)),
            Span::raw(WELCOME_MESSAGE),
        ]));
    }

    for entry in app.timeline.entries() {
        lines.push(entry_line(entry, local_role));
    }

    // Keep the tail in view, like a chat log.
    let height = area.height as usize;
    let skip = lines.len().saturating_sub(height);
    let visible: Vec<Line> = lines.into_iter().skip(skip).collect();

    f.render_widget(Paragraph::new(visible), area);
}

fn entry_line(entry: &TimelineEntry, local_role: SenderRole) -> Line<'static> {
    let (label, color) = if entry.sender == local_role {
        ("You: ", Color::Green)
    } else {
        match entry.sender {
            SenderRole::Customer => ("Customer: ", Color::Yellow),
            SenderRole::Agent => ("Agent: ", Color::Cyan),
            SenderRole::System => ("System: ", Color::DarkGray),
        }
    };

    let body = match &entry.body {
        MessageBody::Text(s) | MessageBody::Emoji(s) => s.clone(),
        MessageBody::Image(_) => "[image]".to_string(),
    };

    let time = entry.timestamp.format("%H:%M").to_string();
    let mut spans = vec![
        Span::styled(format!("{time} "), Style::default().fg(Color::DarkGray)),
        Span::styled(label, Style::default().fg(color)),
        Span::raw(body),
    ];
    if entry.is_pending() {
        spans.push(Span::styled(
            " (sending...)",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    }
    Line::from(spans)
}

fn render_quick_questions(f: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        "Quick: ",
        Style::default().fg(Color::DarkGray),
    )];
    for (i, question) in QUICK_QUESTIONS.iter().enumerate() {
        spans.push(Span::styled(
            format!("[{}] {}  ", i + 1, question),
            Style::default().fg(Color::Blue),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::TOP)),
        area,
    );
}

pub fn render_input(f: &mut Frame, app: &App, area: Rect, title: &str) {
    let (text, style) = match app.input_mode {
        InputMode::Editing => (
            format!("> {}", app.input),
            Style::default().fg(Color::Yellow),
        ),
        InputMode::Normal => (
            app.status_message
                .clone()
                .unwrap_or_else(|| "Press 'i' to type, 'q' to quit".to_string()),
            Style::default().fg(Color::DarkGray),
        ),
    };
    let input = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(input, area);
}

fn render_emoji_picker(f: &mut Frame, app: &App) {
    let area = centered(f.area(), 54, 3);
    let spans: Vec<Span> = EMOJI_PALETTE
        .iter()
        .enumerate()
        .map(|(i, emoji)| {
            let style = if i == app.emoji_index {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Span::styled(format!(" {emoji} "), style)
        })
        .collect();
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Emoji (←/→, Enter to send, Esc to close)"),
        ),
        area,
    );
}

pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
