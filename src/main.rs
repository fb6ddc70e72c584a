use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use parley::backend::{Backend, SqliteBackend};
use parley::config::Config;
use parley::models::{MessageBody, SenderRole};
use parley::ui::{self, views, App, InputMode, Surface};
use ratatui::Frame;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::error;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Customer support chat: end-user widget and agent console"
)]
struct Cli {
    /// Data directory holding the database and the conversation id
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    surface: Option<SurfaceCommand>,
}

#[derive(Subcommand)]
enum SurfaceCommand {
    /// End-user chat widget (default)
    Customer,
    /// Agent console with the conversation list
    Console,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    parley::tracing_setup::init_tracing();

    let config = cli.data_dir.map(Config::new).unwrap_or_default();
    config.ensure_data_dir()?;

    let surface = match cli.surface {
        Some(SurfaceCommand::Console) => Surface::Console,
        _ => Surface::Customer,
    };

    let rt = Runtime::new()?;
    let backend: Arc<dyn Backend> = Arc::new(SqliteBackend::open(config.db_path())?);
    let mut app = App::new(surface, backend, rt.handle().clone(), &config);

    match surface {
        Surface::Customer => init_customer(&mut app, &rt),
        Surface::Console => {
            if let Err(e) = rt.block_on(app.summary_list.refresh()) {
                app.set_status("Could not load conversations");
                error!("{e}");
            }
        }
    }

    let mut terminal = ui::init_terminal()?;
    let result = run_app(&mut terminal, &mut app, &rt);
    ui::restore_terminal()?;

    if let Err(err) = result {
        eprintln!("Error: {err}");
    }
    Ok(())
}

fn run_app(terminal: &mut ui::Tui, app: &mut App, rt: &Runtime) -> Result<()> {
    while app.running {
        app.drain_feed();
        if app.surface == Surface::Console {
            match rt.block_on(app.summary_list.poll()) {
                Ok(true) => app.clamp_selection(),
                Ok(false) => {}
                Err(e) => error!("{e}"),
            }
        }

        terminal.draw(|f| render(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key, rt);
                }
            }
        }
    }
    app.subscriber.detach();
    Ok(())
}

fn render(f: &mut Frame, app: &App) {
    match app.surface {
        Surface::Customer => views::render_customer(f, app),
        Surface::Console => views::render_console(f, app),
    }
}

/// Customer startup: resolve a durable conversation, load its history and
/// go live. A resolution failure blocks the surface behind a retry prompt.
fn init_customer(app: &mut App, rt: &Runtime) {
    match rt.block_on(app.identity.resolve()) {
        Ok(conversation_id) => {
            app.fatal_error = None;
            open_conversation(app, rt, &conversation_id);
        }
        Err(e) => {
            error!("{e}");
            app.fatal_error = Some(e.to_string());
        }
    }
}

/// Conversation switch: the old subscription is torn down before anything
/// about the new conversation is loaded, so no late event can reach the
/// old view.
fn open_conversation(app: &mut App, rt: &Runtime, conversation_id: &str) {
    app.subscriber.detach();
    app.feed_rx = None;
    match rt.block_on(app.repository.load_history(conversation_id)) {
        Ok(history) => {
            app.timeline.seed(conversation_id, history);
            app.clear_status();
        }
        Err(e) => {
            app.timeline.seed(conversation_id, Vec::new());
            app.set_status("Could not load messages for this conversation");
            error!("{e}");
        }
    }
    app.feed_rx = Some(app.subscriber.attach(conversation_id));
}

fn send_message(app: &mut App, rt: &Runtime, body: MessageBody) {
    let Some(conversation_id) = app.timeline.conversation_id().map(str::to_string) else {
        return;
    };
    let sender = match app.surface {
        Surface::Customer => SenderRole::Customer,
        Surface::Console => SenderRole::Agent,
    };

    let pending = app.timeline.stage_send(sender, body.clone());
    match rt.block_on(app.repository.append(&conversation_id, sender, &body)) {
        Ok(record) => app.timeline.confirm_send(pending, record),
        Err(e) => {
            app.timeline.fail_send(pending);
            app.set_status("Message failed to send, please try again");
            error!("{e}");
        }
    }
}

fn submit_text(app: &mut App, rt: &Runtime, input: String) {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return;
    }
    if let Some(path) = trimmed.strip_prefix("/image ") {
        match image_body(path.trim()) {
            Ok(body) => send_message(app, rt, body),
            Err(e) => app.set_status(&format!("Could not attach image: {e}")),
        }
        return;
    }
    send_message(app, rt, MessageBody::Text(trimmed.to_string()));
}

/// Embeds a local file as a data URI, the payload carried inside the
/// image sentinel.
fn image_body(path: &str) -> Result<MessageBody> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let bytes = std::fs::read(path)?;
    let mime = match std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };
    Ok(MessageBody::Image(format!(
        "data:{mime};base64,{}",
        STANDARD.encode(bytes)
    )))
}

fn handle_key(app: &mut App, key: KeyEvent, rt: &Runtime) {
    // Overlays capture the keyboard first.
    if app.showing_emoji_picker {
        handle_emoji_picker_key(app, key.code, rt);
        return;
    }
    if app.showing_quick_replies {
        handle_quick_replies_key(app, key.code, rt);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_key(app, key.code, rt),
        InputMode::Editing => handle_editing_key(app, key.code, rt),
    }
}

fn handle_normal_key(app: &mut App, key: KeyCode, rt: &Runtime) {
    match key {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('r') if app.surface == Surface::Customer && app.fatal_error.is_some() => {
            init_customer(app, rt);
        }
        KeyCode::Char('i') if app.fatal_error.is_none() => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Tab if app.surface == Surface::Customer => {
            app.showing_emoji_picker = true;
            app.emoji_index = 0;
        }
        KeyCode::Char(c @ '1'..='4') if app.surface == Surface::Customer => {
            let index = c as usize - '1' as usize;
            send_message(
                app,
                rt,
                MessageBody::Text(views::chat::QUICK_QUESTIONS[index].to_string()),
            );
        }
        KeyCode::Char('r') if app.surface == Surface::Console => {
            if app.timeline.conversation_id().is_some() {
                app.showing_quick_replies = true;
                app.quick_reply_index = 0;
            }
        }
        KeyCode::Up if app.surface == Surface::Console => {
            app.selected_conversation_index = app.selected_conversation_index.saturating_sub(1);
        }
        KeyCode::Down if app.surface == Surface::Console => {
            app.selected_conversation_index += 1;
            app.clamp_selection();
        }
        KeyCode::Enter if app.surface == Surface::Console => {
            if let Some(summary) = app.selected_summary() {
                let conversation_id = summary.id.clone();
                // Re-seeding the open conversation would only drop
                // in-flight sends.
                if app.timeline.conversation_id() != Some(conversation_id.as_str()) {
                    open_conversation(app, rt, &conversation_id);
                }
            }
        }
        _ => {}
    }
}

fn handle_editing_key(app: &mut App, key: KeyCode, rt: &Runtime) {
    match key {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.clear_input();
        }
        KeyCode::Enter => {
            let input = app.submit_input();
            app.input_mode = InputMode::Normal;
            submit_text(app, rt, input);
        }
        KeyCode::Char(c) => app.enter_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        _ => {}
    }
}

fn handle_emoji_picker_key(app: &mut App, key: KeyCode, rt: &Runtime) {
    match key {
        KeyCode::Esc | KeyCode::Tab => app.showing_emoji_picker = false,
        KeyCode::Left => app.emoji_index = app.emoji_index.saturating_sub(1),
        KeyCode::Right => {
            app.emoji_index = (app.emoji_index + 1).min(views::chat::EMOJI_PALETTE.len() - 1);
        }
        KeyCode::Enter => {
            let emoji = views::chat::EMOJI_PALETTE[app.emoji_index].to_string();
            app.showing_emoji_picker = false;
            send_message(app, rt, MessageBody::Emoji(emoji));
        }
        _ => {}
    }
}

fn handle_quick_replies_key(app: &mut App, key: KeyCode, rt: &Runtime) {
    match key {
        KeyCode::Esc => app.showing_quick_replies = false,
        KeyCode::Up => app.quick_reply_index = app.quick_reply_index.saturating_sub(1),
        KeyCode::Down => {
            app.quick_reply_index =
                (app.quick_reply_index + 1).min(views::console::QUICK_REPLIES.len() - 1);
        }
        KeyCode::Enter => {
            let (_, content) = views::console::QUICK_REPLIES[app.quick_reply_index];
            app.showing_quick_replies = false;
            send_message(app, rt, MessageBody::Text(content.to_string()));
        }
        _ => {}
    }
}
