use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The terminal belongs to the UI, so logs are only written when
/// `PARLEY_LOG_FILE` names a file to append to. `RUST_LOG` controls
/// filtering, defaulting to `info`.
pub fn init_tracing() {
    let Ok(log_path) = std::env::var("PARLEY_LOG_FILE") else {
        return;
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .expect("Failed to open log file");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .init();
}
