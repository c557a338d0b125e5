use std::fs;
use std::path::Path;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::{DEFAULT_LOG_DIR, LOG_FILE_NAME};

/// Initializes logging with a daily-rotated JSON file under `logs/` and a
/// human-readable console layer. `RUST_LOG` overrides the default level.
pub fn init_logging() {
    init_logging_in(Path::new(DEFAULT_LOG_DIR));
}

pub fn init_logging_in(log_dir: &Path) {
    let _ = fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "listing_scraper=info".parse() {
        filter = filter.add_directive(directive);
    }

    // a second init (tests, embedding) keeps the existing subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // keep the worker alive so buffered lines are flushed on exit
    std::mem::forget(guard);
}
