//! Logging Infrastructure
//!
//! Structured logging setup with an optional daily rolling file.

use std::path::Path;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None, None);
}

/// Initialize the logger with optional file output
///
/// The file appender is only used when `log_dir` already exists.
pub fn init_logger_with_file(log_level: Option<&str>, json: Option<bool>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level.parse().unwrap_or(tracing::Level::INFO))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.exists()
            && let Some(dir_str) = log_path.to_str()
        {
            let file_appender = tracing_appender::rolling::daily(dir_str, "kusina-server");
            let subscriber = subscriber.with_writer(file_appender).with_ansi(false);
            // try_init: tests may initialize more than once
            let _ = if json.unwrap_or(false) {
                subscriber.json().try_init()
            } else {
                subscriber.try_init()
            };
            return;
        }
    }

    let _ = if json.unwrap_or(false) {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
}
