//! In-app diagnostic buffer for a UI log panel. Every entry is also forwarded
//! to `tracing`, so the same lines reach stderr when a subscriber is set up.

use std::sync::{Mutex, OnceLock};

use tracing::Level;

const MAX_LOGS: usize = 2000;

static LOG_BUF: OnceLock<Mutex<Vec<LogEntry>>> = OnceLock::new();

#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub time: String,
    pub level: Level,
    pub message: String,
}

fn buf() -> &'static Mutex<Vec<LogEntry>> {
    LOG_BUF.get_or_init(|| Mutex::new(Vec::new()))
}

/// Append a log line. Safe to call from background tasks.
pub fn app_log(level: Level, message: impl Into<String>) {
    let message = message.into();
    match level {
        Level::ERROR => tracing::error!(target: "sysmon", "{}", message),
        Level::WARN => tracing::warn!(target: "sysmon", "{}", message),
        Level::INFO => tracing::info!(target: "sysmon", "{}", message),
        Level::DEBUG => tracing::debug!(target: "sysmon", "{}", message),
        _ => tracing::trace!(target: "sysmon", "{}", message),
    }

    let entry = LogEntry {
        time: chrono::Local::now().format("%H:%M:%S%.3f").to_string(),
        level,
        message,
    };
    if let Ok(mut v) = buf().lock() {
        v.push(entry);
        let n = v.len();
        if n > MAX_LOGS {
            v.drain(0..n - MAX_LOGS);
        }
    }
}

/// Copy of the current buffer, oldest first.
pub fn app_logs_snapshot() -> Vec<LogEntry> {
    buf().lock().map(|v| v.clone()).unwrap_or_default()
}
