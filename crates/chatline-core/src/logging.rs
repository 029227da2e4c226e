//! Wire logging: an optional append-only file of every request and reply.
//!
//! Diagnostics go through the `log` facade; this is the separate,
//! per-session transcript of what actually crossed the wire.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::{SecondsFormat, Utc};

/// Thread-safe handle to an append-only log file. `None` inside means logging is off.
pub type LogHandle = Arc<Mutex<Option<File>>>;

/// A handle that writes nowhere.
pub fn disabled() -> LogHandle {
    Arc::new(Mutex::new(None))
}

/// UTC time as ISO 8601 with milliseconds (e.g. 2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Write `[timestamp] DIRECTION: data` to the log file, if there is one.
pub fn log_line(handle: &LogHandle, direction: &str, data: &str) {
    if let Ok(mut guard) = handle.lock() {
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "[{}] {}: {}", utc_timestamp(), direction, data);
            let _ = file.flush();
        }
    }
}

/// Open (or create) `{log_dir}/{log_id}.log`. Any failure yields a disabled handle.
pub fn open_log_file(log_dir: Option<&Path>, log_id: &str) -> LogHandle {
    let file = log_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("{}.log", sanitize(log_id))))
            .ok()
    });
    Arc::new(Mutex::new(file))
}

// Session ids are backend-issued; keep them from escaping the log directory.
fn sanitize(log_id: &str) -> String {
    log_id
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
