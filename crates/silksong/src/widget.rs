use std::io::Write;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use log::warn;
use silksong_core::{ReleaseStatus, ResolveError, StatusObserver, StatusUpdate};

/// Short status-bar text for an update.
pub fn widget_text(status: &ReleaseStatus) -> &'static str {
    match status {
        ReleaseStatus::Loading => "Checking...",
        ReleaseStatus::Success { is_out: true } => "YES",
        ReleaseStatus::Success { is_out: false } => "COMING SOON",
        ReleaseStatus::Error { message } => match ResolveError::classify(message) {
            Some(ResolveError::Transport) => "NETWORK ERR",
            Some(ResolveError::Parse) => "PARSE ERR",
            Some(ResolveError::Lookup) => "API ERR",
            Some(ResolveError::MissingData) => "DATA ERR",
            Some(ResolveError::MissingReleaseDate) => "DATE ERR",
            None => "ERROR",
        },
    }
}

pub fn widget_line(status: &ReleaseStatus, now: DateTime<Local>) -> String {
    format!(
        "Updated: {} {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        widget_text(status)
    )
}

/// Prints one widget line per published update, for status bars that tail
/// a command's stdout.
pub struct WidgetPrinter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl WidgetPrinter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl StatusObserver for WidgetPrinter {
    fn on_status_changed(&self, update: &StatusUpdate) {
        let now = update
            .checked_at
            .map_or_else(Local::now, |checked| checked.with_timezone(&Local));
        let line = widget_line(&update.status, now);

        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(error) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!("Failed to write widget line: {error}");
        }
    }
}
