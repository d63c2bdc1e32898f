use std::io::Write;
use std::sync::Mutex;

use log::warn;
use silksong_core::{ReleaseStatus, StatusObserver, StatusUpdate};

/// A line typed into the watch screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchInput {
    Refresh,
    Quit,
    SwitchProduct(String),
    Invalid(String),
}

pub fn parse_watch_input(line: &str) -> WatchInput {
    let trimmed = line.trim();
    match trimmed {
        "" => WatchInput::Refresh,
        "q" | "quit" | "exit" => WatchInput::Quit,
        id if id.bytes().all(|b| b.is_ascii_digit()) => WatchInput::SwitchProduct(id.to_string()),
        other => WatchInput::Invalid(other.to_string()),
    }
}

#[derive(Default)]
struct ScreenState {
    heading: Option<(String, String)>,
}

/// Main console screen of `silksong watch`.
///
/// The question line is printed again whenever the product or its display
/// name changes. `Loading` is only shown right under a fresh question line so
/// the periodic re-checks do not spam the terminal.
pub struct ConsoleScreen {
    out: Mutex<Box<dyn Write + Send>>,
    state: Mutex<ScreenState>,
}

impl ConsoleScreen {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            state: Mutex::new(ScreenState::default()),
        }
    }

    fn render(&self, update: &StatusUpdate) -> Vec<String> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let heading = (update.product_id.clone(), update.display_name.clone());
        let mut lines = Vec::new();
        let fresh_heading = state.heading.as_ref() != Some(&heading);
        if fresh_heading {
            lines.push(String::new());
            lines.push(format!("Is {} out?", update.display_name));
            state.heading = Some(heading);
        }

        match &update.status {
            ReleaseStatus::Loading if !fresh_heading => {}
            status => lines.push(format!("  {status}")),
        }
        lines
    }
}

impl StatusObserver for ConsoleScreen {
    fn on_status_changed(&self, update: &StatusUpdate) {
        let lines = self.render(update);
        if lines.is_empty() {
            return;
        }

        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let written = lines
            .iter()
            .try_for_each(|line| writeln!(out, "{line}"))
            .and_then(|()| out.flush());
        if let Err(error) = written {
            warn!("Failed to draw console screen: {error}");
        }
    }
}
