//! Log-backed console display.
//!
//! Renders each [`Screen`] to its text rows and writes them to the logger,
//! one record per row. Stands in for the character LCD on boards without
//! one and on the host.

use log::info;

use crate::app::ports::DisplayPort;
use crate::display::{Row, Screen};

#[derive(Default)]
pub struct LogDisplay {
    last: Option<Screen>,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// The screen most recently shown.
    pub fn last(&self) -> Option<&Screen> {
        self.last.as_ref()
    }
}

impl DisplayPort for LogDisplay {
    fn show(&mut self, screen: &Screen) {
        // Telemetry is redrawn every tick; only log it when it changes.
        if self.last.as_ref() == Some(screen) {
            return;
        }
        for (i, row) in screen.lines().iter().enumerate() {
            info!("LCD{} | {}", i, row.as_str());
        }
        self.last = Some(*screen);
    }
}

/// Rows of `screen` joined with `/`, for compact assertions and logs.
pub fn flatten(screen: &Screen) -> heapless::String<{ 4 * 25 }> {
    let mut out = heapless::String::new();
    for (i, row) in screen.lines().iter().enumerate() {
        if i > 0 {
            let _ = out.push('/');
        }
        let _ = out.push_str(Row::as_str(row));
    }
    out
}
