//! Operator console screens.
//!
//! A [`Screen`] carries only the data to show. Rendering to text rows lives
//! here so every display adapter (character LCD, log) shows the same thing.

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::app::commands::Command;
use crate::faults::FaultCounters;
use crate::telemetry::TelemetrySample;

/// Rows on the console display.
pub const ROWS: usize = 4;
/// Widest row any screen produces.
pub const ROW_WIDTH: usize = 24;

pub type Row = String<ROW_WIDTH>;
pub type Rows = Vec<Row, ROWS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Four-entry command menu.
    Menu,
    /// Start session in progress.
    OperationStarted,
    /// Monitor session. `None` until the first sample has been received.
    Telemetry(Option<TelemetrySample>),
    /// RetrieveFaults session. `None` until the first counters arrive.
    Faults(Option<FaultCounters>),
    /// End-of-pass prompt for a repeatable command.
    RepeatPrompt(Command),
    /// Stop session countdown.
    Stopping,
    /// A session was aborted by a link failure.
    LinkLost,
    /// A session was aborted because the tick timer would not start.
    ClockFault,
}

impl Screen {
    pub fn lines(&self) -> Rows {
        let mut rows = Rows::new();
        let mut push = |args: fmt::Arguments<'_>| {
            let mut row = Row::new();
            // Every row below fits ROW_WIDTH.
            let _ = row.write_fmt(args);
            let _ = rows.push(row);
        };

        match self {
            Self::Menu => {
                push(format_args!("1.StartOperation"));
                push(format_args!("2.Display Values"));
                push(format_args!("3.RetrieveFaults"));
                push(format_args!("4.StopMonitoring"));
            }
            Self::OperationStarted => {
                push(format_args!("OperationStarted"));
                push(format_args!("MonitoringActive"));
            }
            Self::Telemetry(None) => {
                push(format_args!("Temp = "));
                push(format_args!("Dist = "));
            }
            Self::Telemetry(Some(s)) => {
                push(format_args!("Temp = {} C", s.temperature));
                push(format_args!("Dist = {} cm", s.distance));
                push(format_args!("Window1:{}", s.window1));
                push(format_args!("Window2:{}", s.window2));
            }
            Self::Faults(counters) => {
                push(format_args!("Logged Faults:"));
                match counters {
                    Some(c) => {
                        push(format_args!("P001: {}", c.dist));
                        push(format_args!("P002: {}", c.temp));
                    }
                    None => {
                        push(format_args!("P001: "));
                        push(format_args!("P002: "));
                    }
                }
                push(format_args!("--End of List--"));
            }
            Self::RepeatPrompt(command) => {
                push(format_args!("Display again?"));
                push(format_args!("Press {} = YES", command.code()));
                push(format_args!("Other key = MAIN MENU"));
            }
            Self::Stopping => {
                push(format_args!("SystemMonitoring"));
                push(format_args!("Stopped!"));
                push(format_args!("ReturningToMenu"));
            }
            Self::LinkLost => {
                push(format_args!("Link lost"));
                push(format_args!("ReturningToMenu"));
            }
            Self::ClockFault => {
                push(format_args!("Clock fault"));
                push(format_args!("ReturningToMenu"));
            }
        }
        rows
    }
}
