//! Command-keyed session state machines, mirrored on both nodes.
//!
//! ```text
//!   console                          sensor
//!   ───────                          ──────
//!   key ──── Command ──────────────▶ dispatch
//!   Tick(0) ───────────────────────▶ (opening tick)
//!   Tick(t) ───────────────────────▶ t < 5: one tick of work
//!          ◀─────────── fields/acks ─┤
//!   ...                               ...
//!   Tick(≥5) ──────────────────────▶ pass ends
//!   Repeat(flag) ──────────────────▶ re-enter iff flag
//! ```
//!
//! Each node runs at most one session at a time: the runners take
//! `&mut self` for the whole session and only return once it has finished
//! or been aborted.

pub mod console;
pub mod sensor;

use crate::app::commands::Command;
use crate::app::ports::TickError;
use crate::link::LinkError;

pub use console::ConsoleNode;
pub use sensor::SensorNode;

/// A pass ends once a tick of this value (or above) is exchanged.
pub const SESSION_TICKS: u8 = 5;

/// Whether tick `t` ends the current pass.
pub const fn ends_pass(t: u8) -> bool {
    t >= SESSION_TICKS
}

/// Dispatcher position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Waiting for an operator key (console) or command byte (sensor).
    MainMenu,
    InSession(Command),
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Ran to the end; `passes` counts the first pass plus every repeat.
    Completed { passes: u8 },
    /// The link failed; both nodes are back at idle.
    Aborted(LinkError),
    /// The console's tick source would not start; the console is back at
    /// its menu.
    ClockFailed(TickError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub command: Command,
    pub outcome: SessionOutcome,
}

/// Result of one dispatcher round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The key or byte selected no session.
    Ignored(u8),
    Ran(SessionReport),
}

impl Dispatch {
    pub fn report(&self) -> Option<&SessionReport> {
        match self {
            Self::Ran(report) => Some(report),
            Self::Ignored(_) => None,
        }
    }
}
