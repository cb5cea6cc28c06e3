//! Structured node events.
//!
//! Both node runners emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters decide where they
//! go; on the firmware they become log lines.

use crate::app::commands::Command;
use crate::app::ports::TickError;
use crate::error::StorageFault;
use crate::faults::FaultKind;
use crate::link::LinkError;
use crate::telemetry::TelemetrySample;

/// Which node is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Sensor,
    Console,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// The node finished booting and is idle.
    Started(NodeRole),

    /// A key or command byte that selects no session.
    CommandIgnored(u8),

    /// A session was entered.
    SessionStarted(Command),

    /// A session ran to completion. `passes` counts repeat-flag re-entries
    /// plus the first pass.
    SessionFinished { command: Command, passes: u8 },

    /// A session was abandoned because the link failed.
    SessionAborted { command: Command, reason: LinkError },

    /// A console session was abandoned because its tick source failed.
    ClockFailed { command: Command, error: TickError },

    /// A telemetry sample was produced (sensor) or received (console).
    Telemetry(TelemetrySample),

    /// A fault counter advanced to `value`.
    FaultCounted { kind: FaultKind, value: u8 },

    /// Both fault counters were reset.
    CountersReset,

    /// A storage primitive kept failing after its retries.
    StorageFault(StorageFault),
}
