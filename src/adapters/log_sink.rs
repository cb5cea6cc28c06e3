//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing node events to the ESP-IDF logger
//! (UART / USB-CDC in production, stderr on the host). Each event is one
//! line with a subsystem prefix.

use log::{error, info, warn};

use crate::app::events::{NodeEvent, NodeRole};
use crate::app::ports::EventSink;

/// Adapter that logs every [`NodeEvent`] to the serial console.
pub struct LogEventSink {
    role: NodeRole,
}

impl LogEventSink {
    pub fn new(role: NodeRole) -> Self {
        Self { role }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent) {
        let node = match self.role {
            NodeRole::Sensor => "sensor",
            NodeRole::Console => "console",
        };
        match event {
            NodeEvent::Started(role) => {
                info!("START | {:?} node ready, v{}", role, env!("CARGO_PKG_VERSION"));
            }
            NodeEvent::CommandIgnored(code) => {
                info!("SESSION | {} | ignored command 0x{:02X}", node, code);
            }
            NodeEvent::SessionStarted(cmd) => {
                info!("SESSION | {} | {} started", node, cmd);
            }
            NodeEvent::SessionFinished { command, passes } => {
                info!("SESSION | {} | {} finished after {} pass(es)", node, command, passes);
            }
            NodeEvent::SessionAborted { command, reason } => {
                warn!("LINK | {} | {} aborted: {}", node, command, reason);
            }
            NodeEvent::ClockFailed { command, error } => {
                error!("SESSION | {} | {} aborted: {}", node, command, error);
            }
            NodeEvent::Telemetry(s) => {
                info!(
                    "SESSION | {} | T={}\u{00b0}C dist={}cm w1={} w2={}",
                    node, s.temperature, s.distance, s.window1, s.window2
                );
            }
            NodeEvent::FaultCounted { kind, value } => {
                info!("FAULT | {:?} breach, count={}", kind, value);
            }
            NodeEvent::CountersReset => {
                info!("FAULT | counters reset");
            }
            NodeEvent::StorageFault(fault) => {
                error!("FAULT | storage: {}", fault);
            }
        }
    }
}
