//! Session commands selected from the operator console.
//!
//! The operator's key is sent over the link verbatim; only the four codes
//! below select a session; anything else is ignored by both nodes.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Silent heartbeat: sensor reads and fault updates, no payload.
    Start,
    /// Stream telemetry every tick.
    Monitor,
    /// Stream the persisted fault counters every tick.
    RetrieveFaults,
    /// Reset the fault counters.
    Stop,
}

impl Command {
    pub const ALL: [Self; 4] = [Self::Start, Self::Monitor, Self::RetrieveFaults, Self::Stop];

    /// Operator key / wire code.
    pub const fn code(self) -> u8 {
        match self {
            Self::Start => 1,
            Self::Monitor => 2,
            Self::RetrieveFaults => 3,
            Self::Stop => 4,
        }
    }

    /// Whether the pass ends with a repeat-flag exchange.
    pub const fn asks_repeat(self) -> bool {
        matches!(self, Self::Monitor | Self::RetrieveFaults)
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            1 => Ok(Self::Start),
            2 => Ok(Self::Monitor),
            3 => Ok(Self::RetrieveFaults),
            4 => Ok(Self::Stop),
            other => Err(other),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "StartOperation",
            Self::Monitor => "DisplayValues",
            Self::RetrieveFaults => "RetrieveFaults",
            Self::Stop => "StopMonitoring",
        })
    }
}
