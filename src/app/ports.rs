//! Port traits: the hexagonal boundary between the node runners and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SensorNode / ConsoleNode (domain)
//! ```
//!
//! Driven adapters (sensors, buttons, motors, storage, keypad, display,
//! event sinks) implement these traits. The node runners consume them via
//! generics, so the protocol core never touches hardware directly.

use core::fmt;

use crate::actuator::{ActuatorState, WindowId};
use crate::config::NodeConfig;
use crate::display::Screen;
use crate::error::ActuatorError;
use crate::sensors::SensorSnapshot;

// ───────────────────────────────────────────────────────────────
// Sensor node: sensors, buttons, motors
// ───────────────────────────────────────────────────────────────

/// Read-side port: the sensor node calls this once per tick.
pub trait SensorPort {
    /// Read temperature and distance.
    fn read_all(&mut self) -> SensorSnapshot;
}

/// Which of a window's two buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowButton {
    Open,
    Close,
}

/// Current button levels, `true` while held.
pub trait ButtonPort {
    fn is_pressed(&mut self, window: WindowId, button: WindowButton) -> bool;
}

/// Write-side port for the window motors.
pub trait MotorPort {
    fn drive(&mut self, window: WindowId, state: ActuatorState) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging)
// ───────────────────────────────────────────────────────────────

/// The node runners emit structured [`NodeEvent`](super::events::NodeEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::NodeEvent);
}

// ───────────────────────────────────────────────────────────────
// Persistent storage (byte-addressed EEPROM)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed persistent storage.
///
/// One call is one attempt; retry policy belongs to the caller.
pub trait StoragePort {
    fn read(&mut self, addr: u16) -> Result<u8, StorageError>;
    fn write(&mut self, addr: u16, value: u8) -> Result<(), StorageError>;
}

/// Errors returned by [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The device did not respond or the bus transaction failed.
    IoError,
    /// Address outside the device.
    OutOfRange(u16),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "storage I/O error"),
            Self::OutOfRange(addr) => write!(f, "address 0x{addr:04X} out of range"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads and persists the node configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    /// Returns [`NodeConfig::default()`] if nothing is stored.
    fn load(&mut self) -> Result<NodeConfig, ConfigError>;

    fn save(&mut self, config: &NodeConfig) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored bytes could not be decoded.
    Corrupted,
    /// A field is out of range.
    ValidationFailed(&'static str),
    /// Encoded config does not fit its storage region.
    TooLarge,
    /// The storage backend failed.
    Storage(StorageError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "stored config is corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::TooLarge => write!(f, "config does not fit its storage region"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ───────────────────────────────────────────────────────────────
// Console node: keypad, display, tick source
// ───────────────────────────────────────────────────────────────

/// Operator keypad.
pub trait KeypadPort {
    /// Block until a key is pressed and released; return its value.
    fn read_key(&mut self) -> u8;
}

/// Operator display.
pub trait DisplayPort {
    fn show(&mut self, screen: &Screen);
}

/// The tick source could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickError {
    /// The backing timer is already driven by someone else.
    InUse,
    /// The timer hardware refused to start.
    Hardware(i32),
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InUse => write!(f, "tick timer already in use"),
            Self::Hardware(rc) => write!(f, "tick timer failed to start (rc={rc})"),
        }
    }
}

/// Periodic session tick.
pub trait TickSource {
    /// Reset the tick count to 0 and start counting.
    ///
    /// On `Err` the count will never advance, so callers must not wait on
    /// it.
    fn restart(&mut self) -> Result<(), TickError>;

    /// Current tick count, read as one consistent value.
    fn now(&self) -> u8;

    /// Block until the count differs from `last`; return the new value.
    fn wait_advance(&mut self, last: u8) -> u8;

    /// Stop counting.
    fn stop(&mut self) {}
}
