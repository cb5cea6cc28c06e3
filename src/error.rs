//! Unified error types for the WinLink firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! node dispatch loops' error handling uniform. All variants are `Copy` so
//! they can travel inside [`NodeEvent`](crate::app::events::NodeEvent)s
//! without allocation.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};
use crate::drivers::hw_init::HwInitError;
use crate::drivers::hw_timer::TimerError;
use crate::link::LinkError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The inter-node link failed or lost synchronisation.
    Link(LinkError),
    /// Persistent storage kept failing after bounded retries.
    Storage(StorageFault),
    /// The storage device could not be opened.
    StorageDevice(StorageError),
    /// A sensor could not be read.
    Sensor(SensorError),
    /// A window motor command failed.
    Actuator(ActuatorError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Peripheral initialisation failed.
    Init(HwInitError),
    /// A hardware timer could not be claimed or started.
    Timer(TimerError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::StorageDevice(e) => write!(f, "storage device: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::StorageDevice(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Persistent-storage faults
// ---------------------------------------------------------------------------

/// Which storage primitive failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Read,
    Write,
}

/// A storage primitive that still failed after every retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageFault {
    pub op: StorageOp,
    pub addr: u16,
    pub attempts: u8,
}

impl fmt::Display for StorageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            StorageOp::Read => "read",
            StorageOp::Write => "write",
        };
        write!(
            f,
            "{op} at 0x{:02X} failed after {} attempts",
            self.addr, self.attempts
        )
    }
}

impl From<StorageFault> for Error {
    fn from(e: StorageFault) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No ADC conversion has completed since boot.
    NoConversion,
    /// The ultrasonic echo never returned.
    EchoTimeout,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConversion => write!(f, "no ADC conversion latched"),
            Self::EchoTimeout => write!(f, "ultrasonic echo timed out"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// A direction pin could not be driven.
    PinWriteFailed,
    /// The enable-pin PWM duty could not be set.
    PwmWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinWriteFailed => write!(f, "direction pin write failed"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
