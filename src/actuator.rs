//! Window actuator arbitration.
//!
//! Each window has an open button and a close button. The motor command is a
//! pure function of the two current reads: nothing is remembered between
//! calls, so a released button takes effect on the very next evaluation.

use core::fmt;

/// Which window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowId {
    One,
    Two,
}

impl WindowId {
    pub const ALL: [Self; 2] = [Self::One, Self::Two];
}

/// Tri-state motor command. Wire codes: Open = 0, Close = 1, Stop = 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorState {
    Open,
    Close,
    Stop,
}

impl ActuatorState {
    pub const fn code(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Close => 1,
            Self::Stop => 2,
        }
    }

    /// Direction-pin levels `(pin_a, pin_b)` for the H-bridge.
    pub const fn direction_pins(self) -> DirectionPins {
        match self {
            Self::Stop => DirectionPins { a: false, b: false },
            Self::Open => DirectionPins { a: false, b: true },
            Self::Close => DirectionPins { a: true, b: false },
        }
    }
}

impl TryFrom<u8> for ActuatorState {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            0 => Ok(Self::Open),
            1 => Ok(Self::Close),
            2 => Ok(Self::Stop),
            other => Err(other),
        }
    }
}

impl fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "Open",
            Self::Close => "Close",
            Self::Stop => "Stop",
        })
    }
}

/// Logic levels of the two H-bridge direction inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionPins {
    pub a: bool,
    pub b: bool,
}

/// Decide one window's command from its two buttons (`true` = pressed).
///
/// Close is checked last and wins when both are held.
pub const fn arbitrate(open_pressed: bool, close_pressed: bool) -> ActuatorState {
    let mut state = ActuatorState::Stop;
    if open_pressed {
        state = ActuatorState::Open;
    }
    if close_pressed {
        state = ActuatorState::Close;
    }
    state
}
