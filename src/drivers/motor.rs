//! Window DC motor driver (L298-style H-bridge).
//!
//! Two direction inputs select Stop/Open/Close; the enable input is driven
//! by PWM and is always commanded at full duty while the window moves.
//!
//! Generic over embedded-hal pins so the same driver runs on ESP-IDF
//! `PinDriver`/`LedcDriver` and on host mocks.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::actuator::ActuatorState;
use crate::error::ActuatorError;

pub struct WindowMotor<A, B, P>
where
    A: OutputPin,
    B: OutputPin,
    P: SetDutyCycle,
{
    in_a: A,
    in_b: B,
    enable: P,
    duty_percent: u8,
    state: ActuatorState,
}

impl<A, B, P> WindowMotor<A, B, P>
where
    A: OutputPin,
    B: OutputPin,
    P: SetDutyCycle,
{
    /// Build the driver and park the motor.
    pub fn new(in_a: A, in_b: B, enable: P, duty_percent: u8) -> Result<Self, ActuatorError> {
        let mut motor = Self {
            in_a,
            in_b,
            enable,
            duty_percent: duty_percent.clamp(1, 100),
            state: ActuatorState::Stop,
        };
        motor.set(ActuatorState::Stop)?;
        Ok(motor)
    }

    pub fn set(&mut self, state: ActuatorState) -> Result<(), ActuatorError> {
        let pins = state.direction_pins();
        set_level(&mut self.in_a, pins.a)?;
        set_level(&mut self.in_b, pins.b)?;
        self.enable
            .set_duty_cycle_percent(self.duty_percent)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.state = state;
        Ok(())
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }
}

fn set_level<O: OutputPin>(pin: &mut O, high: bool) -> Result<(), ActuatorError> {
    if high {
        pin.set_high()
    } else {
        pin.set_low()
    }
    .map_err(|_| ActuatorError::PinWriteFailed)
}
