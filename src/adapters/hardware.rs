//! Hardware adapter: bridges the sensor node's peripherals to the port
//! traits.
//!
//! Owns the [`SensorHub`] and both window motors, exposing them through
//! [`SensorPort`], [`ButtonPort`] and [`MotorPort`]. Buttons are read
//! straight from GPIO; they are active-low with pull-ups, so a LOW level
//! means held. On non-espidf targets the GPIO reads come from the
//! simulation stubs and every button reads released.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::actuator::{ActuatorState, WindowId};
use crate::app::ports::{ButtonPort, MotorPort, SensorPort, WindowButton};
use crate::drivers::hw_init;
use crate::drivers::motor::WindowMotor;
use crate::error::ActuatorError;
use crate::pins;
use crate::sensors::{SensorHub, SensorSnapshot};

/// Concrete adapter that combines the sensor node's hardware behind ports.
pub struct SensorBoard<A, B, P>
where
    A: OutputPin,
    B: OutputPin,
    P: SetDutyCycle,
{
    hub: SensorHub,
    window1: WindowMotor<A, B, P>,
    window2: WindowMotor<A, B, P>,
}

impl<A, B, P> SensorBoard<A, B, P>
where
    A: OutputPin,
    B: OutputPin,
    P: SetDutyCycle,
{
    pub fn new(hub: SensorHub, window1: WindowMotor<A, B, P>, window2: WindowMotor<A, B, P>) -> Self {
        Self { hub, window1, window2 }
    }

    pub fn motor_state(&self, window: WindowId) -> ActuatorState {
        match window {
            WindowId::One => self.window1.state(),
            WindowId::Two => self.window2.state(),
        }
    }
}

const fn button_gpio(window: WindowId, button: WindowButton) -> i32 {
    match (window, button) {
        (WindowId::One, WindowButton::Open) => pins::W1_OPEN_GPIO,
        (WindowId::One, WindowButton::Close) => pins::W1_CLOSE_GPIO,
        (WindowId::Two, WindowButton::Open) => pins::W2_OPEN_GPIO,
        (WindowId::Two, WindowButton::Close) => pins::W2_CLOSE_GPIO,
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<A, B, P> SensorPort for SensorBoard<A, B, P>
where
    A: OutputPin,
    B: OutputPin,
    P: SetDutyCycle,
{
    fn read_all(&mut self) -> SensorSnapshot {
        self.hub.read_all()
    }
}

// ── ButtonPort implementation ─────────────────────────────────

impl<A, B, P> ButtonPort for SensorBoard<A, B, P>
where
    A: OutputPin,
    B: OutputPin,
    P: SetDutyCycle,
{
    fn is_pressed(&mut self, window: WindowId, button: WindowButton) -> bool {
        !hw_init::gpio_read(button_gpio(window, button))
    }
}

// ── MotorPort implementation ──────────────────────────────────

impl<A, B, P> MotorPort for SensorBoard<A, B, P>
where
    A: OutputPin,
    B: OutputPin,
    P: SetDutyCycle,
{
    fn drive(&mut self, window: WindowId, state: ActuatorState) -> Result<(), ActuatorError> {
        match window {
            WindowId::One => self.window1.set(state),
            WindowId::Two => self.window2.set(state),
        }
    }
}
