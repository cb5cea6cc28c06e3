//! HC-SR04 ultrasonic range finder.
//!
//! The echo pulse width is measured by the capture interrupt and latched
//! into a static atomic in microseconds. Sound travels one centimetre and
//! back in about 58.8 µs.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `read` fires the 10 µs trigger pulse and waits a bounded
//! time for the capture handler to latch a width.
//! On host/test: the latch is written by [`sim_set_echo_us`].

use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;

static ECHO_WIDTH_US: AtomicU32 = AtomicU32::new(0);

/// Called from the echo capture interrupt with the high-pulse width.
pub fn echo_captured(width_us: u32) {
    ECHO_WIDTH_US.store(width_us, Ordering::Release);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_echo_us(width_us: u32) {
    echo_captured(width_us);
}

/// Farthest distance the module reports reliably (cm).
pub const MAX_RANGE_CM: u16 = 400;

/// cm = µs / 58.8, truncated.
pub fn echo_to_cm(width_us: u32) -> Result<u16, SensorError> {
    let cm = u64::from(width_us) * 10 / 588;
    match u16::try_from(cm) {
        Ok(cm) if cm <= MAX_RANGE_CM => Ok(cm),
        _ => Err(SensorError::OutOfRange),
    }
}

pub struct UltrasonicSensor {
    _trigger_gpio: i32,
}

impl UltrasonicSensor {
    pub fn new(trigger_gpio: i32) -> Self {
        Self {
            _trigger_gpio: trigger_gpio,
        }
    }

    pub fn read(&mut self) -> Result<u16, SensorError> {
        self.trigger()?;
        match ECHO_WIDTH_US.load(Ordering::Acquire) {
            0 => Err(SensorError::EchoTimeout),
            width => echo_to_cm(width),
        }
    }

    #[cfg(target_os = "espidf")]
    fn trigger(&mut self) -> Result<(), SensorError> {
        // Clear the latch so a missed echo is not mistaken for the last one.
        ECHO_WIDTH_US.store(0, Ordering::Release);
        hw_init::gpio_write(self._trigger_gpio, true);
        hw_init::delay_us(10);
        hw_init::gpio_write(self._trigger_gpio, false);
        // Longest echo at max range is ~23.5 ms.
        for _ in 0..30 {
            if ECHO_WIDTH_US.load(Ordering::Acquire) != 0 {
                return Ok(());
            }
            hw_init::delay_us(1_000);
        }
        Err(SensorError::EchoTimeout)
    }

    #[cfg(not(target_os = "espidf"))]
    fn trigger(&mut self) -> Result<(), SensorError> {
        Ok(())
    }
}
