//! LM35 analog temperature sensor (10 mV/°C).
//!
//! The ADC conversion-complete handler latches the last raw reading into a
//! static atomic; [`Lm35Sensor::read`] converts the latched value. The latch
//! is the only state shared with interrupt context.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `read` samples the channel through the oneshot driver and
//! latches the result itself.
//! On host/test: the latch is written by [`sim_set_temp_adc`].

use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;

/// Sentinel: no conversion has completed yet.
const NO_CONVERSION: u16 = u16::MAX;

static ADC_RESULT: AtomicU16 = AtomicU16::new(NO_CONVERSION);

/// Called from the conversion-complete interrupt.
pub fn adc_conversion_complete(raw: u16) {
    ADC_RESULT.store(raw, Ordering::Release);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_temp_adc(raw: u16) {
    adc_conversion_complete(raw);
}

/// 10-bit converter full scale.
const ADC_MAX: u32 = 1023;
/// Reference voltage, tenths of a volt.
const V_REF_DV: u32 = 50;
/// Sensor output at full scale, tenths of a volt.
const SENSOR_MAX_DV: u32 = 15;
const SENSOR_MAX_C: u32 = 150;

/// °C = raw × 150 × 5 / (1023 × 1.5), truncated.
pub fn adc_to_celsius(raw: u16) -> Result<u8, SensorError> {
    if u32::from(raw) > ADC_MAX {
        return Err(SensorError::OutOfRange);
    }
    let c = u32::from(raw) * SENSOR_MAX_C * V_REF_DV / (ADC_MAX * SENSOR_MAX_DV);
    u8::try_from(c).map_err(|_| SensorError::OutOfRange)
}

pub struct Lm35Sensor {
    #[cfg(target_os = "espidf")]
    adc_channel: u32,
}

impl Lm35Sensor {
    #[cfg(target_os = "espidf")]
    pub fn new(adc_channel: u32) -> Self {
        Self { adc_channel }
    }

    /// The simulated latch is shared, so the channel is not kept.
    #[cfg(not(target_os = "espidf"))]
    pub fn new(_adc_channel: u32) -> Self {
        Self {}
    }

    pub fn read(&mut self) -> Result<u8, SensorError> {
        self.sample();
        match ADC_RESULT.load(Ordering::Acquire) {
            NO_CONVERSION => Err(SensorError::NoConversion),
            raw => adc_to_celsius(raw),
        }
    }

    #[cfg(target_os = "espidf")]
    fn sample(&mut self) {
        if let Some(raw) = hw_init::adc1_read(self.adc_channel) {
            adc_conversion_complete(raw);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn sample(&mut self) {}
}
