//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns both drivers and produces a [`SensorSnapshot`] each tick
//! for the sensor node's session loop.

pub mod lm35;
pub mod ultrasonic;

use log::warn;

use lm35::Lm35Sensor;
use ultrasonic::UltrasonicSensor;

/// One reading of every sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorSnapshot {
    /// Degrees Celsius.
    pub temperature_c: u8,
    /// Centimetres to the nearest obstacle.
    pub distance_cm: u16,
    /// False when the temperature is the last good value, not a fresh one.
    pub temperature_fresh: bool,
    /// False when the distance is the last good value, not a fresh one.
    pub distance_fresh: bool,
}

/// Aggregates both sensor drivers.
pub struct SensorHub {
    pub temperature: Lm35Sensor,
    pub distance: UltrasonicSensor,
    last: SensorSnapshot,
}

impl SensorHub {
    pub fn new(temperature: Lm35Sensor, distance: UltrasonicSensor) -> Self {
        Self {
            temperature,
            distance,
            last: SensorSnapshot::default(),
        }
    }

    /// Read both sensors.
    ///
    /// A failed read is logged and the previous good value is kept so the
    /// session keeps streaming.
    pub fn read_all(&mut self) -> SensorSnapshot {
        let mut snap = self.last;

        match self.temperature.read() {
            Ok(c) => {
                snap.temperature_c = c;
                snap.temperature_fresh = true;
            }
            Err(e) => {
                warn!("SENSOR | temperature: {}", e);
                snap.temperature_fresh = false;
            }
        }

        match self.distance.read() {
            Ok(cm) => {
                snap.distance_cm = cm;
                snap.distance_fresh = true;
            }
            Err(e) => {
                warn!("SENSOR | distance: {}", e);
                snap.distance_fresh = false;
            }
        }

        self.last = snap;
        snap
    }
}
