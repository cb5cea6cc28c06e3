//! One tick's worth of sensor-node telemetry and its field layout on the link.

use crate::actuator::ActuatorState;
use crate::link::Field;

/// Field order of a Monitor tick. The first four are acknowledged.
pub const MONITOR_FIELDS: [Field; 5] = [
    Field::Temperature,
    Field::DistanceHigh,
    Field::DistanceLow,
    Field::Window1,
    Field::Window2,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetrySample {
    /// Degrees Celsius.
    pub temperature: u8,
    /// Centimetres.
    pub distance: u16,
    pub window1: ActuatorState,
    pub window2: ActuatorState,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            temperature: 0,
            distance: 0,
            window1: ActuatorState::Stop,
            window2: ActuatorState::Stop,
        }
    }
}

impl TelemetrySample {
    /// Byte value of `field` in this sample.
    pub fn field(&self, field: Field) -> u8 {
        let [high, low] = self.distance.to_be_bytes();
        match field {
            Field::Temperature => self.temperature,
            Field::DistanceHigh => high,
            Field::DistanceLow => low,
            Field::Window1 => self.window1.code(),
            Field::Window2 => self.window2.code(),
            Field::DistCounter | Field::TempCounter => 0,
        }
    }

    /// All Monitor fields in transmit order.
    pub fn fields(&self) -> [(Field, u8); 5] {
        MONITOR_FIELDS.map(|f| (f, self.field(f)))
    }

    /// Store a received field. Unknown window codes leave the window as is.
    pub fn merge(&mut self, field: Field, value: u8) {
        let [high, low] = self.distance.to_be_bytes();
        match field {
            Field::Temperature => self.temperature = value,
            Field::DistanceHigh => self.distance = u16::from_be_bytes([value, low]),
            Field::DistanceLow => self.distance = u16::from_be_bytes([high, value]),
            Field::Window1 => {
                if let Ok(s) = ActuatorState::try_from(value) {
                    self.window1 = s;
                }
            }
            Field::Window2 => {
                if let Ok(s) = ActuatorState::try_from(value) {
                    self.window2 = s;
                }
            }
            Field::DistCounter | Field::TempCounter => {}
        }
    }
}
