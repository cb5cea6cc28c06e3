//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements                  | Connects to               |
//! |------------------|-----------------------------|---------------------------|
//! | `eeprom`         | StoragePort, ConfigPort     | NVS blob / in-memory image|
//! | `hardware`       | SensorPort, ButtonPort,     | ESP32 ADC, GPIO, LEDC     |
//! |                  | MotorPort                   |                           |
//! | `log_display`    | DisplayPort                 | Serial log output         |
//! | `log_sink`       | EventSink                   | Serial log output         |
//! | `loopback`       | Transport                   | In-process channel pair   |
//! | `panel`          | KeypadPort, DisplayPort     | Keypad + display pair     |
//! | `uart_transport` | Transport                   | ESP32 UART (espidf only)  |

pub mod eeprom;
pub mod hardware;
pub mod log_display;
pub mod log_sink;
pub mod loopback;
pub mod panel;
#[cfg(target_os = "espidf")]
pub mod uart_transport;
