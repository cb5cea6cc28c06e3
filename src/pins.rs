//! GPIO / peripheral pin assignments for both WinLink boards.
//!
//! Single source of truth: every driver and both binaries reference this
//! module rather than hard-coding pin numbers. Both nodes use the same
//! ESP32-S3 module, so the link UART pins are shared.

// ---------------------------------------------------------------------------
// Inter-node link (both boards)
// ---------------------------------------------------------------------------

/// UART peripheral carrying the link.
pub const LINK_UART_NUM: i32 = 1;
pub const LINK_UART_TX_GPIO: i32 = 17;
pub const LINK_UART_RX_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Sensor node: LM35 temperature (ADC1)
// ---------------------------------------------------------------------------

/// LM35 output, ADC1 channel 8 (GPIO 9 on ESP32-S3).
pub const LM35_ADC_GPIO: i32 = 9;
pub const LM35_ADC1_CHANNEL: u32 = 8;

// ---------------------------------------------------------------------------
// Sensor node: HC-SR04 ultrasonic
// ---------------------------------------------------------------------------

/// Digital output: 10 µs HIGH pulse starts a measurement.
pub const US_TRIGGER_GPIO: i32 = 6;
/// Digital input: HIGH for the duration of the echo.
pub const US_ECHO_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Sensor node: window motors (dual H-bridge)
// ---------------------------------------------------------------------------

pub const W1_IN_A_GPIO: i32 = 1;
pub const W1_IN_B_GPIO: i32 = 2;
/// LEDC channel 0 drives the enable input.
pub const W1_EN_GPIO: i32 = 3;

pub const W2_IN_A_GPIO: i32 = 4;
pub const W2_IN_B_GPIO: i32 = 5;
/// LEDC channel 1 drives the enable input.
pub const W2_EN_GPIO: i32 = 10;

/// Motor enable PWM frequency (1 kHz).
pub const MOTOR_PWM_FREQ_HZ: u32 = 1_000;

// ---------------------------------------------------------------------------
// Sensor node: window buttons (active-low, internal pull-up)
// ---------------------------------------------------------------------------

pub const W1_OPEN_GPIO: i32 = 11;
pub const W1_CLOSE_GPIO: i32 = 12;
pub const W2_OPEN_GPIO: i32 = 13;
pub const W2_CLOSE_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Console node: 4×4 keypad
// ---------------------------------------------------------------------------

/// Driven low one at a time during a scan.
pub const KEYPAD_ROW_GPIOS: [i32; 4] = [1, 2, 3, 4];
/// Inputs with pull-ups; LOW while a key in the driven row is held.
pub const KEYPAD_COL_GPIOS: [i32; 4] = [5, 6, 7, 8];
