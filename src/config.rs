//! Node configuration parameters
//!
//! All tunable parameters shared by the sensor node and the console node.
//! Both nodes must agree on the [`LinkConfig::wire_format`]; everything else
//! is local. Values can be overridden from persistent storage.

use serde::{Deserialize, Serialize};

/// Encoding used on the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireFormat {
    /// One byte per message, `0xAA` acknowledgments, no framing.
    /// Compatible with nodes running the legacy byte protocol.
    Raw,
    /// Tagged, length-prefixed, CRC-checked frames with a resync message.
    Framed,
}

/// Serial link parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub wire_format: WireFormat,
    /// Maximum polls `wait_for_ack` performs before reporting a timeout
    pub ack_poll_cap: u32,
    /// Maximum polls for an in-session tick or field before the session aborts
    pub receive_poll_cap: u32,
    /// Upper bound one transport poll may wait for a byte (milliseconds)
    pub poll_interval_ms: u32,
    /// UART baud rate
    pub baud_rate: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            wire_format: WireFormat::Framed,
            ack_poll_cap: 10_000,
            // 5000 polls at 2 ms ≈ 10 s, several console tick periods
            receive_poll_cap: 5_000,
            poll_interval_ms: 2,
            baud_rate: 9600,
        }
    }
}

/// Core node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Link ---
    pub link: LinkConfig,

    // --- Session timing ---
    /// Console tick interrupt period (milliseconds)
    pub tick_period_ms: u32,

    // --- Fault thresholds ---
    /// Temperature (°C) strictly above which a breach is counted
    pub temp_breach_c: u8,
    /// Distance (cm) strictly below which a breach is counted
    pub dist_breach_cm: u16,

    // --- Storage ---
    /// Attempts per storage primitive before a fault is surfaced
    pub storage_retries: u8,

    // --- Actuators ---
    /// Window motor enable duty (0-100%)
    pub motor_duty_percent: u8,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),

            tick_period_ms: 1000, // 1 Hz console tick

            temp_breach_c: 90,
            dist_breach_cm: 10,

            storage_retries: 3,

            motor_duty_percent: 100,
        }
    }
}

impl NodeConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.link.ack_poll_cap == 0 {
            return Err("ack_poll_cap must be non-zero");
        }
        if self.link.receive_poll_cap == 0 {
            return Err("receive_poll_cap must be non-zero");
        }
        if !(1..=1000).contains(&self.link.poll_interval_ms) {
            return Err("poll_interval_ms must be 1–1000");
        }
        if !(1200..=115_200).contains(&self.link.baud_rate) {
            return Err("baud_rate must be 1200–115200");
        }
        if !(10..=60_000).contains(&self.tick_period_ms) {
            return Err("tick_period_ms must be 10–60000");
        }
        if self.storage_retries == 0 {
            return Err("storage_retries must be at least 1");
        }
        if self.motor_duty_percent == 0 || self.motor_duty_percent > 100 {
            return Err("motor_duty_percent must be 1–100");
        }
        Ok(())
    }
}
