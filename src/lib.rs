//! WinLink firmware library.
//!
//! Two nodes share one serial link: a sensor/actuator node that reads a
//! temperature sensor and an ultrasonic range finder, drives two window
//! motors and persists fault counters, and an operator console with a
//! keypad and a display. Everything hardware-agnostic lives here so both
//! firmware binaries and the host tests use the same code. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod actuator;
pub mod adapters;
pub mod app;
pub mod config;
pub mod display;
pub mod drivers;
pub mod error;
pub mod faults;
pub mod link;
pub mod pins;
pub mod sensors;
pub mod session;
pub mod telemetry;

#[cfg(target_os = "espidf")]
mod esp_link_shims;
