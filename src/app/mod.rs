//! Application core: node-independent domain types and the port boundary.
//!
//! The session runners in [`crate::session`] drive everything through the
//! **port traits** defined in [`ports`], keeping the protocol fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
