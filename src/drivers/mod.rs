//! Peripheral drivers and one-shot hardware initialisation.

pub mod hw_init;
pub mod hw_timer;
pub mod keypad;
pub mod motor;
