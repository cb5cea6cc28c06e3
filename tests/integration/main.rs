//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one node runner or
//! subsystem against mock adapters. All tests run on the host with no real
//! hardware required.

mod console_session_tests;
mod fault_store_tests;
mod mock_hw;
mod sensor_session_tests;
