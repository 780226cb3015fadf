//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the simulated board and in-memory links.  All tests run on
//! the host with no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod dispatcher_tests;
mod end_to_end_tests;
mod mock_hw;
