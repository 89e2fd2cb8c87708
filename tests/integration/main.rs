//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below exercises one subsystem against the mock adapters in
//! `mock_hw`. All tests run on the host with no hardware or broker.

mod mock_hw;
mod pairing_flow_tests;
mod persistence_tests;
mod session_tests;
