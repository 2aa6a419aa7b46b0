//! CLI command implementations
//!
//! Every command runs against the simulated device; the register-level
//! backend only exists on target.

pub mod board;
pub mod bringup;
pub mod faults;
