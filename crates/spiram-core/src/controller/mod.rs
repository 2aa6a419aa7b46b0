//! Bus controller abstractions
//!
//! This module defines the capability traits a backend implements to run
//! the bring-up sequence, and the controller's static parameters.

mod config;
mod traits;

pub use config::{ClockMode, ControllerConfig, MemoryType, SampleShifting};
pub use traits::*;
