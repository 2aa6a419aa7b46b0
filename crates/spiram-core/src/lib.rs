//! spiram-core - Bring-up of external quad-SPI RAM behind a memory-mapped bus controller
//!
//! This crate drives a pseudo-SRAM device (ESP-PSRAM64H / APS6404L class) from
//! an unknown power-on state into quad mode, programs the bus controller so the
//! device appears as ordinary memory, fences the address window with the CPU's
//! memory protection unit, and optionally runs a destructive pattern test over
//! the whole window. It is `no_std` and never allocates.
//!
//! Hardware access goes through the [`controller::BusController`] and
//! [`controller::MappedMemory`] traits, so the same sequence runs against real
//! registers or against a simulated device in tests.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for the error type
//! - `serde` - Derive `Serialize`/`Deserialize` for the board profile
//! - `defmt` - Derive `defmt::Format` for firmware logging
//! - `startup-test` - Read the identifier and run the self-test during bring-up
//!
//! # Example
//!
//! ```ignore
//! use spiram_core::{Spiram, SpiramConfig};
//!
//! let mut ram = Spiram::new(bus, SpiramConfig::default());
//! if ram.initialize() {
//!     let start = ram.window_start().unwrap();
//!     let end = ram.window_end().unwrap();
//!     heap.extend(start, end);
//! }
//! ram.report_diagnostics(&mut console);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bus;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod memory_map;
pub mod protection;
pub mod protocol;
pub mod selftest;
mod spiram;

#[cfg(test)]
mod testing;

pub use config::SpiramConfig;
pub use diagnostics::{Diagnostics, DiagnosticsReporter, Failure, Mismatch, Outcome};
pub use error::{Error, Result};
pub use spiram::Spiram;
