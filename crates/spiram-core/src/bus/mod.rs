//! Serial bus types and transaction structures
//!
//! This module provides types for representing bus transactions,
//! line widths, and the device opcodes.

mod line_width;
pub mod opcodes;
mod transaction;

pub use line_width::LineWidth;
pub use transaction::{
    BusTransaction, DataPhase, Operation, TransactionKind, ADDRESS_MASK, MAX_DUMMY_CYCLES,
};
