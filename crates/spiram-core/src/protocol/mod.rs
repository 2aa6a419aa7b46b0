//! Device protocol
//!
//! The transport issues single transactions, the mode controller strings them
//! into the reset and negotiation sequence.

mod mode;
pub mod transport;

pub use mode::{Device, QuadLine, SingleLine, Unknown, CLEAR_CHUNK};
