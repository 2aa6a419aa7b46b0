//! Error types for spiram-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Transaction phase in which a transport failure was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Instruction/address/dummy phase, or the controller never became idle
    Command,
    /// Receive or transmit data phase
    Data,
}

/// What went wrong on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportFault {
    /// The completion flag did not arrive within the poll budget
    Timeout,
    /// The controller flagged a transfer error
    BusError,
}

/// A failed bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportError {
    /// Phase in which the failure was seen
    pub phase: Phase,
    /// Failure cause
    pub fault: TransportFault,
}

impl TransportError {
    /// Timeout during the given phase
    pub const fn timeout(phase: Phase) -> Self {
        Self {
            phase,
            fault: TransportFault::Timeout,
        }
    }

    /// Controller-signalled transfer error during the given phase
    pub const fn bus_error(phase: Phase) -> Self {
        Self {
            phase,
            fault: TransportFault::BusError,
        }
    }
}

/// Reasons a transaction is refused before it reaches the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidTransaction {
    /// Address does not fit the 24-bit address field
    AddressOutOfRange,
    /// More dummy cycles than the controller can generate
    DummyCyclesOutOfRange,
    /// Data line width given without a data buffer, or the reverse
    DataPhaseMismatch,
    /// Path configuration transactions cannot carry data
    ConfigurationCarriesData,
    /// Path configuration transactions need a data line width
    MissingDataLines,
    /// Memory-mapped write path without the data strobe enabled
    StrobeRequired,
}

/// Reasons a protection region is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionError {
    /// Region size is not a power of two
    SizeNotPowerOfTwo,
    /// Region size is below the 32-byte minimum
    SizeTooSmall,
    /// Base address is not aligned to the region size
    Misaligned,
    /// Region number beyond the unit's region count
    BadRegionNumber,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Bus errors
    /// A transaction failed on the bus
    Transport(TransportError),
    /// A transaction was rejected before being issued
    InvalidTransaction(InvalidTransaction),

    // Configuration errors
    /// Controller parameters out of range
    InvalidControllerConfig,
    /// Memory-map parameters out of range (e.g. chip-select release disabled)
    InvalidMemoryMap,
    /// Protection region rejected
    InvalidRegion(RegionError),
    /// Window attributes known to corrupt writes on this silicon
    UnsafeWindowAttributes,

    // State errors
    /// Device has not been switched to quad mode yet
    NotNegotiated,
    /// Device is memory-mapped; explicit transactions are not allowed
    WindowMapped,
    /// Address range outside the device
    OutOfBounds,

    // Backend errors
    /// The backend could not bring up the controller peripheral
    ControllerUnavailable,
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<InvalidTransaction> for Error {
    fn from(e: InvalidTransaction) -> Self {
        Self::InvalidTransaction(e)
    }
}

impl From<RegionError> for Error {
    fn from(e: RegionError) -> Self {
        Self::InvalidRegion(e)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::Data => write!(f, "data"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fault {
            TransportFault::Timeout => write!(f, "bus timeout in {} phase", self.phase),
            TransportFault::BusError => write!(f, "bus transfer error in {} phase", self.phase),
        }
    }
}

impl fmt::Display for InvalidTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfRange => write!(f, "address exceeds 24-bit field"),
            Self::DummyCyclesOutOfRange => write!(f, "dummy cycle count out of range"),
            Self::DataPhaseMismatch => write!(f, "data lines and data buffer disagree"),
            Self::ConfigurationCarriesData => write!(f, "path configuration cannot carry data"),
            Self::MissingDataLines => write!(f, "path configuration needs data lines"),
            Self::StrobeRequired => write!(f, "write path requires the data strobe"),
        }
    }
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeNotPowerOfTwo => write!(f, "region size is not a power of two"),
            Self::SizeTooSmall => write!(f, "region size below 32 bytes"),
            Self::Misaligned => write!(f, "region base not aligned to its size"),
            Self::BadRegionNumber => write!(f, "region number out of range"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::InvalidTransaction(e) => write!(f, "invalid transaction: {}", e),
            Self::InvalidControllerConfig => write!(f, "invalid controller configuration"),
            Self::InvalidMemoryMap => write!(f, "invalid memory-map configuration"),
            Self::InvalidRegion(e) => write!(f, "invalid protection region: {}", e),
            Self::UnsafeWindowAttributes => {
                write!(f, "window attributes corrupt memory-mapped writes")
            }
            Self::NotNegotiated => write!(f, "device not in quad mode"),
            Self::WindowMapped => write!(f, "device is memory-mapped"),
            Self::OutOfBounds => write!(f, "address out of bounds"),
            Self::ControllerUnavailable => write!(f, "bus controller unavailable"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
