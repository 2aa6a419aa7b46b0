//! Pseudo-SRAM opcodes
//!
//! Command set shared by the ESP-PSRAM64H and APS6404L-3SQR datasheets.

// ============================================================================
// Array access
// ============================================================================

/// Read (1-1-1, up to 33 MHz)
pub const READ: u8 = 0x03;
/// Fast Read (1-1-1, 8 wait cycles)
pub const FAST_READ: u8 = 0x0B;
/// Quad Read (4-4-4 in QPI mode, 6 wait cycles)
pub const QUAD_READ: u8 = 0xEB;
/// Write (1-1-1)
pub const WRITE: u8 = 0x02;
/// Quad Write (4-4-4 in QPI mode)
pub const QUAD_WRITE: u8 = 0x38;

// ============================================================================
// Mode control
// ============================================================================

/// Enter Quad Mode (issued in SPI mode)
pub const QUAD_ON: u8 = 0x35;
/// Exit Quad Mode (issued in QPI mode)
pub const QUAD_OFF: u8 = 0xF5;
/// Reset Enable
pub const RESET_ENABLE: u8 = 0x66;
/// Reset, must directly follow Reset Enable
pub const RESET: u8 = 0x99;
/// Toggle wrapped burst length between 32 bytes and 1 KiB
pub const BURST_LENGTH_TOGGLE: u8 = 0xC0;

// ============================================================================
// Identification
// ============================================================================

/// Read ID (SPI mode only): MF ID, KGD, then EID bytes
pub const READ_ID: u8 = 0x9F;

// ============================================================================
// Timing
// ============================================================================

/// Wait cycles between address and data for [`QUAD_READ`]
pub const QUAD_READ_DUMMY_CYCLES: u8 = 6;
/// Wait cycles for [`FAST_READ`]
pub const FAST_READ_DUMMY_CYCLES: u8 = 8;

/// Length of the identifier returned by [`READ_ID`]
pub const IDENTIFIER_LEN: usize = 8;
/// Known-good-die marker in the second identifier byte
pub const KGD_PASS: u8 = 0x5D;
