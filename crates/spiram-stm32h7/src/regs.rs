//! STM32H7A3 register definitions
//!
//! Offsets and bit positions for OCTOSPI1, the RCC bits that clock and reset
//! it, and the Cortex-M7 MPU, from RM0455 and the ARMv7-M architecture
//! reference manual.

// ============================================================================
// OCTOSPI1
// ============================================================================

/// OCTOSPI1 register block
pub const OCTOSPI1_BASE: usize = 0x5200_5000;
/// Span of the register block
pub const OCTOSPI_BLOCK_SIZE: usize = 0x400;

/// Control register
pub const OCTOSPI_CR: usize = 0x000;
/// Device configuration register 1
pub const OCTOSPI_DCR1: usize = 0x008;
/// Device configuration register 2
pub const OCTOSPI_DCR2: usize = 0x00C;
/// Device configuration register 3
pub const OCTOSPI_DCR3: usize = 0x010;
/// Device configuration register 4
pub const OCTOSPI_DCR4: usize = 0x014;
/// Status register
pub const OCTOSPI_SR: usize = 0x020;
/// Flag clear register
pub const OCTOSPI_FCR: usize = 0x024;
/// Data length register (length - 1)
pub const OCTOSPI_DLR: usize = 0x040;
/// Address register
pub const OCTOSPI_AR: usize = 0x048;
/// Data register
pub const OCTOSPI_DR: usize = 0x050;
/// Communication configuration register
pub const OCTOSPI_CCR: usize = 0x100;
/// Timing configuration register
pub const OCTOSPI_TCR: usize = 0x108;
/// Instruction register
pub const OCTOSPI_IR: usize = 0x110;
/// Low-power timeout register
pub const OCTOSPI_LPTR: usize = 0x130;
/// Write communication configuration register
pub const OCTOSPI_WCCR: usize = 0x180;
/// Write timing configuration register
pub const OCTOSPI_WTCR: usize = 0x188;
/// Write instruction register
pub const OCTOSPI_WIR: usize = 0x190;

// CR bits
/// Enable
pub const CR_EN: u32 = 1 << 0;
/// Abort request
pub const CR_ABORT: u32 = 1 << 1;
/// Timeout counter enable (memory-mapped mode)
pub const CR_TCEN: u32 = 1 << 3;
/// FIFO threshold level shift (value - 1)
pub const CR_FTHRES_SHIFT: u32 = 8;
/// FIFO threshold level mask
pub const CR_FTHRES_MASK: u32 = 0x1F << CR_FTHRES_SHIFT;
/// Functional mode shift
pub const CR_FMODE_SHIFT: u32 = 28;
/// Functional mode mask
pub const CR_FMODE_MASK: u32 = 0b11 << CR_FMODE_SHIFT;
/// Indirect write mode
pub const FMODE_INDIRECT_WRITE: u32 = 0b00 << CR_FMODE_SHIFT;
/// Indirect read mode
pub const FMODE_INDIRECT_READ: u32 = 0b01 << CR_FMODE_SHIFT;
/// Memory-mapped mode
pub const FMODE_MEMORY_MAPPED: u32 = 0b11 << CR_FMODE_SHIFT;

// DCR1 bits
/// Clock mode 3
pub const DCR1_CKMODE: u32 = 1 << 0;
/// Free-running clock
pub const DCR1_FRCK: u32 = 1 << 1;
/// Delay block bypass
pub const DCR1_DLYBYP: u32 = 1 << 3;
/// Chip-select high time shift (cycles - 1)
pub const DCR1_CSHT_SHIFT: u32 = 8;
/// Device size shift (log2 - 1)
pub const DCR1_DEVSIZE_SHIFT: u32 = 16;
/// Memory type shift
pub const DCR1_MTYP_SHIFT: u32 = 24;

// DCR2 bits
/// Clock prescaler shift (divider - 1)
pub const DCR2_PRESCALER_SHIFT: u32 = 0;

// DCR3 bits
/// Maximum transfer shift
pub const DCR3_MAXTRAN_SHIFT: u32 = 0;
/// Chip-select boundary shift
pub const DCR3_CSBOUND_SHIFT: u32 = 16;

// SR / FCR bits
/// Transfer error
pub const SR_TEF: u32 = 1 << 0;
/// Transfer complete
pub const SR_TCF: u32 = 1 << 1;
/// FIFO threshold reached
pub const SR_FTF: u32 = 1 << 2;
/// Status match
pub const SR_SMF: u32 = 1 << 3;
/// Timeout (memory-mapped chip-select release)
pub const SR_TOF: u32 = 1 << 4;
/// Busy
pub const SR_BUSY: u32 = 1 << 5;
/// Clear transfer error
pub const FCR_CTEF: u32 = 1 << 0;
/// Clear transfer complete
pub const FCR_CTCF: u32 = 1 << 1;
/// Clear status match
pub const FCR_CSMF: u32 = 1 << 3;
/// Clear timeout
pub const FCR_CTOF: u32 = 1 << 4;

// CCR / WCCR bits
/// Instruction mode shift
pub const CCR_IMODE_SHIFT: u32 = 0;
/// Instruction size shift (0 = 8-bit)
pub const CCR_ISIZE_SHIFT: u32 = 4;
/// Address mode shift
pub const CCR_ADMODE_SHIFT: u32 = 8;
/// Address size shift
pub const CCR_ADSIZE_SHIFT: u32 = 12;
/// 24-bit address
pub const ADSIZE_24: u32 = 0b10;
/// Data mode shift
pub const CCR_DMODE_SHIFT: u32 = 24;
/// Data strobe enable
pub const CCR_DQSE: u32 = 1 << 29;
/// Send instruction only once
pub const CCR_SIOO: u32 = 1 << 31;
/// Phase on one line
pub const MODE_SINGLE: u32 = 0b001;
/// Phase on four lines
pub const MODE_QUAD: u32 = 0b011;

// TCR / WTCR bits
/// Dummy cycle count mask
pub const TCR_DCYC_MASK: u32 = 0x1F;
/// Delay hold quarter cycle
pub const TCR_DHQC: u32 = 1 << 28;
/// Sample shift by half a cycle
pub const TCR_SSHIFT: u32 = 1 << 30;

// ============================================================================
// RCC
// ============================================================================

/// RCC register block
pub const RCC_BASE: usize = 0x5802_4400;
/// AHB3 peripheral reset register
pub const RCC_AHB3RSTR: usize = 0x07C;
/// AHB3 peripheral clock enable register
pub const RCC_AHB3ENR: usize = 0x134;
/// OCTOSPI1 bit in both AHB3 registers
pub const RCC_AHB3_OCTOSPI1: u32 = 1 << 14;

// ============================================================================
// Cortex-M7 MPU
// ============================================================================

/// MPU register block
pub const MPU_BASE: usize = 0xE000_ED90;
/// Type register
pub const MPU_TYPE: usize = 0x00;
/// Control register
pub const MPU_CTRL: usize = 0x04;
/// Region number register
pub const MPU_RNR: usize = 0x08;
/// Region base address register
pub const MPU_RBAR: usize = 0x0C;
/// Region attribute and size register
pub const MPU_RASR: usize = 0x10;
/// Span of the register block
pub const MPU_BLOCK_SIZE: usize = 0x14;

/// Enable the MPU
pub const MPU_CTRL_ENABLE: u32 = 1 << 0;
/// Keep the MPU on in HardFault and NMI handlers
pub const MPU_CTRL_HFNMIENA: u32 = 1 << 1;
/// Default memory map as background region for privileged code
pub const MPU_CTRL_PRIVDEFENA: u32 = 1 << 2;

/// Region enable
pub const RASR_ENABLE: u32 = 1 << 0;
/// Size field shift (log2 - 1)
pub const RASR_SIZE_SHIFT: u32 = 1;
/// Sub-region disable shift
pub const RASR_SRD_SHIFT: u32 = 8;
/// Bufferable
pub const RASR_B: u32 = 1 << 16;
/// Cacheable
pub const RASR_C: u32 = 1 << 17;
/// Shareable
pub const RASR_S: u32 = 1 << 18;
/// TEX field shift
pub const RASR_TEX_SHIFT: u32 = 19;
/// Access permission shift
pub const RASR_AP_SHIFT: u32 = 24;
/// No access
pub const AP_NO_ACCESS: u32 = 0b000;
/// Full access
pub const AP_FULL_ACCESS: u32 = 0b011;
/// Execute never
pub const RASR_XN: u32 = 1 << 28;
