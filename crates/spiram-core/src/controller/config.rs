//! Static controller parameters

use crate::error::{Error, Result};

/// External memory type selector
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemoryType {
    /// Micron mode (D0/D1 ordering in octal DTR)
    Micron,
    /// Macronix flash mode
    Macronix,
    /// AP Memory / standard mode, used for SDR quad pseudo-SRAM
    #[default]
    ApMemory,
    /// Macronix RAM mode
    MacronixRam,
    /// HyperBus memory mode
    HyperBus,
}

impl MemoryType {
    /// MTYP field encoding
    pub const fn bits(&self) -> u32 {
        match self {
            Self::Micron => 0b000,
            Self::Macronix => 0b001,
            Self::ApMemory => 0b010,
            Self::MacronixRam => 0b011,
            Self::HyperBus => 0b100,
        }
    }
}

/// Clock level while chip select is released
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockMode {
    /// CLK low while idle
    #[default]
    Mode0,
    /// CLK high while idle
    Mode3,
}

/// Input sampling point
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleShifting {
    /// Sample on the clock edge
    None,
    /// Sample half a cycle later
    #[default]
    HalfCycle,
}

/// Controller parameters programmed once at start-up
///
/// Defaults are the values validated on STM32H7A3 with an ESP-PSRAM64H.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// FIFO threshold in bytes (1-32)
    pub fifo_threshold: u8,
    /// Memory type selector
    pub memory_type: MemoryType,
    /// Device size as log2 of bytes (23 for 8 MiB)
    pub device_size_log2: u8,
    /// Minimum chip-select high time in cycles (1-8)
    pub chip_select_high_time: u8,
    /// Keep the clock running while idle
    pub free_running_clock: bool,
    /// Clock idle level
    pub clock_mode: ClockMode,
    /// Kernel clock divider (1-256)
    pub clock_prescaler: u16,
    /// Sampling point
    pub sample_shifting: SampleShifting,
    /// Delay data output by a quarter cycle
    pub delay_hold_quarter_cycle: bool,
    /// Release chip select at 2^n byte boundaries (0 disables, 10 = 1 KiB page)
    pub chip_select_boundary: u8,
    /// Bypass the delay block
    pub delay_block_bypass: bool,
    /// Maximum transfer length before releasing the bus (0 disables)
    pub max_transfer: u8,
    /// Forced chip-select refresh period in cycles (0 disables)
    pub refresh: u32,
    /// Status polls before a transaction counts as timed out
    pub timeout_polls: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            fifo_threshold: 1,
            memory_type: MemoryType::ApMemory,
            device_size_log2: 23,
            chip_select_high_time: 1,
            free_running_clock: false,
            clock_mode: ClockMode::Mode0,
            clock_prescaler: 2,
            sample_shifting: SampleShifting::HalfCycle,
            delay_hold_quarter_cycle: false,
            chip_select_boundary: 10,
            delay_block_bypass: true,
            max_transfer: 0,
            refresh: 0,
            timeout_polls: 1_000_000,
        }
    }
}

impl ControllerConfig {
    /// Check every field against its register range
    pub fn validate(&self) -> Result<()> {
        let ok = (1..=32).contains(&self.fifo_threshold)
            && (1..=32).contains(&self.device_size_log2)
            && (1..=8).contains(&self.chip_select_high_time)
            && (1..=256).contains(&self.clock_prescaler)
            && self.chip_select_boundary <= 31
            && self.timeout_polls > 0;
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidControllerConfig)
        }
    }

    /// Device capacity in bytes
    pub const fn device_size(&self) -> u64 {
        1u64 << self.device_size_log2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_board() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.device_size(), 8 * 1024 * 1024);
        assert_eq!(config.memory_type.bits(), 0b010);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let config = ControllerConfig {
            clock_prescaler: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(Error::InvalidControllerConfig));

        let config = ControllerConfig {
            chip_select_high_time: 9,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(Error::InvalidControllerConfig));
    }
}
