//! Board profile
//!
//! Everything that is a property of the board rather than of the bring-up
//! sequence lives here: where the controller maps memory, how big the device
//! is, which protection regions are free, and the controller timing.

use crate::bus::opcodes;
use crate::controller::ControllerConfig;
use crate::error::{Error, Result};

/// OCTOSPI1 memory-mapped base on STM32H7A3
pub const DEFAULT_MAP_BASE: u32 = 0x9000_0000;

/// ESP-PSRAM64H capacity (64 Mbit)
pub const DEFAULT_DEVICE_SIZE: u32 = 0x80_0000;

/// Address space reserved for the controller (256 MiB)
pub const DEFAULT_BLOCK_SIZE: u32 = 0x1000_0000;

/// Fill word written by the pre-mapping clear
pub const DEFAULT_CLEAR_PATTERN: u32 = 0xDEAD_BEEF;

/// Board profile for one external RAM
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpiramConfig {
    /// CPU address where the controller maps the device
    pub map_base: u32,
    /// Device capacity in bytes
    pub device_size: u32,
    /// Static controller parameters
    pub controller: ControllerConfig,
    /// Dummy cycles latched into the read path
    pub read_dummy_cycles: u8,
    /// Chip-select release timeout while mapped, in controller cycles
    pub cs_release_period: u16,
    /// Protection region number fencing the whole controller space
    pub block_region: u8,
    /// Protection region number opening the device window
    pub window_region: u8,
    /// Span of the block region
    pub block_size: u32,
    /// Read the 8-byte identifier during bring-up
    pub read_identifier: bool,
    /// Run the self-test at the end of bring-up
    pub startup_test: bool,
    /// Fill the device before it is mapped
    pub clear_on_init: bool,
    /// Fill word for the clear
    pub clear_pattern: u32,
}

impl Default for SpiramConfig {
    fn default() -> Self {
        Self {
            map_base: DEFAULT_MAP_BASE,
            device_size: DEFAULT_DEVICE_SIZE,
            controller: ControllerConfig::default(),
            read_dummy_cycles: opcodes::QUAD_READ_DUMMY_CYCLES,
            cs_release_period: 1,
            block_region: 1,
            window_region: 2,
            block_size: DEFAULT_BLOCK_SIZE,
            read_identifier: cfg!(feature = "startup-test"),
            startup_test: cfg!(feature = "startup-test"),
            clear_on_init: true,
            clear_pattern: DEFAULT_CLEAR_PATTERN,
        }
    }
}

impl SpiramConfig {
    /// First CPU address past the device window
    ///
    /// Returns `None` if the window would wrap the address space.
    pub fn window_end(&self) -> Option<u32> {
        self.map_base.checked_add(self.device_size)
    }

    /// Check that the profile describes a mappable device
    pub fn validate(&self) -> Result<()> {
        self.controller.validate()?;
        let fits = self.device_size > 0
            && u64::from(self.device_size) <= self.controller.device_size()
            && self.window_end().is_some()
            && self.device_size <= self.block_size
            && self.block_region != self.window_region;
        if !fits {
            return Err(Error::InvalidControllerConfig);
        }
        Ok(())
    }
}
