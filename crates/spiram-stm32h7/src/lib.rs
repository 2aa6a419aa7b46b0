//! spiram-stm32h7 - STM32H7A3 backend for spiram-core
//!
//! Drives the pseudo-SRAM through OCTOSPI1 in quad mode and fences the
//! memory-mapped window with the Cortex-M7 MPU.
//!
//! # Example
//!
//! ```ignore
//! use spiram_core::{Spiram, SpiramConfig};
//! use spiram_stm32h7::Stm32h7Spiram;
//!
//! let bus = unsafe { Stm32h7Spiram::new(spiram_core::config::DEFAULT_MAP_BASE) };
//! let mut ram = Spiram::new(bus, SpiramConfig::default());
//! ram.initialize();
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(test)]
extern crate std;

pub mod mmio;
pub mod mpu;
pub mod octospi;
pub mod regs;

use spiram_core::bus::BusTransaction;
use spiram_core::controller::{BusController, ControllerConfig, MappedMemory};
use spiram_core::error::Result;
use spiram_core::memory_map::MemoryMapConfig;
use spiram_core::protection::ProtectionRegion;

use mmio::Mmio;
use mpu::Mpu;
use octospi::Octospi;

/// Bus controller backed by real STM32H7A3 registers
#[derive(Debug)]
pub struct Stm32h7Spiram {
    octospi: Octospi,
    mpu: Mpu,
    window: Mmio,
    map_base: u32,
}

impl Stm32h7Spiram {
    /// Backend for OCTOSPI1 with its window at `map_base`
    ///
    /// # Safety
    ///
    /// The caller must own OCTOSPI1, its RCC bits and the MPU, and
    /// `map_base` must be the OCTOSPI1 memory-mapped region.
    pub unsafe fn new(map_base: u32) -> Self {
        let size = ControllerConfig::default().device_size() as usize;
        Self::from_parts(
            Octospi::new(),
            Mpu::new(),
            Mmio::new(map_base as usize, size),
            map_base,
        )
    }

    /// Backend over already-built drivers
    pub fn from_parts(octospi: Octospi, mpu: Mpu, window: Mmio, map_base: u32) -> Self {
        Self {
            octospi,
            mpu,
            window,
            map_base,
        }
    }

    fn offset(&self, addr: u32) -> usize {
        debug_assert!(addr >= self.map_base, "address below the mapped window");
        addr.wrapping_sub(self.map_base) as usize
    }
}

impl BusController for Stm32h7Spiram {
    fn init_controller(&mut self, config: &ControllerConfig) -> Result<()> {
        self.octospi.init(config)
    }

    fn execute(&mut self, txn: &mut BusTransaction<'_>) -> Result<()> {
        self.octospi.execute(txn)
    }

    fn memory_map(&mut self, config: &MemoryMapConfig) -> Result<()> {
        self.octospi.memory_map(config)
    }

    fn configure_protection(&mut self, regions: &[ProtectionRegion]) -> Result<()> {
        self.mpu.configure(regions)
    }
}

impl MappedMemory for Stm32h7Spiram {
    fn read8(&mut self, addr: u32) -> u8 {
        self.window.read8(self.offset(addr))
    }

    fn read16(&mut self, addr: u32) -> u16 {
        self.window.read16(self.offset(addr))
    }

    fn read32(&mut self, addr: u32) -> u32 {
        self.window.read32(self.offset(addr))
    }

    fn write8(&mut self, addr: u32, value: u8) {
        self.window.write8(self.offset(addr), value)
    }

    fn write16(&mut self, addr: u32, value: u16) {
        self.window.write16(self.offset(addr), value)
    }

    fn write32(&mut self, addr: u32, value: u32) {
        self.window.write32(self.offset(addr), value)
    }
}
