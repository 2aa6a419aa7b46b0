//! Memory protection of the controller address space
//!
//! The CPU speculatively reads from normal memory regions. While the bus
//! controller is not yet memory-mapped, such a read into its address space
//! hangs the controller, so the whole space is fenced off as no-access
//! before any path configuration is written, and only the exact device
//! window is opened once mapping succeeded.
//!
//! [`block_all`] hands out a [`Blocked`] token that the memory-map
//! configurator consumes, and [`enable_window`] needs the [`Mapped`] token
//! only a successful activation produces. The ordering is therefore enforced
//! by the types.

use bitflags::bitflags;

use crate::config::SpiramConfig;
use crate::controller::BusController;
use crate::error::{Error, RegionError, Result};
use crate::memory_map::{MappedWindow, Mapped};

/// Number of regions in the Cortex-M7 protection unit
pub const REGION_COUNT: u8 = 16;

/// Smallest region the protection unit supports
pub const MIN_REGION_SIZE: u32 = 32;

bitflags! {
    /// Memory attribute bits of a region
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegionFlags: u8 {
        /// B bit
        const BUFFERABLE = 1 << 0;
        /// C bit
        const CACHEABLE = 1 << 1;
        /// S bit
        const SHAREABLE = 1 << 2;
        /// Instruction fetches fault (XN)
        const EXECUTE_NEVER = 1 << 3;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RegionFlags {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "RegionFlags({=u8:#x})", self.bits())
    }
}

/// Data access permission of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionAccess {
    /// Every access faults
    NoAccess,
    /// Full access from any privilege level
    ReadWrite,
}

/// Memory type of the mapped window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WindowAttributes {
    /// Type extension field (low three bits used)
    pub tex: u8,
    /// Attribute bits
    pub flags: RegionFlags,
}

impl WindowAttributes {
    /// Normal memory, non-cacheable, non-bufferable, non-shareable
    ///
    /// TEX=001 with C=1 and B=1 corrupts the occasional write on STM32H7A3
    /// rev Z; this combination runs clean.
    pub const VERIFIED: Self = Self {
        tex: 0b001,
        flags: RegionFlags::empty(),
    };

    /// Returns true for the combination known to corrupt writes
    pub fn is_unsafe(&self) -> bool {
        self.tex & 0b111 == 0b001
            && self
                .flags
                .contains(RegionFlags::CACHEABLE | RegionFlags::BUFFERABLE)
    }
}

impl Default for WindowAttributes {
    fn default() -> Self {
        Self::VERIFIED
    }
}

/// One protection region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProtectionRegion {
    /// Region number, higher numbers take priority
    pub number: u8,
    /// Region is active; a disabled region ignores every other field
    pub enabled: bool,
    /// Base address, aligned to `size`
    pub base: u32,
    /// Size in bytes, a power of two
    pub size: u32,
    /// Access permission
    pub access: RegionAccess,
    /// Type extension field
    pub tex: u8,
    /// Attribute bits
    pub flags: RegionFlags,
}

impl ProtectionRegion {
    /// No-access, execute-never, strongly-ordered region
    pub const fn blocked(number: u8, base: u32, size: u32) -> Self {
        Self {
            number,
            enabled: true,
            base,
            size,
            access: RegionAccess::NoAccess,
            tex: 0,
            flags: RegionFlags::EXECUTE_NEVER,
        }
    }

    /// Full-access region covering `window` with its attributes
    pub const fn window(number: u8, window: &MappedWindow) -> Self {
        Self {
            number,
            enabled: true,
            base: window.start(),
            size: window.size(),
            access: RegionAccess::ReadWrite,
            tex: window.attributes().tex,
            flags: window.attributes().flags,
        }
    }

    /// Switched-off region
    pub const fn disabled(number: u8) -> Self {
        Self {
            number,
            enabled: false,
            base: 0,
            size: MIN_REGION_SIZE,
            access: RegionAccess::NoAccess,
            tex: 0,
            flags: RegionFlags::empty(),
        }
    }

    /// Returns true if `addr` falls inside an enabled region
    pub const fn contains(&self, addr: u32) -> bool {
        self.enabled && addr >= self.base && addr - self.base < self.size
    }

    /// Attributes of this region
    pub const fn attributes(&self) -> WindowAttributes {
        WindowAttributes {
            tex: self.tex,
            flags: self.flags,
        }
    }

    /// Check the region can be programmed
    pub fn validate(&self) -> Result<()> {
        if self.number >= REGION_COUNT {
            return Err(RegionError::BadRegionNumber.into());
        }
        if !self.enabled {
            return Ok(());
        }
        if !self.size.is_power_of_two() {
            return Err(RegionError::SizeNotPowerOfTwo.into());
        }
        if self.size < MIN_REGION_SIZE {
            return Err(RegionError::SizeTooSmall.into());
        }
        if self.base & (self.size - 1) != 0 {
            return Err(RegionError::Misaligned.into());
        }
        if self.access == RegionAccess::ReadWrite && self.attributes().is_unsafe() {
            return Err(Error::UnsafeWindowAttributes);
        }
        Ok(())
    }

    /// SIZE field encoding, log2(size) - 1
    pub const fn size_field(&self) -> u8 {
        (self.size.trailing_zeros() - 1) as u8
    }
}

/// Proof that the controller address space is fenced off
#[derive(Debug)]
pub struct Blocked {
    _private: (),
}

/// Region that fences the whole controller address space
pub fn block_region(config: &SpiramConfig) -> ProtectionRegion {
    ProtectionRegion::blocked(config.block_region, config.map_base, config.block_size)
}

/// Fence off the controller address space
///
/// The window region is switched off too, so a window left open by an
/// earlier run does not punch through the fence.
pub fn block_all<B: BusController + ?Sized>(bus: &mut B, config: &SpiramConfig) -> Result<Blocked> {
    let regions = [
        block_region(config),
        ProtectionRegion::disabled(config.window_region),
    ];
    for region in &regions {
        region.validate()?;
    }
    log::debug!(
        "mpu block {:#010x}+{:#x} (region {})",
        regions[0].base,
        regions[0].size,
        regions[0].number
    );
    bus.configure_protection(&regions)?;
    Ok(Blocked { _private: () })
}

/// Keep the fence and open the mapped device window
pub fn enable_window<B: BusController + ?Sized>(
    bus: &mut B,
    config: &SpiramConfig,
    mapped: &Mapped,
) -> Result<()> {
    let regions = [
        block_region(config),
        ProtectionRegion::window(config.window_region, mapped.window()),
    ];
    for region in &regions {
        region.validate()?;
    }
    log::debug!(
        "mpu window {:#010x}+{:#x} (region {})",
        regions[1].base,
        regions[1].size,
        regions[1].number
    );
    bus.configure_protection(&regions)
}
