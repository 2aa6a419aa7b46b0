//! Controller trait definitions

use crate::bus::BusTransaction;
use crate::controller::ControllerConfig;
use crate::error::Result;
use crate::memory_map::MemoryMapConfig;
use crate::protection::ProtectionRegion;

/// Bus controller capability
///
/// This trait represents the CPU-side peripheral that clocks transactions out
/// to the device, the memory-mapped mode that replaces explicit transactions,
/// and the protection unit guarding the controller's address space. Every
/// call blocks until the hardware signals completion or the poll budget runs
/// out; only one transaction is ever in flight.
///
/// ## Example: backend
///
/// ```ignore
/// impl BusController for MyController {
///     fn execute(&mut self, txn: &mut BusTransaction<'_>) -> Result<()> {
///         txn.validate()?;
///         self.program_framing(txn);
///         match &mut txn.data {
///             DataPhase::None => self.wait_complete(Phase::Command),
///             DataPhase::Receive(buf) => self.receive(buf),
///             DataPhase::Transmit(data) => self.transmit(data),
///         }
///     }
///     // ...
/// }
/// ```
pub trait BusController {
    /// Reset and program the controller with its static parameters
    ///
    /// This leaves the controller in indirect mode with no memory mapping.
    /// The external device's own mode is not affected.
    fn init_controller(&mut self, config: &ControllerConfig) -> Result<()>;

    /// Execute one transaction
    ///
    /// Returns once the transaction has been fully clocked out and any data
    /// received into the transaction's buffer, or fails with a
    /// [`TransportError`](crate::error::TransportError) naming the phase.
    /// Nothing is retried.
    fn execute(&mut self, txn: &mut BusTransaction<'_>) -> Result<()>;

    /// Switch to memory-mapped mode using the latched read/write paths
    fn memory_map(&mut self, config: &MemoryMapConfig) -> Result<()>;

    /// Program the given protection regions in one critical section
    fn configure_protection(&mut self, regions: &[ProtectionRegion]) -> Result<()>;
}

/// Width of a single load or store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccessWidth {
    /// 8-bit access
    Byte,
    /// 16-bit access
    Half,
    /// 32-bit access
    Word,
}

impl AccessWidth {
    /// Access size in bytes
    pub const fn bytes(&self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }

    /// Access size in bits
    pub const fn bits(&self) -> u32 {
        self.bytes() * 8
    }
}

/// CPU load/store view of the memory-mapped window
///
/// Addresses are absolute CPU addresses inside the mapped window. Each call
/// is a single volatile access of the given width.
pub trait MappedMemory {
    /// 8-bit load
    fn read8(&mut self, addr: u32) -> u8;
    /// 16-bit load, `addr` 2-byte aligned
    fn read16(&mut self, addr: u32) -> u16;
    /// 32-bit load, `addr` 4-byte aligned
    fn read32(&mut self, addr: u32) -> u32;
    /// 8-bit store
    fn write8(&mut self, addr: u32, value: u8);
    /// 16-bit store, `addr` 2-byte aligned
    fn write16(&mut self, addr: u32, value: u16);
    /// 32-bit store, `addr` 4-byte aligned
    fn write32(&mut self, addr: u32, value: u32);
}

impl<T: BusController + ?Sized> BusController for &mut T {
    fn init_controller(&mut self, config: &ControllerConfig) -> Result<()> {
        (**self).init_controller(config)
    }

    fn execute(&mut self, txn: &mut BusTransaction<'_>) -> Result<()> {
        (**self).execute(txn)
    }

    fn memory_map(&mut self, config: &MemoryMapConfig) -> Result<()> {
        (**self).memory_map(config)
    }

    fn configure_protection(&mut self, regions: &[ProtectionRegion]) -> Result<()> {
        (**self).configure_protection(regions)
    }
}

impl<T: MappedMemory + ?Sized> MappedMemory for &mut T {
    fn read8(&mut self, addr: u32) -> u8 {
        (**self).read8(addr)
    }

    fn read16(&mut self, addr: u32) -> u16 {
        (**self).read16(addr)
    }

    fn read32(&mut self, addr: u32) -> u32 {
        (**self).read32(addr)
    }

    fn write8(&mut self, addr: u32, value: u8) {
        (**self).write8(addr, value)
    }

    fn write16(&mut self, addr: u32, value: u16) {
        (**self).write16(addr, value)
    }

    fn write32(&mut self, addr: u32, value: u32) {
        (**self).write32(addr, value)
    }
}
