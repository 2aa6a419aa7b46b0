//! Memory-mapped mode
//!
//! Latches the framing the controller uses for CPU stores and loads, then
//! switches it to memory-mapped mode. From then on the device is reached
//! through the [`MappedWindow`] with ordinary loads and stores, and explicit
//! transactions are no longer possible.

use crate::bus::{opcodes, BusTransaction};
use crate::config::SpiramConfig;
use crate::controller::BusController;
use crate::diagnostics::{Diagnostics, Failure};
use crate::error::{Error, Result};
use crate::protection::{Blocked, WindowAttributes};
use crate::protocol::{transport, Device, QuadLine};

/// Memory-mapped mode parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryMapConfig {
    /// Release chip select after `timeout_period` idle cycles
    pub timeout_counter: bool,
    /// Idle cycles before chip select is released
    pub timeout_period: u16,
}

impl MemoryMapConfig {
    /// Release chip select after `period` idle cycles
    pub const fn cs_release(period: u16) -> Self {
        Self {
            timeout_counter: true,
            timeout_period: period,
        }
    }

    /// Pseudo-SRAM self-refreshes only with chip select released, so the
    /// counter must be on with a non-zero period.
    pub fn validate(&self) -> Result<()> {
        if !self.timeout_counter || self.timeout_period == 0 {
            return Err(Error::InvalidMemoryMap);
        }
        Ok(())
    }
}

/// CPU address range backed by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MappedWindow {
    base: u32,
    size: u32,
    attributes: WindowAttributes,
}

impl MappedWindow {
    /// Window of `size` bytes at `base`
    pub const fn new(base: u32, size: u32, attributes: WindowAttributes) -> Self {
        Self {
            base,
            size,
            attributes,
        }
    }

    /// First address
    pub const fn start(&self) -> u32 {
        self.base
    }

    /// First address past the window
    pub const fn end(&self) -> u32 {
        self.base.wrapping_add(self.size)
    }

    /// Size in bytes
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Memory attributes the window is opened with
    pub const fn attributes(&self) -> WindowAttributes {
        self.attributes
    }

    /// Returns true if `addr` lies inside the window
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr - self.base < self.size
    }
}

/// Proof that memory-mapped mode is active
#[derive(Debug)]
pub struct Mapped {
    window: MappedWindow,
}

impl Mapped {
    /// The window now backed by the device
    pub fn window(&self) -> &MappedWindow {
        &self.window
    }
}

/// Why [`activate`] did not hand out a window
#[derive(Debug)]
pub enum Unmapped {
    /// Controller is still in indirect mode; explicit access remains possible
    Indirect(Device<QuadLine>),
    /// Controller entered memory-mapped mode with a path it rejected
    ///
    /// Explicit transactions can no longer be issued and the window must not
    /// be opened.
    Stranded,
}

fn configure<B: BusController + ?Sized>(
    bus: &mut B,
    mut txn: BusTransaction<'_>,
    failure: Failure,
    diag: &mut Diagnostics,
) -> bool {
    match transport::execute(bus, &mut txn) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{:?}: {}", failure, e);
            diag.record_if_absent(failure);
            false
        }
    }
}

/// Latch both paths and enter memory-mapped mode
///
/// Activation is attempted even after a path configuration failed, so the
/// diagnostics show how far the controller got, but the window is only
/// handed out when all three steps succeeded. The device handle only comes
/// back while the controller is still in indirect mode.
pub fn activate<B: BusController + ?Sized>(
    bus: &mut B,
    device: Device<QuadLine>,
    blocked: Blocked,
    config: &SpiramConfig,
    diag: &mut Diagnostics,
) -> core::result::Result<Mapped, Unmapped> {
    // The fence must stay up for as long as the paths are being written
    let _blocked = blocked;

    // STM32H7A3 errata 2.7.8: the write path always drives DQS
    let write_ok = configure(
        bus,
        BusTransaction::write_path(opcodes::QUAD_WRITE),
        Failure::WritePathConfig,
        diag,
    );
    let read_ok = configure(
        bus,
        BusTransaction::read_path(opcodes::QUAD_READ, config.read_dummy_cycles),
        Failure::ReadPathConfig,
        diag,
    );

    let map_config = MemoryMapConfig::cs_release(config.cs_release_period);
    let mapped_ok = match map_config.validate().and_then(|()| bus.memory_map(&map_config)) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("mapping activation: {}", e);
            diag.record_if_absent(Failure::MappingActivation);
            false
        }
    };

    if write_ok && read_ok && mapped_ok {
        let window = MappedWindow::new(
            config.map_base,
            config.device_size,
            WindowAttributes::VERIFIED,
        );
        log::info!(
            "mapped {:#010x}..{:#010x}",
            window.start(),
            window.end()
        );
        Ok(Mapped { window })
    } else if mapped_ok {
        log::error!("controller mapped with a rejected path");
        Err(Unmapped::Stranded)
    } else {
        Err(Unmapped::Indirect(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{LineWidth, Operation};
    use crate::protection;
    use crate::testing::{Event, FakeBus};
    use std::vec::Vec;

    fn negotiated(bus: &mut FakeBus, diag: &mut Diagnostics) -> Device<QuadLine> {
        Device::new().reset(bus, diag).enable_quad(bus, diag)
    }

    #[test]
    fn test_cs_release_validation() {
        assert!(MemoryMapConfig::cs_release(1).validate().is_ok());
        assert_eq!(
            MemoryMapConfig::cs_release(0).validate(),
            Err(Error::InvalidMemoryMap)
        );
    }

    #[test]
    fn test_window_bounds() {
        let window = MappedWindow::new(0x9000_0000, 0x80_0000, WindowAttributes::VERIFIED);
        assert_eq!(window.end(), 0x9080_0000);
        assert!(window.contains(0x907F_FFFF));
        assert!(!window.contains(0x9080_0000));
        assert!(!window.contains(0x8FFF_FFFF));
    }

    #[test]
    fn test_activate_latches_paths_in_order() {
        let config = SpiramConfig::default();
        let mut bus = FakeBus::new(0x100);
        let mut diag = Diagnostics::new();
        let device = negotiated(&mut bus, &mut diag);
        let blocked = protection::block_all(&mut bus, &config).unwrap();

        let mapped = activate(&mut bus, device, blocked, &config, &mut diag).unwrap();
        assert_eq!(mapped.window().start(), 0x9000_0000);
        assert_eq!(mapped.window().size(), 0x80_0000);
        assert!(diag.is_ok());

        let tail: Vec<_> = bus.events().iter().rev().take(3).rev().cloned().collect();
        assert_eq!(
            tail,
            [
                Event::Command {
                    operation: Operation::ConfigureWritePath,
                    instruction: opcodes::QUAD_WRITE,
                    lines: LineWidth::Quad,
                    data_strobe: true,
                    dummy_cycles: 0,
                },
                Event::Command {
                    operation: Operation::ConfigureReadPath,
                    instruction: opcodes::QUAD_READ,
                    lines: LineWidth::Quad,
                    data_strobe: false,
                    dummy_cycles: 6,
                },
                Event::MemoryMap(MemoryMapConfig::cs_release(1)),
            ]
        );
    }

    #[test]
    fn test_activation_attempted_after_path_failure() {
        let config = SpiramConfig::default();
        let mut bus = FakeBus::new(0x100);
        let mut diag = Diagnostics::new();
        let device = negotiated(&mut bus, &mut diag);
        let blocked = protection::block_all(&mut bus, &config).unwrap();
        bus.fail_operation(Operation::ConfigureWritePath);

        let unmapped = activate(&mut bus, device, blocked, &config, &mut diag).unwrap_err();
        assert!(matches!(unmapped, Unmapped::Stranded));
        assert_eq!(diag.failure(), Some(Failure::WritePathConfig));
        assert!(matches!(bus.events().last(), Some(Event::MemoryMap(_))));
    }

    #[test]
    fn test_activation_failure_returns_device() {
        let config = SpiramConfig::default();
        let mut bus = FakeBus::new(0x100);
        let mut diag = Diagnostics::new();
        let device = negotiated(&mut bus, &mut diag);
        let blocked = protection::block_all(&mut bus, &config).unwrap();
        bus.fail_memory_map();

        let device = match activate(&mut bus, device, blocked, &config, &mut diag) {
            Err(Unmapped::Indirect(device)) => device,
            other => panic!("expected indirect mode, got {:?}", other),
        };
        assert_eq!(diag.failure(), Some(Failure::MappingActivation));
        let mut buf = [0u8; 4];
        assert!(device.read(&mut bus, 0, &mut buf).is_ok());
    }

    #[test]
    fn test_rejected_path_with_failed_activation_stays_indirect() {
        let config = SpiramConfig::default();
        let mut bus = FakeBus::new(0x100);
        let mut diag = Diagnostics::new();
        let device = negotiated(&mut bus, &mut diag);
        let blocked = protection::block_all(&mut bus, &config).unwrap();
        bus.fail_operation(Operation::ConfigureReadPath);
        bus.fail_memory_map();

        let unmapped = activate(&mut bus, device, blocked, &config, &mut diag).unwrap_err();
        assert!(matches!(unmapped, Unmapped::Indirect(_)));
        assert_eq!(diag.failure(), Some(Failure::ReadPathConfig));
    }
}
