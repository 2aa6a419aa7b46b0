//! spiram-dummy - Simulated bus controller and pseudo-SRAM for testing
//!
//! [`DummySpiram`] plays both sides of the bus: a memory-mapped serial
//! controller with its protection unit, and an ESP-PSRAM64H behind it that
//! tracks its SPI/QPI mode the way the real part does. Commands framed for
//! the wrong mode are clocked out but ignored by the device, so the reset
//! sequence has to work from either power-on mode.
//!
//! The controller side reproduces two hardware quirks:
//! - a memory-mapped write path latched without the data strobe drops every
//!   mapped store (STM32H7A3 errata 2.7.8)
//! - a window opened as TEX=001, C=1, B=1 loses the occasional store
//!
//! Failures are injected per transaction ([`CommandTrigger`]), per step
//! ([`Injection`]) or per mapped load ([`MemoryFault`]).

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

mod faults;
#[cfg(all(test, feature = "alloc"))]
mod scenarios;

pub use faults::{CommandTrigger, Injection, MemoryFault};

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use spiram_core::bus::{opcodes, BusTransaction, DataPhase, LineWidth, Operation};
use spiram_core::controller::{AccessWidth, BusController, ControllerConfig, MappedMemory};
use spiram_core::error::{Error, Phase, Result, TransportError};
use spiram_core::memory_map::MemoryMapConfig;
use spiram_core::protection::{ProtectionRegion, RegionAccess, REGION_COUNT};

/// Interface mode of the simulated device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceMode {
    /// Single-line, the power-on default
    #[default]
    Spi,
    /// Quad-line, left over from before a warm reset
    Qpi,
}

impl DeviceMode {
    /// Instruction framing the device decodes in this mode
    pub const fn lines(&self) -> LineWidth {
        match self {
            Self::Spi => LineWidth::Single,
            Self::Qpi => LineWidth::Quad,
        }
    }
}

/// Configuration for the simulated device
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// CPU address of the controller's memory-mapped space
    pub map_base: u32,
    /// Device capacity in bytes, a power of two
    pub size: usize,
    /// Identifier returned by read ID
    pub identifier: [u8; opcodes::IDENTIFIER_LEN],
    /// Mode the device is in when the simulation starts
    pub power_on: DeviceMode,
    /// Initial content of every byte
    pub fill: u8,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            map_base: 0x9000_0000,
            size: 8 * 1024 * 1024,
            // MF 0x0D, KGD pass, then the EID of a sample ESP-PSRAM64H
            identifier: [0x0D, 0x5D, 0x52, 0xA2, 0x64, 0x31, 0x91, 0x31],
            power_on: DeviceMode::Spi,
            fill: 0x00,
        }
    }
}

/// Framing latched for memory-mapped access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathConfig {
    /// Instruction sent for each access
    pub instruction: u8,
    /// Instruction/address/data lines
    pub lines: LineWidth,
    /// Data strobe driven
    pub data_strobe: bool,
    /// Dummy cycles
    pub dummy_cycles: u8,
}

/// Something the simulated controller was asked to do
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Controller initialised
    Init,
    /// Transaction issued (successful or not)
    Transaction {
        /// Register set
        operation: Operation,
        /// Instruction byte
        instruction: u8,
        /// Instruction lines
        lines: LineWidth,
        /// Data strobe flag
        data_strobe: bool,
        /// Dummy cycles
        dummy_cycles: u8,
    },
    /// Memory-mapped mode requested
    MemoryMap(MemoryMapConfig),
    /// Protection regions programmed
    Protection(Vec<ProtectionRegion>),
}

/// Counters of misbehaviour seen by the simulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Loads/stores that hit a no-access region
    pub access_violations: u32,
    /// Loads/stores to the controller space while it was not mapped
    pub unmapped_accesses: u32,
    /// Mapped stores dropped by a write path without data strobe
    pub write_faults: u32,
    /// Mapped stores lost to the corrupting window attributes
    pub corrupted_writes: u32,
    /// Path configurations written with no fence over the controller space
    pub unguarded_configs: u32,
}

/// Every Nth store through a TEX=001/C/B window is lost
const CORRUPTION_INTERVAL: u32 = 4096;

/// Simulated controller and device
#[cfg(feature = "alloc")]
pub struct DummySpiram {
    config: DummyConfig,
    data: Vec<u8>,
    mode: DeviceMode,
    reset_enabled: bool,
    wrap_1k: bool,

    write_path: Option<PathConfig>,
    read_path: Option<PathConfig>,
    mapped: bool,
    regions: [Option<ProtectionRegion>; REGION_COUNT as usize],
    mapped_writes: u32,

    triggers: Vec<CommandTrigger>,
    memory_faults: Vec<MemoryFault>,
    fail_controller_init: bool,
    fail_protection: bool,
    fail_memory_map: bool,

    events: Vec<BusEvent>,
    counters: Counters,
}

#[cfg(feature = "alloc")]
impl DummySpiram {
    /// Create a simulated device with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![config.fill; config.size];
        Self {
            mode: config.power_on,
            config,
            data,
            reset_enabled: false,
            wrap_1k: false,
            write_path: None,
            read_path: None,
            mapped: false,
            regions: [None; REGION_COUNT as usize],
            mapped_writes: 0,
            triggers: Vec::new(),
            memory_faults: Vec::new(),
            fail_controller_init: false,
            fail_protection: false,
            fail_memory_map: false,
            events: Vec::new(),
            counters: Counters::default(),
        }
    }

    /// Create a simulated 8 MiB ESP-PSRAM64H in SPI mode
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Device array content
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Current device mode
    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    /// Returns true if wrapped bursts are 1 KiB instead of 32 bytes
    pub fn wraps_1k(&self) -> bool {
        self.wrap_1k
    }

    /// Returns true if the controller is in memory-mapped mode
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Latched write path
    pub fn write_path(&self) -> Option<&PathConfig> {
        self.write_path.as_ref()
    }

    /// Latched read path
    pub fn read_path(&self) -> Option<&PathConfig> {
        self.read_path.as_ref()
    }

    /// Programmed protection region `number`
    pub fn region(&self, number: u8) -> Option<&ProtectionRegion> {
        self.regions.get(number as usize).and_then(Option::as_ref)
    }

    /// Everything the controller was asked to do, in order
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Misbehaviour counters
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Fail every transaction matching `trigger`
    pub fn add_trigger(&mut self, trigger: CommandTrigger) {
        self.triggers.push(trigger);
    }

    /// Make a named bring-up step fail
    pub fn inject(&mut self, injection: Injection) {
        log::debug!("injecting {}", injection);
        match injection {
            Injection::ControllerInit => self.fail_controller_init = true,
            Injection::Protection => self.fail_protection = true,
            Injection::MemoryMap => self.fail_memory_map = true,
            other => {
                if let Some(trigger) = other.trigger() {
                    self.triggers.push(trigger);
                }
            }
        }
    }

    /// Return a fixed value from a mapped load
    pub fn add_memory_fault(&mut self, fault: MemoryFault) {
        self.memory_faults.push(fault);
    }

    fn fenced(&self) -> bool {
        self.protection_at(self.config.map_base)
            .map_or(false, |r| r.access == RegionAccess::NoAccess)
    }

    /// Highest-numbered enabled region covering `addr`
    fn protection_at(&self, addr: u32) -> Option<&ProtectionRegion> {
        self.regions
            .iter()
            .rev()
            .flatten()
            .find(|r| r.contains(addr))
    }

    fn device_offset(&self, addr: u32) -> usize {
        addr as usize & (self.config.size - 1)
    }

    fn read_array(&self, addr: u32, buf: &mut [u8]) {
        let mut offset = self.device_offset(addr);
        for byte in buf.iter_mut() {
            *byte = self.data[offset];
            offset = (offset + 1) % self.config.size;
        }
    }

    fn write_array(&mut self, addr: u32, data: &[u8]) {
        let mut offset = self.device_offset(addr);
        for &byte in data {
            self.data[offset] = byte;
            offset = (offset + 1) % self.config.size;
        }
    }

    /// Run one explicit command against the simulated device
    fn device_command(&mut self, txn: &mut BusTransaction<'_>) {
        // A device in the other mode does not decode the instruction
        if txn.instruction_lines != self.mode.lines() {
            log::trace!(
                "device in {:?} ignores {}-line {:#04x}",
                self.mode,
                txn.instruction_lines.lines(),
                txn.instruction
            );
            if let DataPhase::Receive(buf) = &mut txn.data {
                buf.fill(0xFF);
            }
            self.reset_enabled = false;
            return;
        }

        let reset_enabled = core::mem::take(&mut self.reset_enabled);
        let addr = txn.address.unwrap_or(0);
        match (self.mode, txn.instruction, &mut txn.data) {
            (_, opcodes::RESET_ENABLE, DataPhase::None) => self.reset_enabled = true,
            (_, opcodes::RESET, DataPhase::None) if reset_enabled => {
                self.mode = DeviceMode::Spi;
                self.wrap_1k = false;
            }
            (_, opcodes::BURST_LENGTH_TOGGLE, DataPhase::None) => self.wrap_1k = !self.wrap_1k,
            (DeviceMode::Spi, opcodes::QUAD_ON, DataPhase::None) => self.mode = DeviceMode::Qpi,
            (DeviceMode::Qpi, opcodes::QUAD_OFF, DataPhase::None) => self.mode = DeviceMode::Spi,
            (DeviceMode::Spi, opcodes::READ_ID, DataPhase::Receive(buf)) => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = self.config.identifier[i % opcodes::IDENTIFIER_LEN];
                }
            }
            (DeviceMode::Spi, opcodes::READ, DataPhase::Receive(buf)) if txn.dummy_cycles == 0 => {
                self.read_array(addr, buf)
            }
            (DeviceMode::Spi, opcodes::FAST_READ, DataPhase::Receive(buf))
                if txn.dummy_cycles == opcodes::FAST_READ_DUMMY_CYCLES =>
            {
                self.read_array(addr, buf)
            }
            (DeviceMode::Qpi, opcodes::QUAD_READ, DataPhase::Receive(buf))
                if txn.dummy_cycles == opcodes::QUAD_READ_DUMMY_CYCLES =>
            {
                self.read_array(addr, buf)
            }
            (DeviceMode::Spi, opcodes::WRITE, DataPhase::Transmit(data))
            | (DeviceMode::Qpi, opcodes::QUAD_WRITE, DataPhase::Transmit(data)) => {
                self.write_array(addr, data)
            }
            (_, _, DataPhase::Receive(buf)) => {
                // Wrong latency or unsupported read: the bus floats high
                buf.fill(0xFF);
            }
            _ => {}
        }
    }

    /// Check the latched read path against what the device expects
    fn read_path_valid(&self) -> bool {
        matches!(
            self.read_path,
            Some(PathConfig {
                instruction: opcodes::QUAD_READ,
                lines: LineWidth::Quad,
                dummy_cycles: opcodes::QUAD_READ_DUMMY_CYCLES,
                ..
            })
        ) && self.mode == DeviceMode::Qpi
    }

    fn write_path_valid(&self) -> bool {
        matches!(
            self.write_path,
            Some(PathConfig {
                instruction: opcodes::QUAD_WRITE,
                lines: LineWidth::Quad,
                data_strobe: true,
                ..
            })
        ) && self.mode == DeviceMode::Qpi
    }

    /// Returns true if a mapped access at `addr` reaches the device
    fn admit(&mut self, addr: u32) -> bool {
        let blocked = self
            .protection_at(addr)
            .map_or(false, |r| r.access == RegionAccess::NoAccess);
        if blocked {
            self.counters.access_violations += 1;
            return false;
        }
        let offset = addr.wrapping_sub(self.config.map_base) as usize;
        if addr < self.config.map_base || offset >= self.config.size {
            self.counters.access_violations += 1;
            return false;
        }
        if !self.mapped {
            self.counters.unmapped_accesses += 1;
            return false;
        }
        true
    }

    fn mapped_load(&mut self, addr: u32, width: AccessWidth) -> u32 {
        if !self.admit(addr) {
            return 0;
        }
        if let Some(fault) = self.memory_faults.iter().find(|f| f.applies(addr, width)) {
            return fault.read_back;
        }
        if !self.read_path_valid() {
            return u32::MAX;
        }
        let mut bytes = [0u8; 4];
        let n = width.bytes() as usize;
        self.read_array(addr - self.config.map_base, &mut bytes[..n]);
        u32::from_le_bytes(bytes)
    }

    fn mapped_store(&mut self, addr: u32, width: AccessWidth, value: u32) {
        if !self.admit(addr) {
            return;
        }
        if !self.write_path_valid() {
            self.counters.write_faults += 1;
            return;
        }
        self.mapped_writes = self.mapped_writes.wrapping_add(1);
        let corrupting = self
            .protection_at(addr)
            .map_or(false, |r| r.attributes().is_unsafe());
        if corrupting && self.mapped_writes % CORRUPTION_INTERVAL == 0 {
            self.counters.corrupted_writes += 1;
            return;
        }
        let n = width.bytes() as usize;
        self.write_array(addr - self.config.map_base, &value.to_le_bytes()[..n]);
    }
}

#[cfg(feature = "alloc")]
impl BusController for DummySpiram {
    fn init_controller(&mut self, config: &ControllerConfig) -> Result<()> {
        self.events.push(BusEvent::Init);
        config.validate()?;
        if self.fail_controller_init {
            return Err(Error::ControllerUnavailable);
        }
        // Abort memory-mapped mode and forget the latched paths
        self.mapped = false;
        self.write_path = None;
        self.read_path = None;
        Ok(())
    }

    fn execute(&mut self, txn: &mut BusTransaction<'_>) -> Result<()> {
        self.events.push(BusEvent::Transaction {
            operation: txn.operation,
            instruction: txn.instruction,
            lines: txn.instruction_lines,
            data_strobe: txn.data_strobe,
            dummy_cycles: txn.dummy_cycles,
        });

        if self.mapped {
            // Indirect transactions are refused while memory-mapped
            return Err(TransportError::bus_error(Phase::Command).into());
        }
        let has_data = txn.has_data();
        if let Some(trigger) = self.triggers.iter().find(|t| {
            t.matches(txn.operation, txn.instruction, txn.instruction_lines, has_data)
        }) {
            return Err(TransportError::timeout(trigger.phase).into());
        }

        match txn.operation {
            Operation::Common => self.device_command(txn),
            Operation::ConfigureWritePath | Operation::ConfigureReadPath => {
                if !self.fenced() {
                    log::warn!("path configuration with controller space unfenced");
                    self.counters.unguarded_configs += 1;
                }
                let path = PathConfig {
                    instruction: txn.instruction,
                    lines: txn.instruction_lines,
                    data_strobe: txn.data_strobe,
                    dummy_cycles: txn.dummy_cycles,
                };
                if txn.operation == Operation::ConfigureWritePath {
                    self.write_path = Some(path);
                } else {
                    self.read_path = Some(path);
                }
            }
        }
        Ok(())
    }

    fn memory_map(&mut self, config: &MemoryMapConfig) -> Result<()> {
        self.events.push(BusEvent::MemoryMap(*config));
        config.validate()?;
        if self.fail_memory_map || self.write_path.is_none() || self.read_path.is_none() {
            return Err(TransportError::timeout(Phase::Command).into());
        }
        self.mapped = true;
        Ok(())
    }

    fn configure_protection(&mut self, regions: &[ProtectionRegion]) -> Result<()> {
        self.events.push(BusEvent::Protection(regions.to_vec()));
        if self.fail_protection {
            return Err(Error::ControllerUnavailable);
        }
        // The unit takes any well-formed region, corrupting attributes included
        for region in regions {
            match region.validate() {
                Ok(()) | Err(Error::UnsafeWindowAttributes) => {}
                Err(e) => return Err(e),
            }
        }
        for region in regions {
            self.regions[region.number as usize] = region.enabled.then_some(*region);
        }
        Ok(())
    }
}

#[cfg(feature = "alloc")]
impl MappedMemory for DummySpiram {
    fn read8(&mut self, addr: u32) -> u8 {
        self.mapped_load(addr, AccessWidth::Byte) as u8
    }

    fn read16(&mut self, addr: u32) -> u16 {
        self.mapped_load(addr, AccessWidth::Half) as u16
    }

    fn read32(&mut self, addr: u32) -> u32 {
        self.mapped_load(addr, AccessWidth::Word)
    }

    fn write8(&mut self, addr: u32, value: u8) {
        self.mapped_store(addr, AccessWidth::Byte, value.into())
    }

    fn write16(&mut self, addr: u32, value: u16) {
        self.mapped_store(addr, AccessWidth::Half, value.into())
    }

    fn write32(&mut self, addr: u32, value: u32) {
        self.mapped_store(addr, AccessWidth::Word, value)
    }
}
