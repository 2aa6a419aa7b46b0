//! Recording bus for unit tests

use std::vec;
use std::vec::Vec;

use crate::bus::{opcodes, BusTransaction, DataPhase, LineWidth, Operation};
use crate::controller::{BusController, ControllerConfig, MappedMemory};
use crate::error::{Error, Phase, Result, TransportError};
use crate::memory_map::MemoryMapConfig;
use crate::protection::ProtectionRegion;

pub const IDENTIFIER: [u8; 8] = [0x0D, 0x5D, 0x52, 0xA2, 0x64, 0x31, 0x91, 0x31];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    instruction: u8,
    lines: Option<LineWidth>,
    phase: Phase,
}

impl Trigger {
    pub fn command(instruction: u8, lines: LineWidth) -> Self {
        Self {
            instruction,
            lines: Some(lines),
            phase: Phase::Command,
        }
    }

    pub fn data(instruction: u8) -> Self {
        Self {
            instruction,
            lines: None,
            phase: Phase::Data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Init,
    Command {
        operation: Operation,
        instruction: u8,
        lines: LineWidth,
        data_strobe: bool,
        dummy_cycles: u8,
    },
    MemoryMap(MemoryMapConfig),
    Protection(Vec<ProtectionRegion>),
}

/// Flat memory that answers every command, with injectable failures
pub struct FakeBus {
    base: u32,
    memory: Vec<u8>,
    events: Vec<Event>,
    triggers: Vec<Trigger>,
    failing_operations: Vec<Operation>,
    fail_init: bool,
    fail_memory_map: bool,
    stuck: Vec<(u32, u8)>,
}

impl FakeBus {
    pub fn new(size: usize) -> Self {
        Self::mapped(0x9000_0000, size)
    }

    pub fn mapped(base: u32, size: usize) -> Self {
        Self {
            base,
            memory: vec![0; size],
            events: Vec::new(),
            triggers: Vec::new(),
            failing_operations: Vec::new(),
            fail_init: false,
            fail_memory_map: false,
            stuck: Vec::new(),
        }
    }

    pub fn fail(&mut self, trigger: Trigger) {
        self.triggers.push(trigger);
    }

    pub fn fail_operation(&mut self, operation: Operation) {
        self.failing_operations.push(operation);
    }

    pub fn fail_init(&mut self) {
        self.fail_init = true;
    }

    pub fn fail_memory_map(&mut self) {
        self.fail_memory_map = true;
    }

    /// Byte at CPU address `addr` always reads `value`
    pub fn stuck_at(&mut self, addr: u32, value: u8) {
        self.stuck.push((addr, value));
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Explicit commands issued, in order
    pub fn commands(&self) -> Vec<(u8, LineWidth)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Command {
                    operation: Operation::Common,
                    instruction,
                    lines,
                    ..
                } => Some((instruction, lines)),
                _ => None,
            })
            .collect()
    }

    fn triggered(&self, txn: &BusTransaction<'_>) -> Option<Phase> {
        self.triggers
            .iter()
            .find(|t| {
                t.instruction == txn.instruction
                    && t.lines.map_or(true, |l| l == txn.instruction_lines)
                    && (t.phase == Phase::Command || txn.has_data())
            })
            .map(|t| t.phase)
    }

    fn byte(&self, addr: u32) -> u8 {
        if let Some(&(_, value)) = self.stuck.iter().find(|(a, _)| *a == addr) {
            return value;
        }
        self.memory[(addr - self.base) as usize]
    }

    fn set_byte(&mut self, addr: u32, value: u8) {
        self.memory[(addr - self.base) as usize] = value;
    }
}

impl BusController for FakeBus {
    fn init_controller(&mut self, _config: &ControllerConfig) -> Result<()> {
        self.events.push(Event::Init);
        if self.fail_init {
            return Err(Error::ControllerUnavailable);
        }
        Ok(())
    }

    fn execute(&mut self, txn: &mut BusTransaction<'_>) -> Result<()> {
        self.events.push(Event::Command {
            operation: txn.operation,
            instruction: txn.instruction,
            lines: txn.instruction_lines,
            data_strobe: txn.data_strobe,
            dummy_cycles: txn.dummy_cycles,
        });
        if self.failing_operations.contains(&txn.operation) {
            return Err(TransportError::timeout(Phase::Command).into());
        }
        if let Some(phase) = self.triggered(txn) {
            return Err(TransportError::timeout(phase).into());
        }

        let start = txn.address.unwrap_or(0) as usize;
        match (txn.instruction, &mut txn.data) {
            (opcodes::READ_ID, DataPhase::Receive(buf)) => {
                let n = buf.len().min(IDENTIFIER.len());
                buf[..n].copy_from_slice(&IDENTIFIER[..n]);
            }
            (opcodes::QUAD_READ, DataPhase::Receive(buf)) => {
                let src = self
                    .memory
                    .get(start..start + buf.len())
                    .ok_or(TransportError::bus_error(Phase::Data))?;
                buf.copy_from_slice(src);
            }
            (opcodes::QUAD_WRITE, DataPhase::Transmit(data)) => {
                let dst = self
                    .memory
                    .get_mut(start..start + data.len())
                    .ok_or(TransportError::bus_error(Phase::Data))?;
                dst.copy_from_slice(data);
            }
            _ => {}
        }
        Ok(())
    }

    fn memory_map(&mut self, config: &MemoryMapConfig) -> Result<()> {
        self.events.push(Event::MemoryMap(*config));
        if self.fail_memory_map {
            return Err(TransportError::timeout(Phase::Command).into());
        }
        Ok(())
    }

    fn configure_protection(&mut self, regions: &[ProtectionRegion]) -> Result<()> {
        self.events.push(Event::Protection(regions.to_vec()));
        Ok(())
    }
}

impl MappedMemory for FakeBus {
    fn read8(&mut self, addr: u32) -> u8 {
        self.byte(addr)
    }

    fn read16(&mut self, addr: u32) -> u16 {
        u16::from_le_bytes([self.byte(addr), self.byte(addr + 1)])
    }

    fn read32(&mut self, addr: u32) -> u32 {
        u32::from_le_bytes([
            self.byte(addr),
            self.byte(addr + 1),
            self.byte(addr + 2),
            self.byte(addr + 3),
        ])
    }

    fn write8(&mut self, addr: u32, value: u8) {
        self.set_byte(addr, value);
    }

    fn write16(&mut self, addr: u32, value: u16) {
        for (i, b) in value.to_le_bytes().into_iter().enumerate() {
            self.set_byte(addr + i as u32, b);
        }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        for (i, b) in value.to_le_bytes().into_iter().enumerate() {
            self.set_byte(addr + i as u32, b);
        }
    }
}
