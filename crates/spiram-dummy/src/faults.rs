//! Fault injection

use core::fmt;

use spiram_core::bus::{opcodes, LineWidth, Operation};
use spiram_core::controller::AccessWidth;
use spiram_core::error::Phase;

/// Makes matching transactions fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTrigger {
    /// Register set the transaction targets
    pub operation: Operation,
    /// Instruction byte to match
    pub instruction: u8,
    /// Instruction lines to match, `None` for either
    pub lines: Option<LineWidth>,
    /// Phase reported as failing; data-phase triggers skip transactions without data
    pub phase: Phase,
}

impl CommandTrigger {
    /// Fail the command phase of an explicit command
    pub const fn command(instruction: u8, lines: LineWidth) -> Self {
        Self {
            operation: Operation::Common,
            instruction,
            lines: Some(lines),
            phase: Phase::Command,
        }
    }

    /// Fail the data phase of an explicit command
    pub const fn data(instruction: u8) -> Self {
        Self {
            operation: Operation::Common,
            instruction,
            lines: None,
            phase: Phase::Data,
        }
    }

    /// Fail a path configuration
    pub const fn path(operation: Operation) -> Self {
        Self {
            operation,
            instruction: match operation {
                Operation::ConfigureReadPath => opcodes::QUAD_READ,
                _ => opcodes::QUAD_WRITE,
            },
            lines: None,
            phase: Phase::Command,
        }
    }

    pub(crate) fn matches(
        &self,
        operation: Operation,
        instruction: u8,
        lines: LineWidth,
        has_data: bool,
    ) -> bool {
        self.operation == operation
            && self.instruction == instruction
            && self.lines.map_or(true, |l| l == lines)
            && (self.phase == Phase::Command || has_data)
    }
}

/// Makes loads from one mapped address return a fixed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryFault {
    /// CPU address of the access
    pub address: u32,
    /// Access width affected, `None` for every width
    pub width: Option<AccessWidth>,
    /// Value returned, truncated to the access width
    pub read_back: u32,
}

impl MemoryFault {
    pub(crate) fn applies(&self, address: u32, width: AccessWidth) -> bool {
        self.address == address && self.width.map_or(true, |w| w == width)
    }
}

/// Named bring-up step that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Injection {
    /// Controller peripheral init
    ControllerInit,
    /// Reset enable in QPI framing
    QspiResetEnable,
    /// Reset in QPI framing
    QspiReset,
    /// Reset enable in SPI framing
    SpiResetEnable,
    /// Reset in SPI framing
    SpiReset,
    /// Read-ID instruction phase
    ReadIdCommand,
    /// Read-ID data phase
    ReadIdData,
    /// Quad on
    QuadOn,
    /// Pre-mapping fill
    Clear,
    /// Protection unit programming
    Protection,
    /// Write path configuration
    WritePath,
    /// Read path configuration
    ReadPath,
    /// Memory-mapped mode activation
    MemoryMap,
}

impl Injection {
    /// Every injectable step, in bring-up order
    pub const ALL: [Injection; 13] = [
        Self::ControllerInit,
        Self::QspiResetEnable,
        Self::QspiReset,
        Self::SpiResetEnable,
        Self::SpiReset,
        Self::ReadIdCommand,
        Self::ReadIdData,
        Self::QuadOn,
        Self::Clear,
        Self::Protection,
        Self::WritePath,
        Self::ReadPath,
        Self::MemoryMap,
    ];

    /// Command-line name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ControllerInit => "controller-init",
            Self::QspiResetEnable => "qspi-reset-enable",
            Self::QspiReset => "qspi-reset",
            Self::SpiResetEnable => "spi-reset-enable",
            Self::SpiReset => "spi-reset",
            Self::ReadIdCommand => "read-id-command",
            Self::ReadIdData => "read-id-data",
            Self::QuadOn => "quad-on",
            Self::Clear => "clear",
            Self::Protection => "protection",
            Self::WritePath => "write-path",
            Self::ReadPath => "read-path",
            Self::MemoryMap => "mmap",
        }
    }

    /// One-line description
    pub const fn description(&self) -> &'static str {
        match self {
            Self::ControllerInit => "controller rejects its static configuration",
            Self::QspiResetEnable => "reset enable (0x66) times out in QPI framing",
            Self::QspiReset => "reset (0x99) times out in QPI framing",
            Self::SpiResetEnable => "reset enable (0x66) times out in SPI framing",
            Self::SpiReset => "reset (0x99) times out in SPI framing",
            Self::ReadIdCommand => "read ID (0x9f) instruction phase times out",
            Self::ReadIdData => "read ID (0x9f) data phase times out",
            Self::QuadOn => "quad on (0x35) times out",
            Self::Clear => "quad write (0x38) data phase times out during clear",
            Self::Protection => "protection unit cannot be programmed",
            Self::WritePath => "memory-mapped write path configuration times out",
            Self::ReadPath => "memory-mapped read path configuration times out",
            Self::MemoryMap => "switch to memory-mapped mode times out",
        }
    }

    /// Look a step up by its command-line name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.name() == name)
    }

    /// Transaction trigger for steps that are single transactions
    pub const fn trigger(&self) -> Option<CommandTrigger> {
        Some(match self {
            Self::QspiResetEnable => {
                CommandTrigger::command(opcodes::RESET_ENABLE, LineWidth::Quad)
            }
            Self::QspiReset => CommandTrigger::command(opcodes::RESET, LineWidth::Quad),
            Self::SpiResetEnable => {
                CommandTrigger::command(opcodes::RESET_ENABLE, LineWidth::Single)
            }
            Self::SpiReset => CommandTrigger::command(opcodes::RESET, LineWidth::Single),
            Self::ReadIdCommand => CommandTrigger::command(opcodes::READ_ID, LineWidth::Single),
            Self::ReadIdData => CommandTrigger::data(opcodes::READ_ID),
            Self::QuadOn => CommandTrigger::command(opcodes::QUAD_ON, LineWidth::Single),
            Self::Clear => CommandTrigger::data(opcodes::QUAD_WRITE),
            Self::WritePath => CommandTrigger::path(Operation::ConfigureWritePath),
            Self::ReadPath => CommandTrigger::path(Operation::ConfigureReadPath),
            Self::ControllerInit | Self::Protection | Self::MemoryMap => return None,
        })
    }
}

impl fmt::Display for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
