//! Bus transaction structure

use super::{opcodes, LineWidth};
use crate::error::InvalidTransaction;

/// Largest address the 24-bit address phase can carry
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Largest dummy cycle count the controller can generate (5-bit field)
pub const MAX_DUMMY_CYCLES: u8 = 31;

/// Which controller register set a transaction targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    /// Issue a command now (indirect mode)
    Common,
    /// Latch the framing used for memory-mapped writes
    ConfigureWritePath,
    /// Latch the framing used for memory-mapped reads
    ConfigureReadPath,
}

/// Data carried by a transaction
#[derive(Debug)]
pub enum DataPhase<'a> {
    /// No data phase
    None,
    /// Receive into the buffer; its length is the data length
    Receive(&'a mut [u8]),
    /// Transmit the buffer; its length is the data length
    Transmit(&'a [u8]),
}

impl DataPhase<'_> {
    /// Number of data bytes
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Receive(buf) => buf.len(),
            Self::Transmit(data) => data.len(),
        }
    }

    /// Returns true if there is nothing to transfer
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shape of a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransactionKind {
    /// Write-path configuration
    ConfigureWritePath,
    /// Read-path configuration
    ConfigureReadPath,
    /// Instruction (and optional address) only
    CommandOnly,
    /// Instruction followed by a data phase
    CommandWithData,
}

/// A single bus transaction
///
/// Built fresh for every call and never stored. The lifetime ties the
/// transaction to the buffer it transfers.
#[derive(Debug)]
pub struct BusTransaction<'a> {
    /// Target register set
    pub operation: Operation,

    /// Instruction byte
    pub instruction: u8,

    /// Lines used for the instruction
    pub instruction_lines: LineWidth,

    /// Address, absent for address-less commands
    pub address: Option<u32>,

    /// Lines used for the address
    pub address_lines: LineWidth,

    /// Lines used for data, `None` without a data phase
    pub data_lines: Option<LineWidth>,

    /// Data buffer
    pub data: DataPhase<'a>,

    /// Drive the data strobe during this transaction
    pub data_strobe: bool,

    /// Dummy cycles between address and data
    pub dummy_cycles: u8,
}

impl<'a> BusTransaction<'a> {
    /// Instruction-only command (e.g. reset enable, quad on)
    pub fn command(instruction: u8, lines: LineWidth) -> Self {
        Self {
            operation: Operation::Common,
            instruction,
            instruction_lines: lines,
            address: None,
            address_lines: lines,
            data_lines: None,
            data: DataPhase::None,
            data_strobe: false,
            dummy_cycles: 0,
        }
    }

    /// Read ID in SPI mode: 1-line instruction, address 0 and data
    pub fn read_identifier(buf: &'a mut [u8]) -> Self {
        Self {
            operation: Operation::Common,
            instruction: opcodes::READ_ID,
            instruction_lines: LineWidth::Single,
            address: Some(0),
            address_lines: LineWidth::Single,
            data_lines: Some(LineWidth::Single),
            data: DataPhase::Receive(buf),
            data_strobe: false,
            dummy_cycles: 0,
        }
    }

    /// Quad read (4-4-4) into the buffer
    pub fn quad_read(addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            operation: Operation::Common,
            instruction: opcodes::QUAD_READ,
            instruction_lines: LineWidth::Quad,
            address: Some(addr),
            address_lines: LineWidth::Quad,
            data_lines: Some(LineWidth::Quad),
            data: DataPhase::Receive(buf),
            data_strobe: false,
            dummy_cycles: opcodes::QUAD_READ_DUMMY_CYCLES,
        }
    }

    /// Quad write (4-4-4) of the buffer
    ///
    /// The data strobe is driven, as required for writes on this controller.
    pub fn quad_write(addr: u32, data: &'a [u8]) -> Self {
        Self {
            operation: Operation::Common,
            instruction: opcodes::QUAD_WRITE,
            instruction_lines: LineWidth::Quad,
            address: Some(addr),
            address_lines: LineWidth::Quad,
            data_lines: Some(LineWidth::Quad),
            data: DataPhase::Transmit(data),
            data_strobe: true,
            dummy_cycles: 0,
        }
    }

    /// Framing latched for memory-mapped writes (4-4-4, strobe on)
    pub fn write_path(instruction: u8) -> Self {
        Self {
            operation: Operation::ConfigureWritePath,
            instruction,
            instruction_lines: LineWidth::Quad,
            address: Some(0),
            address_lines: LineWidth::Quad,
            data_lines: Some(LineWidth::Quad),
            data: DataPhase::None,
            data_strobe: true,
            dummy_cycles: 0,
        }
    }

    /// Framing latched for memory-mapped reads (4-4-4, strobe off)
    pub fn read_path(instruction: u8, dummy_cycles: u8) -> Self {
        Self {
            operation: Operation::ConfigureReadPath,
            instruction,
            instruction_lines: LineWidth::Quad,
            address: Some(0),
            address_lines: LineWidth::Quad,
            data_lines: Some(LineWidth::Quad),
            data: DataPhase::None,
            data_strobe: false,
            dummy_cycles,
        }
    }

    /// Set the instruction line width, keeping the address/data widths
    pub fn with_instruction_lines(mut self, lines: LineWidth) -> Self {
        self.instruction_lines = lines;
        self
    }

    /// Set the number of dummy cycles
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Set the data strobe flag
    pub fn with_data_strobe(mut self, enabled: bool) -> Self {
        self.data_strobe = enabled;
        self
    }

    /// Shape of this transaction
    pub fn kind(&self) -> TransactionKind {
        match self.operation {
            Operation::ConfigureWritePath => TransactionKind::ConfigureWritePath,
            Operation::ConfigureReadPath => TransactionKind::ConfigureReadPath,
            Operation::Common if self.has_data() => TransactionKind::CommandWithData,
            Operation::Common => TransactionKind::CommandOnly,
        }
    }

    /// Returns true if this transaction has a data phase
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Returns true if this transaction has an address phase
    pub fn has_address(&self) -> bool {
        self.address.is_some()
    }

    /// Number of data bytes
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Check the transaction against what the controller and device accept
    pub fn validate(&self) -> Result<(), InvalidTransaction> {
        if self.dummy_cycles > MAX_DUMMY_CYCLES {
            return Err(InvalidTransaction::DummyCyclesOutOfRange);
        }
        if let Some(addr) = self.address {
            if addr > ADDRESS_MASK {
                return Err(InvalidTransaction::AddressOutOfRange);
            }
        }

        match self.operation {
            Operation::ConfigureWritePath | Operation::ConfigureReadPath => {
                if !matches!(self.data, DataPhase::None) {
                    return Err(InvalidTransaction::ConfigurationCarriesData);
                }
                if self.data_lines.is_none() {
                    return Err(InvalidTransaction::MissingDataLines);
                }
                // STM32H7A3 errata 2.7.8: memory-mapped writes error out without DQS
                if self.operation == Operation::ConfigureWritePath && !self.data_strobe {
                    return Err(InvalidTransaction::StrobeRequired);
                }
            }
            Operation::Common => {
                if self.data_lines.is_some() != self.has_data() {
                    return Err(InvalidTransaction::DataPhaseMismatch);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_validate() {
        let mut id = [0u8; opcodes::IDENTIFIER_LEN];
        let data = [0u8; 32];
        let mut buf = [0u8; 32];

        assert!(BusTransaction::command(opcodes::RESET, LineWidth::Quad)
            .validate()
            .is_ok());
        assert!(BusTransaction::read_identifier(&mut id).validate().is_ok());
        assert!(BusTransaction::quad_read(0x7F_FFE0, &mut buf).validate().is_ok());
        assert!(BusTransaction::quad_write(0, &data).validate().is_ok());
        assert!(BusTransaction::write_path(opcodes::QUAD_WRITE).validate().is_ok());
        assert!(BusTransaction::read_path(opcodes::QUAD_READ, 6).validate().is_ok());
    }

    #[test]
    fn test_write_path_requires_strobe() {
        let txn = BusTransaction::write_path(opcodes::QUAD_WRITE).with_data_strobe(false);
        assert_eq!(txn.validate(), Err(InvalidTransaction::StrobeRequired));

        // The read path runs without it
        let txn = BusTransaction::read_path(opcodes::QUAD_READ, 6).with_data_strobe(false);
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        let mut buf = [0u8; 4];
        let txn = BusTransaction::quad_read(0x0100_0000, &mut buf);
        assert_eq!(txn.validate(), Err(InvalidTransaction::AddressOutOfRange));

        let txn = BusTransaction::read_path(opcodes::QUAD_READ, MAX_DUMMY_CYCLES + 1);
        assert_eq!(txn.validate(), Err(InvalidTransaction::DummyCyclesOutOfRange));
    }

    #[test]
    fn test_data_phase_must_match_lines() {
        let mut empty: [u8; 0] = [];
        let txn = BusTransaction::quad_read(0, &mut empty);
        assert_eq!(txn.validate(), Err(InvalidTransaction::DataPhaseMismatch));

        let data = [1u8, 2];
        let mut txn = BusTransaction::command(opcodes::QUAD_ON, LineWidth::Single);
        txn.data = DataPhase::Transmit(&data);
        assert_eq!(txn.validate(), Err(InvalidTransaction::DataPhaseMismatch));

        let mut txn = BusTransaction::write_path(opcodes::QUAD_WRITE);
        txn.data = DataPhase::Transmit(&data);
        assert_eq!(
            txn.validate(),
            Err(InvalidTransaction::ConfigurationCarriesData)
        );
    }

    #[test]
    fn test_kind() {
        let mut buf = [0u8; 8];
        assert_eq!(
            BusTransaction::command(opcodes::RESET_ENABLE, LineWidth::Single).kind(),
            TransactionKind::CommandOnly
        );
        assert_eq!(
            BusTransaction::read_identifier(&mut buf).kind(),
            TransactionKind::CommandWithData
        );
        assert_eq!(
            BusTransaction::write_path(opcodes::QUAD_WRITE).kind(),
            TransactionKind::ConfigureWritePath
        );
        assert_eq!(
            BusTransaction::read_path(opcodes::QUAD_READ, 6).kind(),
            TransactionKind::ConfigureReadPath
        );
    }
}
