//! OCTOSPI1 driver
//!
//! Indirect-mode commands are polled on the status register with a fixed
//! poll budget. Data moves one byte at a time through the data register,
//! which keeps the FIFO threshold at its reset value of one byte.

use bitflags::bitflags;

use spiram_core::bus::{BusTransaction, DataPhase, LineWidth, Operation};
use spiram_core::controller::{ClockMode, ControllerConfig, SampleShifting};
use spiram_core::error::{Error, Phase, Result, TransportError};
use spiram_core::memory_map::MemoryMapConfig;

use crate::mmio::Mmio;
use crate::regs::*;

bitflags! {
    /// Status register flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        /// Transfer error
        const TRANSFER_ERROR = SR_TEF;
        /// Transfer complete
        const TRANSFER_COMPLETE = SR_TCF;
        /// FIFO threshold reached
        const FIFO_THRESHOLD = SR_FTF;
        /// Status match
        const STATUS_MATCH = SR_SMF;
        /// Chip-select release timeout
        const TIMEOUT = SR_TOF;
        /// Controller busy
        const BUSY = SR_BUSY;
    }
}

// ============================================================================
// Register encoders
// ============================================================================

const fn mode_bits(lines: LineWidth) -> u32 {
    match lines {
        LineWidth::Single => MODE_SINGLE,
        LineWidth::Quad => MODE_QUAD,
    }
}

/// CCR (or WCCR) value for a transaction
pub fn ccr(txn: &BusTransaction<'_>) -> u32 {
    let mut value = mode_bits(txn.instruction_lines) << CCR_IMODE_SHIFT;
    if txn.has_address() {
        value |= mode_bits(txn.address_lines) << CCR_ADMODE_SHIFT;
        value |= ADSIZE_24 << CCR_ADSIZE_SHIFT;
    }
    if let Some(lines) = txn.data_lines {
        value |= mode_bits(lines) << CCR_DMODE_SHIFT;
    }
    if txn.data_strobe {
        value |= CCR_DQSE;
    }
    value
}

/// Timing bits shared by every TCR (and WTCR) value
pub fn tcr_base(config: &ControllerConfig) -> u32 {
    let mut value = 0;
    if config.sample_shifting == SampleShifting::HalfCycle {
        value |= TCR_SSHIFT;
    }
    if config.delay_hold_quarter_cycle {
        value |= TCR_DHQC;
    }
    value
}

/// TCR value for `dummy` cycles
pub fn tcr(base: u32, dummy: u8) -> u32 {
    base | (u32::from(dummy) & TCR_DCYC_MASK)
}

/// DCR1 value, `config` already validated
fn dcr1(config: &ControllerConfig) -> u32 {
    let mut value = config.memory_type.bits() << DCR1_MTYP_SHIFT
        | u32::from(config.device_size_log2 - 1) << DCR1_DEVSIZE_SHIFT
        | u32::from(config.chip_select_high_time - 1) << DCR1_CSHT_SHIFT;
    if config.delay_block_bypass {
        value |= DCR1_DLYBYP;
    }
    if config.free_running_clock {
        value |= DCR1_FRCK;
    }
    if config.clock_mode == ClockMode::Mode3 {
        value |= DCR1_CKMODE;
    }
    value
}

/// DCR2 value, `config` already validated
fn dcr2(config: &ControllerConfig) -> u32 {
    u32::from(config.clock_prescaler - 1) << DCR2_PRESCALER_SHIFT
}

/// DCR3 value
fn dcr3(config: &ControllerConfig) -> u32 {
    u32::from(config.chip_select_boundary) << DCR3_CSBOUND_SHIFT
        | u32::from(config.max_transfer) << DCR3_MAXTRAN_SHIFT
}

/// CR FIFO threshold field, `config` already validated
fn fthres(config: &ControllerConfig) -> u32 {
    (u32::from(config.fifo_threshold - 1) << CR_FTHRES_SHIFT) & CR_FTHRES_MASK
}

// ============================================================================
// Driver
// ============================================================================

/// OCTOSPI1 with its RCC clock and reset bits
#[derive(Debug)]
pub struct Octospi {
    regs: Mmio,
    rcc: Mmio,
    timeout_polls: u32,
    tcr_base: u32,
}

impl Octospi {
    /// Driver for the OCTOSPI1 instance
    ///
    /// # Safety
    ///
    /// The caller must own OCTOSPI1 and the RCC AHB3 enable and reset bits
    /// for the lifetime of the driver.
    pub unsafe fn new() -> Self {
        Self::from_parts(
            Mmio::new(OCTOSPI1_BASE, OCTOSPI_BLOCK_SIZE),
            Mmio::new(RCC_BASE, RCC_AHB3ENR + 4),
        )
    }

    /// Driver over already-wrapped register blocks
    pub fn from_parts(regs: Mmio, rcc: Mmio) -> Self {
        let defaults = ControllerConfig::default();
        Self {
            regs,
            rcc,
            timeout_polls: defaults.timeout_polls,
            tcr_base: tcr_base(&defaults),
        }
    }

    /// Current status flags
    pub fn status(&self) -> Status {
        Status::from_bits_truncate(self.regs.read32(OCTOSPI_SR))
    }

    /// Reset and program the static configuration
    pub fn init(&mut self, config: &ControllerConfig) -> Result<()> {
        config.validate()?;

        self.rcc.modify32(RCC_AHB3ENR, |v| v | RCC_AHB3_OCTOSPI1);
        // Read back so the clock is running before the reset pulse
        let _ = self.rcc.read32(RCC_AHB3ENR);
        self.rcc.modify32(RCC_AHB3RSTR, |v| v | RCC_AHB3_OCTOSPI1);
        self.rcc.modify32(RCC_AHB3RSTR, |v| v & !RCC_AHB3_OCTOSPI1);

        self.timeout_polls = config.timeout_polls;
        self.tcr_base = tcr_base(config);

        self.regs.modify32(OCTOSPI_CR, |v| v & !CR_EN);
        self.wait_idle(Phase::Command)
            .map_err(|_| Error::ControllerUnavailable)?;

        self.regs.write32(OCTOSPI_DCR1, dcr1(config));
        self.regs.write32(OCTOSPI_DCR2, dcr2(config));
        self.regs.write32(OCTOSPI_DCR3, dcr3(config));
        self.regs.write32(OCTOSPI_DCR4, config.refresh);
        self.regs
            .modify32(OCTOSPI_CR, |v| (v & !CR_FTHRES_MASK) | fthres(config));
        self.regs.write32(OCTOSPI_TCR, self.tcr_base);

        self.regs.modify32(OCTOSPI_CR, |v| v | CR_EN);

        log::debug!(
            "octospi: DCR1={:#010x} DCR2={:#010x} DCR3={:#010x}",
            self.regs.read32(OCTOSPI_DCR1),
            self.regs.read32(OCTOSPI_DCR2),
            self.regs.read32(OCTOSPI_DCR3)
        );
        Ok(())
    }

    /// Run one transaction
    pub fn execute(&mut self, txn: &mut BusTransaction<'_>) -> Result<()> {
        self.wait_idle(Phase::Command)?;

        match txn.operation {
            Operation::ConfigureWritePath => {
                self.regs.write32(OCTOSPI_WCCR, ccr(txn));
                self.regs
                    .write32(OCTOSPI_WTCR, tcr(self.tcr_base, txn.dummy_cycles));
                self.regs.write32(OCTOSPI_WIR, u32::from(txn.instruction));
                Ok(())
            }
            Operation::ConfigureReadPath => {
                self.regs.write32(OCTOSPI_CCR, ccr(txn));
                self.regs
                    .write32(OCTOSPI_TCR, tcr(self.tcr_base, txn.dummy_cycles));
                self.regs.write32(OCTOSPI_IR, u32::from(txn.instruction));
                Ok(())
            }
            Operation::Common => self.indirect(txn),
        }
    }

    /// Latch chip-select release and switch to memory-mapped mode
    pub fn memory_map(&mut self, config: &MemoryMapConfig) -> Result<()> {
        config.validate()?;
        self.wait_idle(Phase::Command)?;

        if config.timeout_counter {
            self.regs
                .write32(OCTOSPI_LPTR, u32::from(config.timeout_period));
            self.regs.write32(OCTOSPI_FCR, FCR_CTOF);
            self.regs.modify32(OCTOSPI_CR, |v| v | CR_TCEN);
        }
        self.regs
            .modify32(OCTOSPI_CR, |v| (v & !CR_FMODE_MASK) | FMODE_MEMORY_MAPPED);
        Ok(())
    }

    /// Indirect-mode command
    ///
    /// Everything is programmed in write mode, which holds the transfer until
    /// data arrives. Receives then flip to read mode and rewrite the trigger
    /// register to start.
    fn indirect(&mut self, txn: &mut BusTransaction<'_>) -> Result<()> {
        self.regs
            .modify32(OCTOSPI_CR, |v| (v & !CR_FMODE_MASK) | FMODE_INDIRECT_WRITE);
        if txn.has_data() {
            self.regs
                .write32(OCTOSPI_DLR, txn.data_len() as u32 - 1);
        }
        self.regs
            .write32(OCTOSPI_TCR, tcr(self.tcr_base, txn.dummy_cycles));
        self.regs.write32(OCTOSPI_CCR, ccr(txn));
        self.regs.write32(OCTOSPI_IR, u32::from(txn.instruction));
        if let Some(addr) = txn.address {
            self.regs.write32(OCTOSPI_AR, addr);
        }

        match &mut txn.data {
            DataPhase::None => self.complete(Phase::Command),
            DataPhase::Transmit(data) => {
                for &byte in data.iter() {
                    self.wait(Status::FIFO_THRESHOLD, Phase::Data)?;
                    self.regs.write8(OCTOSPI_DR, byte);
                }
                self.complete(Phase::Data)
            }
            DataPhase::Receive(buf) => {
                self.regs
                    .modify32(OCTOSPI_CR, |v| (v & !CR_FMODE_MASK) | FMODE_INDIRECT_READ);
                match txn.address {
                    Some(addr) => self.regs.write32(OCTOSPI_AR, addr),
                    None => self.regs.write32(OCTOSPI_IR, u32::from(txn.instruction)),
                }
                for byte in buf.iter_mut() {
                    self.wait(
                        Status::FIFO_THRESHOLD | Status::TRANSFER_COMPLETE,
                        Phase::Data,
                    )?;
                    *byte = self.regs.read8(OCTOSPI_DR);
                }
                self.complete(Phase::Data)
            }
        }
    }

    /// Wait for transfer complete and acknowledge it
    fn complete(&mut self, phase: Phase) -> Result<()> {
        self.wait(Status::TRANSFER_COMPLETE, phase)?;
        self.regs.write32(OCTOSPI_FCR, FCR_CTCF);
        Ok(())
    }

    /// Poll until any flag in `flags` is set
    fn wait(&mut self, flags: Status, phase: Phase) -> Result<()> {
        let mut remaining = self.timeout_polls;

        loop {
            let status = self.status();

            if status.contains(Status::TRANSFER_ERROR) {
                self.regs.write32(OCTOSPI_FCR, FCR_CTEF);
                log::trace!("octospi: transfer error, SR={:#x}", status.bits());
                return Err(TransportError::bus_error(phase).into());
            }
            if status.intersects(flags) {
                return Ok(());
            }

            if remaining == 0 {
                log::trace!(
                    "octospi: timeout waiting for {:#x}, SR={:#x}",
                    flags.bits(),
                    status.bits()
                );
                self.abort();
                return Err(TransportError::timeout(phase).into());
            }

            core::hint::spin_loop();
            remaining -= 1;
        }
    }

    /// Poll until the controller is idle
    fn wait_idle(&mut self, phase: Phase) -> Result<()> {
        let mut remaining = self.timeout_polls;

        while self.status().contains(Status::BUSY) {
            if remaining == 0 {
                return Err(TransportError::timeout(phase).into());
            }
            core::hint::spin_loop();
            remaining -= 1;
        }
        Ok(())
    }

    /// Drop whatever transfer is in flight
    fn abort(&mut self) {
        self.regs.modify32(OCTOSPI_CR, |v| v | CR_ABORT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spiram_core::bus::opcodes;

    struct Blocks {
        octospi: [u32; OCTOSPI_BLOCK_SIZE / 4],
        rcc: [u32; RCC_AHB3ENR / 4 + 1],
    }

    impl Blocks {
        fn new(status: u32) -> Self {
            let mut blocks = Self {
                octospi: [0; OCTOSPI_BLOCK_SIZE / 4],
                rcc: [0; RCC_AHB3ENR / 4 + 1],
            };
            blocks.octospi[OCTOSPI_SR / 4] = status;
            blocks
        }

        fn driver(&mut self) -> Octospi {
            unsafe {
                Octospi::from_parts(
                    Mmio::new(self.octospi.as_mut_ptr() as usize, OCTOSPI_BLOCK_SIZE),
                    Mmio::new(self.rcc.as_mut_ptr() as usize, RCC_AHB3ENR + 4),
                )
            }
        }

        fn reg(&self, offset: usize) -> u32 {
            self.octospi[offset / 4]
        }
    }

    fn fast_config() -> ControllerConfig {
        ControllerConfig {
            timeout_polls: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_board_encoding() {
        let config = ControllerConfig::default();
        assert_eq!(dcr1(&config), 0x0216_0008);
        assert_eq!(dcr2(&config), 1);
        assert_eq!(dcr3(&config), 10 << 16);
        assert_eq!(fthres(&config), 0);
        assert_eq!(tcr(tcr_base(&config), 6), TCR_SSHIFT | 6);
    }

    #[test]
    fn test_ccr_encoding() {
        let mut id = [0u8; opcodes::IDENTIFIER_LEN];
        assert_eq!(
            ccr(&BusTransaction::read_identifier(&mut id)),
            0x0100_2101
        );
        assert_eq!(
            ccr(&BusTransaction::command(opcodes::QUAD_ON, LineWidth::Single)),
            0x0000_0001
        );
        assert_eq!(
            ccr(&BusTransaction::write_path(opcodes::QUAD_WRITE)),
            0x2300_2303
        );
        assert_eq!(
            ccr(&BusTransaction::read_path(opcodes::QUAD_READ, 6)),
            0x0300_2303
        );
    }

    #[test]
    fn test_init_programs_device_registers() {
        let mut blocks = Blocks::new(0);
        let mut spi = blocks.driver();
        spi.init(&ControllerConfig::default()).unwrap();
        drop(spi);

        assert_eq!(blocks.rcc[RCC_AHB3ENR / 4] & RCC_AHB3_OCTOSPI1, RCC_AHB3_OCTOSPI1);
        assert_eq!(blocks.rcc[RCC_AHB3RSTR / 4] & RCC_AHB3_OCTOSPI1, 0);
        assert_eq!(blocks.reg(OCTOSPI_DCR1), 0x0216_0008);
        assert_eq!(blocks.reg(OCTOSPI_DCR2), 1);
        assert_eq!(blocks.reg(OCTOSPI_CR) & CR_EN, CR_EN);
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let mut blocks = Blocks::new(0);
        let mut spi = blocks.driver();
        let zeroed = [
            ControllerConfig {
                clock_prescaler: 0,
                ..Default::default()
            },
            ControllerConfig {
                device_size_log2: 0,
                ..Default::default()
            },
            ControllerConfig {
                chip_select_high_time: 0,
                ..Default::default()
            },
            ControllerConfig {
                fifo_threshold: 0,
                ..Default::default()
            },
        ];
        for config in &zeroed {
            assert_eq!(spi.init(config), Err(Error::InvalidControllerConfig));
        }
        drop(spi);

        assert_eq!(blocks.reg(OCTOSPI_DCR1), 0);
        assert_eq!(blocks.reg(OCTOSPI_DCR2), 0);
        assert_eq!(blocks.reg(OCTOSPI_CR), 0);
        assert_eq!(blocks.rcc[RCC_AHB3ENR / 4], 0);
    }

    #[test]
    fn test_init_busy_controller_is_unavailable() {
        let mut blocks = Blocks::new(SR_BUSY);
        let mut spi = blocks.driver();
        assert_eq!(spi.init(&fast_config()), Err(Error::ControllerUnavailable));
    }

    #[test]
    fn test_read_identifier_programs_indirect_read() {
        let mut blocks = Blocks::new(SR_TCF | SR_FTF);
        blocks.octospi[OCTOSPI_DR / 4] = 0x5D;
        let mut spi = blocks.driver();

        let mut id = [0u8; opcodes::IDENTIFIER_LEN];
        spi.execute(&mut BusTransaction::read_identifier(&mut id))
            .unwrap();
        drop(spi);

        assert_eq!(id, [0x5D; opcodes::IDENTIFIER_LEN]);
        assert_eq!(blocks.reg(OCTOSPI_DLR), 7);
        assert_eq!(blocks.reg(OCTOSPI_IR), u32::from(opcodes::READ_ID));
        assert_eq!(blocks.reg(OCTOSPI_AR), 0);
        assert_eq!(blocks.reg(OCTOSPI_CCR), 0x0100_2101);
        assert_eq!(
            blocks.reg(OCTOSPI_CR) & CR_FMODE_MASK,
            FMODE_INDIRECT_READ
        );
        assert_eq!(blocks.reg(OCTOSPI_FCR), FCR_CTCF);
    }

    #[test]
    fn test_quad_write_fills_data_register() {
        let mut blocks = Blocks::new(SR_TCF | SR_FTF);
        let mut spi = blocks.driver();

        let data = [0x11, 0x22, 0x33];
        spi.execute(&mut BusTransaction::quad_write(0x40, &data))
            .unwrap();
        drop(spi);

        assert_eq!(blocks.reg(OCTOSPI_DLR), 2);
        assert_eq!(blocks.reg(OCTOSPI_AR), 0x40);
        assert_eq!(blocks.reg(OCTOSPI_DR) & 0xFF, 0x33);
        assert_eq!(
            blocks.reg(OCTOSPI_CR) & CR_FMODE_MASK,
            FMODE_INDIRECT_WRITE
        );
        assert_eq!(blocks.reg(OCTOSPI_CCR) & CCR_DQSE, CCR_DQSE);
    }

    #[test]
    fn test_missing_completion_times_out() {
        let mut blocks = Blocks::new(0);
        let mut spi = blocks.driver();
        spi.init(&fast_config()).unwrap();

        let err = spi
            .execute(&mut BusTransaction::command(opcodes::RESET, LineWidth::Quad))
            .unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::timeout(Phase::Command)));

        let mut id = [0u8; opcodes::IDENTIFIER_LEN];
        let err = spi
            .execute(&mut BusTransaction::read_identifier(&mut id))
            .unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::timeout(Phase::Data)));
        drop(spi);
        assert_eq!(blocks.reg(OCTOSPI_CR) & CR_ABORT, CR_ABORT);
    }

    #[test]
    fn test_transfer_error_flag() {
        let mut blocks = Blocks::new(SR_TEF);
        let mut spi = blocks.driver();
        let err = spi
            .execute(&mut BusTransaction::command(opcodes::QUAD_ON, LineWidth::Single))
            .unwrap_err();
        assert_eq!(
            err,
            Error::Transport(TransportError::bus_error(Phase::Command))
        );
        drop(spi);
        assert_eq!(blocks.reg(OCTOSPI_FCR), FCR_CTEF);
    }

    #[test]
    fn test_paths_land_in_separate_register_sets() {
        let mut blocks = Blocks::new(0);
        let mut spi = blocks.driver();
        spi.init(&ControllerConfig::default()).unwrap();
        spi.execute(&mut BusTransaction::write_path(opcodes::QUAD_WRITE))
            .unwrap();
        spi.execute(&mut BusTransaction::read_path(opcodes::QUAD_READ, 6))
            .unwrap();
        spi.memory_map(&MemoryMapConfig::cs_release(1)).unwrap();
        drop(spi);

        assert_eq!(blocks.reg(OCTOSPI_WIR), u32::from(opcodes::QUAD_WRITE));
        assert_eq!(blocks.reg(OCTOSPI_WCCR), 0x2300_2303);
        assert_eq!(blocks.reg(OCTOSPI_WTCR), TCR_SSHIFT);
        assert_eq!(blocks.reg(OCTOSPI_IR), u32::from(opcodes::QUAD_READ));
        assert_eq!(blocks.reg(OCTOSPI_CCR), 0x0300_2303);
        assert_eq!(blocks.reg(OCTOSPI_TCR), TCR_SSHIFT | 6);
        assert_eq!(blocks.reg(OCTOSPI_LPTR), 1);

        let cr = blocks.reg(OCTOSPI_CR);
        assert_eq!(cr & CR_FMODE_MASK, FMODE_MEMORY_MAPPED);
        assert_eq!(cr & CR_TCEN, CR_TCEN);
    }
}
