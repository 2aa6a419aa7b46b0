//! Device mode negotiation
//!
//! The device can come up in SPI or QPI mode depending on whether the last
//! reset was a power cycle. [`Device`] tracks what is known about it as a
//! type: a handle only reaches [`QuadLine`] by going through the reset pair
//! in both modes and the quad-on command, so quad framing cannot be issued
//! before the sequence completes.

use core::marker::PhantomData;

use crate::bus::{opcodes, BusTransaction, LineWidth};
use crate::controller::BusController;
use crate::diagnostics::{Diagnostics, Failure};
use crate::error::{Error, Phase, Result, TransportError};
use crate::protocol::transport;

/// Bytes written per clear transaction (one wrapped burst)
pub const CLEAR_CHUNK: usize = 32;

/// Power-on state, line width unknown
#[derive(Debug)]
pub struct Unknown;

/// Reset done, device is in SPI mode
#[derive(Debug)]
pub struct SingleLine;

/// Device accepts 4-4-4 framing
#[derive(Debug)]
pub struct QuadLine;

/// Handle on the external device in mode `S`
#[derive(Debug)]
pub struct Device<S> {
    _state: PhantomData<S>,
}

impl<S> Device<S> {
    fn transition<T>(self) -> Device<T> {
        Device {
            _state: PhantomData,
        }
    }
}

/// Issue `txn` and record `failure` if it does not go through
fn step<B: BusController + ?Sized>(
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

impl Device<Unknown> {
    /// Handle for a device in an unknown mode
    pub const fn new() -> Self {
        Self {
            _state: PhantomData,
        }
    }

    /// Reset the device into SPI mode
    ///
    /// Issues reset-enable and reset in QPI framing first, which reaches a
    /// device left in quad mode by a warm reset, then again in SPI framing
    /// for a device fresh from power-up. All four commands are sent even when
    /// one fails; only the first failure is recorded.
    pub fn reset<B: BusController + ?Sized>(
        self,
        bus: &mut B,
        diag: &mut Diagnostics,
    ) -> Device<SingleLine> {
        for lines in [LineWidth::Quad, LineWidth::Single] {
            log::debug!("{} reset", lines);
            step(
                bus,
                BusTransaction::command(opcodes::RESET_ENABLE, lines),
                Failure::ResetEnable { lines },
                diag,
            );
            step(
                bus,
                BusTransaction::command(opcodes::RESET, lines),
                Failure::Reset { lines },
                diag,
            );
        }
        self.transition()
    }
}

impl Default for Device<Unknown> {
    fn default() -> Self {
        Self::new()
    }
}

impl Device<SingleLine> {
    /// Read the 8-byte identifier
    ///
    /// Only works in SPI mode. On success the identifier is stored in
    /// `diag`; a failure is recorded by the phase it happened in.
    pub fn read_identifier<B: BusController + ?Sized>(
        &self,
        bus: &mut B,
        diag: &mut Diagnostics,
    ) -> Option<[u8; opcodes::IDENTIFIER_LEN]> {
        let mut id = [0u8; opcodes::IDENTIFIER_LEN];
        match transport::execute(bus, &mut BusTransaction::read_identifier(&mut id)) {
            Ok(()) => {
                log::info!("eid {:02x?}", id);
                if id[1] != opcodes::KGD_PASS {
                    log::warn!("known good die marker {:#04x}", id[1]);
                }
                diag.set_identifier(id);
                Some(id)
            }
            Err(e) => {
                let failure = match e {
                    Error::Transport(TransportError {
                        phase: Phase::Data,
                        ..
                    }) => Failure::ReadIdData,
                    _ => Failure::ReadIdCommand,
                };
                log::warn!("{:?}: {}", failure, e);
                diag.record_if_absent(failure);
                None
            }
        }
    }

    /// Switch the device to QPI mode
    pub fn enable_quad<B: BusController + ?Sized>(
        self,
        bus: &mut B,
        diag: &mut Diagnostics,
    ) -> Device<QuadLine> {
        log::debug!("quad on");
        step(
            bus,
            BusTransaction::command(opcodes::QUAD_ON, LineWidth::Single),
            Failure::QuadEnable,
            diag,
        );
        self.transition()
    }
}

impl Device<QuadLine> {
    /// Quad read of `buf.len()` bytes at device address `addr`
    pub fn read<B: BusController + ?Sized>(
        &self,
        bus: &mut B,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<()> {
        transport::execute(bus, &mut BusTransaction::quad_read(addr, buf))
    }

    /// Quad write of `data` at device address `addr`
    pub fn write<B: BusController + ?Sized>(
        &self,
        bus: &mut B,
        addr: u32,
        data: &[u8],
    ) -> Result<()> {
        transport::execute(bus, &mut BusTransaction::quad_write(addr, data))
    }

    /// Fill the first `size` bytes of the device with `pattern`
    ///
    /// Stops at the first failed chunk and records [`Failure::Clear`].
    pub fn clear<B: BusController + ?Sized>(
        &self,
        bus: &mut B,
        size: u32,
        pattern: u32,
        diag: &mut Diagnostics,
    ) -> bool {
        let mut chunk = [0u8; CLEAR_CHUNK];
        for word in chunk.chunks_exact_mut(4) {
            word.copy_from_slice(&pattern.to_le_bytes());
        }

        log::debug!("clearing {:#x} bytes with {:#010x}", size, pattern);
        let mut addr = 0u32;
        while addr < size {
            let len = core::cmp::min(CLEAR_CHUNK as u32, size - addr) as usize;
            if let Err(e) = self.write(bus, addr, &chunk[..len]) {
                log::warn!("clear fail at {:#08x}: {}", addr, e);
                diag.record_if_absent(Failure::Clear);
                return false;
            }
            addr += len as u32;
        }
        true
    }
}
