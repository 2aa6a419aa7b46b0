//! Destructive pattern test over the mapped window
//!
//! Three passes, 32-bit then 16-bit then 8-bit. Each pass writes its pattern
//! over the entire window before reading any of it back, so a fault that
//! aliases two addresses shows up as a mismatch instead of reading back its
//! own store. The patterns alternate every data line between 1010 and 0101.

use crate::controller::{AccessWidth, MappedMemory};
use crate::diagnostics::{Diagnostics, Failure, Mismatch, Outcome};
use crate::memory_map::MappedWindow;

/// 32-bit pass pattern
pub const PATTERN_WORD: u32 = 0xA5A5_A5A5;
/// 16-bit pass pattern
pub const PATTERN_HALF: u16 = 0x5A5A;
/// 8-bit pass pattern
pub const PATTERN_BYTE: u8 = 0xA5;

/// One access width of the test
trait Granule: Copy + PartialEq {
    const WIDTH: AccessWidth;
    const PATTERN: Self;

    fn store<M: MappedMemory + ?Sized>(mem: &mut M, addr: u32, value: Self);
    fn load<M: MappedMemory + ?Sized>(mem: &mut M, addr: u32) -> Self;
    fn mismatch(address: u32, observed: Self) -> Mismatch;
}

impl Granule for u32 {
    const WIDTH: AccessWidth = AccessWidth::Word;
    const PATTERN: Self = PATTERN_WORD;

    fn store<M: MappedMemory + ?Sized>(mem: &mut M, addr: u32, value: Self) {
        mem.write32(addr, value)
    }

    fn load<M: MappedMemory + ?Sized>(mem: &mut M, addr: u32) -> Self {
        mem.read32(addr)
    }

    fn mismatch(address: u32, observed: Self) -> Mismatch {
        Mismatch::Word {
            address,
            expected: Self::PATTERN,
            observed,
        }
    }
}

impl Granule for u16 {
    const WIDTH: AccessWidth = AccessWidth::Half;
    const PATTERN: Self = PATTERN_HALF;

    fn store<M: MappedMemory + ?Sized>(mem: &mut M, addr: u32, value: Self) {
        mem.write16(addr, value)
    }

    fn load<M: MappedMemory + ?Sized>(mem: &mut M, addr: u32) -> Self {
        mem.read16(addr)
    }

    fn mismatch(address: u32, observed: Self) -> Mismatch {
        Mismatch::Half {
            address,
            expected: Self::PATTERN,
            observed,
        }
    }
}

impl Granule for u8 {
    const WIDTH: AccessWidth = AccessWidth::Byte;
    const PATTERN: Self = PATTERN_BYTE;

    fn store<M: MappedMemory + ?Sized>(mem: &mut M, addr: u32, value: Self) {
        mem.write8(addr, value)
    }

    fn load<M: MappedMemory + ?Sized>(mem: &mut M, addr: u32) -> Self {
        mem.read8(addr)
    }

    fn mismatch(address: u32, observed: Self) -> Mismatch {
        Mismatch::Byte {
            address,
            expected: Self::PATTERN,
            observed,
        }
    }
}

fn pass<G: Granule, M: MappedMemory + ?Sized>(
    mem: &mut M,
    window: &MappedWindow,
) -> Option<Mismatch> {
    let step = G::WIDTH.bytes() as usize;
    let base = window.start();

    log::debug!("memtest{} {:#010x}..{:#010x}", G::WIDTH.bits(), base, window.end());
    for offset in (0..window.size()).step_by(step) {
        G::store(mem, base + offset, G::PATTERN);
    }
    for offset in (0..window.size()).step_by(step) {
        let addr = base + offset;
        let observed = G::load(mem, addr);
        if observed != G::PATTERN {
            return Some(G::mismatch(addr, observed));
        }
    }
    None
}

/// Per-width result of one self-test run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelfTestReport {
    /// First mismatch of the 32-bit pass
    pub word: Option<Mismatch>,
    /// First mismatch of the 16-bit pass
    pub half: Option<Mismatch>,
    /// First mismatch of the 8-bit pass
    pub byte: Option<Mismatch>,
}

impl SelfTestReport {
    /// Returns true if all three passes read back their pattern
    pub fn passed(&self) -> bool {
        self.word.is_none() && self.half.is_none() && self.byte.is_none()
    }

    /// Mismatches in test order
    pub fn mismatches(&self) -> impl Iterator<Item = Mismatch> + '_ {
        [self.word, self.half, self.byte].into_iter().flatten()
    }
}

/// Run all three passes over `window`
///
/// Every pass runs regardless of the others. Each mismatch is offered to
/// `diag`, then a pass is offered, so the retained outcome is the first
/// thing that went wrong in the whole run.
pub fn run<M: MappedMemory + ?Sized>(
    mem: &mut M,
    window: &MappedWindow,
    diag: &mut Diagnostics,
) -> SelfTestReport {
    let report = SelfTestReport {
        word: pass::<u32, _>(mem, window),
        half: pass::<u16, _>(mem, window),
        byte: pass::<u8, _>(mem, window),
    };

    for mismatch in report.mismatches() {
        log::warn!("self-test mismatch: {:?}", mismatch);
        diag.record_if_absent(Failure::SelfTest(mismatch));
    }
    diag.record_if_absent(Outcome::SelfTestPass);
    report
}
