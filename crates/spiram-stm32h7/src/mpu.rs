//! Cortex-M7 memory protection unit

use spiram_core::error::Result;
use spiram_core::protection::{ProtectionRegion, RegionAccess, RegionFlags};

use crate::mmio::Mmio;
use crate::regs::*;

/// RASR value for a region; zero switches the region off
pub fn encode_rasr(region: &ProtectionRegion) -> u32 {
    if !region.enabled {
        return 0;
    }

    let ap = match region.access {
        RegionAccess::NoAccess => AP_NO_ACCESS,
        RegionAccess::ReadWrite => AP_FULL_ACCESS,
    };
    let mut value = ap << RASR_AP_SHIFT
        | u32::from(region.tex & 0b111) << RASR_TEX_SHIFT
        | u32::from(region.size_field()) << RASR_SIZE_SHIFT
        | RASR_ENABLE;

    if region.flags.contains(RegionFlags::EXECUTE_NEVER) {
        value |= RASR_XN;
    }
    if region.flags.contains(RegionFlags::SHAREABLE) {
        value |= RASR_S;
    }
    if region.flags.contains(RegionFlags::CACHEABLE) {
        value |= RASR_C;
    }
    if region.flags.contains(RegionFlags::BUFFERABLE) {
        value |= RASR_B;
    }
    value
}

/// RBAR value for a region, the base address alone
pub fn encode_rbar(region: &ProtectionRegion) -> u32 {
    if region.enabled {
        region.base & !0x1F
    } else {
        0
    }
}

/// Memory protection unit
#[derive(Debug)]
pub struct Mpu {
    regs: Mmio,
}

impl Mpu {
    /// Driver for the core's MPU
    ///
    /// # Safety
    ///
    /// The caller must be the only code reprogramming the MPU.
    pub unsafe fn new() -> Self {
        Self::from_regs(Mmio::new(MPU_BASE, MPU_BLOCK_SIZE))
    }

    /// Driver over an already-wrapped register block
    pub fn from_regs(regs: Mmio) -> Self {
        Self { regs }
    }

    /// Program `regions` with the MPU switched off and interrupts masked
    ///
    /// Every region is checked before anything is written. The MPU comes back
    /// on with the default map as background for privileged code.
    pub fn configure(&mut self, regions: &[ProtectionRegion]) -> Result<()> {
        for region in regions {
            region.validate()?;
        }

        critical_section(|| {
            barrier::dmb();
            self.regs.write32(MPU_CTRL, 0);

            for region in regions {
                self.regs.write32(MPU_RNR, u32::from(region.number));
                self.regs.write32(MPU_RBAR, encode_rbar(region));
                self.regs.write32(MPU_RASR, encode_rasr(region));
                log::trace!(
                    "mpu: region {} RBAR={:#010x} RASR={:#010x}",
                    region.number,
                    encode_rbar(region),
                    encode_rasr(region)
                );
            }

            self.regs
                .write32(MPU_CTRL, MPU_CTRL_ENABLE | MPU_CTRL_PRIVDEFENA);
            barrier::dsb();
            barrier::isb();
        });
        Ok(())
    }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
fn critical_section<R>(f: impl FnOnce() -> R) -> R {
    cortex_m::interrupt::free(|_| f())
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn critical_section<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod barrier {
    pub use cortex_m::asm::{dmb, dsb, isb};
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
mod barrier {
    use core::sync::atomic::{compiler_fence, Ordering};

    pub fn dmb() {
        compiler_fence(Ordering::SeqCst);
    }

    pub fn dsb() {
        compiler_fence(Ordering::SeqCst);
    }

    pub fn isb() {
        compiler_fence(Ordering::SeqCst);
    }
}
