//! Volatile register access

/// A block of memory-mapped registers
///
/// All accessors are single volatile loads or stores at `base + offset`.
#[derive(Debug)]
pub struct Mmio {
    base: *mut u8,
    size: usize,
}

impl Mmio {
    /// Wrap the register block at `base`
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `base..base + size` is valid for volatile access for the lifetime of
    ///   the returned value
    /// - nothing else drives the same registers concurrently
    pub const unsafe fn new(base: usize, size: usize) -> Self {
        Self {
            base: base as *mut u8,
            size,
        }
    }

    /// Base address of the block
    pub fn base(&self) -> usize {
        self.base as usize
    }

    /// Read an 8-bit value
    #[inline]
    pub fn read8(&self, offset: usize) -> u8 {
        debug_assert!(offset < self.size);
        unsafe { core::ptr::read_volatile(self.base.add(offset)) }
    }

    /// Read a 16-bit value
    #[inline]
    pub fn read16(&self, offset: usize) -> u16 {
        debug_assert!(offset + 2 <= self.size);
        debug_assert!(offset & 1 == 0, "unaligned 16-bit read");
        unsafe { core::ptr::read_volatile(self.base.add(offset) as *const u16) }
    }

    /// Read a 32-bit value
    #[inline]
    pub fn read32(&self, offset: usize) -> u32 {
        debug_assert!(offset + 4 <= self.size);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit read");
        unsafe { core::ptr::read_volatile(self.base.add(offset) as *const u32) }
    }

    /// Write an 8-bit value
    #[inline]
    pub fn write8(&self, offset: usize, value: u8) {
        debug_assert!(offset < self.size);
        unsafe { core::ptr::write_volatile(self.base.add(offset), value) }
    }

    /// Write a 16-bit value
    #[inline]
    pub fn write16(&self, offset: usize, value: u16) {
        debug_assert!(offset + 2 <= self.size);
        debug_assert!(offset & 1 == 0, "unaligned 16-bit write");
        unsafe { core::ptr::write_volatile(self.base.add(offset) as *mut u16, value) }
    }

    /// Write a 32-bit value
    #[inline]
    pub fn write32(&self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= self.size);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit write");
        unsafe { core::ptr::write_volatile(self.base.add(offset) as *mut u32, value) }
    }

    /// Read-modify-write a 32-bit register
    #[inline]
    pub fn modify32(&self, offset: usize, f: impl FnOnce(u32) -> u32) {
        let value = self.read32(offset);
        self.write32(offset, f(value));
    }
}
