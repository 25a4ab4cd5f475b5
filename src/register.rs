//! # Register access
//!
//! Peripherals are described as a base address plus a table of register
//! offsets. A register table is any `Copy` type implementing [`Register`];
//! the bit layout of each register lives next to it as constant masks built
//! with [`bit`], [`bits`] and [`field`].
//!
//! [`RegisterAccess`] is the seam between drivers and hardware. On the chip
//! it is implemented by [`Mmio`], which performs volatile 32-bit accesses at
//! `base + offset`. Host tests implement it with an in-memory register file.
//!
//! ```rust
//! use gd32vf103_diy::register::{bit, bits, field};
//!
//! assert_eq!(bit(13), 0x2000);
//! assert_eq!(bits(4, 15), 0xFFF0);
//! assert_eq!(field(0b10, 12, 13), 0x2000);
//! ```

use core::marker::PhantomData;

use vcell::VolatileCell;

/// Mask with only bit `n` set
pub const fn bit(n: u32) -> u32 {
    1 << n
}

/// Mask covering bits `start..=end`
pub const fn bits(start: u32, end: u32) -> u32 {
    (u32::MAX << start) & (u32::MAX >> (31 - end))
}

/// `value` shifted into bits `start..=end`, truncated to the field width
pub const fn field(value: u32, start: u32, end: u32) -> u32 {
    (value << start) & bits(start, end)
}

/// Extracts bits `start..=end` of `reg`, shifted down to bit 0
pub const fn get_field(reg: u32, start: u32, end: u32) -> u32 {
    (reg & bits(start, end)) >> start
}

/// A register in a peripheral's register table
pub trait Register: Copy {
    /// Byte offset from the peripheral base address
    fn offset(self) -> usize;
}

/// Read/modify/write access to the registers of one peripheral
pub trait RegisterAccess<R: Register> {
    /// Reads the full 32-bit register
    fn read(&self, reg: R) -> u32;

    /// Writes the full 32-bit register
    fn write(&mut self, reg: R, value: u32);

    /// Read, transform, write back
    fn modify<F>(&mut self, reg: R, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Sets every bit in `mask`
    fn set_bits(&mut self, reg: R, mask: u32) {
        self.modify(reg, |r| r | mask);
    }

    /// Clears every bit in `mask`
    fn clear_bits(&mut self, reg: R, mask: u32) {
        self.modify(reg, |r| r & !mask);
    }

    /// Clears the bits of `mask`, then sets those of `value` that fall inside it
    fn write_field(&mut self, reg: R, mask: u32, value: u32) {
        self.modify(reg, |r| (r & !mask) | (value & mask));
    }

    /// Whether any bit of `mask` is set
    fn is_set(&self, reg: R, mask: u32) -> bool {
        self.read(reg) & mask != 0
    }
}

/// Memory mapped register block at a fixed base address
pub struct Mmio<R> {
    base: usize,
    _regs: PhantomData<R>,
}

impl<R: Register> Mmio<R> {
    /// Creates a handle for the register block at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the address of a peripheral whose registers match `R`,
    /// and the caller must hold exclusive access to that peripheral for the
    /// lifetime of the handle.
    pub const unsafe fn new(base: usize) -> Self {
        Mmio {
            base,
            _regs: PhantomData,
        }
    }

    /// Base address of the block
    pub fn base(&self) -> usize {
        self.base
    }

    fn cell(&self, reg: R) -> &VolatileCell<u32> {
        // NOTE(unsafe) address validity is guaranteed by the contract of `new`
        unsafe { &*((self.base + reg.offset()) as *const VolatileCell<u32>) }
    }
}

impl<R: Register> RegisterAccess<R> for Mmio<R> {
    #[inline(always)]
    fn read(&self, reg: R) -> u32 {
        self.cell(reg).get()
    }

    #[inline(always)]
    fn write(&mut self, reg: R, value: u32) {
        self.cell(reg).set(value)
    }
}
