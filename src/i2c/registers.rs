// Licensed under the Apache-2.0 license

//! Register view of the I2C peripheral.
//!
//! The driver only touches six registers: CR1 (enable and interrupt sources),
//! CR2 (framing word), ISR (status), ICR (flag clear), RXDR and TXDR. The
//! [`I2cRegisters`] trait is the seam between the driver and the hardware;
//! [`Mmio`] implements it with volatile accesses, tests implement it with a
//! simulated device.

use bitflags::bitflags;

bitflags! {
    /// Control register 1.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Cr1: u32 {
        const PE = 1 << 0;
        const TXIE = 1 << 1;
        const RXIE = 1 << 2;
        const ADDRIE = 1 << 3;
        const NACKIE = 1 << 4;
        const STOPIE = 1 << 5;
        const TCIE = 1 << 6;
        const ERRIE = 1 << 7;

        const _ = !0;
    }
}

impl Cr1 {
    /// Every source the master driver may enable.
    pub const TRANSFER_IRQS: Cr1 = Cr1::TXIE
        .union(Cr1::RXIE)
        .union(Cr1::NACKIE)
        .union(Cr1::STOPIE)
        .union(Cr1::TCIE);
}

bitflags! {
    /// Interrupt and status register.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Isr: u32 {
        const TXE = 1 << 0;
        const TXIS = 1 << 1;
        const RXNE = 1 << 2;
        const ADDR = 1 << 3;
        const NACKF = 1 << 4;
        const STOPF = 1 << 5;
        const TC = 1 << 6;
        const TCR = 1 << 7;
        const BERR = 1 << 8;
        const ARLO = 1 << 9;
        const OVR = 1 << 10;
        const BUSY = 1 << 15;

        const _ = !0;
    }
}

bitflags! {
    /// Interrupt clear register.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Icr: u32 {
        const ADDRCF = 1 << 3;
        const NACKCF = 1 << 4;
        const STOPCF = 1 << 5;
        const BERRCF = 1 << 8;
        const ARLOCF = 1 << 9;
        const OVRCF = 1 << 10;
    }
}

/// Control register 2 fields.
pub mod cr2 {
    pub const SADD_MASK: u32 = 0x3FF;
    pub const RD_WRN: u32 = 1 << 10;
    pub const START: u32 = 1 << 13;
    pub const STOP: u32 = 1 << 14;
    pub const NBYTES_SHIFT: u32 = 16;
    pub const NBYTES_MASK: u32 = 0xFF << NBYTES_SHIFT;
    pub const RELOAD: u32 = 1 << 24;
    pub const AUTOEND: u32 = 1 << 25;
}

/// Register byte offsets from the peripheral base.
pub mod offset {
    pub const CR1: usize = 0x00;
    pub const CR2: usize = 0x04;
    pub const OAR1: usize = 0x08;
    pub const OAR2: usize = 0x0C;
    pub const TIMINGR: usize = 0x10;
    pub const TIMEOUTR: usize = 0x14;
    pub const ISR: usize = 0x18;
    pub const ICR: usize = 0x1C;
    pub const PECR: usize = 0x20;
    pub const RXDR: usize = 0x24;
    pub const TXDR: usize = 0x28;
}

/// Access to the registers of one I2C peripheral instance.
///
/// Reads of RXDR and writes of TXDR have hardware side effects (they clear
/// RXNE and TXIS), so both take `&mut self`.
pub trait I2cRegisters {
    fn read_cr1(&self) -> Cr1;
    fn write_cr1(&mut self, value: Cr1);
    fn read_cr2(&self) -> u32;
    fn write_cr2(&mut self, value: u32);
    fn read_isr(&self) -> Isr;
    fn write_icr(&mut self, value: Icr);
    fn read_rxdr(&mut self) -> u8;
    fn write_txdr(&mut self, value: u8);

    /// Read-modify-write of CR1. Bits outside the closure's changes are kept.
    fn modify_cr1<F: FnOnce(Cr1) -> Cr1>(&mut self, f: F) {
        let value = self.read_cr1();
        self.write_cr1(f(value));
    }
}

impl<T: I2cRegisters + ?Sized> I2cRegisters for &mut T {
    fn read_cr1(&self) -> Cr1 {
        T::read_cr1(self)
    }
    fn write_cr1(&mut self, value: Cr1) {
        T::write_cr1(self, value);
    }
    fn read_cr2(&self) -> u32 {
        T::read_cr2(self)
    }
    fn write_cr2(&mut self, value: u32) {
        T::write_cr2(self, value);
    }
    fn read_isr(&self) -> Isr {
        T::read_isr(self)
    }
    fn write_icr(&mut self, value: Icr) {
        T::write_icr(self, value);
    }
    fn read_rxdr(&mut self) -> u8 {
        T::read_rxdr(self)
    }
    fn write_txdr(&mut self, value: u8) {
        T::write_txdr(self, value);
    }
}

/// Volatile access to a memory-mapped peripheral.
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the address of an I2Cv2 register block that stays mapped
    /// for the lifetime of the value, and no other `Mmio` may alias it.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[must_use]
    pub fn base(&self) -> usize {
        self.base
    }

    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `new` requires `base` to point at a live register block.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write(&mut self, offset: usize, value: u32) {
        // SAFETY: `new` requires `base` to point at a live register block.
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

impl I2cRegisters for Mmio {
    fn read_cr1(&self) -> Cr1 {
        Cr1::from_bits_retain(self.read(offset::CR1))
    }
    fn write_cr1(&mut self, value: Cr1) {
        self.write(offset::CR1, value.bits());
    }
    fn read_cr2(&self) -> u32 {
        self.read(offset::CR2)
    }
    fn write_cr2(&mut self, value: u32) {
        self.write(offset::CR2, value);
    }
    fn read_isr(&self) -> Isr {
        Isr::from_bits_retain(self.read(offset::ISR))
    }
    fn write_icr(&mut self, value: Icr) {
        self.write(offset::ICR, value.bits());
    }
    fn read_rxdr(&mut self) -> u8 {
        (self.read(offset::RXDR) & 0xFF) as u8
    }
    fn write_txdr(&mut self, value: u8) {
        self.write(offset::TXDR, u32::from(value));
    }
}
