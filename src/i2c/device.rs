// Licensed under the Apache-2.0 license

//! Register access for device drivers.
//!
//! A device driver talks to its chip through [`RegisterAccess`] and never
//! sees the bus handle. Two transports are provided:
//!
//! * [`HalRegisters`] wraps any `embedded_hal::i2c::I2c` bus. Requests
//!   complete before the call returns.
//! * [`InterruptRegisters`] arms interrupt-driven transfers on a
//!   [`SharedI2c`] handle. Requests complete later, through the handle's
//!   callbacks.
//!
//! A driver checks [`RegisterAccess::is_interrupt_driven`] to know whether it
//! must run its own completion logic right after issuing a request.

use embedded_hal::i2c::I2c;
use heapless::Vec;

use crate::i2c::common::{I2cError, RegisterWidth};
use crate::i2c::framing::offset_bytes;
use crate::i2c::shared::SharedI2c;
use crate::i2c::traits::I2cMasterAsync;

/// Longest payload [`HalRegisters::write_register`] accepts.
pub const MAX_REGISTER_WRITE: usize = 32;

pub trait RegisterAccess {
    type Error: core::fmt::Debug;

    /// `true` if requests complete after the call returns.
    fn is_interrupt_driven(&self) -> bool;

    /// Reads `buffer.len()` bytes starting at `offset`.
    ///
    /// Synchronous transports fill `buffer`; interrupt-driven ones only use
    /// its length and deliver the bytes on completion.
    ///
    /// # Errors
    ///
    /// Transport specific.
    fn read_register(
        &mut self,
        offset: u16,
        width: RegisterWidth,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Writes `data` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Transport specific.
    fn write_register(
        &mut self,
        offset: u16,
        width: RegisterWidth,
        data: &[u8],
    ) -> Result<(), Self::Error>;
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    type Error = T::Error;

    fn is_interrupt_driven(&self) -> bool {
        T::is_interrupt_driven(self)
    }

    fn read_register(
        &mut self,
        offset: u16,
        width: RegisterWidth,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        T::read_register(self, offset, width, buffer)
    }

    fn write_register(
        &mut self,
        offset: u16,
        width: RegisterWidth,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        T::write_register(self, offset, width, data)
    }
}

/// Errors from [`HalRegisters`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError<E> {
    /// The bus reported an error.
    Bus(E),
    /// The write does not fit in one request.
    InvalidLength,
}

/// Polled register access over an embedded-hal bus.
pub struct HalRegisters<I> {
    bus: I,
    address: u8,
}

impl<I: I2c> HalRegisters<I> {
    pub fn new(bus: I, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn free(self) -> I {
        self.bus
    }
}

impl<I: I2c> RegisterAccess for HalRegisters<I> {
    type Error = DeviceError<I::Error>;

    fn is_interrupt_driven(&self) -> bool {
        false
    }

    fn read_register(
        &mut self,
        offset: u16,
        width: RegisterWidth,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let offset = offset_bytes(offset, width);
        self.bus
            .write_read(self.address, &offset, buffer)
            .map_err(DeviceError::Bus)
    }

    fn write_register(
        &mut self,
        offset: u16,
        width: RegisterWidth,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        let mut frame: Vec<u8, { MAX_REGISTER_WRITE + 2 }> = offset_bytes(offset, width)
            .into_iter()
            .collect();
        frame
            .extend_from_slice(data)
            .map_err(|()| DeviceError::InvalidLength)?;
        self.bus.write(self.address, &frame).map_err(DeviceError::Bus)
    }
}

/// Interrupt-driven register access through a shared bus handle.
///
/// Register writes go through `memory_write_async`. Devices that take a
/// repeated START as the end of a write need the shared handle built with
/// [`I2cConfigBuilder::memory_write_continuation`](crate::i2c::common::I2cConfigBuilder::memory_write_continuation).
pub struct InterruptRegisters<'a, H> {
    bus: &'a SharedI2c<H>,
    address: u8,
}

impl<'a, H: I2cMasterAsync> InterruptRegisters<'a, H> {
    pub fn new(bus: &'a SharedI2c<H>, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }
}

impl<H: I2cMasterAsync> RegisterAccess for InterruptRegisters<'_, H> {
    type Error = I2cError;

    fn is_interrupt_driven(&self) -> bool {
        true
    }

    fn read_register(
        &mut self,
        offset: u16,
        width: RegisterWidth,
        buffer: &mut [u8],
    ) -> Result<(), I2cError> {
        let address = self.address;
        let len = buffer.len();
        self.bus
            .try_with(|handle| handle.memory_read_async(address, offset, width, len))
    }

    fn write_register(
        &mut self,
        offset: u16,
        width: RegisterWidth,
        data: &[u8],
    ) -> Result<(), I2cError> {
        let address = self.address;
        self.bus
            .try_with(|handle| handle.memory_write_async(address, offset, width, data))
    }
}
