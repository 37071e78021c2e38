// Licensed under the Apache-2.0 license

//! # I2C Master Traits
//!
//! Small capability traits that split the bus handle's surface by concern,
//! so drivers and adapters can ask for exactly what they use.
//!
//! ## Trait Hierarchy
//!
//! ```text
//! I2cHardwareCore (foundation)
//!     ├── I2cMaster (polled master operations)
//!     │   └── I2cMemory (polled register access)
//!     └── I2cMasterAsync (interrupt-driven operations)
//! ```

use embedded_hal::i2c::{AddressMode, Operation, SevenBitAddress};

use crate::i2c::common::{I2cError, I2cState, RegisterWidth};

/// Core I2C hardware interface
///
/// The operations every controller needs regardless of how transfers are
/// driven.
pub trait I2cHardwareCore {
    /// Hardware-specific error type that implements embedded-hal error traits
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Returns the driver to its idle state without touching the bus.
    fn init(&mut self);

    /// Handle hardware interrupt events (called from ISR)
    ///
    /// Implementations must be fast and non-blocking; each call services at
    /// most one condition.
    fn handle_interrupt(&mut self);

    /// Attempt to recover the I2C bus from stuck conditions
    ///
    /// # Errors
    ///
    /// Returns an error if the peripheral does not respond to the reset.
    fn recover_bus(&mut self) -> Result<(), Self::Error>;
}

/// I2C Master mode operations
///
/// The address type `A` must implement `AddressMode` to ensure compatibility
/// with embedded-hal. This driver implements it for `SevenBitAddress` (u8).
///
/// # Examples
///
/// ```rust,ignore
/// use stm32_i2c_ddk::i2c::I2cMaster;
///
/// fn read_sensor<T: I2cMaster>(i2c: &mut T) -> Result<u16, T::Error> {
///     let mut data = [0u8; 2];
///     i2c.read(0x48u8, &mut data)?;
///     Ok(u16::from_be_bytes(data))
/// }
/// ```
pub trait I2cMaster<A: AddressMode = SevenBitAddress>: I2cHardwareCore {
    /// Write data to a slave device at the given address
    ///
    /// # Arguments
    ///
    /// * `addr` - I2C address of the target slave device
    /// * `bytes` - Data to write to the slave
    ///
    /// # Errors
    ///
    /// Returns an error if the bus is busy, the slave does not acknowledge,
    /// or a status wait times out.
    fn write(&mut self, addr: A, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a slave device at the given address
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    fn read(&mut self, addr: A, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Combined write-then-read operation with restart condition
    ///
    /// # Arguments
    ///
    /// * `addr` - I2C address of the target slave device
    /// * `bytes` - Data to write to the slave before reading
    /// * `buffer` - Buffer to fill with data read from the slave
    ///
    /// # Errors
    ///
    /// Returns an error if the slave does not acknowledge during either
    /// phase, or a status wait times out.
    fn write_read(&mut self, addr: A, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Execute a sequence of I2C operations as a single transaction
    ///
    /// # Errors
    ///
    /// Returns an error if any operation in the sequence fails. The remaining
    /// operations are not attempted.
    fn transaction_slice(
        &mut self,
        addr: A,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Self::Error>;
}

/// Polled register access on devices with an internal register pointer.
pub trait I2cMemory<A: AddressMode = SevenBitAddress>: I2cMaster<A> {
    /// Writes `data` starting at `register`.
    ///
    /// # Errors
    ///
    /// Same as [`I2cMaster::write`].
    fn memory_write(
        &mut self,
        addr: A,
        register: u16,
        width: RegisterWidth,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    /// Fills `buffer` starting at `register`.
    ///
    /// # Errors
    ///
    /// Same as [`I2cMaster::write`].
    fn memory_read(
        &mut self,
        addr: A,
        register: u16,
        width: RegisterWidth,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;
}

/// Interrupt-driven master operations.
///
/// Each call arms one transfer and returns; completion is reported through
/// the handle's callbacks once [`I2cHardwareCore::handle_interrupt`] has
/// driven it to the end.
pub trait I2cMasterAsync: I2cHardwareCore<Error = I2cError> {
    /// # Errors
    ///
    /// [`I2cError::Busy`] while another transfer is in flight,
    /// [`I2cError::InvalidLength`] for payloads over one phase.
    fn write_async(&mut self, addr: u8, data: &[u8]) -> Result<(), I2cError>;

    /// # Errors
    ///
    /// See [`write_async`](Self::write_async).
    fn read_async(&mut self, addr: u8, len: usize) -> Result<(), I2cError>;

    /// # Errors
    ///
    /// See [`write_async`](Self::write_async).
    fn memory_write_async(
        &mut self,
        addr: u8,
        register: u16,
        width: RegisterWidth,
        data: &[u8],
    ) -> Result<(), I2cError>;

    /// # Errors
    ///
    /// See [`write_async`](Self::write_async).
    fn memory_read_async(
        &mut self,
        addr: u8,
        register: u16,
        width: RegisterWidth,
        len: usize,
    ) -> Result<(), I2cError>;

    fn state(&self) -> I2cState;

    fn last_error(&self) -> Option<I2cError>;

    /// Bytes collected by the last read.
    fn received(&self) -> &[u8];
}
