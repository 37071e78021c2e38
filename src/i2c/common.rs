// Licensed under the Apache-2.0 license

//! Common types for the I2C master driver.
//!
//! Configuration, handle state, operation kinds and the error taxonomy shared
//! by the blocking, interrupt-driven and device-facing parts of the driver.

use fugit::MillisDurationU32;

/// Largest byte count a single bus phase can declare (the NBYTES field is 8 bits).
pub const MAX_TRANSFER_LEN: usize = 255;

/// Default number of status polls per byte slot before a blocking transfer
/// gives up with [`I2cError::Timeout`].
pub const DEFAULT_TIMEOUT_POLLS: u32 = 10_000;

/// Lifecycle state of a bus handle.
///
/// `Ready` is both the initial and the terminal state of every transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cState {
    Ready,
    /// Sending the register offset of a memory operation.
    BusyAddressing,
    BusyTransmitting,
    BusyReceiving,
}

impl I2cState {
    #[must_use]
    pub fn is_busy(self) -> bool {
        self != I2cState::Ready
    }
}

/// Kind of transfer recorded on the handle when it is armed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cOperation {
    Write,
    Read,
    WriteAsync,
    ReadAsync,
    MemoryWrite,
    MemoryRead,
}

impl I2cOperation {
    /// Whether the payload flows from the target to the controller.
    #[must_use]
    pub fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadAsync | Self::MemoryRead)
    }

    #[must_use]
    pub fn is_memory(self) -> bool {
        matches!(self, Self::MemoryWrite | Self::MemoryRead)
    }
}

/// Errors reported by the bus controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// The peripheral signals bus activity or the handle has a transfer in flight.
    Busy,
    /// A blocking wait ran out of polls, or the watchdog expired.
    Timeout,
    /// The addressed device did not acknowledge.
    NotAcknowledged,
    /// A phase was asked to move more than [`MAX_TRANSFER_LEN`] bytes, or a
    /// register offset does not fit its [`RegisterWidth`].
    InvalidLength,
    /// The shared handle has not been installed yet.
    Unavailable,
}

impl embedded_hal::i2c::Error for I2cError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            I2cError::NotAcknowledged => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            I2cError::Busy
            | I2cError::Timeout
            | I2cError::InvalidLength
            | I2cError::Unavailable => ErrorKind::Other,
        }
    }
}

/// Width of a device register offset sent in the addressing phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterWidth {
    U8,
    U16,
}

impl RegisterWidth {
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            RegisterWidth::U8 => 1,
            RegisterWidth::U16 => 2,
        }
    }

    /// Whether `register` can be sent in this many bytes.
    #[must_use]
    pub fn holds(self, register: u16) -> bool {
        match self {
            RegisterWidth::U8 => register <= 0xFF,
            RegisterWidth::U16 => true,
        }
    }
}

/// Snapshot of a handle's transient transfer fields.
///
/// Two snapshots compare equal when the handles would behave identically for
/// the next transfer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferStatus {
    pub state: I2cState,
    pub previous_state: I2cState,
    pub operation: Option<I2cOperation>,
    pub device_address: u8,
    pub register_address: u16,
    pub register_width: RegisterWidth,
    pub data_len: usize,
    pub data_transferred: usize,
    pub register_bytes_sent: usize,
    pub last_error: Option<I2cError>,
}

pub struct I2cConfig {
    /// Status polls allowed per byte slot in the blocking paths.
    pub timeout_polls: u32,
    /// Idle window after which an interrupt-driven transfer is abandoned.
    pub watchdog: Option<MillisDurationU32>,
    /// Send the payload of a memory write in the same write as the offset,
    /// with RELOAD and no repeated START. Off by default, in which case the
    /// payload follows a fresh START with its own byte count.
    pub memory_write_continuation: bool,
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfigBuilder::new().build()
    }
}

pub struct I2cConfigBuilder {
    timeout_polls: u32,
    watchdog: Option<MillisDurationU32>,
    memory_write_continuation: bool,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout_polls: DEFAULT_TIMEOUT_POLLS,
            watchdog: None,
            memory_write_continuation: false,
        }
    }
    #[must_use]
    pub fn timeout_polls(mut self, polls: u32) -> Self {
        self.timeout_polls = polls;
        self
    }
    #[must_use]
    pub fn watchdog(mut self, window: MillisDurationU32) -> Self {
        self.watchdog = Some(window);
        self
    }
    /// Register devices that take a repeated START as the end of the write
    /// (the HTS221 among them) need this to store the payload at the offset.
    #[must_use]
    pub fn memory_write_continuation(mut self, enabled: bool) -> Self {
        self.memory_write_continuation = enabled;
        self
    }
    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            // At least one status read per slot.
            timeout_polls: self.timeout_polls.max(1),
            watchdog: self.watchdog,
            memory_write_continuation: self.memory_write_continuation,
        }
    }
}
