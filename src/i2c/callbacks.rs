// Licensed under the Apache-2.0 license

//! Completion and error notifications for interrupt-driven transfers.
//!
//! A handle owns one [`I2cCallbacks`] implementation plus a [`CallbackMask`]
//! selecting which kinds are delivered. Every method has a no-op default, so
//! an implementation only overrides the events it cares about. Callbacks run
//! in interrupt context after the handle has already returned to `Ready` and
//! must not block.

use bitflags::bitflags;

use crate::i2c::common::{I2cError, I2cOperation};

/// Kind of notification delivered by the dispatcher.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cCallback {
    WriteComplete,
    ReadComplete,
    MemoryWriteComplete,
    MemoryReadComplete,
    NotAcknowledged,
    Timeout,
}

impl I2cCallback {
    /// Completion kind for a finished transfer of `operation`.
    #[must_use]
    pub fn completion_for(operation: I2cOperation) -> Self {
        match operation {
            I2cOperation::Write | I2cOperation::WriteAsync => I2cCallback::WriteComplete,
            I2cOperation::Read | I2cOperation::ReadAsync => I2cCallback::ReadComplete,
            I2cOperation::MemoryWrite => I2cCallback::MemoryWriteComplete,
            I2cOperation::MemoryRead => I2cCallback::MemoryReadComplete,
        }
    }

    #[must_use]
    pub fn mask(self) -> CallbackMask {
        match self {
            I2cCallback::WriteComplete => CallbackMask::WRITE_COMPLETE,
            I2cCallback::ReadComplete => CallbackMask::READ_COMPLETE,
            I2cCallback::MemoryWriteComplete => CallbackMask::MEMORY_WRITE_COMPLETE,
            I2cCallback::MemoryReadComplete => CallbackMask::MEMORY_READ_COMPLETE,
            I2cCallback::NotAcknowledged => CallbackMask::NOT_ACKNOWLEDGED,
            I2cCallback::Timeout => CallbackMask::TIMEOUT,
        }
    }
}

bitflags! {
    /// Which callback kinds a handle delivers.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct CallbackMask: u8 {
        const WRITE_COMPLETE = 1 << 0;
        const READ_COMPLETE = 1 << 1;
        const MEMORY_WRITE_COMPLETE = 1 << 2;
        const MEMORY_READ_COMPLETE = 1 << 3;
        const NOT_ACKNOWLEDGED = 1 << 4;
        const TIMEOUT = 1 << 5;
    }
}

/// Read-only view of the handle passed to every callback.
#[derive(Copy, Clone, Debug)]
pub struct TransferInfo<'a> {
    pub operation: Option<I2cOperation>,
    pub device_address: u8,
    pub register_address: u16,
    pub error: Option<I2cError>,
    /// Bytes moved by the data phase; for reads this is the received payload.
    pub data: &'a [u8],
}

/// Handlers invoked by the interrupt dispatcher.
pub trait I2cCallbacks {
    fn write_complete(&mut self, _info: &TransferInfo<'_>) {}
    fn read_complete(&mut self, _info: &TransferInfo<'_>) {}
    fn memory_write_complete(&mut self, _info: &TransferInfo<'_>) {}
    fn memory_read_complete(&mut self, _info: &TransferInfo<'_>) {}
    fn not_acknowledged(&mut self, _info: &TransferInfo<'_>) {}
    /// The watchdog abandoned a transfer that saw no interrupt activity.
    fn timeout(&mut self, _info: &TransferInfo<'_>) {}

    /// Routes `kind` to the matching handler.
    fn notify(&mut self, kind: I2cCallback, info: &TransferInfo<'_>) {
        match kind {
            I2cCallback::WriteComplete => self.write_complete(info),
            I2cCallback::ReadComplete => self.read_complete(info),
            I2cCallback::MemoryWriteComplete => self.memory_write_complete(info),
            I2cCallback::MemoryReadComplete => self.memory_read_complete(info),
            I2cCallback::NotAcknowledged => self.not_acknowledged(info),
            I2cCallback::Timeout => self.timeout(info),
        }
    }
}

/// Callback set that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCallbacks;

impl I2cCallbacks for NoCallbacks {}

impl<T: I2cCallbacks + ?Sized> I2cCallbacks for &mut T {
    fn write_complete(&mut self, info: &TransferInfo<'_>) {
        T::write_complete(self, info);
    }
    fn read_complete(&mut self, info: &TransferInfo<'_>) {
        T::read_complete(self, info);
    }
    fn memory_write_complete(&mut self, info: &TransferInfo<'_>) {
        T::memory_write_complete(self, info);
    }
    fn memory_read_complete(&mut self, info: &TransferInfo<'_>) {
        T::memory_read_complete(self, info);
    }
    fn not_acknowledged(&mut self, info: &TransferInfo<'_>) {
        T::not_acknowledged(self, info);
    }
    fn timeout(&mut self, info: &TransferInfo<'_>) {
        T::timeout(self, info);
    }
}
