// Licensed under the Apache-2.0 license

//! Completion events posted from interrupt context to a single-consumer queue.
//!
//! [`QueueCallbacks`] turns every delivered callback into a [`Completion`]
//! record and enqueues it on a `heapless::spsc` queue. Foreground code drains
//! the consumer end at its own pace instead of doing work inside the
//! interrupt.
//!
//! ```rust,ignore
//! static mut EVENTS: Queue<Completion, 8> = Queue::new();
//! let (producer, mut consumer) = unsafe { EVENTS.split() };
//! let handle = I2cHandle::new(regs, config).with_callbacks(QueueCallbacks::new(producer));
//! // ...
//! while let Some(done) = consumer.dequeue() { /* ... */ }
//! ```

use heapless::spsc::Producer;
use heapless::Vec;

use crate::i2c::callbacks::{I2cCallback, I2cCallbacks, TransferInfo};
use crate::i2c::common::I2cError;

/// Payload bytes copied into each [`Completion`].
pub const COMPLETION_DATA_LEN: usize = 32;

/// One finished or failed transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub kind: I2cCallback,
    pub device_address: u8,
    pub register_address: u16,
    pub error: Option<I2cError>,
    /// Leading bytes of the data phase, truncated to [`COMPLETION_DATA_LEN`].
    pub data: Vec<u8, COMPLETION_DATA_LEN>,
}

impl Completion {
    fn new(kind: I2cCallback, info: &TransferInfo<'_>) -> Self {
        Self {
            kind,
            device_address: info.device_address,
            register_address: info.register_address,
            error: info.error,
            data: info.data.iter().take(COMPLETION_DATA_LEN).copied().collect(),
        }
    }
}

/// Callback set that forwards every event to a queue producer.
pub struct QueueCallbacks<'q, const N: usize> {
    producer: Producer<'q, Completion, N>,
    dropped: u32,
}

impl<'q, const N: usize> QueueCallbacks<'q, N> {
    pub fn new(producer: Producer<'q, Completion, N>) -> Self {
        Self {
            producer,
            dropped: 0,
        }
    }

    /// Events discarded because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    fn post(&mut self, kind: I2cCallback, info: &TransferInfo<'_>) {
        if self.producer.enqueue(Completion::new(kind, info)).is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
    }
}

impl<const N: usize> I2cCallbacks for QueueCallbacks<'_, N> {
    fn write_complete(&mut self, info: &TransferInfo<'_>) {
        self.post(I2cCallback::WriteComplete, info);
    }
    fn read_complete(&mut self, info: &TransferInfo<'_>) {
        self.post(I2cCallback::ReadComplete, info);
    }
    fn memory_write_complete(&mut self, info: &TransferInfo<'_>) {
        self.post(I2cCallback::MemoryWriteComplete, info);
    }
    fn memory_read_complete(&mut self, info: &TransferInfo<'_>) {
        self.post(I2cCallback::MemoryReadComplete, info);
    }
    fn not_acknowledged(&mut self, info: &TransferInfo<'_>) {
        self.post(I2cCallback::NotAcknowledged, info);
    }
    fn timeout(&mut self, info: &TransferInfo<'_>) {
        self.post(I2cCallback::Timeout, info);
    }
}
