// Licensed under the Apache-2.0 license

//! STM32 I2C (v2 peripheral) master driver.
//!
//! The driver is split along the lines of the peripheral's own protocol:
//! a register view, a framing encoder for CR2, a bus handle holding the
//! transfer state machine, polled and interrupt-driven entry points, and a
//! callback registry for asynchronous completion. Device drivers reach the
//! bus through the register-access adapters in [`device`].

pub mod blocking;
pub mod callbacks;
pub mod common;
pub mod device;
pub mod dispatch;
pub mod framing;
pub mod handle;
pub mod i2c_controller;
pub mod instances;
pub mod queue;
pub mod registers;
pub mod shared;
pub mod traits;

pub use callbacks::{CallbackMask, I2cCallback, I2cCallbacks, NoCallbacks, TransferInfo};
pub use common::{
    I2cConfig, I2cConfigBuilder, I2cError, I2cOperation, I2cState, RegisterWidth, TransferStatus,
};
pub use device::{DeviceError, HalRegisters, InterruptRegisters, RegisterAccess};
pub use dispatch::Event;
pub use handle::I2cHandle;
pub use i2c_controller::I2cController;
pub use queue::{Completion, QueueCallbacks};
pub use registers::{I2cRegisters, Mmio};
pub use shared::SharedI2c;
pub use traits::{I2cHardwareCore, I2cMaster, I2cMasterAsync, I2cMemory};
