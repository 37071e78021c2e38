// Licensed under the Apache-2.0 license

//! Handle storage shared between foreground code and the interrupt handler.
//!
//! The handle lives in a `static` guarded by a critical section. Foreground
//! code arms transfers inside [`SharedI2c::with`], so an interrupt can never
//! observe a half-armed handle; the interrupt vector calls
//! [`SharedI2c::on_interrupt`], which takes the same lock.
//!
//! The crate only depends on the `critical-section` API. The final binary
//! links exactly one implementation, for example `cortex-m` with the
//! `critical-section-single-core` feature on a single-core part, or the one
//! its HAL or executor already provides.
//!
//! ```rust,ignore
//! static I2C1: SharedI2c<I2cHandle<Mmio, Sensor>> = SharedI2c::new();
//!
//! #[interrupt]
//! fn I2C1_EV() {
//!     I2C1.on_interrupt();
//! }
//! ```

use core::cell::RefCell;

use critical_section::Mutex;

use crate::i2c::common::I2cError;
use crate::i2c::traits::I2cHardwareCore;

pub struct SharedI2c<H> {
    inner: Mutex<RefCell<Option<H>>>,
}

impl<H> Default for SharedI2c<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> SharedI2c<H> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Stores `handle`, returning the one it replaces.
    ///
    /// # Panics
    ///
    /// If called from inside [`with`](Self::with).
    pub fn install(&self, handle: H) -> Option<H> {
        critical_section::with(|cs| self.inner.borrow(cs).replace(Some(handle)))
    }

    /// Removes the handle.
    ///
    /// # Panics
    ///
    /// If called from inside [`with`](Self::with).
    pub fn take(&self) -> Option<H> {
        critical_section::with(|cs| self.inner.borrow(cs).take())
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow()
                .map(|slot| slot.is_some())
                .unwrap_or(true)
        })
    }

    /// Runs `f` on the handle inside a critical section.
    ///
    /// Returns `None` if no handle is installed or if the handle is already
    /// borrowed further up the stack (a callback calling back into the bus).
    pub fn with<T>(&self, f: impl FnOnce(&mut H) -> T) -> Option<T> {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow(cs).try_borrow_mut().ok()?;
            slot.as_mut().map(f)
        })
    }

    /// Like [`with`](Self::with) for fallible bus calls.
    ///
    /// # Errors
    ///
    /// [`I2cError::Unavailable`] if the handle cannot be reached, otherwise
    /// whatever `f` returns.
    pub fn try_with<T>(
        &self,
        f: impl FnOnce(&mut H) -> Result<T, I2cError>,
    ) -> Result<T, I2cError> {
        self.with(f).unwrap_or(Err(I2cError::Unavailable))
    }
}

impl<H: I2cHardwareCore> SharedI2c<H> {
    /// Interrupt entry point: services one pending event.
    pub fn on_interrupt(&self) {
        self.with(H::handle_interrupt);
    }
}
