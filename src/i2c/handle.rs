// Licensed under the Apache-2.0 license

//! Bus handle and transfer state machine.
//!
//! One [`I2cHandle`] exists per physical bus. It owns the register view and
//! records everything about the transfer in flight: the operation, the target
//! address, the register offset of memory operations, the payload buffer and
//! the progress of both phases.
//!
//! ```text
//! Ready ──write_async──────────────▶ BusyTransmitting ──STOPF──▶ Ready
//! Ready ──read_async───────────────▶ BusyReceiving    ──STOPF──▶ Ready
//! Ready ──memory_*_async──▶ BusyAddressing ──TC──▶ Busy{Transmitting,Receiving}
//! any Busy* ──NACKF / watchdog──▶ Ready
//! ```
//!
//! Entry points only write transfer fields while the handle is `Ready`; the
//! interrupt dispatcher (see `dispatch.rs`) only writes them while it is
//! busy. Blocking entry points live in `blocking.rs`.

use fugit::MillisDurationU32;
use heapless::Vec;

use crate::common::{log_debug, log_error, Logger, NoOpLogger};
use crate::i2c::callbacks::{CallbackMask, I2cCallback, I2cCallbacks, NoCallbacks, TransferInfo};
use crate::i2c::common::{
    I2cConfig, I2cError, I2cOperation, I2cState, RegisterWidth, TransferStatus, MAX_TRANSFER_LEN,
};
use crate::i2c::framing::{send_7bit_address, EndMode, StartStop};
use crate::i2c::registers::{Cr1, I2cRegisters, Icr, Isr};
use crate::i2c::traits::{I2cHardwareCore, I2cMasterAsync};

/// Transient fields of the transfer in flight.
#[derive(Debug)]
pub(super) struct Transfer {
    pub(super) state: I2cState,
    pub(super) previous_state: I2cState,
    pub(super) operation: Option<I2cOperation>,
    pub(super) device_address: u8,
    pub(super) register_address: u16,
    pub(super) register_width: RegisterWidth,
    /// Payload to send, or the bytes received so far.
    pub(super) buffer: Vec<u8, MAX_TRANSFER_LEN>,
    pub(super) data_len: usize,
    pub(super) data_transferred: usize,
    pub(super) register_bytes_sent: usize,
    pub(super) last_error: Option<I2cError>,
    /// Time since the last serviced interrupt.
    pub(super) idle: MillisDurationU32,
}

impl Transfer {
    fn idle() -> Self {
        Self {
            state: I2cState::Ready,
            previous_state: I2cState::Ready,
            operation: None,
            device_address: 0,
            register_address: 0,
            register_width: RegisterWidth::U8,
            buffer: Vec::new(),
            data_len: 0,
            data_transferred: 0,
            register_bytes_sent: 0,
            last_error: None,
            idle: MillisDurationU32::from_ticks(0),
        }
    }

    pub(super) fn enter(&mut self, state: I2cState) {
        self.previous_state = self.state;
        self.state = state;
    }
}

pub struct I2cHandle<R, C = NoCallbacks, L = NoOpLogger> {
    pub(super) regs: R,
    pub(super) config: I2cConfig,
    pub(super) callbacks: C,
    pub(super) enabled: CallbackMask,
    pub(super) logger: L,
    pub(super) transfer: Transfer,
}

impl<R: I2cRegisters> I2cHandle<R> {
    /// Binds a register view. The peripheral is not touched.
    pub fn new(regs: R, config: I2cConfig) -> Self {
        Self {
            regs,
            config,
            callbacks: NoCallbacks,
            enabled: CallbackMask::all(),
            logger: NoOpLogger,
            transfer: Transfer::idle(),
        }
    }
}

impl<R: I2cRegisters, C: I2cCallbacks, L: Logger> I2cHandle<R, C, L> {
    /// Replaces the callback set. Every kind starts enabled.
    pub fn with_callbacks<C2: I2cCallbacks>(self, callbacks: C2) -> I2cHandle<R, C2, L> {
        I2cHandle {
            regs: self.regs,
            config: self.config,
            callbacks,
            enabled: CallbackMask::all(),
            logger: self.logger,
            transfer: self.transfer,
        }
    }

    pub fn with_logger<L2: Logger>(self, logger: L2) -> I2cHandle<R, C, L2> {
        I2cHandle {
            regs: self.regs,
            config: self.config,
            callbacks: self.callbacks,
            enabled: self.enabled,
            logger,
            transfer: self.transfer,
        }
    }

    /// Resets every transient field to its idle value and masks the transfer
    /// interrupt sources.
    ///
    /// Only CR1 is written, never the bus, so calling this repeatedly is
    /// harmless. A transfer abandoned this way raises no further interrupts.
    pub fn initialize(&mut self) {
        self.disable_transfer_irqs();
        self.transfer = Transfer::idle();
    }

    /// Swaps in a new callback set while no transfer is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`I2cError::Busy`] if a transfer is armed.
    pub fn set_callbacks(&mut self, callbacks: C) -> Result<(), I2cError> {
        if self.transfer.state.is_busy() {
            return Err(I2cError::Busy);
        }
        self.callbacks = callbacks;
        Ok(())
    }

    /// Selects which callback kinds are delivered.
    ///
    /// # Errors
    ///
    /// Returns [`I2cError::Busy`] if a transfer is armed.
    pub fn enable_callbacks(&mut self, mask: CallbackMask) -> Result<(), I2cError> {
        if self.transfer.state.is_busy() {
            return Err(I2cError::Busy);
        }
        self.enabled = mask;
        Ok(())
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    pub fn config(&self) -> &I2cConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> I2cState {
        self.transfer.state
    }

    #[must_use]
    pub fn last_error(&self) -> Option<I2cError> {
        self.transfer.last_error
    }

    #[must_use]
    pub fn status(&self) -> TransferStatus {
        let t = &self.transfer;
        TransferStatus {
            state: t.state,
            previous_state: t.previous_state,
            operation: t.operation,
            device_address: t.device_address,
            register_address: t.register_address,
            register_width: t.register_width,
            data_len: t.data_len,
            data_transferred: t.data_transferred,
            register_bytes_sent: t.register_bytes_sent,
            last_error: t.last_error,
        }
    }

    /// Payload collected by the last interrupt-driven read.
    #[must_use]
    pub fn received(&self) -> &[u8] {
        match self.transfer.operation {
            Some(op) if op.is_read() => self.transfer.buffer.as_slice(),
            _ => &[],
        }
    }

    /// Outcome of the last interrupt-driven transfer.
    ///
    /// # Errors
    ///
    /// `WouldBlock` while the transfer is in flight, otherwise the error it
    /// ended with.
    pub fn poll(&self) -> nb::Result<(), I2cError> {
        if self.transfer.state.is_busy() {
            return Err(nb::Error::WouldBlock);
        }
        match self.transfer.last_error {
            Some(err) => Err(nb::Error::Other(err)),
            None => Ok(()),
        }
    }

    /// Starts an interrupt-driven write of `data` to `address`.
    ///
    /// # Errors
    ///
    /// [`I2cError::Busy`] if the bus or the handle is engaged,
    /// [`I2cError::InvalidLength`] if `data` is longer than one phase allows.
    /// Neither changes the handle.
    pub fn write_async(&mut self, address: u8, data: &[u8]) -> Result<(), I2cError> {
        self.check_ready(address)?;
        let buffer = Vec::from_slice(data).map_err(|()| I2cError::InvalidLength)?;
        let len = buffer.len();
        self.arm(I2cOperation::WriteAsync, address, 0, RegisterWidth::U8, buffer, len);
        self.transfer.enter(I2cState::BusyTransmitting);
        self.enable_transfer_irqs(Cr1::TXIE | Cr1::NACKIE | Cr1::STOPIE);
        send_7bit_address(
            &mut self.regs,
            address,
            phase_len(len),
            EndMode::AutoEnd,
            StartStop::StartWrite,
        );
        Ok(())
    }

    /// Starts an interrupt-driven read of `len` bytes from `address`.
    ///
    /// The bytes are available from [`received`](Self::received) and from
    /// the read-complete callback.
    ///
    /// # Errors
    ///
    /// Same as [`write_async`](Self::write_async).
    pub fn read_async(&mut self, address: u8, len: usize) -> Result<(), I2cError> {
        self.check_ready(address)?;
        check_len(len)?;
        self.arm(I2cOperation::ReadAsync, address, 0, RegisterWidth::U8, Vec::new(), len);
        self.transfer.enter(I2cState::BusyReceiving);
        self.enable_transfer_irqs(Cr1::RXIE | Cr1::NACKIE | Cr1::STOPIE);
        send_7bit_address(
            &mut self.regs,
            address,
            phase_len(len),
            EndMode::AutoEnd,
            StartStop::StartRead,
        );
        Ok(())
    }

    /// Starts an interrupt-driven write of `data` to register `register`.
    ///
    /// The offset goes out first, most significant byte first. Once it has
    /// been shifted the payload follows after a repeated START, or in the same
    /// write when [`I2cConfig::memory_write_continuation`] is set.
    ///
    /// # Errors
    ///
    /// Same as [`write_async`](Self::write_async), and
    /// [`I2cError::InvalidLength`] if `register` does not fit `width`.
    pub fn memory_write_async(
        &mut self,
        address: u8,
        register: u16,
        width: RegisterWidth,
        data: &[u8],
    ) -> Result<(), I2cError> {
        self.check_ready(address)?;
        check_register(register, width)?;
        let buffer = Vec::from_slice(data).map_err(|()| I2cError::InvalidLength)?;
        let len = buffer.len();
        self.arm(I2cOperation::MemoryWrite, address, register, width, buffer, len);
        self.transfer.enter(I2cState::BusyAddressing);
        self.enable_transfer_irqs(Cr1::TXIE | Cr1::NACKIE | Cr1::STOPIE | Cr1::TCIE);
        let end = self.offset_end();
        send_7bit_address(
            &mut self.regs,
            address,
            phase_len(width.bytes()),
            end,
            StartStop::StartWrite,
        );
        Ok(())
    }

    /// Starts an interrupt-driven read of `len` bytes from register `register`.
    ///
    /// The offset is written with the bus held, then a repeated START turns
    /// the bus around for the data phase.
    ///
    /// # Errors
    ///
    /// Same as [`memory_write_async`](Self::memory_write_async).
    pub fn memory_read_async(
        &mut self,
        address: u8,
        register: u16,
        width: RegisterWidth,
        len: usize,
    ) -> Result<(), I2cError> {
        self.check_ready(address)?;
        check_register(register, width)?;
        check_len(len)?;
        self.arm(I2cOperation::MemoryRead, address, register, width, Vec::new(), len);
        self.transfer.enter(I2cState::BusyAddressing);
        self.enable_transfer_irqs(Cr1::TRANSFER_IRQS);
        send_7bit_address(
            &mut self.regs,
            address,
            phase_len(width.bytes()),
            EndMode::SoftEnd,
            StartStop::StartWrite,
        );
        Ok(())
    }

    /// Advances the watchdog of an interrupt-driven transfer by `elapsed`.
    ///
    /// Once the configured window passes without a serviced interrupt the
    /// transfer is abandoned with [`I2cError::Timeout`] and the timeout
    /// callback fires. Returns `true` if that happened on this tick.
    pub fn watchdog_tick(&mut self, elapsed: MillisDurationU32) -> bool {
        let Some(window) = self.config.watchdog else {
            return false;
        };
        if !self.transfer.state.is_busy() {
            return false;
        }
        let idle_ms = self.transfer.idle.ticks().saturating_add(elapsed.ticks());
        self.transfer.idle = MillisDurationU32::from_ticks(idle_ms);
        if self.transfer.idle < window {
            return false;
        }
        log_error!(
            self.logger,
            "i2c: watchdog expired for 0x{:02x} in {:?}",
            self.transfer.device_address,
            self.transfer.state
        );
        self.abort(I2cError::Timeout, I2cCallback::Timeout);
        true
    }

    /// Resets the peripheral by cycling PE and forces the handle to `Ready`.
    ///
    /// # Errors
    ///
    /// [`I2cError::Timeout`] if PE does not read back as cleared.
    pub fn recover_bus(&mut self) -> Result<(), I2cError> {
        log_debug!(self.logger, "i2c: recovering bus in {:?}", self.transfer.state);
        self.regs.modify_cr1(|cr1| cr1 - Cr1::TRANSFER_IRQS - Cr1::PE);
        let mut cleared = false;
        for _ in 0..self.config.timeout_polls {
            if !self.regs.read_cr1().contains(Cr1::PE) {
                cleared = true;
                break;
            }
        }
        self.regs.modify_cr1(|cr1| cr1 | Cr1::PE);
        self.regs.write_icr(Icr::all());
        self.transfer.enter(I2cState::Ready);
        if cleared {
            Ok(())
        } else {
            self.transfer.last_error = Some(I2cError::Timeout);
            Err(I2cError::Timeout)
        }
    }

    /// Rejects the call if the handle or the bus is engaged.
    pub(super) fn check_ready(&mut self, address: u8) -> Result<(), I2cError> {
        if self.transfer.state.is_busy() || self.regs.read_isr().contains(Isr::BUSY) {
            log_debug!(
                self.logger,
                "i2c: 0x{:02x} rejected, handle {:?}",
                address,
                self.transfer.state
            );
            return Err(I2cError::Busy);
        }
        Ok(())
    }

    /// End mode of the offset phase of a memory write.
    pub(super) fn offset_end(&self) -> EndMode {
        if self.config.memory_write_continuation {
            EndMode::Reload
        } else {
            EndMode::SoftEnd
        }
    }

    /// Records a new transfer. Only called from `Ready`.
    pub(super) fn arm(
        &mut self,
        operation: I2cOperation,
        address: u8,
        register: u16,
        width: RegisterWidth,
        buffer: Vec<u8, MAX_TRANSFER_LEN>,
        len: usize,
    ) {
        let t = &mut self.transfer;
        t.operation = Some(operation);
        t.device_address = address;
        t.register_address = register;
        t.register_width = width;
        t.buffer = buffer;
        t.data_len = len;
        t.data_transferred = 0;
        t.register_bytes_sent = 0;
        t.last_error = None;
        t.idle = MillisDurationU32::from_ticks(0);
        // Flags left over from an earlier transfer must not be serviced.
        self.regs.write_icr(Icr::NACKCF | Icr::STOPCF);
        log_debug!(
            self.logger,
            "i2c: {:?} 0x{:02x} reg 0x{:04x} len {}",
            operation,
            address,
            register,
            len
        );
    }

    pub(super) fn enable_transfer_irqs(&mut self, sources: Cr1) {
        self.regs.modify_cr1(|cr1| (cr1 - Cr1::TRANSFER_IRQS) | sources);
    }

    pub(super) fn disable_transfer_irqs(&mut self) {
        self.regs.modify_cr1(|cr1| cr1 - Cr1::TRANSFER_IRQS);
    }

    /// Ends the transfer in flight and reports `kind`.
    pub(super) fn finish(&mut self, kind: I2cCallback) {
        self.disable_transfer_irqs();
        self.transfer.enter(I2cState::Ready);
        self.notify(kind);
    }

    /// Ends the transfer in flight with `error` and reports `kind`.
    pub(super) fn abort(&mut self, error: I2cError, kind: I2cCallback) {
        self.transfer.last_error = Some(error);
        self.finish(kind);
    }

    fn notify(&mut self, kind: I2cCallback) {
        if !self.enabled.contains(kind.mask()) {
            return;
        }
        let t = &self.transfer;
        let info = TransferInfo {
            operation: t.operation,
            device_address: t.device_address,
            register_address: t.register_address,
            error: t.last_error,
            data: &t.buffer,
        };
        self.callbacks.notify(kind, &info);
    }
}

pub(super) fn check_len(len: usize) -> Result<(), I2cError> {
    if len > MAX_TRANSFER_LEN {
        return Err(I2cError::InvalidLength);
    }
    Ok(())
}

pub(super) fn check_register(register: u16, width: RegisterWidth) -> Result<(), I2cError> {
    if !width.holds(register) {
        return Err(I2cError::InvalidLength);
    }
    Ok(())
}

/// NBYTES value for a phase already checked against [`MAX_TRANSFER_LEN`].
pub(super) fn phase_len(len: usize) -> u8 {
    u8::try_from(len).unwrap_or(u8::MAX)
}

impl<R: I2cRegisters, C: I2cCallbacks, L: Logger> I2cHardwareCore for I2cHandle<R, C, L> {
    type Error = I2cError;

    fn init(&mut self) {
        self.initialize();
    }

    fn handle_interrupt(&mut self) {
        self.handle_event();
    }

    fn recover_bus(&mut self) -> Result<(), I2cError> {
        I2cHandle::recover_bus(self)
    }
}

impl<R: I2cRegisters, C: I2cCallbacks, L: Logger> I2cMasterAsync for I2cHandle<R, C, L> {
    fn write_async(&mut self, addr: u8, data: &[u8]) -> Result<(), I2cError> {
        I2cHandle::write_async(self, addr, data)
    }

    fn read_async(&mut self, addr: u8, len: usize) -> Result<(), I2cError> {
        I2cHandle::read_async(self, addr, len)
    }

    fn memory_write_async(
        &mut self,
        addr: u8,
        register: u16,
        width: RegisterWidth,
        data: &[u8],
    ) -> Result<(), I2cError> {
        I2cHandle::memory_write_async(self, addr, register, width, data)
    }

    fn memory_read_async(
        &mut self,
        addr: u8,
        register: u16,
        width: RegisterWidth,
        len: usize,
    ) -> Result<(), I2cError> {
        I2cHandle::memory_read_async(self, addr, register, width, len)
    }

    fn state(&self) -> I2cState {
        I2cHandle::state(self)
    }

    fn last_error(&self) -> Option<I2cError> {
        I2cHandle::last_error(self)
    }

    fn received(&self) -> &[u8] {
        I2cHandle::received(self)
    }
}
