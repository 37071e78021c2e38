// Licensed under the Apache-2.0 license

//! Polled transfers.
//!
//! The blocking entry points drive the peripheral from the calling context
//! with interrupts for the bus disabled. Every wait on a status flag is
//! bounded by [`I2cConfig::timeout_polls`](crate::i2c::common::I2cConfig)
//! reads of ISR, and a NACK seen during any wait ends the transfer at once.
//!
//! Payloads longer than one NBYTES block are split with RELOAD, so the
//! blocking paths have no length limit.

use embedded_hal::i2c::Operation;
use heapless::Vec;

use crate::common::{log_error, Logger};
use crate::i2c::callbacks::I2cCallbacks;
use crate::i2c::common::{I2cError, I2cOperation, I2cState, RegisterWidth, MAX_TRANSFER_LEN};
use crate::i2c::framing::{offset_bytes, send_7bit_address, EndMode, StartStop};
use crate::i2c::handle::{check_register, phase_len, I2cHandle};
use crate::i2c::registers::{I2cRegisters, Icr, Isr};
use crate::i2c::traits::{I2cMaster, I2cMemory};

impl<R: I2cRegisters, C: I2cCallbacks, L: Logger> I2cHandle<R, C, L> {
    /// Writes `data` to `address` and waits for the STOP.
    ///
    /// # Errors
    ///
    /// [`I2cError::Busy`] without touching the bus if the handle or the bus
    /// is engaged; [`I2cError::NotAcknowledged`] or [`I2cError::Timeout`]
    /// if the transfer fails part way. The handle is `Ready` afterwards in
    /// every case.
    pub fn write(&mut self, address: u8, data: &[u8]) -> Result<(), I2cError> {
        self.begin_blocking(I2cOperation::Write, address, 0, RegisterWidth::U8, data.len())?;
        self.transfer.enter(I2cState::BusyTransmitting);
        let result = self.write_phase(address, data, true, EndMode::AutoEnd);
        self.end_blocking(result)
    }

    /// Fills `buffer` from `address` and waits for the STOP.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), I2cError> {
        self.begin_blocking(I2cOperation::Read, address, 0, RegisterWidth::U8, buffer.len())?;
        self.transfer.enter(I2cState::BusyReceiving);
        let result = self.read_phase(address, buffer, true, EndMode::AutoEnd);
        self.end_blocking(result)
    }

    /// Writes `bytes`, then reads into `buffer` after a repeated START.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), I2cError> {
        self.begin_blocking(I2cOperation::Read, address, 0, RegisterWidth::U8, buffer.len())?;
        self.transfer.enter(I2cState::BusyTransmitting);
        let result = self
            .write_phase(address, bytes, true, EndMode::SoftEnd)
            .and_then(|()| {
                self.transfer.enter(I2cState::BusyReceiving);
                self.read_phase(address, buffer, true, EndMode::AutoEnd)
            });
        self.end_blocking(result)
    }

    /// Writes `data` to register `register` of `address`.
    ///
    /// The bus is held between the offset and the payload. The payload
    /// follows a repeated START unless
    /// [`I2cConfig::memory_write_continuation`](crate::i2c::common::I2cConfig)
    /// is set.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write), and [`I2cError::InvalidLength`] if
    /// `register` does not fit `width`.
    pub fn memory_write(
        &mut self,
        address: u8,
        register: u16,
        width: RegisterWidth,
        data: &[u8],
    ) -> Result<(), I2cError> {
        self.begin_blocking(I2cOperation::MemoryWrite, address, register, width, data.len())?;
        self.transfer.enter(I2cState::BusyAddressing);
        let offset = offset_bytes(register, width);
        let end = self.offset_end();
        let restart = end != EndMode::Reload;
        let result = self
            .write_phase(address, &offset, true, end)
            .and_then(|()| {
                self.transfer.enter(I2cState::BusyTransmitting);
                self.write_phase(address, data, restart, EndMode::AutoEnd)
            });
        self.end_blocking(result)
    }

    /// Reads `buffer.len()` bytes starting at register `register` of `address`.
    ///
    /// # Errors
    ///
    /// Same as [`memory_write`](Self::memory_write).
    pub fn memory_read(
        &mut self,
        address: u8,
        register: u16,
        width: RegisterWidth,
        buffer: &mut [u8],
    ) -> Result<(), I2cError> {
        self.begin_blocking(I2cOperation::MemoryRead, address, register, width, buffer.len())?;
        self.transfer.enter(I2cState::BusyAddressing);
        let offset = offset_bytes(register, width);
        let result = self
            .write_phase(address, &offset, true, EndMode::SoftEnd)
            .and_then(|()| {
                self.transfer.enter(I2cState::BusyReceiving);
                self.read_phase(address, buffer, true, EndMode::AutoEnd)
            });
        self.end_blocking(result)
    }

    /// Runs `operations` as one bus transaction.
    ///
    /// Adjacent operations of the same direction are merged without a
    /// START, a change of direction uses a repeated START and the last
    /// operation ends with STOP.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), I2cError> {
        let Some(first) = operations.first() else {
            return self.check_ready(address);
        };
        let operation = if is_read(first) {
            I2cOperation::Read
        } else {
            I2cOperation::Write
        };
        let total: usize = operations.iter().map(op_len).sum();
        self.begin_blocking(operation, address, 0, RegisterWidth::U8, total)?;
        let result = self.run_operations(address, operations);
        self.end_blocking(result)
    }

    fn run_operations(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), I2cError> {
        let mut previous_read = None;
        for index in 0..operations.len() {
            let next_read = operations.get(index + 1).map(is_read);
            let Some(op) = operations.get_mut(index) else {
                break;
            };
            let read = is_read(op);
            let start = previous_read != Some(read);
            let end = match next_read {
                None => EndMode::AutoEnd,
                Some(next) if next == read => EndMode::Reload,
                Some(_) => EndMode::SoftEnd,
            };
            match op {
                Operation::Write(bytes) => {
                    self.transfer.enter(I2cState::BusyTransmitting);
                    self.write_phase(address, bytes, start, end)?;
                }
                Operation::Read(buffer) => {
                    self.transfer.enter(I2cState::BusyReceiving);
                    self.read_phase(address, buffer, start, end)?;
                }
            }
            previous_read = Some(read);
        }
        Ok(())
    }

    fn begin_blocking(
        &mut self,
        operation: I2cOperation,
        address: u8,
        register: u16,
        width: RegisterWidth,
        len: usize,
    ) -> Result<(), I2cError> {
        self.check_ready(address)?;
        check_register(register, width)?;
        self.disable_transfer_irqs();
        self.arm(operation, address, register, width, Vec::new(), len);
        Ok(())
    }

    fn end_blocking(&mut self, result: Result<(), I2cError>) -> Result<(), I2cError> {
        if let Err(err) = result {
            log_error!(
                self.logger,
                "i2c: 0x{:02x} {:?} in {:?}",
                self.transfer.device_address,
                err,
                self.transfer.state
            );
            self.transfer.last_error = Some(err);
        }
        self.transfer.enter(I2cState::Ready);
        result
    }

    /// Sends `bytes`, one NBYTES block at a time.
    ///
    /// `start` issues a (repeated) START before the first block; otherwise
    /// the bytes continue a reload. `end` applies to the last block only.
    fn write_phase(
        &mut self,
        address: u8,
        bytes: &[u8],
        start: bool,
        end: EndMode,
    ) -> Result<(), I2cError> {
        let mut blocks = bytes.chunks(MAX_TRANSFER_LEN).peekable();
        let mut first = true;
        loop {
            let block = blocks.next().unwrap_or_default();
            let last = blocks.peek().is_none();
            let mode = if last { end } else { EndMode::Reload };
            let start_stop = if first && start {
                StartStop::StartWrite
            } else {
                StartStop::None
            };
            send_7bit_address(&mut self.regs, address, phase_len(block.len()), mode, start_stop);
            for &byte in block {
                self.wait_for(Isr::TXIS)?;
                self.regs.write_txdr(byte);
                self.count_byte();
            }
            self.wait_block_end(mode)?;
            if last {
                return Ok(());
            }
            first = false;
        }
    }

    /// Receives into `buffer`, one NBYTES block at a time.
    fn read_phase(
        &mut self,
        address: u8,
        buffer: &mut [u8],
        start: bool,
        end: EndMode,
    ) -> Result<(), I2cError> {
        let mut blocks = buffer.chunks_mut(MAX_TRANSFER_LEN).peekable();
        let mut first = true;
        loop {
            let block = blocks.next().unwrap_or_default();
            let last = blocks.peek().is_none();
            let mode = if last { end } else { EndMode::Reload };
            let start_stop = if first && start {
                StartStop::StartRead
            } else {
                StartStop::None
            };
            send_7bit_address(&mut self.regs, address, phase_len(block.len()), mode, start_stop);
            for slot in block.iter_mut() {
                self.wait_for(Isr::RXNE)?;
                *slot = self.regs.read_rxdr();
                self.count_byte();
            }
            self.wait_block_end(mode)?;
            if last {
                return Ok(());
            }
            first = false;
        }
    }

    fn count_byte(&mut self) {
        let t = &mut self.transfer;
        if t.state == I2cState::BusyAddressing {
            t.register_bytes_sent += 1;
        } else {
            t.data_transferred += 1;
        }
    }

    fn wait_block_end(&mut self, mode: EndMode) -> Result<(), I2cError> {
        match mode {
            EndMode::Reload => self.wait_for(Isr::TCR),
            EndMode::SoftEnd => self.wait_for(Isr::TC),
            EndMode::AutoEnd => {
                self.wait_for(Isr::STOPF)?;
                self.regs.write_icr(Icr::STOPCF);
                Ok(())
            }
        }
    }

    /// Polls ISR until any bit of `flags` is set.
    fn wait_for(&mut self, flags: Isr) -> Result<(), I2cError> {
        for _ in 0..self.config.timeout_polls {
            let isr = self.regs.read_isr();
            if isr.contains(Isr::NACKF) {
                self.regs.write_icr(Icr::NACKCF | Icr::STOPCF);
                return Err(I2cError::NotAcknowledged);
            }
            if isr.intersects(flags) {
                return Ok(());
            }
        }
        Err(I2cError::Timeout)
    }
}

fn is_read(op: &Operation<'_>) -> bool {
    matches!(op, Operation::Read(_))
}

fn op_len(op: &Operation<'_>) -> usize {
    match op {
        Operation::Read(buffer) => buffer.len(),
        Operation::Write(bytes) => bytes.len(),
    }
}

impl<R: I2cRegisters, C: I2cCallbacks, L: Logger> I2cMaster for I2cHandle<R, C, L> {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), I2cError> {
        I2cHandle::write(self, addr, bytes)
    }

    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), I2cError> {
        I2cHandle::read(self, addr, buffer)
    }

    fn write_read(&mut self, addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), I2cError> {
        I2cHandle::write_read(self, addr, bytes, buffer)
    }

    fn transaction_slice(
        &mut self,
        addr: u8,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), I2cError> {
        self.transaction(addr, ops_slice)
    }
}

impl<R: I2cRegisters, C: I2cCallbacks, L: Logger> I2cMemory for I2cHandle<R, C, L> {
    fn memory_write(
        &mut self,
        addr: u8,
        register: u16,
        width: RegisterWidth,
        data: &[u8],
    ) -> Result<(), I2cError> {
        I2cHandle::memory_write(self, addr, register, width, data)
    }

    fn memory_read(
        &mut self,
        addr: u8,
        register: u16,
        width: RegisterWidth,
        buffer: &mut [u8],
    ) -> Result<(), I2cError> {
        I2cHandle::memory_read(self, addr, register, width, buffer)
    }
}
