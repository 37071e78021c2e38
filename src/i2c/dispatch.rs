// Licensed under the Apache-2.0 license

//! Interrupt event dispatcher.
//!
//! [`I2cHandle::handle_event`] is called once per peripheral interrupt. It
//! picks the highest-priority raised and enabled condition, services it and
//! returns. Conditions that do not fit the current state are left alone, so a
//! stray interrupt can never corrupt a transfer. An interrupt taken while no
//! transfer is armed masks the transfer sources instead.

use fugit::MillisDurationU32;

use crate::common::{log_debug, log_error, Logger};
use crate::i2c::callbacks::{I2cCallback, I2cCallbacks};
use crate::i2c::common::{I2cError, I2cOperation, I2cState};
use crate::i2c::framing::{register_byte, send_7bit_address, EndMode, StartStop};
use crate::i2c::handle::{phase_len, I2cHandle};
use crate::i2c::registers::{Cr1, I2cRegisters, Icr, Isr};

/// One interrupt condition, in service order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    NotAcknowledged,
    ReceiveReady,
    TransmitReady,
    /// TC or TCR (phase done, bus held) or STOPF (bus released).
    TransferComplete,
}

impl Event {
    /// Highest-priority condition that is both raised in `isr` and enabled in `cr1`.
    #[must_use]
    pub fn decode(isr: Isr, cr1: Cr1) -> Option<Self> {
        if isr.contains(Isr::NACKF) && cr1.contains(Cr1::NACKIE) {
            Some(Event::NotAcknowledged)
        } else if isr.contains(Isr::RXNE) && cr1.contains(Cr1::RXIE) {
            Some(Event::ReceiveReady)
        } else if isr.contains(Isr::TXIS) && cr1.contains(Cr1::TXIE) {
            Some(Event::TransmitReady)
        } else if (isr.contains(Isr::STOPF) && cr1.contains(Cr1::STOPIE))
            || (isr.intersects(Isr::TC | Isr::TCR) && cr1.contains(Cr1::TCIE))
        {
            Some(Event::TransferComplete)
        } else {
            None
        }
    }
}

impl<R: I2cRegisters, C: I2cCallbacks, L: Logger> I2cHandle<R, C, L> {
    /// Services one pending interrupt condition.
    ///
    /// Returns the event that was serviced, if any. Never blocks.
    pub fn handle_event(&mut self) -> Option<Event> {
        let isr = self.regs.read_isr();
        let cr1 = self.regs.read_cr1();
        let event = Event::decode(isr, cr1)?;
        if !self.transfer.state.is_busy() {
            // No transfer owns these sources. Masking them drops the line.
            self.regs.write_icr(Icr::NACKCF | Icr::STOPCF);
            self.disable_transfer_irqs();
            return Some(event);
        }
        self.transfer.idle = MillisDurationU32::from_ticks(0);
        match event {
            Event::NotAcknowledged => self.on_nack(),
            Event::ReceiveReady => self.on_receive(),
            Event::TransmitReady => self.on_transmit(),
            Event::TransferComplete if isr.contains(Isr::STOPF) && cr1.contains(Cr1::STOPIE) => {
                self.on_stop();
            }
            Event::TransferComplete => self.on_phase_done(),
        }
        Some(event)
    }

    fn on_nack(&mut self) {
        // The peripheral issues STOP by itself after a NACK.
        self.regs.write_icr(Icr::NACKCF | Icr::STOPCF);
        log_error!(
            self.logger,
            "i2c: 0x{:02x} nack in {:?}",
            self.transfer.device_address,
            self.transfer.state
        );
        self.abort(I2cError::NotAcknowledged, I2cCallback::NotAcknowledged);
    }

    fn on_receive(&mut self) {
        if self.transfer.state != I2cState::BusyReceiving {
            return;
        }
        let byte = self.regs.read_rxdr();
        let t = &mut self.transfer;
        if t.data_transferred < t.data_len && t.buffer.push(byte).is_ok() {
            t.data_transferred += 1;
        }
    }

    fn on_transmit(&mut self) {
        let t = &mut self.transfer;
        match t.state {
            I2cState::BusyAddressing if t.register_bytes_sent < t.register_width.bytes() => {
                let byte =
                    register_byte(t.register_address, t.register_width, t.register_bytes_sent);
                t.register_bytes_sent += 1;
                self.regs.write_txdr(byte);
            }
            I2cState::BusyTransmitting => {
                if let Some(&byte) = t.buffer.get(t.data_transferred) {
                    t.data_transferred += 1;
                    self.regs.write_txdr(byte);
                }
            }
            _ => {}
        }
    }

    /// TC or TCR: the offset has been shifted with the bus still held.
    fn on_phase_done(&mut self) {
        let t = &self.transfer;
        let offset_sent = t.register_bytes_sent >= t.register_width.bytes();
        if t.state != I2cState::BusyAddressing || !offset_sent {
            return;
        }
        let (next, start) = match t.operation {
            Some(I2cOperation::MemoryWrite) if self.config.memory_write_continuation => {
                (I2cState::BusyTransmitting, StartStop::None)
            }
            Some(I2cOperation::MemoryWrite) => (I2cState::BusyTransmitting, StartStop::StartWrite),
            Some(I2cOperation::MemoryRead) => (I2cState::BusyReceiving, StartStop::StartRead),
            _ => return,
        };
        let address = t.device_address;
        let len = phase_len(t.data_len);
        self.transfer.enter(next);
        // Writing CR2 clears TC/TCR.
        send_7bit_address(&mut self.regs, address, len, EndMode::AutoEnd, start);
    }

    fn on_stop(&mut self) {
        self.regs.write_icr(Icr::STOPCF);
        let state = self.transfer.state;
        if !matches!(state, I2cState::BusyTransmitting | I2cState::BusyReceiving) {
            return;
        }
        let Some(operation) = self.transfer.operation else {
            return;
        };
        log_debug!(
            self.logger,
            "i2c: {:?} 0x{:02x} done, {} bytes",
            operation,
            self.transfer.device_address,
            self.transfer.data_transferred
        );
        self.finish(I2cCallback::completion_for(operation));
    }
}
