// Licensed under the Apache-2.0 license

//! CR2 framing word encoder.
//!
//! Every bus phase starts with one store to CR2 that carries the slave
//! address, the byte count of the phase, how the phase ends and whether a
//! START (with direction) or a STOP is generated.

use heapless::Vec;

use crate::i2c::common::RegisterWidth;
use crate::i2c::registers::{cr2, I2cRegisters};

/// What the peripheral does after the last byte of a phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndMode {
    /// Hold the bus and raise TCR; another NBYTES block follows without a START.
    Reload,
    /// Generate STOP automatically, raising STOPF.
    AutoEnd,
    /// Hold the bus and raise TC; software issues a restart or a stop.
    SoftEnd,
}

/// Start/stop request carried by the framing word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartStop {
    /// Continue the current transfer (used after a reload).
    None,
    Stop,
    StartRead,
    StartWrite,
}

const FRAMING_FIELDS: u32 = cr2::SADD_MASK
    | cr2::NBYTES_MASK
    | cr2::RELOAD
    | cr2::AUTOEND
    | cr2::RD_WRN
    | cr2::START
    | cr2::STOP;

/// Computes the CR2 value for a phase from the current CR2 contents.
///
/// Bits outside the framing fields are carried over from `current`.
#[must_use]
pub fn encode(current: u32, address: u8, nbytes: u8, end: EndMode, start_stop: StartStop) -> u32 {
    let mut value = current & !FRAMING_FIELDS;
    value |= (u32::from(address) << 1) & cr2::SADD_MASK;
    value |= u32::from(nbytes) << cr2::NBYTES_SHIFT;
    value |= match end {
        EndMode::Reload => cr2::RELOAD,
        EndMode::AutoEnd => cr2::AUTOEND,
        EndMode::SoftEnd => 0,
    };
    value |= match start_stop {
        StartStop::None => 0,
        StartStop::Stop => cr2::STOP,
        StartStop::StartRead => cr2::START | cr2::RD_WRN,
        StartStop::StartWrite => cr2::START,
    };
    value
}

/// Writes the framing word for a phase to CR2 in a single store.
pub fn send_7bit_address<R: I2cRegisters + ?Sized>(
    regs: &mut R,
    address: u8,
    nbytes: u8,
    end: EndMode,
    start_stop: StartStop,
) {
    let value = encode(regs.read_cr2(), address, nbytes, end, start_stop);
    regs.write_cr2(value);
}

/// Byte `index` of a register offset as it goes out on the wire, most
/// significant byte first.
///
/// A `U8` offset keeps only its low byte; the handle rejects larger offsets
/// before a transfer is armed.
#[must_use]
pub fn register_byte(register: u16, width: RegisterWidth, index: usize) -> u8 {
    let [hi, lo] = register.to_be_bytes();
    match (width, index) {
        (RegisterWidth::U16, 0) => hi,
        _ => lo,
    }
}

/// All bytes of a register offset in wire order.
#[must_use]
pub fn offset_bytes(register: u16, width: RegisterWidth) -> Vec<u8, 2> {
    (0..width.bytes())
        .map(|index| register_byte(register, width, index))
        .collect()
}
